use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use machinesense_api::config::{init_tracing, load_config};
use machinesense_api::db::{establish_connection_from_app_config, run_migrations};
use machinesense_api::{app, AppState};
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_config().context("Failed to load configuration")?;
    init_tracing(&config.log_level, config.log_json);

    info!(
        environment = %config.environment,
        "Starting MachineSense API v{}",
        env!("CARGO_PKG_VERSION")
    );

    let db = establish_connection_from_app_config(&config)
        .await
        .context("Failed to connect to the database")?;

    if config.auto_migrate {
        run_migrations(&db)
            .await
            .context("Failed to run database migrations")?;
    }

    let state = AppState::new(Arc::new(db), config.clone());
    let router = app(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("Invalid host/port combination")?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    info!("Listening on {addr}");
    info!("Swagger UI available at http://{addr}/swagger-ui");

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => tracing::error!("Failed to install SIGTERM handler: {e}"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
