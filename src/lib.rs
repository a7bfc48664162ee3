//! MachineSense API Library
//!
//! This crate provides the core functionality for the MachineSense telemetry API
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod middleware_helpers;
pub mod migrator;
pub mod openapi;
pub mod services;
pub mod tracing;

use axum::{extract::State, response::Json, routing::get, Router};
use http::HeaderValue;
use sea_orm::DatabaseConnection;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;

// A module named `tracing` lives at the crate root, so reach the external
// crate through an explicit global path here.
use ::tracing::{info, warn};

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub auth: Arc<auth::AuthService>,
    pub telemetry: services::telemetry::TelemetryService,
}

impl AppState {
    /// Wire up the service layer from a connection pool and loaded config.
    pub fn new(db: Arc<DatabaseConnection>, config: config::AppConfig) -> Self {
        let auth_cfg = auth::AuthConfig {
            jwt_secret: config.jwt_secret.clone(),
            jwt_issuer: config.auth_issuer.clone(),
            jwt_audience: config.auth_audience.clone(),
            access_token_expiration: Duration::from_secs(config.jwt_expiration),
        };
        let auth = Arc::new(auth::AuthService::new(auth_cfg, db.clone()));
        let telemetry = services::telemetry::TelemetryService::new(db.clone());

        Self {
            db,
            config,
            auth,
            telemetry,
        }
    }
}

/// API routes: public account endpoints plus the bearer-protected
/// telemetry and analytics surface.
pub fn api_routes(auth: Arc<auth::AuthService>) -> Router<AppState> {
    let protected = handlers::telemetry::routes()
        .merge(handlers::analytics::routes())
        .route_layer(axum::middleware::from_fn_with_state(
            auth,
            auth::auth_middleware,
        ));

    Router::new()
        .route("/", get(api_status))
        .route("/health", get(health_check))
        .merge(handlers::auth::routes())
        .merge(protected)
}

/// Build the complete application with middleware stack applied.
pub fn app(state: AppState) -> Router {
    let cors = build_cors_layer(&state.config);

    Router::new()
        .merge(api_routes(state.auth.clone()))
        .merge(openapi::swagger_ui())
        // HTTP tracing layer for consistent request/response telemetry
        .layer(crate::tracing::configure_http_tracing())
        // Apply CORS
        .layer(cors)
        // Request-level timeout
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        // Ensure every request carries a request id for traceability
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id_middleware,
        ))
        .with_state(state)
}

/// Build CORS layer from config
pub fn build_cors_layer(cfg: &config::AppConfig) -> CorsLayer {
    let configured_origins: Option<Vec<HeaderValue>> = cfg
        .cors_allowed_origins
        .as_ref()
        .map(|raw| {
            raw.split(',')
                .filter_map(|origin| {
                    let trimmed = origin.trim();
                    if trimmed.is_empty() {
                        None
                    } else {
                        HeaderValue::from_str(trimmed).ok()
                    }
                })
                .collect::<Vec<_>>()
        })
        .filter(|origins| !origins.is_empty());

    if let Some(origins) = configured_origins {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
            .allow_credentials(cfg.cors_allow_credentials)
    } else if cfg.should_allow_permissive_cors() {
        info!(
            "Using permissive CORS because explicit origins were not configured ({})",
            if cfg.is_development() {
                "development environment"
            } else {
                "explicit override enabled"
            }
        );
        CorsLayer::permissive()
    } else {
        // Config validation rejects this combination at load time; a
        // hand-built config falls back to same-origin only.
        warn!("No CORS origins configured outside development; cross-origin requests are denied");
        CorsLayer::new()
    }
}

async fn api_status() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "machinesense-api",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

async fn health_check(State(state): State<AppState>) -> Json<Value> {
    let db_status = match state.db.ping().await {
        Ok(_) => "healthy",
        Err(_) => "unhealthy",
    };

    Json(json!({
        "status": db_status,
        "checks": {
            "database": db_status,
        },
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
