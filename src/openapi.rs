use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "MachineSense API",
        version = "0.1.0",
        description = r#"
# MachineSense Telemetry API

Authenticated ingestion and analysis of factory machine sensor readings.

## Features

- **Telemetry Logging**: Push temperature, humidity, vibration and RPM readings
- **Latest Reading**: Fetch the most recent reading for dashboards
- **Breakdown Prediction**: Linear-trend extrapolation of threshold crossings
- **Analytics**: Summary statistics and threshold-based anomaly scans

## Authentication

All telemetry and analytics endpoints require a JWT bearer token obtained
from `/login`:

```
Authorization: Bearer <your-jwt-token>
```
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "Auth", description = "Account registration and token issuance"),
        (name = "Telemetry", description = "Sensor reading ingestion and prediction"),
        (name = "Analytics", description = "Summary statistics and anomaly scans")
    ),
    paths(
        crate::handlers::auth::register,
        crate::handlers::auth::login,
        crate::handlers::telemetry::log_reading,
        crate::handlers::telemetry::latest_reading,
        crate::handlers::telemetry::predict_breakdown,
        crate::handlers::analytics::metric_summary,
        crate::handlers::analytics::metric_anomalies,
    ),
    components(
        schemas(
            crate::handlers::auth::CredentialsRequest,
            crate::handlers::auth::RegisterResponse,
            crate::handlers::auth::TokenResponse,
            crate::handlers::telemetry::SensorDataRequest,
            crate::handlers::telemetry::LogResponse,
            crate::handlers::telemetry::LatestReading,
            crate::handlers::telemetry::PredictionResponse,
            crate::handlers::analytics::AnomaliesResponse,
            crate::services::analytics::MetricSummary,
            crate::services::anomaly::Anomaly,
            crate::errors::ErrorResponse
        )
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}
