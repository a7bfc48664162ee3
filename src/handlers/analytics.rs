use crate::{
    errors::ServiceError,
    handlers::AppState,
    services::{
        analytics::{self, MetricSummary},
        anomaly::{self, Anomaly},
        metric::Metric,
    },
};
use axum::{
    extract::{Json, Query, State},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

// Request and response DTOs

#[derive(Debug, Deserialize, IntoParams)]
pub struct SummaryQuery {
    /// Metric channel to summarize (temp, humid, vib, rpm)
    #[serde(default = "default_metric")]
    pub metric: String,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct AnomaliesQuery {
    /// Metric channel to scan (temp, humid, vib, rpm)
    #[serde(default = "default_metric")]
    pub metric: String,
    /// Anomaly threshold override; derived as mean + 2 sigma when absent
    pub threshold: Option<f64>,
}

fn default_metric() -> String {
    "temp".to_string()
}

/// Summary statistics, or a marker object when the store is empty.
#[derive(Debug, Serialize, ToSchema)]
#[serde(untagged)]
pub enum SummaryResponse {
    Stats(MetricSummary),
    #[schema(example = json!({"summary": "No data"}))]
    Empty {
        summary: String,
    },
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AnomaliesResponse {
    pub anomalies: Vec<Anomaly>,
}

/// Build the analytics Router scoped under `/analytics` (bearer auth
/// applied by the caller).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/analytics/summary", get(metric_summary))
        .route("/analytics/anomalies", get(metric_anomalies))
}

fn parse_metric(raw: &str) -> Result<Metric, ServiceError> {
    raw.parse::<Metric>()
        .map_err(|_| ServiceError::ValidationError("Invalid metric".to_string()))
}

/// Average, min, max and count for one metric
#[utoipa::path(
    get,
    path = "/analytics/summary",
    params(SummaryQuery),
    responses(
        (status = 200, description = "Summary statistics", body = MetricSummary),
        (status = 400, description = "Invalid metric", body = crate::errors::ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Analytics"
)]
pub async fn metric_summary(
    State(state): State<AppState>,
    Query(params): Query<SummaryQuery>,
) -> Result<Json<SummaryResponse>, ServiceError> {
    let metric = parse_metric(&params.metric)?;

    let records = state.telemetry.all().await?;
    let response = match analytics::summarize(&records, metric) {
        Some(summary) => SummaryResponse::Stats(summary),
        None => SummaryResponse::Empty {
            summary: "No data".to_string(),
        },
    };

    Ok(Json(response))
}

/// Readings whose metric value strictly exceeds the threshold
#[utoipa::path(
    get,
    path = "/analytics/anomalies",
    params(AnomaliesQuery),
    responses(
        (status = 200, description = "Anomalous readings in input order", body = AnomaliesResponse),
        (status = 400, description = "Invalid metric", body = crate::errors::ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Analytics"
)]
pub async fn metric_anomalies(
    State(state): State<AppState>,
    Query(params): Query<AnomaliesQuery>,
) -> Result<Json<AnomaliesResponse>, ServiceError> {
    let metric = parse_metric(&params.metric)?;

    let records = state.telemetry.all().await?;
    let anomalies = anomaly::detect(&records, metric, params.threshold);

    Ok(Json(AnomaliesResponse { anomalies }))
}
