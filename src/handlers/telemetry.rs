use super::common::validate_input;
use crate::{
    errors::ServiceError,
    handlers::AppState,
    services::{
        metric::Metric,
        telemetry::NewReading,
        trend,
    },
};
use axum::{
    extract::{Json, Query, State},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

// Request and response DTOs

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "temp": 23.4,
    "humid": 51.0,
    "vib": 0,
    "rpm": 1480.0,
    "timestamp": "2024-03-01T12:00:00Z"
}))]
pub struct SensorDataRequest {
    /// Temperature reading
    #[schema(example = 23.4)]
    pub temp: f64,

    /// Humidity reading
    #[schema(example = 51.0)]
    pub humid: f64,

    /// Vibration flag: 0 normal, 1 alert
    #[validate(range(min = 0, max = 1, message = "vib must be 0 or 1"))]
    #[schema(example = 0)]
    pub vib: i32,

    /// Rotation speed reading
    #[schema(example = 1480.0)]
    pub rpm: f64,

    /// Device-side reading time; inserts may arrive out of order
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
#[schema(example = json!({"status": "ok"}))]
pub struct LogResponse {
    #[schema(example = "ok")]
    pub status: String,
}

/// The most recent reading, rendered for dashboards: the vibration flag is
/// expanded to a label and the timestamp reduced to wall-clock time.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "temp": 23.4,
    "humid": 51.0,
    "vib": "Normal",
    "rpm": 1480.0,
    "time": "12:00:00"
}))]
pub struct LatestReading {
    pub temp: f64,
    pub humid: f64,
    /// "Alert" or "Normal"
    #[schema(example = "Normal")]
    pub vib: String,
    pub rpm: f64,
    /// Reading time formatted as %H:%M:%S
    #[schema(example = "12:00:00")]
    pub time: String,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct PredictQuery {
    /// Metric channel to extrapolate (temp, humid, vib, rpm)
    #[serde(default = "default_metric")]
    pub metric: String,
    /// Breakdown threshold override; defaults are per metric
    pub threshold: Option<f64>,
}

fn default_metric() -> String {
    "temp".to_string()
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({"prediction": "Estimated temp breakdown at 2024-03-01 12:05:00"}))]
pub struct PredictionResponse {
    pub prediction: String,
}

/// Build the telemetry Router (bearer auth applied by the caller).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/log", post(log_reading))
        .route("/latest", get(latest_reading))
        .route("/predict", get(predict_breakdown))
}

/// Store one sensor reading
#[utoipa::path(
    post,
    path = "/log",
    request_body = SensorDataRequest,
    responses(
        (status = 200, description = "Reading stored", body = LogResponse),
        (status = 400, description = "Invalid reading", body = crate::errors::ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Telemetry"
)]
pub async fn log_reading(
    State(state): State<AppState>,
    Json(payload): Json<SensorDataRequest>,
) -> Result<Json<LogResponse>, ServiceError> {
    validate_input(&payload)?;

    let saved = state
        .telemetry
        .append(NewReading {
            temp: payload.temp,
            humid: payload.humid,
            vib: payload.vib,
            rpm: payload.rpm,
            timestamp: payload.timestamp,
        })
        .await?;
    debug!(id = saved.id, "sensor reading logged");

    Ok(Json(LogResponse {
        status: "ok".to_string(),
    }))
}

/// Fetch the most recently timestamped reading
#[utoipa::path(
    get,
    path = "/latest",
    responses(
        (status = 200, description = "Latest reading", body = LatestReading),
        (status = 404, description = "No sensor data found", body = crate::errors::ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Telemetry"
)]
pub async fn latest_reading(
    State(state): State<AppState>,
) -> Result<Json<LatestReading>, ServiceError> {
    let record = state
        .telemetry
        .latest()
        .await?
        .ok_or_else(|| ServiceError::NotFound("No sensor data found".to_string()))?;

    Ok(Json(LatestReading {
        temp: record.temp,
        humid: record.humid,
        vib: if record.vib == 1 { "Alert" } else { "Normal" }.to_string(),
        rpm: record.rpm,
        time: record.timestamp.format("%H:%M:%S").to_string(),
    }))
}

/// Extrapolate when a metric crosses its breakdown threshold
///
/// Negative outcomes (not enough data, flat or falling trend, unknown
/// metric) are ordinary 200 responses carrying a descriptive string.
#[utoipa::path(
    get,
    path = "/predict",
    params(PredictQuery),
    responses(
        (status = 200, description = "Prediction result", body = PredictionResponse),
        (status = 401, description = "Missing or invalid token", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Telemetry"
)]
pub async fn predict_breakdown(
    State(state): State<AppState>,
    Query(params): Query<PredictQuery>,
) -> Result<Json<PredictionResponse>, ServiceError> {
    let Ok(metric) = params.metric.parse::<Metric>() else {
        return Ok(Json(PredictionResponse {
            prediction: "Invalid metric".to_string(),
        }));
    };

    let records = state.telemetry.all().await?;
    let prediction = trend::predict_breakdown(&records, metric, params.threshold);

    Ok(Json(PredictionResponse {
        prediction: prediction.to_string(),
    }))
}
