use super::common::validate_input;
use crate::{
    auth::AuthError,
    errors::ServiceError,
    handlers::AppState,
};
use axum::{
    extract::{Json, State},
    routing::post,
    Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;
use validator::Validate;

// Request and response DTOs

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "username": "operator1",
    "password": "SecurePass123!"
}))]
pub struct CredentialsRequest {
    /// Account name (must be unique at registration)
    #[validate(length(min = 1, max = 64, message = "Username must be 1-64 characters"))]
    #[schema(example = "operator1")]
    pub username: String,

    /// Account password
    #[validate(length(min = 1, message = "Password must not be empty"))]
    #[schema(example = "SecurePass123!")]
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[schema(example = json!({"msg": "User registered"}))]
pub struct RegisterResponse {
    #[schema(example = "User registered")]
    pub msg: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "access_token": "eyJhbGciOiJIUzI1NiJ9...",
    "token_type": "bearer"
}))]
pub struct TokenResponse {
    /// Signed JWT access token
    pub access_token: String,
    /// Always "bearer"
    #[schema(example = "bearer")]
    pub token_type: String,
}

/// Build the account Router (no authentication required).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

/// Register a new account
#[utoipa::path(
    post,
    path = "/register",
    request_body = CredentialsRequest,
    responses(
        (status = 200, description = "Account created", body = RegisterResponse),
        (status = 400, description = "Username already registered", body = crate::errors::ErrorResponse)
    ),
    tag = "Auth"
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<CredentialsRequest>,
) -> Result<Json<RegisterResponse>, ServiceError> {
    validate_input(&payload)?;

    state
        .auth
        .register(&payload.username, &payload.password)
        .await?;
    info!(username = %payload.username, "account registered");

    Ok(Json(RegisterResponse {
        msg: "User registered".to_string(),
    }))
}

/// Exchange credentials for an access token
#[utoipa::path(
    post,
    path = "/login",
    request_body = CredentialsRequest,
    responses(
        (status = 200, description = "Token issued", body = TokenResponse),
        (status = 401, description = "Incorrect username or password", body = crate::errors::ErrorResponse)
    ),
    tag = "Auth"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<CredentialsRequest>,
) -> Result<Json<TokenResponse>, AuthError> {
    let access_token = state.auth.login(&payload.username, &payload.password).await?;

    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer".to_string(),
    }))
}
