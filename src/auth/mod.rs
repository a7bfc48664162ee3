/*!
 * # Authentication Module
 *
 * Username/password accounts with Argon2 password hashing and stateless
 * JWT bearer tokens (HS256). Tokens carry the username as the subject and
 * are checked against the user table on every authenticated request, so a
 * deleted account is locked out immediately even with a live token.
 */

use std::sync::Arc;
use std::time::Duration;

use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::entities::user::{self, Entity as Users};
use crate::errors::{ErrorResponse, ServiceError};

/// Claim structure for JWT tokens
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // Subject (username)
    pub jti: String, // JWT ID (unique identifier for this token)
    pub iat: i64,    // Issued at time
    pub exp: i64,    // Expiration time
    pub nbf: i64,    // Not valid before time
    pub iss: String, // Issuer
    pub aud: String, // Audience
}

/// Authenticated user data extracted from the JWT token
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub username: String,
    pub token_id: String,
}

/// Authentication configuration
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub jwt_audience: String,
    pub access_token_expiration: Duration,
}

/// Authentication service that handles accounts, token issuance and
/// validation
#[derive(Clone)]
pub struct AuthService {
    pub config: AuthConfig,
    pub db: Arc<DatabaseConnection>,
}

impl AuthService {
    pub fn new(config: AuthConfig, db: Arc<DatabaseConnection>) -> Self {
        Self { config, db }
    }

    /// Hash a password with a fresh random salt, producing a PHC string.
    pub fn hash_password(password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AuthError::InternalError(e.to_string()))?;
        Ok(hash.to_string())
    }

    /// Verify a password against a stored PHC string.
    pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool, AuthError> {
        let parsed = PasswordHash::new(stored_hash)
            .map_err(|e| AuthError::InternalError(e.to_string()))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }

    /// Create an account. Usernames are unique; a second registration with
    /// the same name is rejected.
    pub async fn register(&self, username: &str, password: &str) -> Result<user::Model, AuthError> {
        let existing = Users::find()
            .filter(user::Column::Username.eq(username))
            .one(&*self.db)
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?;
        if existing.is_some() {
            return Err(AuthError::UsernameTaken);
        }

        let account = user::ActiveModel {
            username: Set(username.to_string()),
            password_hash: Set(Self::hash_password(password)?),
            ..Default::default()
        };
        let saved = account
            .insert(&*self.db)
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?;
        debug!(username, "registered new account");
        Ok(saved)
    }

    /// Check credentials and issue an access token. Unknown usernames and
    /// wrong passwords are indistinguishable to the caller.
    pub async fn login(&self, username: &str, password: &str) -> Result<String, AuthError> {
        let account = Users::find()
            .filter(user::Column::Username.eq(username))
            .one(&*self.db)
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?
            .ok_or(AuthError::InvalidCredentials)?;

        if !Self::verify_password(password, &account.password_hash)? {
            return Err(AuthError::InvalidCredentials);
        }

        self.issue_token(&account.username)
    }

    /// Generate a JWT access token for a username.
    pub fn issue_token(&self, username: &str) -> Result<String, AuthError> {
        let now = Utc::now();
        let exp = now
            + ChronoDuration::from_std(self.config.access_token_expiration)
                .map_err(|_| AuthError::InternalError("Invalid token duration".to_string()))?;

        let claims = Claims {
            sub: username.to_string(),
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            nbf: now.timestamp(),
            iss: self.config.jwt_issuer.clone(),
            aud: self.config.jwt_audience.clone(),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| AuthError::TokenCreation(e.to_string()))
    }

    /// Validate a JWT token and extract the claims
    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let claims = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        })?
        .claims;

        Ok(claims)
    }

    /// Resolve a token subject to a live account. The failure is the same
    /// uniform credential error as a bad signature.
    pub async fn resolve_subject(&self, claims: &Claims) -> Result<AuthUser, AuthError> {
        let account = Users::find()
            .filter(user::Column::Username.eq(claims.sub.as_str()))
            .one(&*self.db)
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?
            .ok_or(AuthError::InvalidToken)?;

        Ok(AuthUser {
            username: account.username,
            token_id: claims.jti.clone(),
        })
    }
}

/// Authentication error types
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Username already registered")]
    UsernameTaken,

    #[error("Incorrect username or password")]
    InvalidCredentials,

    #[error("Missing token")]
    MissingToken,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Token creation failed: {0}")]
    TokenCreation(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<AuthError> for ServiceError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::UsernameTaken => {
                ServiceError::BadRequest("Username already registered".to_string())
            }
            AuthError::InvalidCredentials => {
                ServiceError::Unauthorized("Incorrect username or password".to_string())
            }
            AuthError::MissingToken | AuthError::InvalidToken | AuthError::TokenExpired => {
                ServiceError::Unauthorized("Could not validate credentials".to_string())
            }
            AuthError::TokenCreation(msg)
            | AuthError::DatabaseError(msg)
            | AuthError::InternalError(msg) => ServiceError::InternalError(msg),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message): (StatusCode, String) = match &self {
            Self::UsernameTaken => (
                StatusCode::BAD_REQUEST,
                "Username already registered".to_string(),
            ),
            Self::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "Incorrect username or password".to_string(),
            ),
            // Token problems are deliberately indistinct.
            Self::MissingToken | Self::InvalidToken | Self::TokenExpired => (
                StatusCode::UNAUTHORIZED,
                "Could not validate credentials".to_string(),
            ),
            Self::TokenCreation(_) | Self::DatabaseError(_) | Self::InternalError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message,
            details: None,
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        };

        let mut response = (status, Json(body)).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                header::HeaderValue::from_static("Bearer"),
            );
        }
        response
    }
}

/// Authentication middleware that validates bearer tokens and attaches the
/// resolved [`AuthUser`] to the request extensions.
pub async fn auth_middleware(
    State(auth_service): State<Arc<AuthService>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let token = bearer_token(request.headers())?;
    let claims = auth_service.validate_token(&token)?;
    let user = auth_service.resolve_subject(&claims).await?;

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

fn bearer_token(headers: &axum::http::HeaderMap) -> Result<String, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingToken)?
        .to_str()
        .map_err(|_| AuthError::InvalidToken)?;
    let token = value.strip_prefix("Bearer ").ok_or(AuthError::MissingToken)?;
    Ok(token.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::Database;

    fn auth_config() -> AuthConfig {
        AuthConfig {
            jwt_secret: "unit-test-secret-0123456789-abcdefghijklmnopqrstuvwxyz-ABCDEFGHIJ".into(),
            jwt_issuer: "machinesense-api".into(),
            jwt_audience: "machinesense-clients".into(),
            access_token_expiration: Duration::from_secs(3600),
        }
    }

    async fn service() -> AuthService {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        AuthService::new(auth_config(), Arc::new(db))
    }

    #[test]
    fn password_hash_round_trip() {
        let hash = AuthService::hash_password("hunter2!").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(AuthService::verify_password("hunter2!", &hash).unwrap());
        assert!(!AuthService::verify_password("hunter3!", &hash).unwrap());
    }

    #[test]
    fn hashing_the_same_password_twice_salts_differently() {
        let a = AuthService::hash_password("same-password").unwrap();
        let b = AuthService::hash_password("same-password").unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn token_round_trip_preserves_subject() {
        let svc = service().await;
        let token = svc.issue_token("operator1").unwrap();
        let claims = svc.validate_token(&token).unwrap();
        assert_eq!(claims.sub, "operator1");
        assert_eq!(claims.iss, "machinesense-api");
        assert!(claims.exp > claims.iat);
    }

    #[tokio::test]
    async fn tampered_token_is_rejected() {
        let svc = service().await;
        let mut token = svc.issue_token("operator1").unwrap();
        token.push('x');
        assert!(matches!(
            svc.validate_token(&token),
            Err(AuthError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn token_signed_with_another_secret_is_rejected() {
        let svc = service().await;
        let mut other_config = auth_config();
        other_config.jwt_secret =
            "different-secret-9876543210-zyxwvutsrqponmlkjihgfedcba-JIHGFEDCBA".into();
        let other = AuthService::new(other_config, svc.db.clone());

        let token = other.issue_token("operator1").unwrap();
        assert!(matches!(
            svc.validate_token(&token),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn bearer_extraction_requires_the_scheme() {
        let mut headers = axum::http::HeaderMap::new();
        assert!(matches!(
            bearer_token(&headers),
            Err(AuthError::MissingToken)
        ));

        headers.insert(header::AUTHORIZATION, "Basic abc".parse().unwrap());
        assert!(matches!(
            bearer_token(&headers),
            Err(AuthError::MissingToken)
        ));

        headers.insert(header::AUTHORIZATION, "Bearer abc.def.ghi".parse().unwrap());
        assert_eq!(bearer_token(&headers).unwrap(), "abc.def.ghi");
    }
}
