pub mod analytics;
pub mod auth;
pub mod common;
pub mod telemetry;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;
