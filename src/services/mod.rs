//! Domain services: storage plus the pure analysis routines layered on it.

pub mod analytics;
pub mod anomaly;
pub mod metric;
pub mod telemetry;
pub mod trend;
