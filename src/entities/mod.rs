//! Database entities backing the telemetry store.

pub mod sensor_record;
pub mod user;
