use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, QueryOrder, Set};
use tracing::debug;

use crate::entities::sensor_record::{self, Entity as SensorRecord};
use crate::errors::ServiceError;

/// A reading as submitted by a device, before the store assigns an id.
/// Devices timestamp their own readings, so inserts may arrive out of
/// timestamp order.
#[derive(Debug, Clone, Copy)]
pub struct NewReading {
    pub temp: f64,
    pub humid: f64,
    pub vib: i32,
    pub rpm: f64,
    pub timestamp: DateTime<Utc>,
}

/// Persistence layer for sensor readings. Thin by design: the trend,
/// anomaly and summary computations are pure functions that operate on a
/// snapshot fetched here.
#[derive(Clone)]
pub struct TelemetryService {
    db: Arc<DatabaseConnection>,
}

impl TelemetryService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Append one reading.
    pub async fn append(&self, reading: NewReading) -> Result<sensor_record::Model, ServiceError> {
        let model = sensor_record::ActiveModel {
            temp: Set(reading.temp),
            humid: Set(reading.humid),
            vib: Set(reading.vib),
            rpm: Set(reading.rpm),
            timestamp: Set(reading.timestamp),
            ..Default::default()
        };
        let saved = model.insert(&*self.db).await?;
        debug!(id = saved.id, "stored sensor reading");
        Ok(saved)
    }

    /// Every stored reading in insertion order. Callers that need temporal
    /// order sort the snapshot themselves.
    pub async fn all(&self) -> Result<Vec<sensor_record::Model>, ServiceError> {
        let records = SensorRecord::find()
            .order_by_asc(sensor_record::Column::Id)
            .all(&*self.db)
            .await?;
        Ok(records)
    }

    /// The most recently timestamped reading, with insertion id as the tie
    /// breaker.
    pub async fn latest(&self) -> Result<Option<sensor_record::Model>, ServiceError> {
        let record = SensorRecord::find()
            .order_by_desc(sensor_record::Column::Timestamp)
            .order_by_desc(sensor_record::Column::Id)
            .one(&*self.db)
            .await?;
        Ok(record)
    }
}
