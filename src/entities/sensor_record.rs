use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A single immutable sensor reading. Records are appended once and never
/// updated or deleted; insertion order carries no timestamp guarantee, so
/// consumers that need temporal order must sort at query time.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sensor_data")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub temp: f64,
    pub humid: f64,
    /// 0: Normal, 1: Alert. Stored as an integer flag but treated as a
    /// continuous measurement for regression and threshold scans.
    pub vib: i32,
    pub rpm: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
