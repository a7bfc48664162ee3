//! Summary statistics over a metric's readings.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entities::sensor_record::Model as SensorRecord;
use crate::services::metric::Metric;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MetricSummary {
    pub average: f64,
    pub min: f64,
    pub max: f64,
    pub count: usize,
}

/// Average, min, max and count for one channel; `None` when there is
/// nothing to summarize.
pub fn summarize(records: &[SensorRecord], metric: Metric) -> Option<MetricSummary> {
    if records.is_empty() {
        return None;
    }

    let accessor = metric.accessor();
    let mut sum = 0.0;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for record in records {
        let value = accessor(record);
        sum += value;
        min = min.min(value);
        max = max.max(value);
    }

    Some(MetricSummary {
        average: sum / records.len() as f64,
        min,
        max,
        count: records.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn temp_record(id: i32, temp: f64) -> SensorRecord {
        SensorRecord {
            id,
            temp,
            humid: 40.0,
            vib: 0,
            rpm: 1200.0,
            timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap(),
        }
    }

    #[test]
    fn empty_store_has_no_summary() {
        assert_eq!(summarize(&[], Metric::Temp), None);
    }

    #[test]
    fn summary_covers_average_extremes_and_count() {
        let records = vec![temp_record(1, 18.0), temp_record(2, 22.0), temp_record(3, 26.0)];
        let summary = summarize(&records, Metric::Temp).unwrap();
        assert_eq!(summary.average, 22.0);
        assert_eq!(summary.min, 18.0);
        assert_eq!(summary.max, 26.0);
        assert_eq!(summary.count, 3);
    }

    #[test]
    fn single_record_summary_is_degenerate_but_valid() {
        let summary = summarize(&[temp_record(1, 19.5)], Metric::Temp).unwrap();
        assert_eq!(summary.average, 19.5);
        assert_eq!(summary.min, 19.5);
        assert_eq!(summary.max, 19.5);
        assert_eq!(summary.count, 1);
    }
}
