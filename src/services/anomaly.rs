//! Threshold-based anomaly scan over a metric's readings.
//!
//! Flags every reading whose metric value strictly exceeds a threshold.
//! When no threshold is given, one is derived from the scanned set itself:
//! mean plus two population standard deviations. Pure and synchronous.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entities::sensor_record::Model as SensorRecord;
use crate::services::metric::Metric;

/// A reading flagged by the scan, in the same relative order it was handed
/// in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Anomaly {
    pub id: i32,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}

/// Derived threshold: mean + 2σ with population statistics (divide by n),
/// computed over exactly the sequence being scanned.
pub fn derived_threshold(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
    mean + 2.0 * variance.sqrt()
}

/// Scan `records` for values of `metric` strictly above the threshold.
/// An empty input yields an empty list; equality with the threshold is not
/// anomalous.
pub fn detect(records: &[SensorRecord], metric: Metric, threshold: Option<f64>) -> Vec<Anomaly> {
    if records.is_empty() {
        return Vec::new();
    }

    let accessor = metric.accessor();
    let threshold = threshold.unwrap_or_else(|| {
        let values: Vec<f64> = records.iter().map(|r| accessor(r)).collect();
        derived_threshold(&values)
    });

    records
        .iter()
        .filter(|r| accessor(r) > threshold)
        .map(|r| Anomaly {
            id: r.id,
            value: accessor(r),
            timestamp: r.timestamp,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn rpm_record(id: i32, rpm: f64) -> SensorRecord {
        let base = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
        SensorRecord {
            id,
            temp: 21.0,
            humid: 40.0,
            vib: 0,
            rpm,
            timestamp: base + Duration::seconds(id as i64 * 60),
        }
    }

    #[test]
    fn empty_input_yields_empty_list() {
        assert!(detect(&[], Metric::Rpm, None).is_empty());
        assert!(detect(&[], Metric::Rpm, Some(100.0)).is_empty());
    }

    #[test]
    fn explicit_threshold_is_strictly_exclusive() {
        let records = vec![rpm_record(1, 1500.0), rpm_record(2, 1600.0), rpm_record(3, 1601.0)];
        let found = detect(&records, Metric::Rpm, Some(1600.0));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, 3);
        assert_eq!(found[0].value, 1601.0);
    }

    #[test]
    fn single_outlier_can_inflate_sigma_past_itself() {
        // mean ≈ 3632.25, σ ≈ 3676 → threshold ≈ 10984: even the 9999
        // outlier sits below mean + 2σ, so nothing is flagged.
        let records = vec![
            rpm_record(1, 1500.0),
            rpm_record(2, 1510.0),
            rpm_record(3, 1520.0),
            rpm_record(4, 9999.0),
        ];
        assert!(detect(&records, Metric::Rpm, None).is_empty());
    }

    #[test]
    fn derived_threshold_tracks_the_scanned_set() {
        let narrow = [10.0, 10.0, 10.0, 12.0];
        let wide = [10.0, 10.0, 10.0, 40.0];
        assert!(derived_threshold(&wide) > derived_threshold(&narrow));

        // Appending a point moves the derived threshold, because it is
        // computed over the same sequence being scanned.
        let extended = [10.0, 10.0, 10.0, 12.0, 30.0];
        assert_ne!(derived_threshold(&narrow), derived_threshold(&extended));
    }

    #[test]
    fn results_preserve_input_order() {
        let records = vec![rpm_record(7, 2000.0), rpm_record(2, 1900.0), rpm_record(5, 1950.0)];
        let found = detect(&records, Metric::Rpm, Some(1000.0));
        let ids: Vec<i32> = found.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![7, 2, 5]);
    }

    #[test]
    fn repeated_scans_are_identical() {
        let records = vec![rpm_record(1, 1500.0), rpm_record(2, 2500.0), rpm_record(3, 1400.0)];
        let first = detect(&records, Metric::Rpm, None);
        let second = detect(&records, Metric::Rpm, None);
        assert_eq!(first, second);
    }

    #[test]
    fn vib_flag_is_scanned_as_a_continuous_value() {
        let mut records = vec![rpm_record(1, 1500.0), rpm_record(2, 1500.0)];
        records[1].vib = 1;
        let found = detect(&records, Metric::Vib, Some(0.5));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, 2);
        assert_eq!(found[0].value, 1.0);
    }
}
