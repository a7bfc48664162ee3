//! Linear trend extrapolation for breakdown prediction.
//!
//! Fits an ordinary least-squares line to a metric's time series and
//! extrapolates the instant the fitted line crosses a breakdown threshold.
//! Pure and synchronous: callers snapshot the store and hand in a slice.

use chrono::{DateTime, Duration, Utc};
use std::fmt;

use crate::entities::sensor_record::Model as SensorRecord;
use crate::services::metric::Metric;

/// Outcome of a breakdown prediction. Negative outcomes are ordinary
/// results, not errors; the HTTP layer renders them verbatim.
#[derive(Debug, Clone, PartialEq)]
pub enum TrendPrediction {
    /// Fewer than two usable points, or a singular fit (every record shares
    /// one timestamp).
    InsufficientData,
    /// The metric carries no default threshold and none was supplied.
    NoThreshold,
    /// Fitted slope is flat or decreasing; no positive-time crossing.
    NoBreakdownExpected,
    /// Projected threshold crossing. The ETA may lie in the past when the
    /// series already exceeds the threshold; that is deliberate.
    Breakdown { metric: Metric, eta: DateTime<Utc> },
}

impl fmt::Display for TrendPrediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrendPrediction::InsufficientData => write!(f, "Not enough data"),
            TrendPrediction::NoThreshold => write!(f, "No threshold set for this metric"),
            TrendPrediction::NoBreakdownExpected => write!(f, "No breakdown expected"),
            TrendPrediction::Breakdown { metric, eta } => write!(
                f,
                "Estimated {} breakdown at {}",
                metric,
                eta.format("%Y-%m-%d %H:%M:%S")
            ),
        }
    }
}

/// First-degree least-squares fit. Returns `None` when the predictor is
/// degenerate (empty, or all x identical), which would otherwise divide by
/// zero.
pub fn least_squares(xs: &[f64], ys: &[f64]) -> Option<(f64, f64)> {
    debug_assert_eq!(xs.len(), ys.len());
    // Checked on the raw inputs: mean-centering a constant nonzero series
    // leaves rounding residue, so a moment-based check can miss it.
    if xs.is_empty() || xs.iter().all(|&x| x == xs[0]) {
        return None;
    }
    let n = xs.len() as f64;
    let x_mean = xs.iter().sum::<f64>() / n;
    let y_mean = ys.iter().sum::<f64>() / n;

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    for (&x, &y) in xs.iter().zip(ys) {
        sxx += (x - x_mean) * (x - x_mean);
        sxy += (x - x_mean) * (y - y_mean);
    }
    if sxx == 0.0 {
        return None;
    }
    let slope = sxy / sxx;
    let intercept = y_mean - slope * x_mean;
    Some((slope, intercept))
}

/// Predict when `metric` crosses `threshold` (or the per-metric default) by
/// extrapolating a least-squares line over the readings.
pub fn predict_breakdown(
    records: &[SensorRecord],
    metric: Metric,
    threshold: Option<f64>,
) -> TrendPrediction {
    // Stable sort keeps insertion order for identical timestamps.
    let mut ordered: Vec<&SensorRecord> = records.iter().collect();
    ordered.sort_by_key(|r| r.timestamp);

    if ordered.len() < 2 {
        return TrendPrediction::InsufficientData;
    }

    let Some(threshold) = threshold.or_else(|| metric.default_threshold()) else {
        return TrendPrediction::NoThreshold;
    };

    let t0 = ordered[0].timestamp;
    let accessor = metric.accessor();
    let elapsed: Vec<f64> = ordered
        .iter()
        .map(|r| (r.timestamp - t0).num_milliseconds() as f64 / 1_000.0)
        .collect();
    let values: Vec<f64> = ordered.iter().map(|r| accessor(r)).collect();

    let Some((slope, intercept)) = least_squares(&elapsed, &values) else {
        return TrendPrediction::InsufficientData;
    };
    if slope <= 0.0 {
        return TrendPrediction::NoBreakdownExpected;
    }

    let seconds_to_threshold = (threshold - intercept) / slope;
    let eta = t0 + Duration::milliseconds((seconds_to_threshold * 1_000.0).round() as i64);
    TrendPrediction::Breakdown { metric, eta }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(id: i32, temp: f64, offset_secs: i64) -> SensorRecord {
        let base = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        SensorRecord {
            id,
            temp,
            humid: 40.0,
            vib: 0,
            rpm: 1200.0,
            timestamp: base + Duration::seconds(offset_secs),
        }
    }

    #[test]
    fn linear_series_crosses_threshold_at_exact_instant() {
        // 20 -> 22 -> 24 over 200s: slope 0.02/s, intercept 20, crossing
        // 26 at t0 + 300s.
        let records = vec![
            record(1, 20.0, 0),
            record(2, 22.0, 100),
            record(3, 24.0, 200),
        ];
        let prediction = predict_breakdown(&records, Metric::Temp, Some(26.0));
        match prediction {
            TrendPrediction::Breakdown { metric, eta } => {
                assert_eq!(metric, Metric::Temp);
                assert_eq!(eta, records[0].timestamp + Duration::seconds(300));
            }
            other => panic!("expected breakdown, got {other:?}"),
        }
    }

    #[test]
    fn fit_matches_closed_form_for_unevenly_sampled_series() {
        let xs = [0.0, 30.0, 90.0, 250.0];
        let ys = [10.0, 10.9, 12.4, 17.1];
        let (slope, intercept) = least_squares(&xs, &ys).unwrap();

        // Independent closed-form computation.
        let n = xs.len() as f64;
        let sx: f64 = xs.iter().sum();
        let sy: f64 = ys.iter().sum();
        let sxy: f64 = xs.iter().zip(&ys).map(|(x, y)| x * y).sum();
        let sxx: f64 = xs.iter().map(|x| x * x).sum();
        let expected_slope = (n * sxy - sx * sy) / (n * sxx - sx * sx);
        let expected_intercept = (sy - expected_slope * sx) / n;

        assert!((slope - expected_slope).abs() < 1e-12);
        assert!((intercept - expected_intercept).abs() < 1e-12);
    }

    #[test]
    fn fit_rejects_a_constant_time_axis_even_off_origin() {
        // A constant nonzero x leaves rounding residue after mean-centering,
        // so the guard must fire on the raw inputs, not on sxx.
        let xs = [-393_076.949_530_296_3; 7];
        let ys = [0.0; 7];
        assert_eq!(least_squares(&xs, &ys), None);

        assert_eq!(least_squares(&[], &[]), None);
    }

    #[test]
    fn fewer_than_two_records_is_insufficient() {
        assert_eq!(
            predict_breakdown(&[], Metric::Temp, None),
            TrendPrediction::InsufficientData
        );
        assert_eq!(
            predict_breakdown(&[record(1, 20.0, 0)], Metric::Temp, None),
            TrendPrediction::InsufficientData
        );
    }

    #[test]
    fn decreasing_series_never_predicts_breakdown() {
        let records = vec![record(1, 30.0, 0), record(2, 28.0, 100)];
        assert_eq!(
            predict_breakdown(&records, Metric::Temp, Some(26.0)),
            TrendPrediction::NoBreakdownExpected
        );
    }

    #[test]
    fn flat_series_never_predicts_breakdown() {
        let records = vec![record(1, 22.0, 0), record(2, 22.0, 100), record(3, 22.0, 200)];
        assert_eq!(
            predict_breakdown(&records, Metric::Temp, None),
            TrendPrediction::NoBreakdownExpected
        );
    }

    #[test]
    fn identical_timestamps_degrade_to_insufficient_data() {
        // Singular fit: every elapsed value is zero.
        let records = vec![record(1, 20.0, 0), record(2, 24.0, 0)];
        assert_eq!(
            predict_breakdown(&records, Metric::Temp, None),
            TrendPrediction::InsufficientData
        );
    }

    #[test]
    fn out_of_order_insertion_is_sorted_before_fitting() {
        let records = vec![
            record(1, 24.0, 200),
            record(2, 20.0, 0),
            record(3, 22.0, 100),
        ];
        let sorted_first = records[1].timestamp;
        match predict_breakdown(&records, Metric::Temp, Some(26.0)) {
            TrendPrediction::Breakdown { eta, .. } => {
                assert_eq!(eta, sorted_first + Duration::seconds(300));
            }
            other => panic!("expected breakdown, got {other:?}"),
        }
    }

    #[test]
    fn series_already_past_threshold_yields_eta_in_the_past() {
        // Rising trend that crossed 26 before t0's successor readings; the
        // crossing instant is reported as-is, not clamped.
        let records = vec![record(1, 27.0, 0), record(2, 29.0, 100)];
        match predict_breakdown(&records, Metric::Temp, Some(26.0)) {
            TrendPrediction::Breakdown { eta, .. } => {
                assert!(eta < records[0].timestamp);
            }
            other => panic!("expected breakdown, got {other:?}"),
        }
    }

    #[test]
    fn negative_outcomes_render_their_contract_strings() {
        assert_eq!(TrendPrediction::InsufficientData.to_string(), "Not enough data");
        assert_eq!(
            TrendPrediction::NoThreshold.to_string(),
            "No threshold set for this metric"
        );
        assert_eq!(
            TrendPrediction::NoBreakdownExpected.to_string(),
            "No breakdown expected"
        );
    }

    #[test]
    fn breakdown_renders_metric_and_timestamp() {
        let eta = Utc.with_ymd_and_hms(2024, 3, 1, 12, 5, 0).unwrap();
        let rendered = TrendPrediction::Breakdown {
            metric: Metric::Rpm,
            eta,
        }
        .to_string();
        assert_eq!(rendered, "Estimated rpm breakdown at 2024-03-01 12:05:00");
    }
}
