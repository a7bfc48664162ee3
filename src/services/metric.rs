use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::entities::sensor_record;

/// The four recognized measurement channels. Anything else fails to parse
/// and is handled as an input-validation concern by the caller.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, EnumIter, Display, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Temp,
    Humid,
    Vib,
    Rpm,
}

impl Metric {
    /// Typed accessor for this channel. A fixed dispatch table instead of
    /// name-based field lookup; `vib` is widened from its integer flag.
    pub fn accessor(self) -> fn(&sensor_record::Model) -> f64 {
        match self {
            Metric::Temp => |r| r.temp,
            Metric::Humid => |r| r.humid,
            Metric::Vib => |r| r.vib as f64,
            Metric::Rpm => |r| r.rpm,
        }
    }

    /// Built-in breakdown threshold used by the trend predictor when the
    /// caller supplies none. Returns `Option` so that future channels
    /// without a sensible default degrade to a "no threshold" outcome
    /// instead of a wrong number.
    pub fn default_threshold(self) -> Option<f64> {
        match self {
            Metric::Temp => Some(26.0),
            Metric::Humid => Some(60.0),
            Metric::Vib => Some(1.0),
            Metric::Rpm => Some(1600.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use strum::IntoEnumIterator;

    fn record(temp: f64, humid: f64, vib: i32, rpm: f64) -> sensor_record::Model {
        sensor_record::Model {
            id: 1,
            temp,
            humid,
            vib,
            rpm,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn parses_lowercase_names_only() {
        assert_eq!("temp".parse::<Metric>().unwrap(), Metric::Temp);
        assert_eq!("rpm".parse::<Metric>().unwrap(), Metric::Rpm);
        assert!("pressure".parse::<Metric>().is_err());
        assert!("".parse::<Metric>().is_err());
    }

    #[test]
    fn accessor_reads_the_matching_field() {
        let r = record(21.5, 48.0, 1, 1450.0);
        assert_eq!((Metric::Temp.accessor())(&r), 21.5);
        assert_eq!((Metric::Humid.accessor())(&r), 48.0);
        assert_eq!((Metric::Vib.accessor())(&r), 1.0);
        assert_eq!((Metric::Rpm.accessor())(&r), 1450.0);
    }

    #[test]
    fn every_metric_has_a_default_threshold_today() {
        for metric in Metric::iter() {
            assert!(metric.default_threshold().is_some());
        }
    }
}
