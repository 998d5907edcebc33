//! Risk Classifier
//!
//! Pure, total mapping from a water-quality quadruple to a [`RiskVerdict`].
//! Danger conditions are evaluated first and short-circuit.

use crate::config::ThresholdConfig;
use crate::types::{ChannelValues, RawReading, RiskVerdict};

#[derive(Debug, Clone, Default)]
pub struct RiskClassifier {
    thresholds: ThresholdConfig,
}

impl RiskClassifier {
    pub const fn new(thresholds: ThresholdConfig) -> Self {
        Self { thresholds }
    }

    pub const fn thresholds(&self) -> &ThresholdConfig {
        &self.thresholds
    }

    pub fn classify(&self, temp: f64, ph: f64, dissolved_oxygen: f64, turbidity: f64) -> RiskVerdict {
        let t = &self.thresholds;

        // NaN compares false everywhere, so a NaN channel can never be Safe
        // and falls through to Warning.
        if dissolved_oxygen < t.do_danger_min
            || ph < t.ph_danger_min
            || ph > t.ph_danger_max
            || temp < t.temp_danger_min
            || temp > t.temp_danger_max
            || turbidity > t.turb_danger_max
        {
            return RiskVerdict::Danger;
        }

        let safe = (t.temp_safe_min..=t.temp_safe_max).contains(&temp)
            && (t.ph_safe_min..=t.ph_safe_max).contains(&ph)
            && dissolved_oxygen >= t.do_safe_min
            && turbidity <= t.turb_safe_max;

        if safe {
            RiskVerdict::Safe
        } else {
            RiskVerdict::Warning
        }
    }

    pub fn classify_values(&self, values: &ChannelValues<f64>) -> RiskVerdict {
        self.classify(
            values.temperature,
            values.ph,
            values.dissolved_oxygen,
            values.turbidity,
        )
    }

    pub fn classify_reading(&self, reading: &RawReading) -> RiskVerdict {
        self.classify_values(&reading.values())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> RiskClassifier {
        RiskClassifier::default()
    }

    #[test]
    fn ideal_pond_is_safe() {
        assert_eq!(classifier().classify(30.0, 7.5, 7.0, 10.0), RiskVerdict::Safe);
    }

    #[test]
    fn safe_band_edges_are_inclusive() {
        let c = classifier();
        assert_eq!(c.classify(28.0, 6.5, 6.0, 30.0), RiskVerdict::Safe);
        assert_eq!(c.classify(32.0, 8.5, 6.0, 30.0), RiskVerdict::Safe);
    }

    #[test]
    fn residual_band_is_warning() {
        let c = classifier();
        assert_eq!(c.classify(26.0, 7.5, 7.0, 10.0), RiskVerdict::Warning);
        assert_eq!(c.classify(30.0, 6.0, 7.0, 10.0), RiskVerdict::Warning);
        assert_eq!(c.classify(30.0, 7.5, 4.0, 10.0), RiskVerdict::Warning);
        assert_eq!(c.classify(30.0, 7.5, 7.0, 40.0), RiskVerdict::Warning);
    }

    #[test]
    fn danger_edges_are_exclusive() {
        let c = classifier();
        // exactly on a danger bound is not Danger
        assert_eq!(c.classify(22.0, 7.5, 7.0, 10.0), RiskVerdict::Warning);
        assert_eq!(c.classify(30.0, 7.5, 2.0, 10.0), RiskVerdict::Warning);
        assert_eq!(c.classify(30.0, 7.5, 7.0, 50.0), RiskVerdict::Warning);
        assert_eq!(c.classify(30.0, 9.5, 7.0, 10.0), RiskVerdict::Warning);
    }

    #[test]
    fn any_single_danger_condition_wins() {
        let c = classifier();
        assert_eq!(c.classify(30.0, 7.5, 1.5, 10.0), RiskVerdict::Danger);
        assert_eq!(c.classify(30.0, 5.0, 7.0, 10.0), RiskVerdict::Danger);
        assert_eq!(c.classify(30.0, 10.0, 7.0, 10.0), RiskVerdict::Danger);
        assert_eq!(c.classify(21.0, 7.5, 7.0, 10.0), RiskVerdict::Danger);
        assert_eq!(c.classify(38.0, 7.5, 7.0, 10.0), RiskVerdict::Danger);
        assert_eq!(c.classify(30.0, 7.5, 7.0, 55.0), RiskVerdict::Danger);
    }

    #[test]
    fn thresholds_come_from_config() {
        let thresholds = ThresholdConfig {
            do_danger_min: 4.0,
            ..ThresholdConfig::default()
        };
        let c = RiskClassifier::new(thresholds);
        assert_eq!(c.classify(30.0, 7.5, 3.5, 10.0), RiskVerdict::Danger);
    }

    #[test]
    fn classification_is_total() {
        let c = classifier();
        assert_eq!(c.classify(f64::NAN, 7.5, 7.0, 10.0), RiskVerdict::Warning);
        assert_eq!(c.classify(f64::INFINITY, 7.5, 7.0, 10.0), RiskVerdict::Danger);
    }
}
