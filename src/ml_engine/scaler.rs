//! Fitted min-max scaling
//!
//! Affine per-column transform fit at training time:
//! `scale = (range_max - range_min) / (data_max - data_min)` (zero ranges
//! treated as 1), `offset = range_min - data_min * scale`.

use serde::{Deserialize, Serialize};

use super::features::SchemaError;

/// Column-wise affine transform between physical and model space.
pub trait Scaler: Send + Sync + std::fmt::Debug {
    fn width(&self) -> usize;
    fn transform(&self, values: &[f64]) -> Vec<f64>;
    fn inverse_transform(&self, values: &[f64]) -> Vec<f64>;
}

/// Persisted form of a fitted scaler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinMaxParams {
    pub data_min: Vec<f64>,
    pub data_max: Vec<f64>,
    #[serde(default = "default_feature_range")]
    pub feature_range: (f64, f64),
}

const fn default_feature_range() -> (f64, f64) {
    (0.0, 1.0)
}

#[derive(Debug, Clone, PartialEq)]
pub struct MinMaxScaler {
    scale: Vec<f64>,
    offset: Vec<f64>,
}

impl MinMaxScaler {
    pub fn fit(params: &MinMaxParams) -> Result<Self, SchemaError> {
        let (range_min, range_max) = params.feature_range;
        if params.data_min.len() != params.data_max.len() {
            return Err(SchemaError::InvalidScaler(format!(
                "data_min has {} columns, data_max has {}",
                params.data_min.len(),
                params.data_max.len()
            )));
        }
        if params.data_min.is_empty() {
            return Err(SchemaError::InvalidScaler("no columns".to_string()));
        }
        if !(range_min.is_finite() && range_max.is_finite()) || range_max <= range_min {
            return Err(SchemaError::InvalidScaler(format!(
                "feature_range ({range_min}, {range_max}) is not an increasing interval"
            )));
        }

        let mut scale = Vec::with_capacity(params.data_min.len());
        let mut offset = Vec::with_capacity(params.data_min.len());
        for (i, (&lo, &hi)) in params.data_min.iter().zip(&params.data_max).enumerate() {
            if !(lo.is_finite() && hi.is_finite()) || hi < lo {
                return Err(SchemaError::InvalidScaler(format!(
                    "column {i}: data_min {lo} / data_max {hi}"
                )));
            }
            let range = if hi - lo == 0.0 { 1.0 } else { hi - lo };
            let s = (range_max - range_min) / range;
            scale.push(s);
            offset.push(range_min - lo * s);
        }
        Ok(Self { scale, offset })
    }

    /// Pass-through scaler of the given width.
    pub fn identity(width: usize) -> Self {
        Self {
            scale: vec![1.0; width],
            offset: vec![0.0; width],
        }
    }

    /// Inverse-transform a single value through column 0.
    pub fn inverse_one(&self, value: f64) -> f64 {
        (value - self.offset[0]) / self.scale[0]
    }
}

impl Scaler for MinMaxScaler {
    fn width(&self) -> usize {
        self.scale.len()
    }

    fn transform(&self, values: &[f64]) -> Vec<f64> {
        debug_assert_eq!(values.len(), self.width());
        values
            .iter()
            .zip(self.scale.iter().zip(&self.offset))
            .map(|(x, (s, o))| x * s + o)
            .collect()
    }

    fn inverse_transform(&self, values: &[f64]) -> Vec<f64> {
        debug_assert_eq!(values.len(), self.width());
        values
            .iter()
            .zip(self.scale.iter().zip(&self.offset))
            .map(|(y, (s, o))| (y - o) / s)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(min: Vec<f64>, max: Vec<f64>) -> MinMaxParams {
        MinMaxParams {
            data_min: min,
            data_max: max,
            feature_range: (0.0, 1.0),
        }
    }

    #[test]
    fn maps_data_range_onto_unit_interval() {
        let scaler = MinMaxScaler::fit(&params(vec![20.0, 0.0], vec![40.0, 100.0])).unwrap();
        let out = scaler.transform(&[30.0, 25.0]);
        assert!((out[0] - 0.5).abs() < 1e-12);
        assert!((out[1] - 0.25).abs() < 1e-12);
    }

    #[test]
    fn inverse_recovers_physical_value() {
        let scaler = MinMaxScaler::fit(&params(vec![2.0], vec![10.0])).unwrap();
        let scaled = scaler.transform(&[7.3]);
        assert!((scaler.inverse_one(scaled[0]) - 7.3).abs() < 1e-12);
        assert!((scaler.inverse_transform(&scaled)[0] - 7.3).abs() < 1e-12);
    }

    #[test]
    fn constant_column_uses_unit_range() {
        let scaler = MinMaxScaler::fit(&params(vec![5.0], vec![5.0])).unwrap();
        // scale 1, offset -5
        assert!((scaler.transform(&[6.0])[0] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn custom_feature_range() {
        let p = MinMaxParams {
            data_min: vec![0.0],
            data_max: vec![10.0],
            feature_range: (-1.0, 1.0),
        };
        let scaler = MinMaxScaler::fit(&p).unwrap();
        assert!((scaler.transform(&[5.0])[0]).abs() < 1e-12);
    }

    #[test]
    fn rejects_malformed_params() {
        assert!(MinMaxScaler::fit(&params(vec![0.0, 1.0], vec![1.0])).is_err());
        assert!(MinMaxScaler::fit(&params(vec![], vec![])).is_err());
        assert!(MinMaxScaler::fit(&params(vec![3.0], vec![1.0])).is_err());
    }

    #[test]
    fn params_default_feature_range() {
        let p: MinMaxParams =
            serde_json::from_str(r#"{"data_min": [0.0], "data_max": [2.0]}"#).unwrap();
        assert_eq!(p.feature_range, (0.0, 1.0));
    }
}
