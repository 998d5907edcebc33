//! Forecast Engine
//!
//! History snapshot -> feature vector -> one inference per channel ->
//! inverse output scaling -> rounding. Insufficient history yields no
//! forecast, never an error.

use super::artifacts::{ChannelModel, ModelArtifacts};
use super::features::{FeatureReconstructor, FeatureVector, Reconstruction};
use crate::types::{ChannelValues, RawReading};

#[derive(Debug, Clone, PartialEq)]
pub enum ForecastOutcome {
    Ready(ChannelValues<f64>),
    InsufficientHistory { have: usize, need: usize },
}

impl ForecastOutcome {
    pub const fn values(&self) -> Option<&ChannelValues<f64>> {
        match self {
            Self::Ready(v) => Some(v),
            Self::InsufficientHistory { .. } => None,
        }
    }
}

#[derive(Debug)]
pub struct ForecastEngine {
    reconstructor: FeatureReconstructor,
    models: ChannelValues<ChannelModel>,
    decimals: u32,
    horizon_hours: u32,
}

impl ForecastEngine {
    pub fn new(artifacts: ModelArtifacts, decimals: u32) -> Self {
        Self {
            reconstructor: artifacts.reconstructor,
            models: artifacts.models,
            decimals,
            horizon_hours: artifacts.manifest.horizon_hours,
        }
    }

    pub const fn horizon_hours(&self) -> u32 {
        self.horizon_hours
    }

    pub const fn min_history(&self) -> usize {
        self.reconstructor.schema().min_history()
    }

    /// Physical-unit forecast for every channel from a ready feature vector.
    pub fn predict(&self, features: &FeatureVector) -> ChannelValues<f64> {
        let x = features.as_slice();
        ChannelValues {
            temperature: self.models.temperature.predict(x),
            ph: self.models.ph.predict(x),
            dissolved_oxygen: self.models.dissolved_oxygen.predict(x),
            turbidity: self.models.turbidity.predict(x),
        }
        .map(|v| round_to(v, self.decimals))
    }

    /// Forecast from a history snapshot whose last entry is the newest reading.
    pub fn forecast(&self, snapshot: &[RawReading]) -> ForecastOutcome {
        match self.reconstructor.reconstruct(snapshot) {
            Reconstruction::Ready(features) => ForecastOutcome::Ready(self.predict(&features)),
            Reconstruction::InsufficientHistory { have, need } => {
                ForecastOutcome::InsufficientHistory { have, need }
            }
        }
    }
}

/// Round half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(i32::try_from(decimals).unwrap_or(i32::MAX).min(15));
    (value * factor).round() / factor
}
