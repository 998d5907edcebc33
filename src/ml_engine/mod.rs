//! Forecasting engine for 6-hour-ahead water-quality prediction
//!
//! ## Architecture
//! - `history`: bounded, ordered window of recent readings
//! - `features`: lag / rolling / cyclical-time feature reconstruction
//! - `scaler`: fitted min-max scaling between physical and model space
//! - `regressor`: linear and gradient-boosted tree backends
//! - `artifacts`: loading and cross-checking the trained bundle
//! - `forecast`: per-channel inference and inverse scaling

pub mod artifacts;
pub mod features;
pub mod forecast;
pub mod history;
pub mod regressor;
pub mod scaler;

pub use artifacts::{ArtifactError, ChannelModel, ModelArtifacts};
pub use features::{FeatureReconstructor, FeatureSchema, FeatureVector, Reconstruction, SchemaError};
pub use forecast::{ForecastEngine, ForecastOutcome};
pub use history::{AppendOutcome, HistoryWindow};
pub use regressor::{LinearRegressor, Regressor, RegressorSpec, TreeEnsemble};
pub use scaler::{MinMaxParams, MinMaxScaler, Scaler};
