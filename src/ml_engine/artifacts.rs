//! Trained artifact bundle loading
//!
//! A bundle directory contains:
//!
//! ```text
//! model_config.json            {"schema_version": 1, "horizon_hours": 6, "targets": [...]}
//! feature_columns.json         ["Temperature_lag1h", ...]
//! scaler_features.json         input MinMax scaler
//! scaler_<Target>.json         output MinMax scaler per target (width 1)
//! model_<Target>_<H>h.json     regressor per target
//! ```
//!
//! Any missing file or inconsistency is fatal: serving forecasts from a
//! mismatched bundle would silently produce wrong predictions.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use super::features::{FeatureReconstructor, FeatureSchema, SchemaError};
use super::regressor::{Regressor, RegressorSpec};
use super::scaler::{MinMaxParams, MinMaxScaler, Scaler};
use crate::config::FeatureConfig;
use crate::types::{Channel, ChannelValues};

/// Bundle layout version this build understands.
pub const SUPPORTED_SCHEMA_VERSION: u32 = 1;

pub const MODEL_CONFIG_FILE: &str = "model_config.json";
pub const FEATURE_COLUMNS_FILE: &str = "feature_columns.json";
pub const INPUT_SCALER_FILE: &str = "scaler_features.json";

#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("missing artifact: {}", .0.display())]
    Missing(PathBuf),

    #[error("failed to read {}: {1}", .0.display())]
    Io(PathBuf, #[source] std::io::Error),

    #[error("failed to parse {}: {1}", .0.display())]
    Json(PathBuf, #[source] serde_json::Error),

    #[error("unsupported artifact schema_version {found} (expected {expected})")]
    UnsupportedSchemaVersion { found: u32, expected: u32 },

    #[error("unknown target '{0}' in model_config.json")]
    UnknownTarget(String),

    #[error("model_config.json does not list target {0}")]
    MissingTarget(Channel),

    #[error("invalid model for {target}: {reason}")]
    InvalidModel { target: Channel, reason: String },

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Contents of `model_config.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleManifest {
    pub schema_version: u32,
    pub horizon_hours: u32,
    pub targets: Vec<String>,
    /// Free-form training metadata (dataset, date); logged only
    #[serde(default)]
    pub trained_on: Option<String>,
}

pub fn scaler_file_name(target: Channel) -> String {
    format!("scaler_{}.json", target.wire_name())
}

pub fn model_file_name(target: Channel, horizon_hours: u32) -> String {
    format!("model_{}_{horizon_hours}h.json", target.wire_name())
}

/// Regressor plus output scaler for one channel.
#[derive(Debug)]
pub struct ChannelModel {
    pub regressor: Box<dyn Regressor>,
    pub output_scaler: MinMaxScaler,
}

impl ChannelModel {
    /// Predict in scaled space and map back to physical units.
    pub fn predict(&self, features: &[f64]) -> f64 {
        self.output_scaler.inverse_one(self.regressor.predict(features))
    }
}

/// A fully validated artifact bundle.
#[derive(Debug)]
pub struct ModelArtifacts {
    pub manifest: BundleManifest,
    pub reconstructor: FeatureReconstructor,
    pub models: ChannelValues<ChannelModel>,
}

impl ModelArtifacts {
    /// Load and cross-check a bundle directory against the feature layout.
    pub fn load(dir: &Path, layout: &FeatureConfig) -> Result<Self, ArtifactError> {
        let manifest: BundleManifest = read_json(&dir.join(MODEL_CONFIG_FILE))?;
        if manifest.schema_version != SUPPORTED_SCHEMA_VERSION {
            return Err(ArtifactError::UnsupportedSchemaVersion {
                found: manifest.schema_version,
                expected: SUPPORTED_SCHEMA_VERSION,
            });
        }
        for name in &manifest.targets {
            if Channel::from_wire_name(name).is_none() {
                return Err(ArtifactError::UnknownTarget(name.clone()));
            }
        }
        if let Some(missing) = Channel::ALL
            .into_iter()
            .find(|c| !manifest.targets.iter().any(|t| t == c.wire_name()))
        {
            return Err(ArtifactError::MissingTarget(missing));
        }

        let columns: Vec<String> = read_json(&dir.join(FEATURE_COLUMNS_FILE))?;
        let schema = FeatureSchema::resolve(columns, layout)?;
        let input_params: MinMaxParams = read_json(&dir.join(INPUT_SCALER_FILE))?;
        let reconstructor = FeatureReconstructor::new(schema, MinMaxScaler::fit(&input_params)?)?;
        let width = reconstructor.schema().len();

        let load_channel = |target: Channel| -> Result<ChannelModel, ArtifactError> {
            let params: MinMaxParams = read_json(&dir.join(scaler_file_name(target)))?;
            let output_scaler = MinMaxScaler::fit(&params)?;
            if output_scaler.width() != 1 {
                return Err(SchemaError::OutputScalerWidth(
                    target.wire_name().to_string(),
                    output_scaler.width(),
                )
                .into());
            }

            let spec: RegressorSpec =
                read_json(&dir.join(model_file_name(target, manifest.horizon_hours)))?;
            let regressor = spec
                .build()
                .map_err(|reason| ArtifactError::InvalidModel { target, reason })?;
            if regressor.input_width() != width {
                return Err(SchemaError::WidthMismatch {
                    what: format!("{target} regressor"),
                    expected: regressor.input_width(),
                    actual: width,
                }
                .into());
            }
            Ok(ChannelModel {
                regressor,
                output_scaler,
            })
        };

        let models = ChannelValues {
            temperature: load_channel(Channel::Temperature)?,
            ph: load_channel(Channel::Ph)?,
            dissolved_oxygen: load_channel(Channel::DissolvedOxygen)?,
            turbidity: load_channel(Channel::Turbidity)?,
        };

        info!(
            dir = %dir.display(),
            features = width,
            horizon_h = manifest.horizon_hours,
            trained_on = manifest.trained_on.as_deref().unwrap_or("unknown"),
            "Loaded forecast artifacts"
        );

        Ok(Self {
            manifest,
            reconstructor,
            models,
        })
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ArtifactError> {
    let bytes = std::fs::read(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ArtifactError::Missing(path.to_path_buf())
        } else {
            ArtifactError::Io(path.to_path_buf(), e)
        }
    })?;
    serde_json::from_slice(&bytes).map_err(|e| ArtifactError::Json(path.to_path_buf(), e))
}
