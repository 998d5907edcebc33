//! Feature Reconstructor
//!
//! Rebuilds, from the rolling history, the exact feature row the forecasting
//! models were trained on:
//!
//! - `<Target>_lag<N>h`: value N samples before the newest reading
//! - `<Target>_mean<W>h` / `<Target>_std<W>h`: rolling mean and sample
//!   standard deviation over the newest W samples (newest included)
//! - `hour`, `dow`, `hour_sin`, `hour_cos`, `dow_sin`, `dow_cos` from the
//!   newest reading's timestamp (`dow` is Monday = 0)
//!
//! The persisted schema selects and orders these by name. Reconstruction is a
//! pure function of the history snapshot.

use chrono::{Datelike, NaiveDateTime, Timelike};
use statrs::statistics::Statistics;
use std::collections::{HashMap, HashSet};
use std::f64::consts::TAU;

use super::scaler::{MinMaxScaler, Scaler};
use crate::config::FeatureConfig;
use crate::types::{Channel, RawReading};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("feature '{0}' in the trained schema cannot be computed from the configured lags/windows")]
    UnknownFeature(String),

    #[error("feature '{0}' appears more than once in the trained schema")]
    DuplicateFeature(String),

    #[error("trained schema is empty")]
    EmptySchema,

    #[error("{what} expects {expected} inputs but the feature schema has {actual}")]
    WidthMismatch {
        what: String,
        expected: usize,
        actual: usize,
    },

    #[error("output scaler for {0} must have width 1, found {1}")]
    OutputScalerWidth(String, usize),

    #[error("invalid scaler: {0}")]
    InvalidScaler(String),
}

// ============================================================================
// Feature Catalogue
// ============================================================================

/// One computable feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureKind {
    Lag { channel: Channel, lag: usize },
    RollingMean { channel: Channel, window: usize },
    RollingStd { channel: Channel, window: usize },
    Hour,
    DayOfWeek,
    HourSin,
    HourCos,
    DowSin,
    DowCos,
}

impl FeatureKind {
    /// Column name used by the training pipeline.
    pub fn name(&self) -> String {
        match self {
            Self::Lag { channel, lag } => format!("{}_lag{lag}h", channel.wire_name()),
            Self::RollingMean { channel, window } => format!("{}_mean{window}h", channel.wire_name()),
            Self::RollingStd { channel, window } => format!("{}_std{window}h", channel.wire_name()),
            Self::Hour => "hour".to_string(),
            Self::DayOfWeek => "dow".to_string(),
            Self::HourSin => "hour_sin".to_string(),
            Self::HourCos => "hour_cos".to_string(),
            Self::DowSin => "dow_sin".to_string(),
            Self::DowCos => "dow_cos".to_string(),
        }
    }

    /// Every feature the reconstructor can produce for the given layout,
    /// channel-major: lags, then means, then stds, then time features.
    pub fn catalogue(layout: &FeatureConfig) -> Vec<Self> {
        let mut kinds = Vec::new();
        for channel in Channel::ALL {
            kinds.extend(layout.lags.iter().map(|&lag| Self::Lag { channel, lag }));
            kinds.extend(
                layout
                    .rolling_windows
                    .iter()
                    .map(|&window| Self::RollingMean { channel, window }),
            );
            kinds.extend(
                layout
                    .rolling_windows
                    .iter()
                    .map(|&window| Self::RollingStd { channel, window }),
            );
        }
        kinds.extend([
            Self::Hour,
            Self::DayOfWeek,
            Self::HourSin,
            Self::HourCos,
            Self::DowSin,
            Self::DowCos,
        ]);
        kinds
    }

    /// Evaluate against a snapshot known to hold enough history.
    fn evaluate(&self, snapshot: &[RawReading]) -> f64 {
        let n = snapshot.len();
        let newest = &snapshot[n - 1];
        match *self {
            Self::Lag { channel, lag } => snapshot[n - 1 - lag].value(channel),
            Self::RollingMean { channel, window } => {
                snapshot[n - window..].iter().map(|r| r.value(channel)).mean()
            }
            Self::RollingStd { channel, window } => {
                snapshot[n - window..].iter().map(|r| r.value(channel)).std_dev()
            }
            Self::Hour => f64::from(newest.timestamp.hour()),
            Self::DayOfWeek => day_of_week(&newest.timestamp),
            Self::HourSin => (TAU * f64::from(newest.timestamp.hour()) / 24.0).sin(),
            Self::HourCos => (TAU * f64::from(newest.timestamp.hour()) / 24.0).cos(),
            Self::DowSin => (TAU * day_of_week(&newest.timestamp) / 7.0).sin(),
            Self::DowCos => (TAU * day_of_week(&newest.timestamp) / 7.0).cos(),
        }
    }
}

fn day_of_week(ts: &NaiveDateTime) -> f64 {
    f64::from(ts.weekday().num_days_from_monday())
}

// ============================================================================
// Schema
// ============================================================================

/// Trained feature order, resolved against the computable catalogue.
#[derive(Debug, Clone)]
pub struct FeatureSchema {
    names: Vec<String>,
    kinds: Vec<FeatureKind>,
    min_history: usize,
}

impl FeatureSchema {
    /// Resolve persisted feature names. Every name must match a computable
    /// feature exactly and appear once.
    pub fn resolve(names: Vec<String>, layout: &FeatureConfig) -> Result<Self, SchemaError> {
        if names.is_empty() {
            return Err(SchemaError::EmptySchema);
        }
        let catalogue: HashMap<String, FeatureKind> = FeatureKind::catalogue(layout)
            .into_iter()
            .map(|k| (k.name(), k))
            .collect();

        let mut seen = HashSet::new();
        let mut kinds = Vec::with_capacity(names.len());
        for name in &names {
            if !seen.insert(name.as_str()) {
                return Err(SchemaError::DuplicateFeature(name.clone()));
            }
            let kind = catalogue
                .get(name)
                .ok_or_else(|| SchemaError::UnknownFeature(name.clone()))?;
            kinds.push(*kind);
        }

        Ok(Self {
            names,
            kinds,
            min_history: layout.min_history(),
        })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// Samples required before every configured lag and rolling feature is
    /// defined, whether or not the schema selects it.
    pub const fn min_history(&self) -> usize {
        self.min_history
    }
}

// ============================================================================
// Reconstruction
// ============================================================================

/// Scaled model input, in schema order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    values: Vec<f64>,
}

impl FeatureVector {
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Reconstruction {
    Ready(FeatureVector),
    InsufficientHistory { have: usize, need: usize },
}

#[derive(Debug, Clone)]
pub struct FeatureReconstructor {
    schema: FeatureSchema,
    scaler: MinMaxScaler,
}

impl FeatureReconstructor {
    /// The input scaler must be as wide as the schema.
    pub fn new(schema: FeatureSchema, scaler: MinMaxScaler) -> Result<Self, SchemaError> {
        if scaler.width() != schema.len() {
            return Err(SchemaError::WidthMismatch {
                what: "input scaler".to_string(),
                expected: scaler.width(),
                actual: schema.len(),
            });
        }
        Ok(Self { schema, scaler })
    }

    pub const fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Unscaled feature values in schema order, or `None` while any
    /// lag/rolling window reaches before the start of the snapshot.
    pub fn raw_features(&self, snapshot: &[RawReading]) -> Option<Vec<f64>> {
        if snapshot.is_empty() || snapshot.len() < self.schema.min_history() {
            return None;
        }
        Some(self.schema.kinds.iter().map(|k| k.evaluate(snapshot)).collect())
    }

    pub fn reconstruct(&self, snapshot: &[RawReading]) -> Reconstruction {
        match self.raw_features(snapshot) {
            Some(raw) => Reconstruction::Ready(FeatureVector {
                values: self.scaler.transform(&raw),
            }),
            None => Reconstruction::InsufficientHistory {
                have: snapshot.len(),
                need: self.schema.min_history(),
            },
        }
    }
}
