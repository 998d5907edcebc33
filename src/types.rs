//! Core domain types shared by the ingestion pipeline.
//!
//! - [`Channel`] / [`ChannelValues`]: the four monitored water-quality parameters
//! - [`RawReading`]: one validated sensor sample
//! - [`RiskVerdict`]: Safe / Warning / Danger with a total severity order
//! - [`EnrichedRecord`]: the per-message row handed to persistence

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Wire / storage timestamp format (second precision, no timezone).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parse a `YYYY-MM-DD HH:MM:SS` timestamp.
pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    NaiveDateTime::parse_from_str(raw.trim(), TIMESTAMP_FORMAT)
}

/// Format a timestamp in the wire format.
pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Serde adapter for [`NaiveDateTime`] in the wire format.
pub mod timestamp_format {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::format_timestamp(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_timestamp(&raw).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// Channels
// ============================================================================

/// A monitored water-quality parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    Temperature,
    Ph,
    DissolvedOxygen,
    Turbidity,
}

impl Channel {
    /// All channels in model-target order.
    pub const ALL: [Self; 4] = [
        Self::Temperature,
        Self::Ph,
        Self::DissolvedOxygen,
        Self::Turbidity,
    ];

    /// Name used on the wire and in trained artifact / feature names.
    pub const fn wire_name(self) -> &'static str {
        match self {
            Self::Temperature => "Temperature",
            Self::Ph => "pH",
            Self::DissolvedOxygen => "Dissolved_Oxygen",
            Self::Turbidity => "Turbidity",
        }
    }

    pub fn from_wire_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.wire_name() == name)
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// One value per [`Channel`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ChannelValues<T> {
    pub temperature: T,
    pub ph: T,
    pub dissolved_oxygen: T,
    pub turbidity: T,
}

impl<T> ChannelValues<T> {
    /// Build by evaluating `f` once per channel, in [`Channel::ALL`] order.
    pub fn from_fn(mut f: impl FnMut(Channel) -> T) -> Self {
        Self {
            temperature: f(Channel::Temperature),
            ph: f(Channel::Ph),
            dissolved_oxygen: f(Channel::DissolvedOxygen),
            turbidity: f(Channel::Turbidity),
        }
    }

    pub const fn get(&self, channel: Channel) -> &T {
        match channel {
            Channel::Temperature => &self.temperature,
            Channel::Ph => &self.ph,
            Channel::DissolvedOxygen => &self.dissolved_oxygen,
            Channel::Turbidity => &self.turbidity,
        }
    }

    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> ChannelValues<U> {
        ChannelValues {
            temperature: f(self.temperature),
            ph: f(self.ph),
            dissolved_oxygen: f(self.dissolved_oxygen),
            turbidity: f(self.turbidity),
        }
    }
}

// ============================================================================
// Raw Reading
// ============================================================================

/// One validated sensor sample, immutable once received.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawReading {
    #[serde(with = "timestamp_format")]
    pub timestamp: NaiveDateTime,
    /// Water temperature (°C)
    pub temperature: f64,
    /// pH (unitless)
    pub ph: f64,
    /// Dissolved oxygen (mg/L)
    pub dissolved_oxygen: f64,
    /// Turbidity (NTU)
    pub turbidity: f64,
}

impl RawReading {
    pub const fn value(&self, channel: Channel) -> f64 {
        match channel {
            Channel::Temperature => self.temperature,
            Channel::Ph => self.ph,
            Channel::DissolvedOxygen => self.dissolved_oxygen,
            Channel::Turbidity => self.turbidity,
        }
    }

    pub const fn values(&self) -> ChannelValues<f64> {
        ChannelValues {
            temperature: self.temperature,
            ph: self.ph,
            dissolved_oxygen: self.dissolved_oxygen,
            turbidity: self.turbidity,
        }
    }
}

// ============================================================================
// Risk Verdict
// ============================================================================

/// Risk verdict for a quadruple of water-quality values.
///
/// Variant order defines severity: `Danger > Warning > Safe`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum RiskVerdict {
    #[default]
    Safe = 0,
    Warning = 1,
    Danger = 2,
}

impl RiskVerdict {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Safe => "Safe",
            Self::Warning => "Warning",
            Self::Danger => "Danger",
        }
    }
}

impl std::fmt::Display for RiskVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RiskVerdict {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Safe" => Ok(Self::Safe),
            "Warning" => Ok(Self::Warning),
            "Danger" => Ok(Self::Danger),
            other => Err(format!("unknown risk verdict '{other}'")),
        }
    }
}

// ============================================================================
// Enriched Record
// ============================================================================

/// The unit handed to persistence: raw reading, 6h forecast (nullable),
/// sensor / forecast / merged risk verdicts. Field names match the persisted
/// row layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedRecord {
    #[serde(with = "timestamp_format")]
    pub timestamp: NaiveDateTime,
    pub temp: f64,
    pub ph: f64,
    #[serde(rename = "do")]
    pub dissolved_oxygen: f64,
    pub turbidity: f64,
    pub pred_temp: Option<f64>,
    pub pred_ph: Option<f64>,
    pub pred_do: Option<f64>,
    pub pred_turb: Option<f64>,
    pub sensor_risk: RiskVerdict,
    /// `None` while history is insufficient for a forecast
    pub pred_risk: Option<RiskVerdict>,
    pub status: RiskVerdict,
}

impl EnrichedRecord {
    pub fn new(
        reading: &RawReading,
        forecast: Option<&ChannelValues<f64>>,
        sensor_risk: RiskVerdict,
        pred_risk: Option<RiskVerdict>,
        status: RiskVerdict,
    ) -> Self {
        let (pred_temp, pred_ph, pred_do, pred_turb) = match forecast {
            Some(f) => (
                Some(f.temperature),
                Some(f.ph),
                Some(f.dissolved_oxygen),
                Some(f.turbidity),
            ),
            None => (None, None, None, None),
        };
        Self {
            timestamp: reading.timestamp,
            temp: reading.temperature,
            ph: reading.ph,
            dissolved_oxygen: reading.dissolved_oxygen,
            turbidity: reading.turbidity,
            pred_temp,
            pred_ph,
            pred_do,
            pred_turb,
            sensor_risk,
            pred_risk,
            status,
        }
    }

    /// The forecast, if all four channels were predicted.
    pub fn forecast(&self) -> Option<ChannelValues<f64>> {
        Some(ChannelValues {
            temperature: self.pred_temp?,
            ph: self.pred_ph?,
            dissolved_oxygen: self.pred_do?,
            turbidity: self.pred_turb?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verdict_order_is_danger_warning_safe() {
        assert!(RiskVerdict::Danger > RiskVerdict::Warning);
        assert!(RiskVerdict::Warning > RiskVerdict::Safe);
        assert_eq!(
            RiskVerdict::Safe.max(RiskVerdict::Danger),
            RiskVerdict::Danger
        );
    }

    #[test]
    fn channel_wire_names_round_trip() {
        for ch in Channel::ALL {
            assert_eq!(Channel::from_wire_name(ch.wire_name()), Some(ch));
        }
        assert_eq!(Channel::from_wire_name("DO"), None);
    }

    #[test]
    fn enriched_record_serializes_with_row_names() {
        let reading = RawReading {
            timestamp: parse_timestamp("2025-01-01 06:00:00").unwrap(),
            temperature: 30.0,
            ph: 7.2,
            dissolved_oxygen: 6.5,
            turbidity: 15.0,
        };
        let record = EnrichedRecord::new(&reading, None, RiskVerdict::Safe, None, RiskVerdict::Safe);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["timestamp"], "2025-01-01 06:00:00");
        assert_eq!(json["do"], 6.5);
        assert!(json["pred_temp"].is_null());
        assert_eq!(json["status"], "Safe");
        assert!(record.forecast().is_none());
    }
}
