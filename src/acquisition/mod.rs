//! Sensor data acquisition module
//!
//! Transport boundary: inbound payloads are validated into strongly-typed
//! [`RawReading`]s here, so nothing malformed reaches the pipeline core.

pub mod mqtt;

pub use mqtt::MqttSubscriber;

use serde::Deserialize;

use crate::types::{self, Channel, RawReading};

#[derive(Debug, thiserror::Error)]
pub enum AcquisitionError {
    #[error("malformed message: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid timestamp '{raw}': {source}")]
    Timestamp {
        raw: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("non-finite value for {0}")]
    NonFinite(Channel),

    #[error("malformed CSV row: {0}")]
    Csv(#[from] csv::Error),
}

/// Wire format of one inbound message.
///
/// `{"Temperature": 29.1, "pH": 7.2, "Dissolved_Oxygen": 6.4,
///   "Turbidity": 12.0, "timestamp": "2025-01-01 06:00:00", "demo_mode": false}`
#[derive(Debug, Clone, Deserialize)]
pub struct ReadingMessage {
    #[serde(rename = "Temperature")]
    pub temperature: f64,
    #[serde(rename = "pH")]
    pub ph: f64,
    #[serde(rename = "Dissolved_Oxygen")]
    pub dissolved_oxygen: f64,
    #[serde(rename = "Turbidity")]
    pub turbidity: f64,
    pub timestamp: String,
    #[serde(default)]
    pub demo_mode: bool,
}

/// A validated reading plus its per-message flags.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IncomingReading {
    pub reading: RawReading,
    /// Surface the sensor verdict alone; the forecast is still computed and stored
    pub demo_mode: bool,
}

impl IncomingReading {
    pub const fn new(reading: RawReading) -> Self {
        Self {
            reading,
            demo_mode: false,
        }
    }
}

impl TryFrom<ReadingMessage> for IncomingReading {
    type Error = AcquisitionError;

    fn try_from(msg: ReadingMessage) -> Result<Self, Self::Error> {
        let timestamp =
            types::parse_timestamp(&msg.timestamp).map_err(|source| AcquisitionError::Timestamp {
                raw: msg.timestamp.clone(),
                source,
            })?;
        let reading = RawReading {
            timestamp,
            temperature: msg.temperature,
            ph: msg.ph,
            dissolved_oxygen: msg.dissolved_oxygen,
            turbidity: msg.turbidity,
        };
        validate_reading(&reading)?;
        Ok(Self {
            reading,
            demo_mode: msg.demo_mode,
        })
    }
}

/// Reject NaN / infinite channel values.
pub fn validate_reading(reading: &RawReading) -> Result<(), AcquisitionError> {
    match Channel::ALL.into_iter().find(|c| !reading.value(*c).is_finite()) {
        Some(channel) => Err(AcquisitionError::NonFinite(channel)),
        None => Ok(()),
    }
}

/// Parse one JSON payload into a validated reading.
pub fn parse_message(payload: &[u8]) -> Result<IncomingReading, AcquisitionError> {
    let msg: ReadingMessage = serde_json::from_slice(payload)?;
    IncomingReading::try_from(msg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_message() {
        let incoming = parse_message(
            br#"{"Temperature": 29.5, "pH": 7.1, "Dissolved_Oxygen": 6.2,
                 "Turbidity": 14.0, "timestamp": "2025-03-01 12:00:00", "demo_mode": true}"#,
        )
        .unwrap();
        assert!((incoming.reading.temperature - 29.5).abs() < f64::EPSILON);
        assert!((incoming.reading.dissolved_oxygen - 6.2).abs() < f64::EPSILON);
        assert_eq!(
            types::format_timestamp(&incoming.reading.timestamp),
            "2025-03-01 12:00:00"
        );
        assert!(incoming.demo_mode);
    }

    #[test]
    fn demo_mode_defaults_to_false() {
        let incoming = parse_message(
            br#"{"Temperature": 29.5, "pH": 7.1, "Dissolved_Oxygen": 6.2,
                 "Turbidity": 14.0, "timestamp": "2025-03-01 12:00:00"}"#,
        )
        .unwrap();
        assert!(!incoming.demo_mode);
    }

    #[test]
    fn missing_field_is_rejected() {
        let err = parse_message(
            br#"{"Temperature": 29.5, "pH": 7.1, "Turbidity": 14.0,
                 "timestamp": "2025-03-01 12:00:00"}"#,
        )
        .unwrap_err();
        assert!(matches!(err, AcquisitionError::Json(_)));
    }

    #[test]
    fn non_numeric_field_is_rejected() {
        let err = parse_message(
            br#"{"Temperature": "hot", "pH": 7.1, "Dissolved_Oxygen": 6.2,
                 "Turbidity": 14.0, "timestamp": "2025-03-01 12:00:00"}"#,
        )
        .unwrap_err();
        assert!(matches!(err, AcquisitionError::Json(_)));
    }

    #[test]
    fn bad_timestamp_is_rejected() {
        let err = parse_message(
            br#"{"Temperature": 29.5, "pH": 7.1, "Dissolved_Oxygen": 6.2,
                 "Turbidity": 14.0, "timestamp": "yesterday"}"#,
        )
        .unwrap_err();
        assert!(matches!(err, AcquisitionError::Timestamp { .. }));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(parse_message(b"not json").is_err());
    }
}
