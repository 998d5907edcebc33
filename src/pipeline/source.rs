//! Reading source abstraction for sensor data ingestion.
//!
//! Provides a unified trait for reading water-quality messages from different
//! sources: MQTT (live), stdin (JSON lines) and CSV files (replay).

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::Path;

use crate::acquisition::{parse_message, AcquisitionError, IncomingReading, MqttSubscriber, ReadingMessage};
use crate::config::MqttConfig;

/// Events produced by a reading source.
#[derive(Debug)]
pub enum ReadingEvent {
    /// A validated reading.
    Reading(IncomingReading),
    /// A payload that failed validation; the source keeps going.
    Malformed(AcquisitionError),
    /// Source reached end of data (EOF for files/stdin).
    Eof,
}

/// Trait abstracting where readings come from.
///
/// Implementations handle format parsing, reconnection, and pacing internally.
/// The processing loop calls [`next_reading`](ReadingSource::next_reading) in
/// a select! with cancellation.
#[async_trait]
pub trait ReadingSource: Send + 'static {
    /// Read the next event from the source.
    ///
    /// Returns `Err` only on unrecoverable errors (e.g. stdin closed with an
    /// I/O failure).
    async fn next_reading(&mut self) -> Result<ReadingEvent>;

    /// Human-readable name for logging (e.g. "MQTT", "stdin", "CSV").
    fn source_name(&self) -> &str;
}

// ============================================================================
// MQTT Source (live)
// ============================================================================

pub struct MqttSource {
    subscriber: MqttSubscriber,
}

impl MqttSource {
    pub fn new(config: MqttConfig) -> Self {
        Self {
            subscriber: MqttSubscriber::new(config),
        }
    }
}

#[async_trait]
impl ReadingSource for MqttSource {
    async fn next_reading(&mut self) -> Result<ReadingEvent> {
        let payload = self.subscriber.next_payload().await;
        tracing::debug!(topic = %payload.topic, bytes = payload.payload.len(), "Received MQTT message");
        Ok(match parse_message(&payload.payload) {
            Ok(reading) => ReadingEvent::Reading(reading),
            Err(e) => ReadingEvent::Malformed(e),
        })
    }

    fn source_name(&self) -> &str {
        "MQTT"
    }
}

// ============================================================================
// CSV Source (file replay)
// ============================================================================

/// Replays a CSV export with optional inter-row delay.
///
/// Expected header: `timestamp,Temperature,pH,Dissolved_Oxygen,Turbidity`
/// (an optional `demo_mode` column is honoured).
pub struct CsvSource {
    rows: std::vec::IntoIter<Result<IncomingReading, AcquisitionError>>,
    delay_ms: u64,
    yielded_first: bool,
}

impl CsvSource {
    pub fn from_path(path: &Path, delay_ms: u64) -> Result<Self> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("opening CSV replay file {}", path.display()))?;
        Ok(Self::from_reader(file, delay_ms))
    }

    /// Parse every row up front; bad rows are replayed as malformed events.
    pub fn from_reader<R: std::io::Read>(reader: R, delay_ms: u64) -> Self {
        let mut csv = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let rows: Vec<_> = csv
            .deserialize::<ReadingMessage>()
            .map(|row| {
                row.map_err(AcquisitionError::from)
                    .and_then(IncomingReading::try_from)
            })
            .collect();
        tracing::info!(rows = rows.len(), "Loaded CSV replay");
        Self {
            rows: rows.into_iter(),
            delay_ms,
            yielded_first: false,
        }
    }
}

#[async_trait]
impl ReadingSource for CsvSource {
    async fn next_reading(&mut self) -> Result<ReadingEvent> {
        // No delay before the first row
        if self.yielded_first && self.delay_ms > 0 {
            tokio::time::sleep(tokio::time::Duration::from_millis(self.delay_ms)).await;
        }
        match self.rows.next() {
            Some(row) => {
                self.yielded_first = true;
                Ok(match row {
                    Ok(reading) => ReadingEvent::Reading(reading),
                    Err(e) => ReadingEvent::Malformed(e),
                })
            }
            None => Ok(ReadingEvent::Eof),
        }
    }

    fn source_name(&self) -> &str {
        "CSV"
    }
}

// ============================================================================
// Stdin Source (JSON messages, one per line)
// ============================================================================

/// Reads JSON messages from stdin.
///
/// Used with a simulator:
/// `python normal.py | ./tilapia-gateway --stdin`
pub struct StdinSource {
    reader: tokio::io::BufReader<tokio::io::Stdin>,
    line_buffer: String,
}

impl StdinSource {
    pub fn new() -> Self {
        Self {
            reader: tokio::io::BufReader::new(tokio::io::stdin()),
            line_buffer: String::with_capacity(512),
        }
    }
}

impl Default for StdinSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReadingSource for StdinSource {
    async fn next_reading(&mut self) -> Result<ReadingEvent> {
        use tokio::io::AsyncBufReadExt;
        loop {
            self.line_buffer.clear();
            let bytes = self.reader.read_line(&mut self.line_buffer).await?;
            if bytes == 0 {
                return Ok(ReadingEvent::Eof);
            }
            let line = self.line_buffer.trim();
            if line.is_empty() {
                continue;
            }
            return Ok(match parse_message(line.as_bytes()) {
                Ok(reading) => ReadingEvent::Reading(reading),
                Err(e) => ReadingEvent::Malformed(e),
            });
        }
    }

    fn source_name(&self) -> &str {
        "stdin"
    }
}

// ============================================================================
// Vec Source (in-process replay)
// ============================================================================

/// Replays already-validated readings; used by tests and embedding callers.
pub struct VecSource {
    readings: std::vec::IntoIter<IncomingReading>,
}

impl VecSource {
    pub fn new(readings: Vec<IncomingReading>) -> Self {
        Self {
            readings: readings.into_iter(),
        }
    }
}

#[async_trait]
impl ReadingSource for VecSource {
    async fn next_reading(&mut self) -> Result<ReadingEvent> {
        Ok(self
            .readings
            .next()
            .map_or(ReadingEvent::Eof, ReadingEvent::Reading))
    }

    fn source_name(&self) -> &str {
        "in-memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPLAY: &str = "\
timestamp,Temperature,pH,Dissolved_Oxygen,Turbidity
2025-01-01 00:00:00,29.0,7.2,6.5,12.0
2025-01-01 01:00:00,not-a-number,7.2,6.5,12.0
2025-01-01 02:00:00, 29.4 ,7.1,6.3,12.5
";

    #[tokio::test]
    async fn test_csv_source_skips_bad_rows() {
        let mut source = CsvSource::from_reader(REPLAY.as_bytes(), 0);

        match source.next_reading().await.unwrap() {
            ReadingEvent::Reading(r) => {
                assert!((r.reading.dissolved_oxygen - 6.5).abs() < f64::EPSILON);
                assert!(!r.demo_mode);
            }
            other => panic!("expected reading, got {other:?}"),
        }
        assert!(matches!(
            source.next_reading().await.unwrap(),
            ReadingEvent::Malformed(AcquisitionError::Csv(_))
        ));
        match source.next_reading().await.unwrap() {
            ReadingEvent::Reading(r) => assert!((r.reading.temperature - 29.4).abs() < f64::EPSILON),
            other => panic!("expected reading, got {other:?}"),
        }
        assert!(matches!(source.next_reading().await.unwrap(), ReadingEvent::Eof));
        assert_eq!(source.source_name(), "CSV");
    }

    #[tokio::test]
    async fn test_csv_source_rejects_bad_timestamp() {
        let data = "timestamp,Temperature,pH,Dissolved_Oxygen,Turbidity\n01/01/2025,29.0,7.2,6.5,12.0\n";
        let mut source = CsvSource::from_reader(data.as_bytes(), 0);
        assert!(matches!(
            source.next_reading().await.unwrap(),
            ReadingEvent::Malformed(AcquisitionError::Timestamp { .. })
        ));
    }

    #[tokio::test]
    async fn test_vec_source_ends_with_eof() {
        let reading = crate::acquisition::parse_message(
            br#"{"Temperature": 29.0, "pH": 7.2, "Dissolved_Oxygen": 6.5,
                 "Turbidity": 12.0, "timestamp": "2025-01-01 00:00:00"}"#,
        )
        .unwrap();
        let mut source = VecSource::new(vec![reading]);
        assert!(matches!(source.next_reading().await.unwrap(), ReadingEvent::Reading(_)));
        assert!(matches!(source.next_reading().await.unwrap(), ReadingEvent::Eof));
    }
}
