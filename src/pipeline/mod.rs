//! Ingestion pipeline
//!
//! - `coordinator`: per-reading classification, forecast, merge, throttle
//! - `source`: MQTT / stdin / CSV reading sources
//! - `processing_loop`: drives a source through the coordinator into the
//!   store and notifier
//! - `state`: shared status for the read API

mod coordinator;
pub mod processing_loop;
pub mod source;
mod state;

pub use coordinator::{PipelineCoordinator, ProcessOutcome};
pub use processing_loop::ProcessingLoop;
pub use source::{CsvSource, MqttSource, ReadingEvent, ReadingSource, StdinSource, VecSource};
pub use state::*;
