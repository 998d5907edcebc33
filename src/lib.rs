//! Tilapia Gateway: water-quality ingestion for aquaculture ponds
//!
//! Receives sensor readings, classifies risk against configured bands,
//! forecasts each channel 6 hours ahead from a rolling history, merges the
//! two verdicts, throttles Danger alerts and persists every enriched record.
//!
//! ## Architecture
//!
//! - **acquisition**: MQTT transport and message validation
//! - **ml_engine**: history window, feature reconstruction, forecast engine
//! - **risk**: threshold classifier and escalating merge
//! - **alerts**: throttle state machine and notifiers
//! - **storage**: record store backends and CSV export
//! - **pipeline**: coordinator, sources and the async processing loop
//! - **api**: read-only HTTP status and record queries

pub mod acquisition;
pub mod alerts;
pub mod api;
pub mod config;
pub mod ml_engine;
pub mod pipeline;
pub mod risk;
pub mod storage;
pub mod types;

// Re-export configuration
pub use config::GatewayConfig;

// Re-export commonly used types
pub use types::{Channel, ChannelValues, EnrichedRecord, RawReading, RiskVerdict};

// Re-export pipeline components
pub use pipeline::{GatewayStatus, PipelineCoordinator, PipelineStats, ProcessingLoop};
