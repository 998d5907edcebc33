//! Gateway State and Status
//!
//! Shared view of the ingestion pipeline for the read API and shutdown
//! reporting. Wrapped in `Arc<RwLock<>>`; the processing loop is the only
//! writer apart from the detached notification tasks.

use serde::Serialize;
use std::time::Instant;

use crate::alerts::AlertState;
use crate::types::EnrichedRecord;

// ============================================================================
// Counters
// ============================================================================

/// Running totals for one gateway session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PipelineStats {
    /// Payloads handed to the pipeline by the source, valid or not
    pub messages_received: u64,
    /// Payloads dropped at the transport boundary
    pub parse_failures: u64,
    pub records_persisted: u64,
    pub persist_failures: u64,
    /// Readings that produced a full forecast
    pub forecasts: u64,
    pub insufficient_history: u64,
    /// Readings older than the newest history entry
    pub out_of_order: u64,
    pub demo_mode_messages: u64,
    /// Notifications handed to the notifier (first + repeated)
    pub alerts_sent: u64,
    pub alerts_suppressed: u64,
    /// Notifications the transport failed to deliver
    pub notify_failures: u64,
}

impl std::fmt::Display for PipelineStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Pipeline: {} messages ({} rejected), {} persisted, {} forecasts, {} alerts ({} suppressed)",
            self.messages_received,
            self.parse_failures,
            self.records_persisted,
            self.forecasts,
            self.alerts_sent,
            self.alerts_suppressed
        )
    }
}

// ============================================================================
// Gateway Status
// ============================================================================

/// Shared status accessible from API handlers and the processing loop.
#[derive(Debug, Clone, Serialize)]
pub struct GatewayStatus {
    pub deployment: String,

    pub status: SystemStatus,

    /// Active transport ("MQTT", "stdin", "CSV")
    pub source: String,

    /// Session start (serializes as seconds of uptime)
    #[serde(skip)]
    pub started_at: Instant,

    pub stats: PipelineStats,

    /// Readings currently held in the rolling history
    pub history_len: usize,

    /// Readings needed before forecasts start
    pub min_history: usize,

    pub latest_record: Option<EnrichedRecord>,

    pub alert_state: AlertState,
}

impl Default for GatewayStatus {
    fn default() -> Self {
        Self {
            deployment: String::new(),
            status: SystemStatus::Initializing,
            source: String::new(),
            started_at: Instant::now(),
            stats: PipelineStats::default(),
            history_len: 0,
            min_history: 0,
            latest_record: None,
            alert_state: AlertState::default(),
        }
    }
}

impl GatewayStatus {
    pub fn new(deployment: impl Into<String>, min_history: usize) -> Self {
        Self {
            deployment: deployment.into(),
            min_history,
            ..Self::default()
        }
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    /// True once the history is long enough for forecasts.
    pub const fn forecasting(&self) -> bool {
        self.min_history > 0 && self.history_len >= self.min_history
    }
}

/// Gateway operational status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SystemStatus {
    /// Artifacts loading, store opening
    Initializing,
    /// Receiving readings, history still too short to forecast
    WarmingUp,
    /// Receiving readings with forecasts
    Monitoring,
    /// Source exhausted or shutdown requested
    Stopped,
}

impl std::fmt::Display for SystemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SystemStatus::Initializing => write!(f, "Initializing"),
            SystemStatus::WarmingUp => write!(f, "WarmingUp"),
            SystemStatus::Monitoring => write!(f, "Monitoring"),
            SystemStatus::Stopped => write!(f, "Stopped"),
        }
    }
}
