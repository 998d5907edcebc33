//! Reading processing loop shared across all input modes.
//!
//! source -> coordinator -> store -> notifier -> shared status, with
//! cancellation checked between readings.

use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use super::coordinator::ProcessOutcome;
use super::source::{ReadingEvent, ReadingSource};
use super::{GatewayStatus, PipelineCoordinator, PipelineStats, SystemStatus};
use crate::alerts::{AlertDecision, AlertNotification, Notifier};
use crate::config::defaults::PROGRESS_LOG_INTERVAL;
use crate::config::NotifierConfig;
use crate::storage::RecordStore;

/// Owns everything the ingestion loop needs.
///
/// Built with [`new()`](ProcessingLoop::new) and consumed by
/// [`run()`](ProcessingLoop::run).
pub struct ProcessingLoop {
    coordinator: PipelineCoordinator,
    status: Arc<RwLock<GatewayStatus>>,
    store: Arc<dyn RecordStore>,
    notifier: Arc<dyn Notifier>,
    notifier_config: NotifierConfig,
    cancel_token: CancellationToken,
    deliveries: TaskTracker,
}

impl ProcessingLoop {
    pub fn new(
        coordinator: PipelineCoordinator,
        status: Arc<RwLock<GatewayStatus>>,
        store: Arc<dyn RecordStore>,
        notifier: Arc<dyn Notifier>,
        notifier_config: NotifierConfig,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            coordinator,
            status,
            store,
            notifier,
            notifier_config,
            cancel_token,
            deliveries: TaskTracker::new(),
        }
    }

    /// Run until the source is exhausted or cancellation.
    ///
    /// Waits for in-flight notifications before returning the final
    /// statistics.
    pub async fn run<S: ReadingSource>(mut self, source: &mut S) -> PipelineStats {
        info!("📊 Processing readings from {}...", source.source_name());
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

        {
            let mut status = self.status.write().await;
            status.source = source.source_name().to_string();
            status.min_history = self.coordinator.min_history();
            status.status = SystemStatus::WarmingUp;
        }

        loop {
            let event = tokio::select! {
                _ = self.cancel_token.cancelled() => {
                    info!("[ProcessingLoop] Shutdown signal received");
                    break;
                }
                result = source.next_reading() => {
                    match result {
                        Ok(ev) => ev,
                        Err(e) => {
                            warn!("[ProcessingLoop] Source error: {:#}", e);
                            break;
                        }
                    }
                }
            };

            let incoming = match event {
                ReadingEvent::Reading(r) => r,
                ReadingEvent::Malformed(e) => {
                    warn!("[ProcessingLoop] Dropping malformed message: {}", e);
                    let mut status = self.status.write().await;
                    status.stats.messages_received += 1;
                    status.stats.parse_failures += 1;
                    continue;
                }
                ReadingEvent::Eof => {
                    info!(
                        "[ProcessingLoop] Source reached end ({} readings processed)",
                        self.coordinator.readings_processed()
                    );
                    break;
                }
            };

            let outcome = self.coordinator.process(incoming);
            let persisted = self.persist(&outcome);

            if outcome.decision.should_notify() {
                self.dispatch_alert(&outcome);
            }

            let stats = {
                let mut status = self.status.write().await;
                record_outcome(&mut status.stats, &outcome, persisted);
                status.history_len = self.coordinator.history_len();
                status.alert_state = self.coordinator.alert_state();
                status.status = if status.forecasting() {
                    SystemStatus::Monitoring
                } else {
                    SystemStatus::WarmingUp
                };
                status.latest_record = Some(outcome.record);
                status.stats
            };

            if stats.messages_received % PROGRESS_LOG_INTERVAL == 0 {
                info!(
                    "📈 Progress: {} messages | Persisted: {} | Forecasts: {} | Alerts: {} | History: {}/{}",
                    stats.messages_received,
                    stats.records_persisted,
                    stats.forecasts,
                    stats.alerts_sent,
                    self.coordinator.history_len(),
                    self.coordinator.min_history()
                );
            }
        }

        self.deliveries.close();
        self.deliveries.wait().await;

        let stats = {
            let mut status = self.status.write().await;
            status.status = SystemStatus::Stopped;
            status.stats
        };
        log_final_statistics(&stats, self.coordinator.history_len());
        stats
    }

    fn persist(&self, outcome: &ProcessOutcome) -> bool {
        match self.store.insert(&outcome.record) {
            Ok(id) => {
                debug!(id, "Saved record");
                true
            }
            Err(e) => {
                warn!("Failed to persist record: {}", e);
                false
            }
        }
    }

    /// Deliver on a detached task so a slow transport never holds up the
    /// next reading.
    fn dispatch_alert(&self, outcome: &ProcessOutcome) {
        let notification = AlertNotification::new(
            &outcome.record,
            outcome.decision,
            self.notifier_config.recipient.clone(),
            self.notifier_config.dashboard_url.as_deref(),
        );
        let notifier = Arc::clone(&self.notifier);
        let status = Arc::clone(&self.status);
        self.deliveries.spawn(async move {
            if let Err(e) = notifier.notify(&notification).await {
                warn!(notifier = notifier.name(), "Alert delivery failed: {}", e);
                status.write().await.stats.notify_failures += 1;
            }
        });
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn record_outcome(stats: &mut PipelineStats, outcome: &ProcessOutcome, persisted: bool) {
    stats.messages_received += 1;
    if persisted {
        stats.records_persisted += 1;
    } else {
        stats.persist_failures += 1;
    }
    if outcome.forecast_ready() {
        stats.forecasts += 1;
    } else if outcome.forecast.is_some() {
        stats.insufficient_history += 1;
    }
    if outcome.out_of_order() {
        stats.out_of_order += 1;
    }
    if outcome.demo_mode {
        stats.demo_mode_messages += 1;
    }
    match outcome.decision {
        AlertDecision::FirstAlert | AlertDecision::RepeatedAlert => stats.alerts_sent += 1,
        AlertDecision::Suppressed => stats.alerts_suppressed += 1,
        AlertDecision::NoAlert => {}
    }
}

fn log_final_statistics(stats: &PipelineStats, history_len: usize) {
    info!("");
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("📊 FINAL STATISTICS");
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("   Messages Received:    {}", stats.messages_received);
    info!("   Parse Failures:       {}", stats.parse_failures);
    info!("   Records Persisted:    {}", stats.records_persisted);
    info!("   Persist Failures:     {}", stats.persist_failures);
    info!("   Forecasts:            {}", stats.forecasts);
    info!("   Out-of-order:         {}", stats.out_of_order);
    info!("   Alerts Sent:          {}", stats.alerts_sent);
    info!("   Alerts Suppressed:    {}", stats.alerts_suppressed);
    info!("   Delivery Failures:    {}", stats.notify_failures);
    info!("   History Size:         {}", history_len);
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
}
