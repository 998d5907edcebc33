//! Alert delivery
//!
//! Best-effort: delivery failures are reported to the caller for logging and
//! never feed back into the throttle state.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use super::throttle::AlertDecision;
use crate::config::NotifierConfig;
use crate::types::{self, EnrichedRecord};

pub const ALERT_SUBJECT: &str = "DANGER ALERT - Tilapia water quality";

const WEBHOOK_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("webhook returned status {0}")]
    Status(reqwest::StatusCode),
}

/// One Danger notification.
#[derive(Debug, Clone, Serialize)]
pub struct AlertNotification {
    pub subject: String,
    pub body: String,
    pub decision: AlertDecision,
    pub record: EnrichedRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,
}

impl AlertNotification {
    pub fn new(
        record: &EnrichedRecord,
        decision: AlertDecision,
        recipient: Option<String>,
        dashboard_url: Option<&str>,
    ) -> Self {
        Self {
            subject: ALERT_SUBJECT.to_string(),
            body: render_body(record, dashboard_url),
            decision,
            record: record.clone(),
            recipient,
        }
    }
}

fn render_body(record: &EnrichedRecord, dashboard_url: Option<&str>) -> String {
    let forecast_risk = record
        .pred_risk
        .map_or_else(|| "n/a (insufficient history)".to_string(), |r| r.to_string());
    let mut body = format!(
        "DANGER condition detected.\n\n\
         Time: {}\n\
         Final status: {}\n\n\
         Current sensor readings:\n  \
         - Temperature: {:.2} °C\n  \
         - pH: {:.2}\n  \
         - Dissolved oxygen: {:.2} mg/L\n  \
         - Turbidity: {:.2} NTU\n  \
         - Sensor risk: {}\n  \
         - Forecast risk: {}\n\n\
         Recommended actions:\n  \
         1. Check aeration equipment (low dissolved oxygen)\n  \
         2. Check pH and adjust if needed\n  \
         3. Check water temperature\n",
        types::format_timestamp(&record.timestamp),
        record.status,
        record.temp,
        record.ph,
        record.dissolved_oxygen,
        record.turbidity,
        record.sensor_risk,
        forecast_risk,
    );
    if let Some(url) = dashboard_url {
        body.push_str(&format!("  4. Review the dashboard: {url}\n"));
    }
    body
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &AlertNotification) -> Result<(), NotifyError>;

    fn name(&self) -> &'static str;
}

// ============================================================================
// Log Notifier
// ============================================================================

/// Writes alerts to the log. Always available.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: &AlertNotification) -> Result<(), NotifyError> {
        warn!(
            subject = %notification.subject,
            decision = ?notification.decision,
            timestamp = %types::format_timestamp(&notification.record.timestamp),
            status = %notification.record.status,
            "ALERT"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

// ============================================================================
// Webhook Notifier
// ============================================================================

/// POSTs the notification as JSON.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    http: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: &str) -> Result<Self, NotifyError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(WEBHOOK_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            http,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, notification: &AlertNotification) -> Result<(), NotifyError> {
        let resp = self.http.post(&self.url).json(notification).send().await?;
        if !resp.status().is_success() {
            return Err(NotifyError::Status(resp.status()));
        }
        info!(url = %self.url, "Alert delivered to webhook");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "webhook"
    }
}

/// Webhook when configured, otherwise log-only.
pub fn build_notifier(config: &NotifierConfig) -> Result<Arc<dyn Notifier>, NotifyError> {
    match config.webhook_url.as_deref() {
        Some(url) => Ok(Arc::new(WebhookNotifier::new(url)?)),
        None => Ok(Arc::new(LogNotifier)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{parse_timestamp, RawReading, RiskVerdict};

    fn danger_record() -> EnrichedRecord {
        let reading = RawReading {
            timestamp: parse_timestamp("2025-02-01 03:00:00").unwrap(),
            temperature: 30.0,
            ph: 7.0,
            dissolved_oxygen: 1.2,
            turbidity: 12.0,
        };
        EnrichedRecord::new(&reading, None, RiskVerdict::Danger, None, RiskVerdict::Danger)
    }

    #[test]
    fn body_lists_readings_and_status() {
        let n = AlertNotification::new(
            &danger_record(),
            AlertDecision::FirstAlert,
            Some("ops@example.com".to_string()),
            Some("http://localhost:8501"),
        );
        assert_eq!(n.subject, ALERT_SUBJECT);
        assert!(n.body.contains("2025-02-01 03:00:00"));
        assert!(n.body.contains("Dissolved oxygen: 1.20 mg/L"));
        assert!(n.body.contains("Final status: Danger"));
        assert!(n.body.contains("insufficient history"));
        assert!(n.body.contains("http://localhost:8501"));
    }

    #[test]
    fn payload_serializes_decision() {
        let n = AlertNotification::new(&danger_record(), AlertDecision::RepeatedAlert, None, None);
        let json = serde_json::to_value(&n).unwrap();
        assert_eq!(json["decision"], "repeated_alert");
        assert_eq!(json["record"]["do"], 1.2);
        assert!(json.get("recipient").is_none());
    }

    #[tokio::test]
    async fn log_notifier_always_succeeds() {
        let n = AlertNotification::new(&danger_record(), AlertDecision::FirstAlert, None, None);
        assert!(LogNotifier.notify(&n).await.is_ok());
    }

    #[test]
    fn builds_log_notifier_without_webhook() {
        let notifier = build_notifier(&NotifierConfig::default()).unwrap();
        assert_eq!(notifier.name(), "log");
    }
}
