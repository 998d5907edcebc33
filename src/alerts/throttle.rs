//! Alert Throttler
//!
//! State machine deciding whether a merged verdict produces a notification.
//! The state advances on every decision, independent of whether delivery
//! later succeeds.

use chrono::{Duration, NaiveDateTime};
use serde::Serialize;

use crate::types::{self, RiskVerdict};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertDecision {
    /// Danger after a non-Danger status
    FirstAlert,
    /// Still Danger and the repeat interval has elapsed
    RepeatedAlert,
    /// Danger inside the repeat interval
    Suppressed,
    /// Not Danger
    NoAlert,
}

impl AlertDecision {
    pub const fn should_notify(self) -> bool {
        matches!(self, Self::FirstAlert | Self::RepeatedAlert)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AlertState {
    #[serde(serialize_with = "serialize_optional_timestamp")]
    pub last_alert_ts: Option<NaiveDateTime>,
    pub last_status: RiskVerdict,
}

fn serialize_optional_timestamp<S: serde::Serializer>(
    ts: &Option<NaiveDateTime>,
    s: S,
) -> Result<S::Ok, S::Error> {
    match ts {
        Some(ts) => s.serialize_str(&types::format_timestamp(ts)),
        None => s.serialize_none(),
    }
}

#[derive(Debug, Clone)]
pub struct AlertThrottler {
    interval: Duration,
    state: AlertState,
}

impl AlertThrottler {
    pub fn new(interval_min: u64) -> Self {
        let interval = i64::try_from(interval_min)
            .ok()
            .and_then(Duration::try_minutes)
            .unwrap_or(Duration::MAX);
        Self {
            interval,
            state: AlertState::default(),
        }
    }

    pub const fn state(&self) -> AlertState {
        self.state
    }

    /// Decide for `verdict` observed at `now` and advance the state.
    pub fn evaluate(&mut self, verdict: RiskVerdict, now: NaiveDateTime) -> AlertDecision {
        let previous = self.state.last_status;
        self.state.last_status = verdict;

        match verdict {
            RiskVerdict::Danger if previous != RiskVerdict::Danger => {
                self.state.last_alert_ts = Some(now);
                AlertDecision::FirstAlert
            }
            RiskVerdict::Danger => {
                let due = self
                    .state
                    .last_alert_ts
                    .map_or(true, |last| now - last >= self.interval);
                if due {
                    self.state.last_alert_ts = Some(now);
                    AlertDecision::RepeatedAlert
                } else {
                    AlertDecision::Suppressed
                }
            }
            RiskVerdict::Safe => {
                self.state.last_alert_ts = None;
                AlertDecision::NoAlert
            }
            RiskVerdict::Warning => AlertDecision::NoAlert,
        }
    }
}
