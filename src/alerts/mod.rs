//! Danger alerting
//!
//! - `throttle`: first / repeated / suppressed decisions over [`AlertState`]
//! - `notifier`: delivery collaborators (log, webhook)

pub mod notifier;
pub mod throttle;

pub use notifier::{
    build_notifier, AlertNotification, LogNotifier, Notifier, NotifyError, WebhookNotifier,
    ALERT_SUBJECT,
};
pub use throttle::{AlertDecision, AlertState, AlertThrottler};
