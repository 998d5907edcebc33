//! System-wide default constants.
//!
//! Centralises the reference values used when no config file overrides them.
//! Grouped by subsystem for easy discovery.

// ============================================================================
// Risk Thresholds (tilapia reference bands)
// ============================================================================

pub const TEMP_SAFE_MIN: f64 = 28.0;
pub const TEMP_SAFE_MAX: f64 = 32.0;
pub const TEMP_DANGER_MIN: f64 = 22.0;
pub const TEMP_DANGER_MAX: f64 = 37.0;

pub const PH_SAFE_MIN: f64 = 6.5;
pub const PH_SAFE_MAX: f64 = 8.5;
pub const PH_DANGER_MIN: f64 = 5.5;
pub const PH_DANGER_MAX: f64 = 9.5;

/// Dissolved oxygen floor for Safe (mg/L).
pub const DO_SAFE_MIN: f64 = 6.0;
/// Dissolved oxygen below this is Danger (mg/L).
pub const DO_DANGER_MIN: f64 = 2.0;

/// Turbidity ceiling for Safe (NTU).
pub const TURB_SAFE_MAX: f64 = 30.0;
/// Turbidity above this is Danger (NTU).
pub const TURB_DANGER_MAX: f64 = 50.0;

// ============================================================================
// Feature Reconstruction
// ============================================================================

/// Lag offsets (samples) the forecasting models were trained on.
pub const FEATURE_LAGS: [usize; 5] = [1, 3, 6, 12, 24];

/// Rolling mean/std windows (samples, current sample included).
pub const FEATURE_ROLLING_WINDOWS: [usize; 3] = [6, 12, 24];

/// History retention horizon (samples). 168 = one week of hourly readings.
pub const HISTORY_RETENTION: usize = 168;

/// Largest accepted `features.retention`. 10 080 = one week of one-minute readings.
pub const MAX_HISTORY_RETENTION: usize = 10_080;

/// Forecast horizon the models are trained for (hours).
pub const FORECAST_HORIZON_HOURS: u32 = 6;

/// Decimal places kept on forecast values.
pub const FORECAST_DECIMALS: u32 = 3;

// ============================================================================
// Alerts
// ============================================================================

/// Minimum interval between repeated Danger notifications (minutes).
pub const ALERT_INTERVAL_MIN: u64 = 10;

// ============================================================================
// Transport
// ============================================================================

pub const MQTT_BROKER: &str = "broker.hivemq.com";
pub const MQTT_PORT: u16 = 1883;
pub const MQTT_TOPIC: &str = "iot/tilapia/data";
pub const MQTT_CLIENT_ID: &str = "tilapia-gateway";
pub const MQTT_KEEP_ALIVE_SECS: u64 = 30;

/// Delay before reconnecting after an MQTT connection drop (seconds).
pub const MQTT_RECONNECT_DELAY_SECS: u64 = 2;

/// Capacity of the MQTT client request channel.
pub const MQTT_CHANNEL_CAPACITY: usize = 32;

// ============================================================================
// Storage / Artifacts / Server
// ============================================================================

pub const DATABASE_PATH: &str = "./data/sensor_logs.db";

/// Records older than this are pruned at startup (days).
pub const STORAGE_RETENTION_DAYS: u32 = 30;

/// Record cap of the `--no-persist` in-memory store. 10 080 = one week of
/// one-minute readings.
pub const MEMORY_STORE_MAX_RECORDS: usize = 10_080;

pub const MODELS_DIR: &str = "./models";

pub const SERVER_ADDR: &str = "0.0.0.0:8501";

/// Default / maximum page size for record listing endpoints.
pub const API_DEFAULT_LIMIT: usize = 100;
pub const API_MAX_LIMIT: usize = 1_000;

/// Progress line every N processed messages.
pub const PROGRESS_LOG_INTERVAL: u64 = 50;
