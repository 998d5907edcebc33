//! Gateway Configuration - thresholds, feature schema, transport and storage
//! settings as operator-tunable TOML values.
//!
//! Each struct implements `Default` with the reference values from
//! [`super::defaults`], so a deployment without a config file behaves exactly
//! like the reference gateway.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::defaults;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "TILAPIA_CONFIG";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "gateway_config.toml";

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config I/O error ({}): {1}", .0.display())]
    Io(PathBuf, #[source] std::io::Error),

    #[error("config parse error ({}): {1}", .0.display())]
    Parse(PathBuf, #[source] toml::de::Error),

    #[error("config serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("config validation failed:\n  - {}", .0.join("\n  - "))]
    Validation(Vec<String>),
}

// ============================================================================
// Top-Level Config
// ============================================================================

/// Where the active configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    Defaults,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File(p) => write!(f, "{}", p.display()),
            Self::Defaults => write!(f, "built-in defaults"),
        }
    }
}

/// Root configuration for one pond deployment.
///
/// Load with [`GatewayConfig::load`] which searches:
/// 1. `$TILAPIA_CONFIG`
/// 2. `./gateway_config.toml`
/// 3. Built-in defaults
///
/// Environment overrides (see [`GatewayConfig::apply_overrides`]) are applied
/// on top of whichever source won.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub deployment: DeploymentInfo,

    /// Risk classification bands
    #[serde(default)]
    pub thresholds: ThresholdConfig,

    /// Lag / rolling feature layout and history retention
    #[serde(default)]
    pub features: FeatureConfig,

    #[serde(default)]
    pub alerts: AlertConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,

    #[serde(default)]
    pub mqtt: MqttConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    /// Trained artifact bundle location
    #[serde(default)]
    pub models: ModelConfig,

    #[serde(default)]
    pub notifier: NotifierConfig,

    /// Read API
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl GatewayConfig {
    /// Load configuration using the standard search order, then apply
    /// environment overrides and validate.
    ///
    /// A missing file falls through to the next source; a file that exists
    /// but fails to parse or validate is an error.
    pub fn load() -> Result<(Self, ConfigSource), ConfigError> {
        let (mut config, source) = if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                (Self::load_from_file(&p)?, ConfigSource::File(p))
            } else {
                warn!(path = %path, "{} points to non-existent file, falling back", CONFIG_ENV_VAR);
                Self::load_local()?
            }
        } else {
            Self::load_local()?
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        info!(source = %source, deployment = %config.deployment.name, "Gateway configuration loaded");
        Ok((config, source))
    }

    /// Load an explicitly named file (`--config`), then apply environment
    /// overrides and validate. A missing file is an error here.
    pub fn load_path(path: &Path) -> Result<(Self, ConfigSource), ConfigError> {
        let mut config = Self::load_from_file(path)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        info!(source = %path.display(), deployment = %config.deployment.name, "Gateway configuration loaded");
        Ok((config, ConfigSource::File(path.to_path_buf())))
    }

    fn load_local() -> Result<(Self, ConfigSource), ConfigError> {
        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            let config = Self::load_from_file(&local)?;
            return Ok((config, ConfigSource::File(local)));
        }
        info!("No {} found, using built-in defaults", LOCAL_CONFIG_FILE);
        Ok((Self::default(), ConfigSource::Defaults))
    }

    /// Load from a specific TOML file path.
    ///
    /// Unknown keys are reported as warnings and never fail the load.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Parse(_, inner) => ConfigError::Parse(path.to_path_buf(), inner),
            other => other,
        })
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        for w in super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }
        let config: Self =
            toml::from_str(contents).map_err(|e| ConfigError::Parse(PathBuf::new(), e))?;
        config.validate()?;
        for w in super::validation::validate_physical_ranges(&config).1 {
            warn!("{}", w);
        }
        Ok(config)
    }

    /// Serialize to TOML (for `check-config` output and templates).
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Apply environment-style overrides through `lookup`.
    ///
    /// Variable names follow the gateway's `.env` convention. Values that
    /// fail to parse are logged and ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        fn parse<T: std::str::FromStr>(
            lookup: &dyn Fn(&str) -> Option<String>,
            key: &str,
        ) -> Option<T> {
            let raw = lookup(key)?;
            match raw.trim().parse::<T>() {
                Ok(v) => Some(v),
                Err(_) => {
                    warn!(key, value = %raw, "Ignoring unparseable environment override");
                    None
                }
            }
        }

        let lookup: &dyn Fn(&str) -> Option<String> = &lookup;
        let t = &mut self.thresholds;
        let float_overrides: [(&str, &mut f64); 12] = [
            ("TEMP_MIN_SAFE", &mut t.temp_safe_min),
            ("TEMP_MAX_SAFE", &mut t.temp_safe_max),
            ("TEMP_MIN_DANGER", &mut t.temp_danger_min),
            ("TEMP_MAX_DANGER", &mut t.temp_danger_max),
            ("PH_MIN_SAFE", &mut t.ph_safe_min),
            ("PH_MAX_SAFE", &mut t.ph_safe_max),
            ("PH_MIN_DANGER", &mut t.ph_danger_min),
            ("PH_MAX_DANGER", &mut t.ph_danger_max),
            ("DO_MIN_SAFE", &mut t.do_safe_min),
            ("DO_MIN_DANGER", &mut t.do_danger_min),
            ("TURB_MAX_SAFE", &mut t.turb_safe_max),
            ("TURB_MAX_WARNING", &mut t.turb_danger_max),
        ];
        for (key, slot) in float_overrides {
            if let Some(v) = parse::<f64>(lookup, key) {
                *slot = v;
            }
        }

        if let Some(v) = lookup("MQTT_BROKER") {
            self.mqtt.broker = v;
        }
        if let Some(v) = parse::<u16>(lookup, "MQTT_PORT") {
            self.mqtt.port = v;
        }
        if let Some(v) = lookup("MQTT_TOPIC") {
            self.mqtt.topic = v;
        }
        if let Some(v) = lookup("DATABASE_PATH") {
            self.storage.path = PathBuf::from(v);
        }
        if let Some(v) = lookup("MODELS_DIR") {
            self.models.dir = PathBuf::from(v);
        }
        if let Some(v) = parse::<u64>(lookup, "ALERT_INTERVAL_MIN") {
            self.alerts.interval_min = v;
        }
        if let Some(v) = lookup("ALERT_WEBHOOK_URL").filter(|v| !v.is_empty()) {
            self.notifier.webhook_url = Some(v);
        }
        if let Some(v) = lookup("EMAIL_RECEIVER").filter(|v| !v.is_empty()) {
            self.notifier.recipient = Some(v);
        }
    }

    /// Validate thresholds and feature layout for internal consistency.
    ///
    /// Rules:
    /// - Every safe band sits inside its danger band
    /// - Lags are non-empty and non-zero, rolling windows are >= 2
    /// - Retention covers the minimum feature history
    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.thresholds;
        let mut errors: Vec<String> = Vec::new();

        Self::check_band(
            "temp",
            t.temp_danger_min,
            t.temp_safe_min,
            t.temp_safe_max,
            t.temp_danger_max,
            &mut errors,
        );
        Self::check_band(
            "ph",
            t.ph_danger_min,
            t.ph_safe_min,
            t.ph_safe_max,
            t.ph_danger_max,
            &mut errors,
        );
        if t.do_danger_min > t.do_safe_min {
            errors.push(format!(
                "thresholds.do_danger_min ({:.2}) must not exceed do_safe_min ({:.2})",
                t.do_danger_min, t.do_safe_min
            ));
        }
        if t.turb_safe_max > t.turb_danger_max {
            errors.push(format!(
                "thresholds.turb_safe_max ({:.2}) must not exceed turb_danger_max ({:.2})",
                t.turb_safe_max, t.turb_danger_max
            ));
        }

        let f = &self.features;
        if f.lags.is_empty() {
            errors.push("features.lags must not be empty".to_string());
        }
        if f.lags.contains(&0) {
            errors.push("features.lags must not contain 0".to_string());
        }
        if f.rolling_windows.is_empty() {
            errors.push("features.rolling_windows must not be empty".to_string());
        }
        if let Some(w) = f.rolling_windows.iter().find(|w| **w < 2) {
            errors.push(format!(
                "features.rolling_windows contains {w}; windows must be >= 2 for a sample std"
            ));
        }
        if f.retention < f.min_history() {
            errors.push(format!(
                "features.retention ({}) must be at least the minimum feature history ({})",
                f.retention,
                f.min_history()
            ));
        }

        if f.retention > defaults::MAX_HISTORY_RETENTION {
            errors.push(format!(
                "features.retention ({}) exceeds the maximum of {} samples",
                f.retention,
                defaults::MAX_HISTORY_RETENTION
            ));
        }
        if self.storage.memory_max_records == 0 {
            errors.push("storage.memory_max_records must be at least 1".to_string());
        }

        let (range_errors, _) = super::validation::validate_physical_ranges(self);
        errors.extend(range_errors);

        if self.mqtt.topic.trim().is_empty() {
            errors.push("mqtt.topic must not be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Check `danger_min <= safe_min <= safe_max <= danger_max`.
    fn check_band(
        name: &str,
        danger_min: f64,
        safe_min: f64,
        safe_max: f64,
        danger_max: f64,
        errors: &mut Vec<String>,
    ) {
        if !(danger_min <= safe_min && safe_min <= safe_max && safe_max <= danger_max) {
            errors.push(format!(
                "thresholds.{name}: expected {name}_danger_min ({danger_min:.2}) <= {name}_safe_min ({safe_min:.2}) \
                 <= {name}_safe_max ({safe_max:.2}) <= {name}_danger_max ({danger_max:.2})"
            ));
        }
    }

    /// Key/value summary for startup logs and `check-config`, secrets masked.
    pub fn summary(&self) -> Vec<(&'static str, String)> {
        vec![
            ("deployment", self.deployment.name.clone()),
            (
                "pond",
                if self.deployment.pond.is_empty() { "NOT_SET".to_string() } else { self.deployment.pond.clone() },
            ),
            ("mqtt_broker", self.mqtt.broker.clone()),
            ("mqtt_port", self.mqtt.port.to_string()),
            ("mqtt_topic", self.mqtt.topic.clone()),
            (
                "mqtt_password",
                if self.mqtt.password.is_some() { "***" } else { "NOT_SET" }.to_string(),
            ),
            ("database", self.storage.path.display().to_string()),
            ("models_dir", self.models.dir.display().to_string()),
            ("alert_interval_min", self.alerts.interval_min.to_string()),
            (
                "alert_webhook",
                if self.notifier.webhook_url.is_some() { "***" } else { "NOT_SET" }.to_string(),
            ),
            ("server", if self.server.enabled { self.server.addr.clone() } else { "disabled".to_string() }),
        ]
    }
}

// ============================================================================
// Deployment
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentInfo {
    #[serde(default = "default_deployment_name")]
    pub name: String,
    #[serde(default)]
    pub pond: String,
}

fn default_deployment_name() -> String {
    "tilapia-pond".to_string()
}

impl Default for DeploymentInfo {
    fn default() -> Self {
        Self {
            name: default_deployment_name(),
            pond: String::new(),
        }
    }
}

// ============================================================================
// Thresholds
// ============================================================================

/// Risk classification bands. A reading is Danger when any value leaves its
/// danger band, Safe when every value sits in its safe band, Warning otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    /// °C
    pub temp_safe_min: f64,
    pub temp_safe_max: f64,
    pub temp_danger_min: f64,
    pub temp_danger_max: f64,
    pub ph_safe_min: f64,
    pub ph_safe_max: f64,
    pub ph_danger_min: f64,
    pub ph_danger_max: f64,
    /// mg/L
    pub do_safe_min: f64,
    pub do_danger_min: f64,
    /// NTU
    pub turb_safe_max: f64,
    pub turb_danger_max: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            temp_safe_min: defaults::TEMP_SAFE_MIN,
            temp_safe_max: defaults::TEMP_SAFE_MAX,
            temp_danger_min: defaults::TEMP_DANGER_MIN,
            temp_danger_max: defaults::TEMP_DANGER_MAX,
            ph_safe_min: defaults::PH_SAFE_MIN,
            ph_safe_max: defaults::PH_SAFE_MAX,
            ph_danger_min: defaults::PH_DANGER_MIN,
            ph_danger_max: defaults::PH_DANGER_MAX,
            do_safe_min: defaults::DO_SAFE_MIN,
            do_danger_min: defaults::DO_DANGER_MIN,
            turb_safe_max: defaults::TURB_SAFE_MAX,
            turb_danger_max: defaults::TURB_DANGER_MAX,
        }
    }
}

// ============================================================================
// Features
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Lag offsets in samples
    pub lags: Vec<usize>,
    /// Rolling mean/std windows in samples (current sample included)
    pub rolling_windows: Vec<usize>,
    /// Maximum samples kept in the history window
    pub retention: usize,
}

impl FeatureConfig {
    /// Samples needed before every lag and rolling feature is defined:
    /// `max(max_lag + 1, max_window)`.
    pub fn min_history(&self) -> usize {
        let lag = self.lags.iter().max().map_or(0, |l| l + 1);
        let window = self.rolling_windows.iter().copied().max().unwrap_or(0);
        lag.max(window)
    }
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            lags: defaults::FEATURE_LAGS.to_vec(),
            rolling_windows: defaults::FEATURE_ROLLING_WINDOWS.to_vec(),
            retention: defaults::HISTORY_RETENTION,
        }
    }
}

// ============================================================================
// Alerts / Pipeline
// ============================================================================

/// Time source used by the alert throttler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertClock {
    /// Wall-clock time at processing (live deployments)
    #[default]
    Wall,
    /// The reading's own timestamp (replays)
    Reading,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Minimum minutes between repeated Danger notifications
    pub interval_min: u64,
    pub clock: AlertClock,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            interval_min: defaults::ALERT_INTERVAL_MIN,
            clock: AlertClock::Wall,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Honour the per-message `demo_mode` flag
    pub honor_demo_mode: bool,
    pub forecast_decimals: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            honor_demo_mode: true,
            forecast_decimals: defaults::FORECAST_DECIMALS,
        }
    }
}

// ============================================================================
// Transport / Storage / Models / Notifier / Server / Logging
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    pub broker: String,
    pub port: u16,
    pub topic: String,
    pub client_id: String,
    pub keep_alive_secs: u64,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            broker: defaults::MQTT_BROKER.to_string(),
            port: defaults::MQTT_PORT,
            topic: defaults::MQTT_TOPIC.to_string(),
            client_id: defaults::MQTT_CLIENT_ID.to_string(),
            keep_alive_secs: defaults::MQTT_KEEP_ALIVE_SECS,
            username: None,
            password: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub path: PathBuf,
    pub retention_days: u32,
    /// Record cap when running with `--no-persist`
    pub memory_max_records: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(defaults::DATABASE_PATH),
            retention_days: defaults::STORAGE_RETENTION_DAYS,
            memory_max_records: defaults::MEMORY_STORE_MAX_RECORDS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub dir: PathBuf,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(defaults::MODELS_DIR),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifierConfig {
    /// JSON webhook receiving Danger alerts; log-only when unset
    pub webhook_url: Option<String>,
    /// Recipient address forwarded in the alert payload
    pub recipient: Option<String>,
    /// Link included in alert bodies
    pub dashboard_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub enabled: bool,
    pub addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            addr: defaults::SERVER_ADDR.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Emit JSON log lines instead of the human-readable format
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(GatewayConfig::default().validate().is_ok());
    }

    #[test]
    fn min_history_covers_longest_lag() {
        let f = FeatureConfig::default();
        assert_eq!(f.min_history(), 25);

        let f = FeatureConfig {
            lags: vec![1, 2],
            rolling_windows: vec![6],
            retention: 10,
        };
        assert_eq!(f.min_history(), 6);
    }

    #[test]
    fn inverted_band_is_rejected() {
        let mut config = GatewayConfig::default();
        config.thresholds.ph_safe_min = 5.0; // below ph_danger_min
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("thresholds.ph"));
    }

    #[test]
    fn retention_below_min_history_is_rejected() {
        let mut config = GatewayConfig::default();
        config.features.retention = 10;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let config = GatewayConfig::from_toml_str(
            r#"
[thresholds]
do_danger_min = 3.0

[alerts]
clock = "reading"
"#,
        )
        .unwrap();
        assert!((config.thresholds.do_danger_min - 3.0).abs() < f64::EPSILON);
        assert!((config.thresholds.do_safe_min - defaults::DO_SAFE_MIN).abs() < f64::EPSILON);
        assert_eq!(config.alerts.clock, AlertClock::Reading);
        assert_eq!(config.alerts.interval_min, defaults::ALERT_INTERVAL_MIN);
    }
}
