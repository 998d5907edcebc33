//! Config validation: unknown-key detection with Levenshtein suggestions
//! and physical range checks on thresholds.
//!
//! The raw TOML is first parsed into `toml::Value` and its key tree compared
//! against the known field names. Unknown keys only produce warnings, so a
//! typo never stops a pond gateway from starting with its other settings.

use std::collections::HashSet;

/// A non-fatal config warning (typo, suspicious value).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, " (did you mean '{s}'?)")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

/// Every valid dotted key path of [`super::GatewayConfig`].
///
/// Kept in step with the struct hierarchy in `gateway_config.rs`.
pub fn known_config_keys() -> HashSet<&'static str> {
    let keys: &[&str] = &[
        "deployment",
        "deployment.name",
        "deployment.pond",
        "thresholds",
        "thresholds.temp_safe_min",
        "thresholds.temp_safe_max",
        "thresholds.temp_danger_min",
        "thresholds.temp_danger_max",
        "thresholds.ph_safe_min",
        "thresholds.ph_safe_max",
        "thresholds.ph_danger_min",
        "thresholds.ph_danger_max",
        "thresholds.do_safe_min",
        "thresholds.do_danger_min",
        "thresholds.turb_safe_max",
        "thresholds.turb_danger_max",
        "features",
        "features.lags",
        "features.rolling_windows",
        "features.retention",
        "alerts",
        "alerts.interval_min",
        "alerts.clock",
        "pipeline",
        "pipeline.honor_demo_mode",
        "pipeline.forecast_decimals",
        "mqtt",
        "mqtt.broker",
        "mqtt.port",
        "mqtt.topic",
        "mqtt.client_id",
        "mqtt.keep_alive_secs",
        "mqtt.username",
        "mqtt.password",
        "storage",
        "storage.path",
        "storage.retention_days",
        "storage.memory_max_records",
        "models",
        "models.dir",
        "notifier",
        "notifier.webhook_url",
        "notifier.recipient",
        "notifier.dashboard_url",
        "server",
        "server.enabled",
        "server.addr",
        "logging",
        "logging.json",
    ];
    keys.iter().copied().collect()
}

// ============================================================================
// TOML Key Walking
// ============================================================================

/// Recursively collect dotted key paths from a `toml::Value` tree.
///
/// `{ a = { b = 1, c = 2 } }` yields `["a", "a.b", "a.c"]`.
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            keys.push(path.clone());
            if v.is_table() {
                keys.extend(walk_toml_keys(v, &path));
            }
        }
    }
    keys
}

// ============================================================================
// Levenshtein Distance
// ============================================================================

fn levenshtein(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0; b_chars.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_chars.len()]
}

/// Closest known key within edit distance 3, if any.
pub fn suggest_correction(unknown: &str, known: &HashSet<&str>) -> Option<String> {
    known
        .iter()
        .map(|k| (*k, levenshtein(unknown, k)))
        .filter(|(_, d)| *d <= 3)
        .min_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)))
        .map(|(k, _)| k.to_string())
}

/// Warnings for every unknown key in a raw TOML document.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let Ok(value) = raw_toml.parse::<toml::Value>() else {
        return Vec::new(); // parse errors surface from serde
    };

    let known = known_config_keys();
    walk_toml_keys(&value, "")
        .into_iter()
        .filter(|key| !known.contains(key.as_str()))
        .map(|key| ValidationWarning {
            suggestion: suggest_correction(&key, &known),
            message: format!("Unknown config key '{key}'"),
            field: key,
        })
        .collect()
}

// ============================================================================
// Physical Range Validation
// ============================================================================

/// Physical plausibility of the threshold values.
///
/// Returns `(errors, warnings)`: errors are impossible values that must
/// prevent startup, warnings are legal but unusual for tilapia culture.
pub fn validate_physical_ranges(config: &super::GatewayConfig) -> (Vec<String>, Vec<ValidationWarning>) {
    let t = &config.thresholds;
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    for (name, v) in [
        ("ph_safe_min", t.ph_safe_min),
        ("ph_safe_max", t.ph_safe_max),
        ("ph_danger_min", t.ph_danger_min),
        ("ph_danger_max", t.ph_danger_max),
    ] {
        if !(0.0..=14.0).contains(&v) {
            errors.push(format!("thresholds.{name} = {v:.2} is outside the pH scale (0-14)"));
        }
    }

    for (name, v) in [
        ("do_safe_min", t.do_safe_min),
        ("do_danger_min", t.do_danger_min),
        ("turb_safe_max", t.turb_safe_max),
        ("turb_danger_max", t.turb_danger_max),
    ] {
        if v < 0.0 {
            errors.push(format!("thresholds.{name} = {v:.2} cannot be negative"));
        }
    }

    if t.temp_danger_min < 0.0 || t.temp_danger_max > 45.0 {
        warnings.push(ValidationWarning {
            field: "thresholds.temp_danger_*".to_string(),
            message: format!(
                "temperature danger band {:.1}-{:.1} °C is outside the survivable range for tilapia",
                t.temp_danger_min, t.temp_danger_max
            ),
            suggestion: None,
        });
    }

    if config.alerts.interval_min == 0 {
        warnings.push(ValidationWarning {
            field: "alerts.interval_min".to_string(),
            message: "alerts.interval_min = 0 sends a notification for every Danger reading"
                .to_string(),
            suggestion: None,
        });
    }

    (errors, warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GatewayConfig;

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein("retention", "retention"), 0);
        assert_eq!(levenshtein("retension", "retention"), 1);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("abc", ""), 3);
    }

    #[test]
    fn test_walk_toml_keys_nested() {
        let toml: toml::Value = r#"
            [alerts]
            interval_min = 5
        "#
        .parse()
        .unwrap();
        let keys = walk_toml_keys(&toml, "");
        assert!(keys.contains(&"alerts".to_string()));
        assert!(keys.contains(&"alerts.interval_min".to_string()));
    }

    #[test]
    fn test_typo_key_produces_warning_with_suggestion() {
        let warnings = validate_unknown_keys(
            r#"
[thresholds]
do_danger_mn = 2.5
"#,
        );
        assert_eq!(warnings.len(), 1);
        assert_eq!(
            warnings[0].suggestion.as_deref(),
            Some("thresholds.do_danger_min")
        );
    }

    #[test]
    fn test_valid_keys_produce_no_warnings() {
        let warnings = validate_unknown_keys(
            r#"
[deployment]
name = "pond-3"

[features]
lags = [1, 2]
rolling_windows = [6]

[mqtt]
broker = "localhost"
"#,
        );
        assert!(warnings.is_empty(), "unexpected warnings: {warnings:?}");
    }

    #[test]
    fn test_garbage_key_has_no_suggestion() {
        let known = known_config_keys();
        assert!(suggest_correction("completely_unrelated_garbage_key_xyz", &known).is_none());
    }

    #[test]
    fn test_defaults_are_physically_clean() {
        let (errors, warnings) = validate_physical_ranges(&GatewayConfig::default());
        assert!(errors.is_empty(), "{errors:?}");
        assert!(warnings.is_empty(), "{warnings:?}");
    }

    #[test]
    fn test_ph_outside_scale_is_error() {
        let mut config = GatewayConfig::default();
        config.thresholds.ph_danger_max = 15.0;
        let (errors, _) = validate_physical_ranges(&config);
        assert!(errors.iter().any(|e| e.contains("ph_danger_max")));
    }
}
