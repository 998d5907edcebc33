//! Shared fixtures: a synthetic artifact bundle written to a temp directory.

#![allow(dead_code)]

use serde_json::json;
use std::path::Path;

pub const TARGETS: [&str; 4] = ["Temperature", "pH", "Dissolved_Oxygen", "Turbidity"];

/// Feature columns of the synthetic bundle: the 1h lag of every channel.
pub fn lag1_columns() -> Vec<String> {
    TARGETS.iter().map(|t| format!("{t}_lag1h")).collect()
}

pub fn write_json(dir: &Path, name: &str, value: &serde_json::Value) {
    std::fs::write(dir.join(name), serde_json::to_vec_pretty(value).unwrap()).unwrap();
}

/// Write a linear bundle where each target forecasts its own previous
/// reading plus `offsets[i]`. Identity scalers on input and output.
pub fn write_linear_bundle(dir: &Path, offsets: [f64; 4]) {
    write_json(
        dir,
        "model_config.json",
        &json!({
            "schema_version": 1,
            "horizon_hours": 6,
            "targets": TARGETS,
            "trained_on": "synthetic"
        }),
    );
    write_json(dir, "feature_columns.json", &json!(lag1_columns()));
    write_json(
        dir,
        "scaler_features.json",
        &json!({ "data_min": [0.0, 0.0, 0.0, 0.0], "data_max": [1.0, 1.0, 1.0, 1.0] }),
    );
    for (i, target) in TARGETS.iter().enumerate() {
        write_json(
            dir,
            &format!("scaler_{target}.json"),
            &json!({ "data_min": [0.0], "data_max": [1.0] }),
        );
        let mut coefficients = vec![0.0; TARGETS.len()];
        coefficients[i] = 1.0;
        write_json(
            dir,
            &format!("model_{target}_6h.json"),
            &json!({
                "kind": "linear",
                "intercept": offsets[i],
                "coefficients": coefficients
            }),
        );
    }
}

pub const REFERENCE_LAGS: [usize; 5] = [1, 3, 6, 12, 24];
pub const REFERENCE_WINDOWS: [usize; 3] = [6, 12, 24];

/// The 50 training columns of the reference layout: per channel its lags,
/// rolling means and rolling stds, then the six time features.
pub fn reference_columns() -> Vec<String> {
    let mut columns = Vec::new();
    for target in TARGETS {
        columns.extend(REFERENCE_LAGS.iter().map(|l| format!("{target}_lag{l}h")));
        columns.extend(REFERENCE_WINDOWS.iter().map(|w| format!("{target}_mean{w}h")));
        columns.extend(REFERENCE_WINDOWS.iter().map(|w| format!("{target}_std{w}h")));
    }
    columns.extend(
        ["hour", "dow", "hour_sin", "hour_cos", "dow_sin", "dow_cos"]
            .iter()
            .map(|s| s.to_string()),
    );
    columns
}

/// Write a linear bundle over [`reference_columns`] with identity scalers.
/// `picks[i]` names the single column target `i` forecasts as-is.
pub fn write_reference_bundle(dir: &Path, picks: [&str; 4]) {
    let columns = reference_columns();
    write_json(
        dir,
        "model_config.json",
        &json!({ "schema_version": 1, "horizon_hours": 6, "targets": TARGETS }),
    );
    write_json(dir, "feature_columns.json", &json!(columns));
    write_json(
        dir,
        "scaler_features.json",
        &json!({ "data_min": vec![0.0; columns.len()], "data_max": vec![1.0; columns.len()] }),
    );
    for (target, pick) in TARGETS.iter().zip(picks) {
        write_json(
            dir,
            &format!("scaler_{target}.json"),
            &json!({ "data_min": [0.0], "data_max": [1.0] }),
        );
        let coefficients: Vec<f64> = columns
            .iter()
            .map(|c| if c == pick { 1.0 } else { 0.0 })
            .collect();
        write_json(
            dir,
            &format!("model_{target}_6h.json"),
            &json!({ "kind": "linear", "intercept": 0.0, "coefficients": coefficients }),
        );
    }
}
