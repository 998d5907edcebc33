//! Gateway Configuration Module
//!
//! Thresholds, feature layout, transport and storage settings loaded from
//! TOML, replacing hardcoded pond values with operator-tunable ones.
//!
//! ## Loading Order
//!
//! 1. `TILAPIA_CONFIG` environment variable (path to TOML file)
//! 2. `gateway_config.toml` in the current working directory
//! 3. Built-in defaults (the reference tilapia bands)
//!
//! Environment overrides (`MQTT_BROKER`, `TEMP_MIN_SAFE`, ...) apply on top.
//!
//! The loaded [`GatewayConfig`] is passed explicitly to the components that
//! need it; there is no process-wide config handle.

mod gateway_config;
pub mod defaults;
pub mod validation;

pub use gateway_config::*;
