//! Risk Merge Policy
//!
//! The surfaced status is the more severe of the sensor and forecast verdicts
//! under `Danger > Warning > Safe`.

use crate::types::RiskVerdict;

/// Escalating merge. A missing forecast verdict leaves the sensor verdict.
pub fn merge(sensor: RiskVerdict, forecast: Option<RiskVerdict>) -> RiskVerdict {
    forecast.map_or(sensor, |f| sensor.max(f))
}

/// Merge, unless `sensor_only` forces the sensor verdict (demo mode).
pub fn merge_with_override(
    sensor: RiskVerdict,
    forecast: Option<RiskVerdict>,
    sensor_only: bool,
) -> RiskVerdict {
    if sensor_only {
        sensor
    } else {
        merge(sensor, forecast)
    }
}
