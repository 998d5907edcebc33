//! Pipeline Coordinator - per-reading processing sequence
//!
//! ```text
//! STEP 1: Sensor classification (current reading)
//! STEP 2: History append (rejects out-of-order readings)
//! STEP 3: Feature reconstruction + 6h forecast (skipped when history is short)
//! STEP 4: Forecast classification
//! STEP 5: Merge (sensor-only when demo mode is honoured)
//! STEP 6: Alert throttling
//! ```
//!
//! The coordinator is synchronous and owns all mutable pipeline state.
//! Persistence and notification delivery happen in the processing loop.

use chrono::NaiveDateTime;
use tracing::{debug, info, warn};

use crate::acquisition::IncomingReading;
use crate::alerts::{AlertDecision, AlertState, AlertThrottler};
use crate::config::{AlertClock, GatewayConfig};
use crate::ml_engine::{AppendOutcome, ForecastEngine, ForecastOutcome, HistoryWindow};
use crate::risk::{merge_with_override, RiskClassifier};
use crate::types::{self, EnrichedRecord, RiskVerdict};

/// Result of processing one reading.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessOutcome {
    pub record: EnrichedRecord,
    pub decision: AlertDecision,
    pub history: AppendOutcome,
    /// `None` when the reading was not appended and no forecast was attempted
    pub forecast: Option<ForecastOutcome>,
    /// Merged status was forced to the sensor verdict
    pub demo_mode: bool,
}

impl ProcessOutcome {
    pub const fn out_of_order(&self) -> bool {
        matches!(self.history, AppendOutcome::RejectedOutOfOrder)
    }

    pub const fn forecast_ready(&self) -> bool {
        matches!(self.forecast, Some(ForecastOutcome::Ready(_)))
    }
}

pub struct PipelineCoordinator {
    classifier: RiskClassifier,
    history: HistoryWindow,
    engine: ForecastEngine,
    throttler: AlertThrottler,
    clock: AlertClock,
    honor_demo_mode: bool,
    readings_processed: u64,
}

impl PipelineCoordinator {
    pub fn new(config: &GatewayConfig, engine: ForecastEngine) -> Self {
        info!(
            retention = config.features.retention,
            min_history = engine.min_history(),
            horizon_hours = engine.horizon_hours(),
            alert_interval_min = config.alerts.interval_min,
            "Initializing pipeline coordinator"
        );
        Self {
            classifier: RiskClassifier::new(config.thresholds.clone()),
            history: HistoryWindow::new(config.features.retention),
            engine,
            throttler: AlertThrottler::new(config.alerts.interval_min),
            clock: config.alerts.clock,
            honor_demo_mode: config.pipeline.honor_demo_mode,
            readings_processed: 0,
        }
    }

    /// Process a reading, taking the throttle time from the configured clock.
    pub fn process(&mut self, incoming: IncomingReading) -> ProcessOutcome {
        let now = match self.clock {
            AlertClock::Wall => chrono::Local::now().naive_local(),
            AlertClock::Reading => incoming.reading.timestamp,
        };
        self.process_at(incoming, now)
    }

    /// Process a reading with an explicit throttle time.
    pub fn process_at(&mut self, incoming: IncomingReading, now: NaiveDateTime) -> ProcessOutcome {
        let reading = incoming.reading;
        self.readings_processed += 1;

        let sensor_risk = self.classifier.classify_reading(&reading);

        let history = self.history.append(reading);
        let forecast = match history {
            AppendOutcome::Appended => Some(self.engine.forecast(self.history.snapshot())),
            AppendOutcome::RejectedOutOfOrder => {
                warn!(
                    timestamp = %types::format_timestamp(&reading.timestamp),
                    newest = %self
                        .history
                        .latest()
                        .map(|r| types::format_timestamp(&r.timestamp))
                        .unwrap_or_default(),
                    "Out-of-order reading kept out of history; forecast skipped"
                );
                None
            }
        };

        let predicted = forecast.as_ref().and_then(ForecastOutcome::values);
        let pred_risk = predicted.map(|values| self.classifier.classify_values(values));

        let demo_mode = incoming.demo_mode && self.honor_demo_mode;
        let status = merge_with_override(sensor_risk, pred_risk, demo_mode);

        let record = EnrichedRecord::new(&reading, predicted, sensor_risk, pred_risk, status);
        log_record(&record, forecast.as_ref(), demo_mode);

        let decision = self.throttler.evaluate(status, now);
        match decision {
            AlertDecision::FirstAlert | AlertDecision::RepeatedAlert => {
                warn!(decision = ?decision, "⚠️ DANGER detected, sending alert");
            }
            AlertDecision::Suppressed => {
                debug!("Danger persists; alert suppressed by repeat interval");
            }
            AlertDecision::NoAlert => {}
        }

        ProcessOutcome {
            record,
            decision,
            history,
            forecast,
            demo_mode,
        }
    }

    pub fn alert_state(&self) -> AlertState {
        self.throttler.state()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub const fn min_history(&self) -> usize {
        self.engine.min_history()
    }

    pub const fn readings_processed(&self) -> u64 {
        self.readings_processed
    }
}

fn log_record(record: &EnrichedRecord, forecast: Option<&ForecastOutcome>, demo_mode: bool) {
    info!(
        "📡 Sensor: T={} pH={} DO={} Turb={} | Risk={}",
        record.temp, record.ph, record.dissolved_oxygen, record.turbidity, record.sensor_risk
    );
    match forecast {
        Some(ForecastOutcome::Ready(p)) => info!(
            "🤖 Pred(6h): T={} pH={} DO={} Turb={} | Risk={}",
            p.temperature,
            p.ph,
            p.dissolved_oxygen,
            p.turbidity,
            record.pred_risk.map_or("n/a", RiskVerdict::as_str)
        ),
        Some(ForecastOutcome::InsufficientHistory { have, need }) => {
            info!("⏳ Insufficient history for predictions ({have}/{need})");
        }
        None => debug!("No forecast for this reading"),
    }
    if demo_mode {
        info!("🎯 DEMO MODE: using sensor risk only");
    }
    info!("🚨 FINAL: {}", record.status);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FeatureConfig;
    use crate::ml_engine::artifacts::{BundleManifest, ChannelModel, ModelArtifacts};
    use crate::ml_engine::{FeatureReconstructor, FeatureSchema, LinearRegressor, MinMaxScaler};
    use crate::types::{Channel, ChannelValues, RawReading};
    use chrono::Duration;

    /// Each channel forecasts its own 1h lag plus `offset`.
    fn engine(offset: ChannelValues<f64>) -> ForecastEngine {
        let layout = FeatureConfig::default();
        let names: Vec<String> = Channel::ALL
            .iter()
            .map(|c| format!("{}_lag1h", c.wire_name()))
            .collect();
        let schema = FeatureSchema::resolve(names, &layout).unwrap();
        let reconstructor =
            FeatureReconstructor::new(schema, MinMaxScaler::identity(Channel::ALL.len())).unwrap();
        let models = ChannelValues::from_fn(|ch| {
            let mut coefficients = vec![0.0; Channel::ALL.len()];
            let idx = Channel::ALL.iter().position(|c| *c == ch).unwrap();
            coefficients[idx] = 1.0;
            ChannelModel {
                regressor: Box::new(LinearRegressor {
                    intercept: *offset.get(ch),
                    coefficients,
                }),
                output_scaler: MinMaxScaler::identity(1),
            }
        });
        let artifacts = ModelArtifacts {
            manifest: BundleManifest {
                schema_version: 1,
                horizon_hours: 6,
                targets: Channel::ALL.iter().map(|c| c.wire_name().to_string()).collect(),
                trained_on: None,
            },
            reconstructor,
            models,
        };
        ForecastEngine::new(artifacts, 3)
    }

    fn coordinator(offset: ChannelValues<f64>) -> PipelineCoordinator {
        PipelineCoordinator::new(&GatewayConfig::default(), engine(offset))
    }

    fn no_offset() -> ChannelValues<f64> {
        ChannelValues::from_fn(|_| 0.0)
    }

    fn reading(hour: i64, dissolved_oxygen: f64) -> IncomingReading {
        let base = types::parse_timestamp("2025-01-01 00:00:00").unwrap();
        IncomingReading::new(RawReading {
            timestamp: base + Duration::hours(hour),
            temperature: 29.0,
            ph: 7.2,
            dissolved_oxygen,
            turbidity: 12.0,
        })
    }

    #[test]
    fn test_warm_up_then_forecast() {
        let mut coord = coordinator(no_offset());
        let need = coord.min_history();
        assert_eq!(need, 25);

        for h in 0..(need as i64 - 1) {
            let out = coord.process_at(reading(h, 6.5), reading(h, 6.5).reading.timestamp);
            assert!(!out.forecast_ready());
            assert!(out.record.pred_temp.is_none());
            assert_eq!(out.record.pred_risk, None);
            assert_eq!(out.record.status, RiskVerdict::Safe);
        }

        let last = reading(need as i64 - 1, 6.5);
        let out = coord.process_at(last, last.reading.timestamp);
        assert!(out.forecast_ready());
        assert_eq!(out.record.pred_do, Some(6.5));
        assert_eq!(out.record.pred_risk, Some(RiskVerdict::Safe));
        assert_eq!(coord.history_len(), need);
    }

    #[test]
    fn test_forecast_danger_escalates_status() {
        // forecast DO = lag1 - 5.0 -> 1.5 mg/L, below the danger floor
        let mut offset = no_offset();
        offset.dissolved_oxygen = -5.0;
        let mut coord = coordinator(offset);

        let mut out = None;
        for h in 0..25 {
            let r = reading(h, 6.5);
            out = Some(coord.process_at(r, r.reading.timestamp));
        }
        let out = out.unwrap();
        assert_eq!(out.record.sensor_risk, RiskVerdict::Safe);
        assert_eq!(out.record.pred_risk, Some(RiskVerdict::Danger));
        assert_eq!(out.record.status, RiskVerdict::Danger);
        assert_eq!(out.decision, AlertDecision::FirstAlert);
    }

    #[test]
    fn test_demo_mode_keeps_forecast_but_surfaces_sensor_risk() {
        let mut offset = no_offset();
        offset.dissolved_oxygen = -5.0;
        let mut coord = coordinator(offset);
        for h in 0..24 {
            let r = reading(h, 6.5);
            coord.process_at(r, r.reading.timestamp);
        }
        let mut r = reading(24, 6.5);
        r.demo_mode = true;
        let out = coord.process_at(r, r.reading.timestamp);
        assert!(out.demo_mode);
        assert_eq!(out.record.pred_risk, Some(RiskVerdict::Danger));
        assert_eq!(out.record.status, RiskVerdict::Safe);
        assert_eq!(out.decision, AlertDecision::NoAlert);
    }

    #[test]
    fn test_demo_mode_ignored_when_disabled() {
        let mut config = GatewayConfig::default();
        config.pipeline.honor_demo_mode = false;
        let mut offset = no_offset();
        offset.dissolved_oxygen = -5.0;
        let mut coord = PipelineCoordinator::new(&config, engine(offset));
        let mut out = None;
        for h in 0..25 {
            let mut r = reading(h, 6.5);
            r.demo_mode = true;
            out = Some(coord.process_at(r, r.reading.timestamp));
        }
        let out = out.unwrap();
        assert!(!out.demo_mode);
        assert_eq!(out.record.status, RiskVerdict::Danger);
    }

    #[test]
    fn test_out_of_order_is_classified_but_not_appended() {
        let mut coord = coordinator(no_offset());
        let first = reading(5, 6.5);
        coord.process_at(first, first.reading.timestamp);

        let late = reading(2, 1.0);
        let out = coord.process_at(late, late.reading.timestamp);
        assert!(out.out_of_order());
        assert!(out.forecast.is_none());
        assert_eq!(out.record.sensor_risk, RiskVerdict::Danger);
        assert_eq!(out.record.status, RiskVerdict::Danger);
        assert_eq!(coord.history_len(), 1);
        assert_eq!(coord.readings_processed(), 2);
    }

    #[test]
    fn test_danger_reading_after_safe_sends_first_alert() {
        let mut coord = coordinator(no_offset());
        let calm = reading(0, 6.5);
        let out = coord.process_at(calm, calm.reading.timestamp);
        assert_eq!(out.record.status, RiskVerdict::Safe);
        assert_eq!(out.decision, AlertDecision::NoAlert);

        let base = types::parse_timestamp("2025-01-01 01:00:00").unwrap();
        let storm = IncomingReading::new(RawReading {
            timestamp: base,
            temperature: 24.5,
            ph: 5.8,
            dissolved_oxygen: 1.0,
            turbidity: 65.0,
        });
        let out = coord.process_at(storm, base);
        assert_eq!(out.record.sensor_risk, RiskVerdict::Danger);
        assert_eq!(out.record.pred_risk, None);
        assert_eq!(out.record.status, RiskVerdict::Danger);
        assert_eq!(out.decision, AlertDecision::FirstAlert);
        assert_eq!(coord.alert_state().last_alert_ts, Some(base));
    }

    #[test]
    fn test_throttle_uses_supplied_time() {
        let mut coord = coordinator(no_offset());
        let base = reading(0, 1.0).reading.timestamp;
        let decisions: Vec<AlertDecision> = [0, 1, 2, 11]
            .into_iter()
            .map(|m| coord.process_at(reading(0, 1.0), base + Duration::minutes(m)).decision)
            .collect();
        assert_eq!(
            decisions,
            vec![
                AlertDecision::FirstAlert,
                AlertDecision::Suppressed,
                AlertDecision::Suppressed,
                AlertDecision::RepeatedAlert,
            ]
        );
        assert_eq!(coord.alert_state().last_status, RiskVerdict::Danger);
    }
}
