//! One sampling-and-reporting cycle
//!
//! Acquire, estimate, publish, decide, actuate. A failed climate read aborts
//! the cycle before anything is published or actuated.

use log::{debug, info, warn};
use thiserror_no_std::Error;

use crate::alarm::{ActuatorError, AlarmOutput};
use crate::alert::{AlertCategory, AlertEvent, AlertNotifier};
use crate::config::{DeviceConfig, Thresholds};
use crate::dashboard::Dashboard;
use crate::estimator::Co2Estimator;
use crate::reading::Reading;
use crate::sensors::{ClimateSensor, GasSensor, SensorError};

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleError {
    #[error("Climate sensor unavailable: {0}")]
    Climate(SensorError),
    #[error("Alarm output failed: {0}")]
    Actuator(ActuatorError),
}

/// What a completed cycle measured and did
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleReport {
    pub reading: Reading,
    pub category: AlertCategory,
    pub published: bool,
    pub event: Option<AlertEvent>,
    pub event_sent: bool,
}

pub struct ReadCycle {
    estimator: Co2Estimator,
    thresholds: Thresholds,
    notifier: AlertNotifier,
}

impl ReadCycle {
    pub fn new(config: &DeviceConfig<'_>) -> Self {
        Self {
            estimator: Co2Estimator::new(config.calibration),
            thresholds: config.thresholds,
            notifier: AlertNotifier::new(config.alerts.notify),
        }
    }

    pub fn estimator(&self) -> &Co2Estimator {
        &self.estimator
    }

    pub async fn run<G, C, D, A>(
        &mut self,
        gas: &mut G,
        climate: &mut C,
        dashboard: &mut D,
        alarm: &mut A,
    ) -> Result<CycleReport, CycleError>
    where
        G: GasSensor,
        C: ClimateSensor,
        D: Dashboard,
        A: AlarmOutput,
    {
        let gas_raw = gas.read_raw();
        let estimate = self.estimator.estimate_detailed(gas_raw);
        debug!("Rs/R0 ratio: {:.3}", estimate.ratio);

        let climate = match climate.read().await {
            Ok(readings) if readings.is_valid() => readings,
            Ok(_) => {
                warn!("Failed to read from climate sensor: value is not a number");
                return Err(CycleError::Climate(SensorError::InvalidValue {
                    sensor: "climate",
                }));
            }
            Err(e) => {
                warn!("Failed to read from climate sensor: {}", e);
                return Err(CycleError::Climate(e));
            }
        };

        let reading = Reading::new(gas_raw, estimate, climate);
        info!(
            "gas raw: {} | CO2: {:.2} ppm | temp: {:.1} C | humidity: {:.1} % | AQI: {}",
            reading.gas_raw,
            reading.co2_ppm(),
            climate.temperature_celsius,
            climate.humidity_percent,
            reading.air_quality_index
        );

        let published = match dashboard.publish(&reading.metrics()).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to publish metrics: {}", e);
                false
            }
        };

        let category = AlertCategory::decide(reading.gas_raw, reading.co2_ppm(), &self.thresholds);
        alarm
            .set_alarm(category.is_alarm())
            .map_err(CycleError::Actuator)?;
        if category.is_alarm() {
            warn!("{} detected!", category.label());
        }

        let event = self.notifier.observe(category);
        let event_sent = match event {
            Some(event) => match dashboard.log_event(event).await {
                Ok(()) => true,
                Err(e) => {
                    warn!("Failed to send {} event: {}", event.code(), e);
                    false
                }
            },
            None => false,
        };

        Ok(CycleReport {
            reading,
            category,
            published,
            event,
            event_sent,
        })
    }
}


#[cfg(test)]
mod tests {
    use embassy_futures::block_on;

    use super::testing::*;
    use super::*;
    use crate::config::{CloudConfig, NetworkConfig, NotifyMode};

    fn config() -> DeviceConfig<'static> {
        DeviceConfig::new(
            NetworkConfig {
                ssid: "test",
                password: "secret",
            },
            CloudConfig::default(),
        )
    }

    fn run_once(
        cycle: &mut ReadCycle,
        raw: u16,
        climate: &mut ScriptedClimate,
        dashboard: &mut RecordingDashboard,
        alarm: &mut RecordingAlarm,
    ) -> Result<CycleReport, CycleError> {
        block_on(cycle.run(&mut FixedGas(raw), climate, dashboard, alarm))
    }

    #[test]
    fn test_high_co2_reading() {
        let mut cycle = ReadCycle::new(&config());
        let mut dashboard = RecordingDashboard::default();
        let mut alarm = RecordingAlarm::default();

        let report = run_once(
            &mut cycle,
            1100,
            &mut ScriptedClimate::ok(23.0, 45.0),
            &mut dashboard,
            &mut alarm,
        )
        .unwrap();

        assert_eq!(report.category, AlertCategory::HighCo2);
        assert!(report.reading.co2_ppm() > 4000.0);
        assert!(alarm.active);
        assert_eq!(dashboard.events, [AlertEvent::HighCo2]);
        assert!(report.event_sent);
    }

    #[test]
    fn test_poor_air_reading() {
        let mut cycle = ReadCycle::new(&config());
        let mut dashboard = RecordingDashboard::default();
        let mut alarm = RecordingAlarm::default();

        let report = run_once(
            &mut cycle,
            900,
            &mut ScriptedClimate::ok(23.0, 45.0),
            &mut dashboard,
            &mut alarm,
        )
        .unwrap();

        assert!(report.reading.co2_ppm() <= 4000.0);
        assert_eq!(report.category, AlertCategory::PoorAirQuality);
        assert!(alarm.active);
        assert_eq!(dashboard.events, [AlertEvent::PoorAirQuality]);
    }

    #[test]
    fn test_normal_reading_clears_alarm() {
        let mut cycle = ReadCycle::new(&config());
        let mut dashboard = RecordingDashboard::default();
        let mut alarm = RecordingAlarm {
            active: true,
            writes: 0,
        };

        let report = run_once(
            &mut cycle,
            700,
            &mut ScriptedClimate::ok(23.0, 45.0),
            &mut dashboard,
            &mut alarm,
        )
        .unwrap();

        assert_eq!(report.category, AlertCategory::Normal);
        assert!(!alarm.active);
        assert!(dashboard.events.is_empty());
        assert_eq!(report.event, None);
    }

    #[test]
    fn test_publishes_five_metrics() {
        let mut cycle = ReadCycle::new(&config());
        let mut dashboard = RecordingDashboard::default();
        let mut alarm = RecordingAlarm::default();

        run_once(
            &mut cycle,
            512,
            &mut ScriptedClimate::ok(21.5, 55.0),
            &mut dashboard,
            &mut alarm,
        )
        .unwrap();

        assert_eq!(dashboard.published.len(), 1);
        let metrics = dashboard.published[0];
        assert_eq!(metrics.temperature_celsius, 21.5);
        assert_eq!(metrics.humidity_percent, 55.0);
        assert_eq!(metrics.gas_raw, 512);
        assert_eq!(metrics.air_quality_index, 51);
        assert_eq!(metrics.co2_ppm, cycle.estimator().estimate(512));
    }

    #[test]
    fn test_nan_climate_skips_publish_and_actuation() {
        for climate in [
            ScriptedClimate::ok(f32::NAN, 45.0),
            ScriptedClimate::ok(23.0, f32::NAN),
        ] {
            let mut climate = climate;
            let mut cycle = ReadCycle::new(&config());
            let mut dashboard = RecordingDashboard::default();
            let mut alarm = RecordingAlarm {
                active: true,
                writes: 0,
            };

            let result = run_once(&mut cycle, 1100, &mut climate, &mut dashboard, &mut alarm);

            assert!(matches!(result, Err(CycleError::Climate(_))));
            assert!(dashboard.published.is_empty());
            assert!(dashboard.events.is_empty());
            assert_eq!(alarm.writes, 0);
            assert!(alarm.active);
        }
    }

    #[test]
    fn test_driver_error_skips_cycle() {
        let mut cycle = ReadCycle::new(&config());
        let mut dashboard = RecordingDashboard::default();
        let mut alarm = RecordingAlarm::default();
        let error = SensorError::Timeout {
            sensor: "DHT22",
            stage: "response low",
        };

        let result = run_once(
            &mut cycle,
            300,
            &mut ScriptedClimate(Err(error)),
            &mut dashboard,
            &mut alarm,
        );

        assert_eq!(result, Err(CycleError::Climate(error)));
        assert!(dashboard.published.is_empty());
        assert_eq!(alarm.writes, 0);
    }

    #[test]
    fn test_dashboard_failure_still_actuates() {
        let mut cycle = ReadCycle::new(&config());
        let mut dashboard = RecordingDashboard {
            fail: true,
            ..Default::default()
        };
        let mut alarm = RecordingAlarm::default();

        let report = run_once(
            &mut cycle,
            1100,
            &mut ScriptedClimate::ok(23.0, 45.0),
            &mut dashboard,
            &mut alarm,
        )
        .unwrap();

        assert!(!report.published);
        assert!(!report.event_sent);
        assert_eq!(report.event, Some(AlertEvent::HighCo2));
        assert!(alarm.active);
    }

    #[test]
    fn test_on_transition_mode_sends_single_event() {
        let mut config = config();
        config.alerts.notify = NotifyMode::OnTransition;
        let mut cycle = ReadCycle::new(&config);
        let mut dashboard = RecordingDashboard::default();
        let mut alarm = RecordingAlarm::default();

        for _ in 0..3 {
            run_once(
                &mut cycle,
                900,
                &mut ScriptedClimate::ok(23.0, 45.0),
                &mut dashboard,
                &mut alarm,
            )
            .unwrap();
        }

        assert_eq!(dashboard.published.len(), 3);
        assert_eq!(dashboard.events, [AlertEvent::PoorAirQuality]);
        assert!(alarm.active);
    }

    #[test]
    fn test_every_cycle_mode_refires() {
        let mut cycle = ReadCycle::new(&config());
        let mut dashboard = RecordingDashboard::default();
        let mut alarm = RecordingAlarm::default();

        for _ in 0..3 {
            run_once(
                &mut cycle,
                1100,
                &mut ScriptedClimate::ok(23.0, 45.0),
                &mut dashboard,
                &mut alarm,
            )
            .unwrap();
        }

        assert_eq!(dashboard.events.len(), 3);
    }
}
