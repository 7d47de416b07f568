//! Desktop simulator for the airq air-quality station.
//!
//! Runs the same control loop as the firmware (network bring-up, then the
//! cooperative sampling loop) against synthetic collaborators:
//!
//! | Collaborator | Simulation                                          |
//! |--------------|-----------------------------------------------------|
//! | gas sensor   | slow sine sweep through normal, poor and high-CO2   |
//! | DHT22        | drifting temperature/humidity, periodic NaN glitch  |
//! | Wi-Fi        | fails the first attempts, then connects             |
//! | dashboard    | real Blynk request formatting over a logging socket |
//! | buzzer       | logs on/off transitions                             |
//!
//! Set `RUST_LOG=debug` to see the Rs/R0 ratio and the Blynk requests.
//! Set `AIRQ_CONFIG=<path>` to load a postcard-encoded device config.

use std::time::{Duration as StdDuration, Instant as StdInstant};

use log::{error, info, warn};

use airq_core::alarm::{ActuatorError, AlarmOutput};
use airq_core::app_state::{AppError, AppRunState};
use airq_core::config::{CloudConfig, DeviceConfig, NetworkConfig};
use airq_core::connection::{Connector, LinkError, NetworkLink};
use airq_core::dashboard::TransportError;
use airq_core::dashboard::blynk::{BlynkDashboard, HttpTransport};
use airq_core::monitor::Monitor;
use airq_core::reading::ClimateReadings;
use airq_core::sensors::{ClimateSensor, GasSensor, SensorError};
use embassy_futures::block_on;
use embassy_time::Instant;
use embedded_hal_async::delay::DelayNs;

// ---------------------------------------------------------------------------
// Simulation constants
// ---------------------------------------------------------------------------

/// How long the loop sleeps between steps, standing in for cloud servicing.
const LOOP_PAUSE: StdDuration = StdDuration::from_millis(100);

/// Period of the synthetic gas sweep.
const GAS_SWEEP_PERIOD_SECS: f64 = 120.0;

/// Every n-th climate read returns a NaN humidity.
const CLIMATE_GLITCH_EVERY: u32 = 7;

/// Failed Wi-Fi attempts before the simulated link comes up.
const LINK_FAILURES: u32 = 2;

// ---------------------------------------------------------------------------
// Synthetic collaborators
// ---------------------------------------------------------------------------

/// Gas sensor sweeping raw values 250..1150 on a sine.
struct SweepingGasSensor {
    started: StdInstant,
}

impl GasSensor for SweepingGasSensor {
    fn read_raw(&mut self) -> u16 {
        let t = self.started.elapsed().as_secs_f64();
        let phase = t / GAS_SWEEP_PERIOD_SECS * core::f64::consts::TAU;
        (700.0 + 450.0 * phase.sin()).round() as u16
    }
}

/// DHT22 stand-in that drifts slowly and glitches periodically.
struct GlitchyClimateSensor {
    started: StdInstant,
    reads: u32,
}

impl ClimateSensor for GlitchyClimateSensor {
    async fn read(&mut self) -> Result<ClimateReadings, SensorError> {
        self.reads += 1;
        let t = self.started.elapsed().as_secs_f64();

        let temperature = 23.0 + 3.0 * (t / 120.0).sin() + 0.5 * (t / 37.0).cos();
        let humidity = if self.reads % CLIMATE_GLITCH_EVERY == 0 {
            f64::NAN
        } else {
            50.0 + 10.0 * (t / 180.0).sin() + 2.0 * (t / 23.0).cos()
        };

        Ok(ClimateReadings {
            temperature_celsius: temperature as f32,
            humidity_percent: humidity as f32,
        })
    }
}

/// Wi-Fi link that only succeeds after a few failures.
struct SimulatedLink {
    failures_left: u32,
}

impl NetworkLink for SimulatedLink {
    async fn connect(&mut self) -> Result<(), LinkError> {
        if self.failures_left > 0 {
            self.failures_left -= 1;
            Err(LinkError::NotFound)
        } else {
            Ok(())
        }
    }
}

/// HTTP transport that logs each request and answers 200.
struct LoggingTransport {
    requests: usize,
}

impl HttpTransport for LoggingTransport {
    async fn get(&mut self, host: &str, path: &str) -> Result<u16, TransportError> {
        self.requests += 1;
        log::debug!("[net] GET http://{}{}", host, path);
        Ok(200)
    }
}

/// Buzzer that reports state changes to the log.
#[derive(Default)]
struct TerminalBuzzer {
    active: bool,
}

impl AlarmOutput for TerminalBuzzer {
    fn set_alarm(&mut self, active: bool) -> Result<(), ActuatorError> {
        if active != self.active {
            if active {
                warn!("[buzzer] ON");
            } else {
                info!("[buzzer] off");
            }
        }
        self.active = active;
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

/// Blocking delay backed by the host thread.
struct ThreadDelay;

impl DelayNs for ThreadDelay {
    async fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(StdDuration::from_nanos(ns as u64));
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

fn load_config(blob: &[u8]) -> Result<DeviceConfig<'_>, AppError> {
    if blob.is_empty() {
        let config = DeviceConfig::new(
            NetworkConfig {
                ssid: "simulated-ap",
                password: "simulated",
            },
            CloudConfig {
                host: "blynk.cloud",
                auth_token: "simulator-token",
            },
        );
        config.validate()?;
        return Ok(config);
    }
    Ok(DeviceConfig::from_bytes(blob)?)
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() {
    env_logger::init();
    info!("Starting airq simulator");

    let blob = match std::env::var("AIRQ_CONFIG") {
        Ok(path) => match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) => {
                error!("Cannot read config {}: {}", path, e);
                return;
            }
        },
        Err(_) => Vec::new(),
    };
    let config = match load_config(&blob) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return;
        }
    };
    info!(
        "Sampling every {} ms, CO2 threshold {} ppm, gas threshold {}",
        config.sampling.interval_ms, config.thresholds.co2_ppm, config.thresholds.gas_raw
    );

    // --- Network bring-up -------------------------------------------------
    let mut connector = Connector::new(config.retry);
    let mut link = SimulatedLink {
        failures_left: LINK_FAILURES,
    };
    info!("Connecting to {}", config.network.ssid);
    if let Err(e) = block_on(connector.establish(&mut link, &mut ThreadDelay)) {
        warn!("{}; continuing offline", AppError::from(e));
    }
    let mut run_state = AppRunState::after_connect(connector.state());
    info!("Run state: {:?}", run_state);

    // --- Control loop -----------------------------------------------------
    let started = StdInstant::now();
    let dashboard = BlynkDashboard::new(LoggingTransport { requests: 0 }, &config.cloud);
    let mut monitor = Monitor::new(
        &config,
        SweepingGasSensor { started },
        GlitchyClimateSensor { started, reads: 0 },
        dashboard,
        TerminalBuzzer::default(),
    );

    loop {
        let now = Instant::from_micros(started.elapsed().as_micros() as u64);

        match block_on(monitor.step(now)) {
            Some(Ok(report)) => {
                if run_state != AppRunState::SensorsRunning {
                    run_state = AppRunState::SensorsRunning;
                    info!("Run state: {:?}", run_state);
                }
                info!(
                    "[cycle] {} | alarm {} | published {} | requests so far {}",
                    report.category.label(),
                    if monitor.alarm.is_active() { "on" } else { "off" },
                    report.published,
                    monitor.dashboard.transport().requests
                );
            }
            Some(Err(e)) => warn!("[cycle] skipped: {}", e),
            None => {}
        }

        std::thread::sleep(LOOP_PAUSE);
    }
}
