//! Device configuration
//!
//! Credentials, calibration, thresholds and timing, handed to the control
//! loop at startup. The whole structure is serde-serialisable so a per-device
//! copy (a calibrated R0, say) can be stored as a postcard blob and loaded
//! without recompiling.

use alloc::vec::Vec;

use embassy_time::Duration;
use serde::{Deserialize, Serialize};
use thiserror_no_std::Error;

/// Upper bound of an encoded [`DeviceConfig`] blob.
pub const MAX_CONFIG_BLOB_LEN: usize = 256;

#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum ConfigError {
    #[error("Invalid calibration: {0}")]
    InvalidCalibration(&'static str),
    #[error("Sampling interval must be non-zero")]
    ZeroInterval,
    #[error("Retry policy must allow at least one attempt")]
    ZeroAttempts,
    #[error("Network SSID is empty")]
    MissingSsid,
    #[error("Config blob could not be encoded or decoded")]
    Codec,
}

impl From<postcard::Error> for ConfigError {
    fn from(_: postcard::Error) -> Self {
        ConfigError::Codec
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(bound(deserialize = "'de: 'a"))]
pub struct DeviceConfig<'a> {
    pub network: NetworkConfig<'a>,
    pub cloud: CloudConfig<'a>,
    pub calibration: Calibration,
    pub thresholds: Thresholds,
    pub sampling: SamplingConfig,
    pub retry: RetryPolicy,
    pub alerts: AlertConfig,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct NetworkConfig<'a> {
    pub ssid: &'a str,
    pub password: &'a str,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CloudConfig<'a> {
    /// Dashboard host, e.g. `blynk.cloud`
    pub host: &'a str,
    pub auth_token: &'a str,
}

impl Default for CloudConfig<'_> {
    fn default() -> Self {
        Self {
            host: "blynk.cloud",
            auth_token: "",
        }
    }
}

/// MQ-135 style gas sensor calibration.
///
/// Resistances are in kΩ, voltages in volts.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    /// ADC reference voltage
    pub reference_voltage: f32,
    /// Highest raw value the ADC produces
    pub adc_max: u16,
    /// Lowest voltage used in the divider formula
    pub voltage_floor: f32,
    /// Load resistance RL
    pub load_resistance: f32,
    /// Sensor resistance in clean air (R0)
    pub clean_air_resistance: f32,
    /// Rs/R0 ratio that corresponds to `base_concentration_ppm`
    pub base_ratio: f32,
    pub base_concentration_ppm: f32,
    /// Power-law exponent of the curve fit
    pub exponent: f32,
    pub max_ppm: f32,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            reference_voltage: 3.3,
            adc_max: 4095,
            voltage_floor: 0.01,
            load_resistance: 10.0,
            clean_air_resistance: 37.73,
            base_ratio: 3.6,
            base_concentration_ppm: 400.0,
            exponent: -1.5,
            max_ppm: 10_000.0,
        }
    }
}

impl Calibration {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.adc_max == 0 {
            return Err(ConfigError::InvalidCalibration("adc_max must be non-zero"));
        }
        let positive = [
            (self.reference_voltage, "reference_voltage must be positive"),
            (self.voltage_floor, "voltage_floor must be positive"),
            (self.load_resistance, "load_resistance must be positive"),
            (self.clean_air_resistance, "clean_air_resistance must be positive"),
            (self.base_ratio, "base_ratio must be positive"),
            (self.max_ppm, "max_ppm must be positive"),
        ];
        for (value, reason) in positive {
            // `!(x > 0)` also rejects NaN
            if !(value > 0.0) {
                return Err(ConfigError::InvalidCalibration(reason));
            }
        }
        if !self.exponent.is_finite() || !self.base_concentration_ppm.is_finite() {
            return Err(ConfigError::InvalidCalibration("curve constants must be finite"));
        }
        Ok(())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    /// Estimated CO2 above this raises the high-CO2 alarm
    pub co2_ppm: f32,
    /// Raw gas value above this raises the poor-air-quality alarm
    pub gas_raw: u16,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            co2_ppm: 4000.0,
            gas_raw: 800,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct SamplingConfig {
    pub interval_ms: u32,
}

impl SamplingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms as u64)
    }
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self { interval_ms: 2000 }
    }
}

/// Bounded exponential backoff used while bringing the network up
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff_ms: u32,
    pub max_backoff_ms: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            initial_backoff_ms: 1000,
            max_backoff_ms: 30_000,
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn backoff_ms(&self, attempt: u32) -> u32 {
        let shift = attempt.saturating_sub(1).min(31);
        self.initial_backoff_ms
            .saturating_mul(1u32 << shift)
            .min(self.max_backoff_ms)
    }
}

/// When a dashboard event is sent for an active alarm
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NotifyMode {
    /// Every cycle the alarm condition holds
    #[default]
    EveryCycle,
    /// Only when the alarm category changes
    OnTransition,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AlertConfig {
    pub notify: NotifyMode,
}

impl<'a> DeviceConfig<'a> {
    /// Default configuration for the given network and dashboard credentials
    pub fn new(network: NetworkConfig<'a>, cloud: CloudConfig<'a>) -> Self {
        Self {
            network,
            cloud,
            calibration: Calibration::default(),
            thresholds: Thresholds::default(),
            sampling: SamplingConfig::default(),
            retry: RetryPolicy::default(),
            alerts: AlertConfig::default(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.network.ssid.is_empty() {
            return Err(ConfigError::MissingSsid);
        }
        if self.sampling.interval_ms == 0 {
            return Err(ConfigError::ZeroInterval);
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::ZeroAttempts);
        }
        self.calibration.validate()
    }

    /// Decode and validate a postcard blob. Strings borrow from `bytes`.
    pub fn from_bytes(bytes: &'a [u8]) -> Result<Self, ConfigError> {
        let config: DeviceConfig<'a> = postcard::from_bytes(bytes)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_slice<'b>(&self, buf: &'b mut [u8]) -> Result<&'b mut [u8], ConfigError> {
        Ok(postcard::to_slice(self, buf)?)
    }

    pub fn to_vec(&self) -> Result<Vec<u8>, ConfigError> {
        Ok(postcard::to_allocvec(self)?)
    }
}
