//! Per-cycle reading and the metrics derived from it

use core::fmt;

use crate::estimator::Estimate;

/// Temperature and humidity from the digital sensor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClimateReadings {
    pub temperature_celsius: f32,
    pub humidity_percent: f32,
}

impl ClimateReadings {
    /// Both values are real numbers
    pub fn is_valid(&self) -> bool {
        self.temperature_celsius.is_finite() && self.humidity_percent.is_finite()
    }
}

/// Everything measured and derived in one sampling cycle.
/// Never persisted; rebuilt every cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub gas_raw: u16,
    pub estimate: Estimate,
    pub climate: ClimateReadings,
    pub air_quality_index: u16,
}

impl Reading {
    pub fn new(gas_raw: u16, estimate: Estimate, climate: ClimateReadings) -> Self {
        Self {
            gas_raw,
            estimate,
            climate,
            air_quality_index: air_quality_index(gas_raw),
        }
    }

    pub fn co2_ppm(&self) -> f32 {
        self.estimate.co2_ppm
    }

    pub fn metrics(&self) -> Metrics {
        Metrics {
            temperature_celsius: self.climate.temperature_celsius,
            humidity_percent: self.climate.humidity_percent,
            gas_raw: self.gas_raw,
            co2_ppm: self.estimate.co2_ppm,
            air_quality_index: self.air_quality_index,
        }
    }
}

/// Simplified air-quality index: the raw gas value divided by ten.
/// Not a standardised AQI.
pub const fn air_quality_index(gas_raw: u16) -> u16 {
    gas_raw / 10
}

/// Dashboard channel a metric is published on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Temperature,
    Humidity,
    GasRaw,
    Co2,
    AirQualityIndex,
}

impl Channel {
    /// Blynk virtual pin number
    pub const fn virtual_pin(self) -> u8 {
        match self {
            Self::Temperature => 0,
            Self::Humidity => 1,
            Self::GasRaw => 2,
            Self::Co2 => 3,
            Self::AirQualityIndex => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    Real(f32),
    Integer(u16),
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Real(value) => write!(f, "{:.2}", value),
            Self::Integer(value) => write!(f, "{}", value),
        }
    }
}

/// The five values published every successful cycle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Metrics {
    pub temperature_celsius: f32,
    pub humidity_percent: f32,
    pub gas_raw: u16,
    pub co2_ppm: f32,
    pub air_quality_index: u16,
}

impl Metrics {
    pub fn channels(&self) -> [(Channel, MetricValue); 5] {
        [
            (Channel::Temperature, MetricValue::Real(self.temperature_celsius)),
            (Channel::Humidity, MetricValue::Real(self.humidity_percent)),
            (Channel::GasRaw, MetricValue::Integer(self.gas_raw)),
            (Channel::Co2, MetricValue::Real(self.co2_ppm)),
            (Channel::AirQualityIndex, MetricValue::Integer(self.air_quality_index)),
        ]
    }
}
