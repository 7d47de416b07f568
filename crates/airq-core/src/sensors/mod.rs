pub mod dht22;

use thiserror_no_std::Error;

use crate::reading::ClimateReadings;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    #[error("{sensor}: timed out while waiting for {stage}")]
    Timeout {
        sensor: &'static str,
        stage: &'static str,
    },
    #[error("{sensor}: checksum mismatch (expected {expected:#04x}, got {actual:#04x})")]
    Checksum {
        sensor: &'static str,
        expected: u8,
        actual: u8,
    },
    #[error("{sensor}: failed to {operation}")]
    ReadFailed {
        sensor: &'static str,
        operation: &'static str,
    },
    #[error("{sensor}: reading is not a number")]
    InvalidValue { sensor: &'static str },
}

/// Analog gas sensor. Reads always produce a raw ADC value.
pub trait GasSensor {
    fn read_raw(&mut self) -> u16;
}

/// Digital temperature/humidity sensor. Reads may fail.
pub trait ClimateSensor {
    fn read(&mut self) -> impl Future<Output = Result<ClimateReadings, SensorError>>;
}
