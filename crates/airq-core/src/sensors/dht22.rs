//! DHT22 (AM2302) frame decoding
//!
//! The sensor answers a start pulse with 40 bits: humidity (16 bit, tenths
//! of a percent), temperature (15 bit magnitude in tenths of a degree plus a
//! sign bit) and an 8 bit checksum over the first four bytes. Pin timing is
//! done by the firmware driver; this module only turns the bits into values.

use super::SensorError;
use crate::reading::ClimateReadings;

pub const SENSOR_NAME: &str = "DHT22";

/// Number of data bits in one frame
pub const FRAME_BITS: usize = 40;

/// A high pulse longer than this (µs) encodes a one bit
pub const ONE_BIT_THRESHOLD_US: u32 = 50;

/// Minimum time between two reads (µs)
pub const MIN_READ_INTERVAL_US: u64 = 2_000_000;

/// Scheduling jitter accepted below [`MIN_READ_INTERVAL_US`] (µs). A sampling
/// loop running at the minimum interval lands slightly early when the
/// previous cycle started late.
pub const READ_INTERVAL_TOLERANCE_US: u64 = 200_000;

/// Whether a new conversion may start `elapsed_us` after the previous one.
/// Otherwise the previous conversion is reused.
pub const fn conversion_due(elapsed_us: u64) -> bool {
    elapsed_us.saturating_add(READ_INTERVAL_TOLERANCE_US) >= MIN_READ_INTERVAL_US
}

/// Assembles frame bytes from measured high-pulse lengths
#[derive(Debug, Default, Clone)]
pub struct FrameBuilder {
    bytes: [u8; 5],
    bits: usize,
}

impl FrameBuilder {
    pub const fn new() -> Self {
        Self {
            bytes: [0; 5],
            bits: 0,
        }
    }

    /// Push the length of one bit's high pulse. Extra bits are ignored.
    pub fn push_pulse(&mut self, high_us: u32) {
        if self.bits >= FRAME_BITS {
            return;
        }
        let byte = &mut self.bytes[self.bits / 8];
        *byte <<= 1;
        if high_us > ONE_BIT_THRESHOLD_US {
            *byte |= 1;
        }
        self.bits += 1;
    }

    pub const fn is_complete(&self) -> bool {
        self.bits == FRAME_BITS
    }

    pub fn finish(self) -> Result<ClimateReadings, SensorError> {
        if !self.is_complete() {
            return Err(SensorError::Timeout {
                sensor: SENSOR_NAME,
                stage: "data bits",
            });
        }
        decode_frame(&self.bytes)
    }
}

/// Validate the checksum and decode a raw frame
pub fn decode_frame(frame: &[u8; 5]) -> Result<ClimateReadings, SensorError> {
    let expected = frame[..4]
        .iter()
        .fold(0u8, |sum, byte| sum.wrapping_add(*byte));
    if expected != frame[4] {
        return Err(SensorError::Checksum {
            sensor: SENSOR_NAME,
            expected,
            actual: frame[4],
        });
    }

    let raw_humidity = u16::from_be_bytes([frame[0], frame[1]]);
    let raw_temperature = u16::from_be_bytes([frame[2], frame[3]]);

    let mut temperature_celsius = (raw_temperature & 0x7fff) as f32 / 10.0;
    if raw_temperature & 0x8000 != 0 {
        temperature_celsius = -temperature_celsius;
    }

    Ok(ClimateReadings {
        temperature_celsius,
        humidity_percent: raw_humidity as f32 / 10.0,
    })
}
