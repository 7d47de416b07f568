//! DHT22 single-wire driver
//!
//! Bit timing is measured here; frame decoding lives in
//! `airq_core::sensors::dht22`.

use airq_core::reading::ClimateReadings;
use airq_core::sensors::dht22::{FRAME_BITS, FrameBuilder, SENSOR_NAME, conversion_due};
use airq_core::sensors::{ClimateSensor, SensorError};
use embassy_time::Timer;
use esp_hal::gpio::{DriveMode, Flex, OutputConfig, Pull};
use esp_hal::time::Instant;
use log::debug;

/// Longest a single level may last before the read is abandoned (µs)
const LEVEL_TIMEOUT_US: u64 = 200;

/// Start signal low time (ms)
const START_LOW_MS: u64 = 2;

pub struct Dht22<'d> {
    pin: Flex<'d>,
    last_read: Option<Instant>,
    last_readings: Option<ClimateReadings>,
}

impl<'d> Dht22<'d> {
    pub fn new(mut pin: Flex<'d>) -> Self {
        pin.apply_output_config(
            &OutputConfig::default()
                .with_drive_mode(DriveMode::OpenDrain)
                .with_pull(Pull::Up),
        );
        pin.set_high();
        pin.set_output_enable(true);
        pin.set_input_enable(true);

        Self {
            pin,
            last_read: None,
            last_readings: None,
        }
    }

    fn wait_for_level(&self, high: bool, stage: &'static str) -> Result<u64, SensorError> {
        let start = Instant::now();
        loop {
            let elapsed = start.elapsed().as_micros();
            if self.pin.is_high() == high {
                return Ok(elapsed);
            }
            if elapsed > LEVEL_TIMEOUT_US {
                return Err(SensorError::Timeout {
                    sensor: SENSOR_NAME,
                    stage,
                });
            }
        }
    }

    /// Response handshake and 40 data bits. Runs with interrupts masked.
    fn read_frame(&mut self) -> Result<ClimateReadings, SensorError> {
        self.pin.set_high();

        self.wait_for_level(false, "response low")?;
        self.wait_for_level(true, "response high")?;
        self.wait_for_level(false, "data preamble")?;

        let mut frame = FrameBuilder::new();
        for _ in 0..FRAME_BITS {
            self.wait_for_level(true, "bit start")?;
            let high_us = self.wait_for_level(false, "bit end")?;
            frame.push_pulse(high_us as u32);
        }
        frame.finish()
    }
}

impl ClimateSensor for Dht22<'_> {
    async fn read(&mut self) -> Result<ClimateReadings, SensorError> {
        // The sensor needs two seconds between conversions
        if let (Some(at), Some(readings)) = (self.last_read, self.last_readings) {
            if !conversion_due(at.elapsed().as_micros()) {
                debug!("DHT22 polled too early, reusing last conversion");
                return Ok(readings);
            }
        }

        self.pin.set_low();
        Timer::after_millis(START_LOW_MS).await;

        let result = critical_section::with(|_| self.read_frame());
        self.pin.set_high();
        self.last_read = Some(Instant::now());
        self.last_readings = result.ok();

        result
    }
}
