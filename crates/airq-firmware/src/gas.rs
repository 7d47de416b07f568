//! MQ-135 analog output on ADC1

use airq_core::sensors::GasSensor;
use esp_hal::Blocking;
use esp_hal::analog::adc::{Adc, AdcPin};
use esp_hal::peripherals::{ADC1, GPIO4};
use log::error;

pub type GasAdc = Adc<'static, ADC1<'static>, Blocking>;
pub type GasAdcPin = AdcPin<GPIO4<'static>, ADC1<'static>>;

pub struct AdcGasSensor {
    adc: GasAdc,
    pin: GasAdcPin,
    last: u16,
}

impl AdcGasSensor {
    pub fn new(adc: GasAdc, pin: GasAdcPin) -> Self {
        Self { adc, pin, last: 0 }
    }
}

impl GasSensor for AdcGasSensor {
    fn read_raw(&mut self) -> u16 {
        match nb::block!(self.adc.read_oneshot(&mut self.pin)) {
            Ok(raw) => {
                self.last = raw;
                raw
            }
            // Repeat the previous sample on a failed conversion
            Err(()) => {
                error!("ADC oneshot read failed");
                self.last
            }
        }
    }
}
