//! Local alarm actuator

use embedded_hal::digital::OutputPin;
use log::error;
use thiserror_no_std::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorError {
    #[error("Failed to drive alarm output")]
    Pin,
}

/// Binary alarm output (buzzer, LED, relay)
pub trait AlarmOutput {
    fn set_alarm(&mut self, active: bool) -> Result<(), ActuatorError>;

    fn is_active(&self) -> bool;
}

/// Buzzer driven high-active from a GPIO
pub struct Buzzer<P> {
    pin: P,
    active: bool,
}

impl<P: OutputPin> Buzzer<P> {
    /// Wrap the pin and drive it low so the alarm starts silent
    pub fn new(mut pin: P) -> Result<Self, ActuatorError> {
        pin.set_low().map_err(|e| {
            error!("Buzzer pin init failed: {:?}", e);
            ActuatorError::Pin
        })?;
        Ok(Self { pin, active: false })
    }

    pub fn release(self) -> P {
        self.pin
    }
}

impl<P: OutputPin> AlarmOutput for Buzzer<P> {
    fn set_alarm(&mut self, active: bool) -> Result<(), ActuatorError> {
        let result = if active {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        result.map_err(|e| {
            error!("Buzzer pin write failed: {:?}", e);
            ActuatorError::Pin
        })?;

        self.active = active;
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

#[cfg(test)]
mod tests {
    use core::convert::Infallible;

    use embedded_hal::digital::{ErrorKind, ErrorType};

    use super::*;

    #[derive(Default)]
    struct RecordingPin {
        high: bool,
        writes: usize,
    }

    impl ErrorType for RecordingPin {
        type Error = Infallible;
    }

    impl OutputPin for RecordingPin {
        fn set_low(&mut self) -> Result<(), Self::Error> {
            self.high = false;
            self.writes += 1;
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Self::Error> {
            self.high = true;
            self.writes += 1;
            Ok(())
        }
    }

    struct BrokenPin;

    impl ErrorType for BrokenPin {
        type Error = ErrorKind;
    }

    impl OutputPin for BrokenPin {
        fn set_low(&mut self) -> Result<(), Self::Error> {
            Err(ErrorKind::Other)
        }

        fn set_high(&mut self) -> Result<(), Self::Error> {
            Err(ErrorKind::Other)
        }
    }

    #[test]
    fn test_new_buzzer_is_silent() {
        let buzzer = Buzzer::new(RecordingPin::default()).unwrap();
        assert!(!buzzer.is_active());

        let pin = buzzer.release();
        assert!(!pin.high);
        assert_eq!(pin.writes, 1);
    }

    #[test]
    fn test_set_alarm_drives_pin() {
        let mut buzzer = Buzzer::new(RecordingPin::default()).unwrap();

        buzzer.set_alarm(true).unwrap();
        assert!(buzzer.is_active());

        buzzer.set_alarm(false).unwrap();
        assert!(!buzzer.is_active());
        assert!(!buzzer.release().high);
    }

    #[test]
    fn test_pin_error_is_reported() {
        assert!(matches!(Buzzer::new(BrokenPin), Err(ActuatorError::Pin)));
    }
}
