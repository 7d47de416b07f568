//! CO2 estimation from an MQ-135 style analog gas sensor
//!
//! The raw ADC value is converted to a voltage, the voltage to the sensor's
//! resistance through the load-resistor divider, and the Rs/R0 ratio to a
//! concentration through an inverse power-law curve fit:
//!
//! ```text
//! ppm = base_concentration * (ratio / base_ratio) ^ exponent
//! ```
//!
//! The result is always clamped into `[0, max_ppm]`.

use libm::powf;

use crate::config::Calibration;

/// Intermediate values of one estimation, useful for logging and calibration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Estimate {
    pub voltage: f32,
    pub resistance: f32,
    pub ratio: f32,
    pub co2_ppm: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Co2Estimator {
    calibration: Calibration,
}

impl Co2Estimator {
    pub const fn new(calibration: Calibration) -> Self {
        Self { calibration }
    }

    /// Estimated CO2 concentration in ppm for a raw ADC value
    pub fn estimate(&self, raw: u16) -> f32 {
        self.estimate_detailed(raw).co2_ppm
    }

    pub fn estimate_detailed(&self, raw: u16) -> Estimate {
        let voltage = self.voltage(raw);
        let resistance = self.resistance(voltage);
        let ratio = resistance / self.calibration.clean_air_resistance;

        Estimate {
            voltage,
            resistance,
            ratio,
            co2_ppm: self.ppm_from_ratio(ratio),
        }
    }

    /// Apply the curve fit and clamp. Non-numeric results map to 0.
    pub fn ppm_from_ratio(&self, ratio: f32) -> f32 {
        let cal = &self.calibration;
        let ppm = cal.base_concentration_ppm * powf(ratio / cal.base_ratio, cal.exponent);

        if ppm.is_nan() {
            return 0.0;
        }
        // `max_ppm` may be unvalidated here and `clamp` panics on a NaN bound
        ppm.max(0.0).min(cal.max_ppm)
    }

    /// R0 that makes a reading taken in clean air sit exactly on `base_ratio`.
    ///
    /// Returns `None` when the reading saturates the divider (Rs <= 0).
    pub fn calibrate_r0(&self, raw_in_clean_air: u16) -> Option<f32> {
        let resistance = self.resistance(self.voltage(raw_in_clean_air));
        if resistance > 0.0 && resistance.is_finite() {
            Some(resistance / self.calibration.base_ratio)
        } else {
            None
        }
    }

    fn voltage(&self, raw: u16) -> f32 {
        let cal = &self.calibration;
        let raw = raw.min(cal.adc_max);
        let voltage = raw as f32 * (cal.reference_voltage / cal.adc_max as f32);

        // Floor keeps the divider formula away from a division by zero
        voltage.max(cal.voltage_floor)
    }

    fn resistance(&self, voltage: f32) -> f32 {
        let cal = &self.calibration;
        cal.load_resistance * (cal.reference_voltage - voltage) / voltage
    }
}

impl Default for Co2Estimator {
    fn default() -> Self {
        Self::new(Calibration::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f32, expected: f32, tolerance: f32) {
        assert!(
            libm::fabsf(actual - expected) <= tolerance,
            "expected {expected} ± {tolerance}, got {actual}"
        );
    }

    #[test]
    fn test_zero_reading_is_finite_and_in_range() {
        let estimator = Co2Estimator::default();
        let estimate = estimator.estimate_detailed(0);

        assert_eq!(estimate.voltage, 0.01);
        assert!(estimate.co2_ppm.is_finite());
        assert!((0.0..=10_000.0).contains(&estimate.co2_ppm));
    }

    #[test]
    fn test_base_ratio_yields_base_concentration() {
        let estimator = Co2Estimator::default();
        assert_close(estimator.ppm_from_ratio(3.6), 400.0, 1e-3);
    }

    #[test]
    fn test_full_scale_reading_clamps_to_max() {
        // Rs collapses to 0 so the power law diverges
        let estimator = Co2Estimator::default();
        assert_eq!(estimator.estimate(4095), 10_000.0);
    }

    #[test]
    fn test_out_of_range_reading_saturates() {
        let estimator = Co2Estimator::default();
        assert_eq!(estimator.estimate(u16::MAX), estimator.estimate(4095));
    }

    #[test]
    fn test_known_readings() {
        let estimator = Co2Estimator::default();
        assert_close(estimator.estimate(900), 2993.6, 2.0);
        assert_close(estimator.estimate(1100), 4457.0, 5.0);
    }

    #[test]
    fn test_output_is_always_clamped() {
        let estimator = Co2Estimator::default();
        for raw in 0..=4200u16 {
            let ppm = estimator.estimate(raw);
            assert!(
                (0.0..=10_000.0).contains(&ppm),
                "raw {raw} produced {ppm}"
            );
        }
    }

    #[test]
    fn test_non_increasing_in_ratio() {
        let estimator = Co2Estimator::default();
        let mut previous = f32::INFINITY;
        let mut ratio = 0.05_f32;
        while ratio < 100.0 {
            let ppm = estimator.ppm_from_ratio(ratio);
            assert!(ppm <= previous, "ratio {ratio}: {ppm} > {previous}");
            previous = ppm;
            ratio *= 1.1;
        }
    }

    #[test]
    fn test_non_decreasing_in_raw_value() {
        let estimator = Co2Estimator::default();
        let mut previous = 0.0_f32;
        for raw in 0..=4095u16 {
            let ppm = estimator.estimate(raw);
            assert!(ppm >= previous, "raw {raw}: {ppm} < {previous}");
            previous = ppm;
        }
    }

    #[test]
    fn test_negative_ratio_maps_to_zero() {
        let estimator = Co2Estimator::default();
        assert_eq!(estimator.ppm_from_ratio(-1.0), 0.0);
    }

    #[test]
    fn test_calibrated_r0_puts_reading_on_base_curve() {
        let estimator = Co2Estimator::default();
        let r0 = estimator.calibrate_r0(300).unwrap();

        let calibrated = Co2Estimator::new(Calibration {
            clean_air_resistance: r0,
            ..Calibration::default()
        });
        assert_close(calibrated.estimate(300), 400.0, 0.5);
    }

    #[test]
    fn test_unvalidated_bound_does_not_panic() {
        let estimator = Co2Estimator::new(Calibration {
            max_ppm: f32::NAN,
            ..Default::default()
        });
        let ppm = estimator.estimate(900);
        assert!(ppm.is_finite() && ppm >= 0.0);

        let estimator = Co2Estimator::new(Calibration {
            max_ppm: -1.0,
            ..Default::default()
        });
        assert!(estimator.estimate(900).is_finite());
    }

    #[test]
    fn test_calibrate_r0_rejects_saturated_reading() {
        let estimator = Co2Estimator::default();
        assert_eq!(estimator.calibrate_r0(4095), None);
    }
}
