//! Sensor-side types shared by every temperature source.

use core::fmt;

use serde::Serialize;

/// Why a temperature sample is missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorError {
    /// The two-wire transaction failed or returned short.
    Bus,
    /// The ADC conversion failed.
    Adc,
    /// No sample arrived within one poll interval.
    Timeout,
    /// The sample is not a finite number.
    InvalidReading,
}

impl SensorError {
    pub fn to_str(&self) -> &'static str {
        match self {
            SensorError::Bus => "bus error",
            SensorError::Adc => "adc error",
            SensorError::Timeout => "timeout",
            SensorError::InvalidReading => "invalid reading",
        }
    }
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_str())
    }
}

/// Value reported by a sensor path that failed to read. Anything at or
/// below it is a failure, not a temperature.
pub const SENSOR_FAILURE_SENTINEL: f32 = -100.0;

/// Reject non-finite samples and the failure sentinel before they reach
/// any comparison.
pub fn checked_reading(celsius: f32) -> Result<f32, SensorError> {
    if !celsius.is_finite() {
        Err(SensorError::InvalidReading)
    } else if celsius <= SENSOR_FAILURE_SENTINEL {
        Err(SensorError::Bus)
    } else {
        Ok(celsius)
    }
}

/// ADC reference and full-scale code for the analog (TMP36) input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalogScale {
    pub reference_volts: f32,
    pub full_scale: u16,
}

impl AnalogScale {
    /// 5 V reference, 10-bit converter.
    pub const ARDUINO_10BIT: Self = Self {
        reference_volts: 5.0,
        full_scale: 1023,
    };

    /// 3.3 V reference, 12-bit converter.
    pub const RP2040_12BIT: Self = Self {
        reference_volts: 3.3,
        full_scale: 4095,
    };

    pub fn volts(&self, raw: u16) -> f32 {
        raw as f32 * (self.reference_volts / self.full_scale as f32)
    }
}

/// TMP36 transfer function: 10 mV/°C with a 500 mV offset.
pub fn tmp36_celsius(raw: u16, scale: AnalogScale) -> f32 {
    (scale.volts(raw) - 0.5) * 100.0
}
