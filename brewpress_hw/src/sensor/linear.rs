use super::Sensor;
use crate::error::ConfigError;

/// Ratiometric transducer with a linear output between two voltages.
///
/// `max_voltage` maps to the rated pressure and `min_voltage` to zero. Voltages outside
/// that range extrapolate, nothing is clamped.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LinearPressureMapper {
    scale: f64,
    calc_offset: f64,
}

impl LinearPressureMapper {
    pub fn new(
        max_rated_pressure: f64,
        min_voltage: f64,
        max_voltage: f64,
    ) -> Result<Self, ConfigError> {
        let scale = max_rated_pressure / (max_voltage - min_voltage);

        if min_voltage == max_voltage || !scale.is_finite() {
            return Err(ConfigError::DegenerateVoltageRange {
                min: min_voltage,
                max: max_voltage,
            });
        }

        Ok(Self {
            scale,
            calc_offset: max_rated_pressure - max_voltage * scale,
        })
    }

    /// Pressure per volt.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn calc_offset(&self) -> f64 {
        self.calc_offset
    }

    pub fn map(&self, voltage: f64) -> f64 {
        self.scale * voltage + self.calc_offset
    }
}

impl Sensor for LinearPressureMapper {
    type Output = f64;

    fn conversion(&self, voltage: f64) -> f64 {
        self.map(voltage)
    }
}
