pub mod calibration;
mod linear;
pub mod unit;

pub use calibration::{CalibrationModel, CalibrationPoint};
pub use linear::LinearPressureMapper;
pub use unit::UnitConverter;

/// Conversion from a measured voltage into a physical quantity.
pub trait Sensor {
    type Output;

    fn conversion(&self, voltage: f64) -> Self::Output;
}
