//! Per-sensor properties as the host stores them, and their validated form.

use crate::adc::ads1x15::Model;
use crate::adc::Gain;
use crate::error::ConfigError;
use crate::sensor::calibration::{self, CalibrationPoint};
use brewpress_api::sensor::PressureUnit;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Properties of one sensor, in the loosely typed form the host UI edits them.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct SensorProps {
    pub id: String,
    /// Analog input of the ADC
    pub channel: u8,
    /// I2C address in hex, e.g. `"0x48"`
    pub address: String,
    pub adc: Model,
    pub gain: Gain,
    pub min_voltage: f64,
    pub max_voltage: f64,
    /// Pressure at `max_voltage`, in PSI
    pub max_pressure: f64,
    /// Added to the value in display units
    pub offset: f64,
    /// Display unit, falls back to the process default when unset
    pub unit: Option<String>,
    /// Seconds between polls
    pub interval: u64,
    /// `raw=actual` correction points
    pub calibration: Vec<String>,
}

impl Default for SensorProps {
    fn default() -> Self {
        Self {
            id: "pressure".to_owned(),
            channel: 0,
            address: "0x48".to_owned(),
            adc: Model::default(),
            gain: Gain::default(),
            min_voltage: 0.527,
            max_voltage: 4.5,
            max_pressure: 80.0,
            offset: 0.0,
            unit: None,
            interval: 2,
            calibration: Vec::new(),
        }
    }
}

/// Validated sensor configuration. Fixed for the lifetime of a sensor.
#[derive(Clone, Debug, PartialEq)]
pub struct ChannelConfig {
    pub id: String,
    pub channel_index: u8,
    pub device_address: u16,
    pub adc: Model,
    pub gain: Gain,
    pub min_voltage: f64,
    pub max_voltage: f64,
    pub max_rated_pressure: f64,
    pub offset: f64,
    pub display_unit: PressureUnit,
    pub poll_interval_seconds: u64,
    pub calibration: Vec<CalibrationPoint>,
}

impl ChannelConfig {
    /// Validate `props` for a sensor publishing in `display_unit`.
    ///
    /// Malformed calibration entries are dropped rather than rejected.
    pub fn from_props(props: &SensorProps, display_unit: PressureUnit) -> Result<Self, ConfigError> {
        if props.channel > 3 {
            return Err(ConfigError::ChannelOutOfRange(props.channel));
        }
        if props.interval == 0 {
            return Err(ConfigError::ZeroPollInterval);
        }
        for (name, value) in [
            ("min voltage", props.min_voltage),
            ("max voltage", props.max_voltage),
            ("max pressure", props.max_pressure),
            ("offset", props.offset),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::NonFinite { name, value });
            }
        }

        Ok(Self {
            id: props.id.clone(),
            channel_index: props.channel,
            device_address: parse_address(&props.address)?,
            adc: props.adc,
            gain: props.gain,
            min_voltage: props.min_voltage,
            max_voltage: props.max_voltage,
            max_rated_pressure: props.max_pressure,
            offset: props.offset,
            display_unit,
            poll_interval_seconds: props.interval,
            calibration: calibration::parse_points(&props.calibration),
        })
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }
}

/// Parse a 7 bit I2C address written in hex, with or without a `0x` prefix.
pub fn parse_address(s: &str) -> Result<u16, ConfigError> {
    let trimmed = s.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    match u16::from_str_radix(digits, 16) {
        Ok(addr) if addr <= 0x7F => Ok(addr),
        _ => Err(ConfigError::InvalidAddress(s.to_owned())),
    }
}
