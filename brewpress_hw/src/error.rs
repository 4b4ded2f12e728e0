//! Errors raised while configuring, opening and reading a pressure sensor.
//!
//! Construction-time errors ([`ConfigError`], [`InitError`]) disable the sensor for good.
//! A [`ReadError`] only costs the current poll cycle.

use std::error::Error;
use thiserror::Error;

pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// Invalid sensor properties.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("degenerate voltage range: min voltage {min} V equals max voltage {max} V")]
    DegenerateVoltageRange { min: f64, max: f64 },

    #[error("invalid device address `{0}`, expected a hex address such as 0x48")]
    InvalidAddress(String),

    #[error("channel {0} is out of range, expected 0-3")]
    ChannelOutOfRange(u8),

    #[error("poll interval must be at least one second")]
    ZeroPollInterval,

    #[error("{name} must be a finite number, got {value}")]
    NonFinite { name: &'static str, value: f64 },
}

/// The ADC could not be opened or configured.
#[derive(Debug, Error)]
#[error("cannot open input at address {address:#04x}, channel {channel}: {source}")]
pub struct InitError {
    pub address: u16,
    pub channel: u8,
    #[source]
    pub source: BoxError,
}

/// A single poll cycle failed.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("failed to read voltage: {0}")]
    Source(#[source] BoxError),

    #[error("{voltage} V converted to a non-finite pressure")]
    NonFinite { voltage: f64 },
}

/// Why a sensor was left non-functional at construction.
#[derive(Debug, Error)]
pub enum SensorError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Init(#[from] InitError),
}

/// A calibration entry that is not of the form `raw=actual`.
#[derive(Debug, Error, PartialEq)]
pub enum CalibrationParseError {
    #[error("expected `raw=actual`, got `{0}`")]
    MissingSeparator(String),

    #[error("`{0}` is not a finite number")]
    InvalidNumber(String),
}
