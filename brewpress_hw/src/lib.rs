pub mod adc;
pub mod config;
pub mod error;
pub mod host;
pub mod poll;
pub mod sensor;
