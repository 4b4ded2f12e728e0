pub mod ads1x15;
pub mod bus;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// One opened analog input that can be sampled for a voltage.
///
/// Bus arbitration is the implementation's concern, callers only ever hold one
/// source per channel. [`ads1x15::Ads1x15`] serializes the inputs of a chip through
/// [`bus::SharedDevice`].
pub trait VoltageSource {
    /// Take a single voltage sample in volts.
    fn read_voltage(&mut self) -> Result<f64>;
}

impl<T: VoltageSource + ?Sized> VoltageSource for Box<T> {
    fn read_voltage(&mut self) -> Result<f64> {
        (**self).read_voltage()
    }
}

/// Gain selector as presented to the user.
///
/// The selector names follow the ADS1x15 convention where a gain of 1 gives ±4.096 V full scale.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub enum Gain {
    #[serde(rename = "2/3")]
    TwoThirds,
    #[default]
    #[serde(rename = "1")]
    One,
    #[serde(rename = "2")]
    Two,
    #[serde(rename = "4")]
    Four,
    #[serde(rename = "8")]
    Eight,
    #[serde(rename = "16")]
    Sixteen,
}

impl From<Gain> for ads1x15::Pga {
    fn from(gain: Gain) -> Self {
        match gain {
            Gain::TwoThirds => Self::Fsr6_144V,
            Gain::One => Self::Fsr4_096V,
            Gain::Two => Self::Fsr2_048V,
            Gain::Four => Self::Fsr1_024V,
            Gain::Eight => Self::Fsr0_512V,
            Gain::Sixteen => Self::Fsr0_256V,
        }
    }
}
