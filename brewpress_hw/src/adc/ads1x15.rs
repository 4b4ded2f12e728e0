//! Driver for the TI ADS1015 (12 bit) and ADS1115 (16 bit) I2C ADCs.
//!
//! Conversions are always taken in single-shot mode against one single-ended input so that
//! several sensors can share a chip without fighting over a continuous-conversion config.

use super::bus::{lock, SharedDevice};
use super::{Gain, VoltageSource};
use anyhow::{bail, ensure, Result};
use cfg_if::cfg_if;
use i2cdev::core::*;
#[cfg(target_os = "linux")]
use i2cdev::linux::LinuxI2CDevice;
use serde::{Deserialize, Serialize};
use std::io;
use std::time::Duration;

// Register map of ADS1x15 devices
const CONVERSION_REG: u8 = 0x00;
const CONFIG_REG: u8 = 0x01;
const LO_THRESH_REG: u8 = 0x02;
const HI_THRESH_REG: u8 = 0x03;

// Bit offsets for the different sections of the u16 config
const OS_OFFSET: u8 = 15;
const MUX_OFFSET: u8 = 12;
const PGA_OFFSET: u8 = 9;
const MODE_OFFSET: u8 = 8;
const DATA_RATE_OFFSET: u8 = 5;
const COMP_MODE_OFFSET: u8 = 4;
const COMP_POLARITY_OFFSET: u8 = 3;
const COMP_LATCH_OFFSET: u8 = 2;
const COMP_QUEUE_OFFSET: u8 = 0;

// How many times the OS bit is polled before a conversion is considered stuck
const CONVERSION_POLLS: u32 = 10;

cfg_if! {
    if #[cfg(target_os = "linux")] {
        /// I2C device used on the current compile target.
        pub type PlatformDevice = LinuxI2CDevice;

        /// Open the i2c-dev device at `addr` on the bus at `path`.
        pub fn open_device(path: &str, addr: u16) -> Result<PlatformDevice> {
            Ok(LinuxI2CDevice::new(path, addr)?)
        }
    } else {
        /// I2C device used on the current compile target.
        pub type PlatformDevice = MockAds1x15;

        /// Targets without i2c-dev get a mock chip in its power-on state.
        pub fn open_device(_path: &str, _addr: u16) -> Result<PlatformDevice> {
            Ok(MockAds1x15::new())
        }
    }
}

/// Which member of the family is on the bus.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Model {
    /// 12 bit, 128-3300 SPS
    Ads1015,
    /// 16 bit, 8-860 SPS
    #[default]
    Ads1115,
}

impl Model {
    /// Positive full-scale code count.
    fn full_scale_counts(self) -> f64 {
        match self {
            Self::Ads1015 => 2048.0,
            Self::Ads1115 => 32768.0,
        }
    }

    /// Decode a conversion register word (already in chip byte order) into a signed code.
    ///
    /// The ADS1015 left-aligns its 12 bit result, an arithmetic shift keeps the sign.
    pub fn decode(self, word: u16) -> i16 {
        match self {
            Self::Ads1015 => (word as i16) >> 4,
            Self::Ads1115 => word as i16,
        }
    }
}

/// Operational status or single-shot conversion start.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Os {
    /// When writing: No effect
    ///
    /// When reading: Device is currently performing a conversion
    Off = 0,
    /// When writing: Start a single conversion (when in power-down state)
    ///
    /// When reading: Device is not currently performing a conversion
    On = 1,
}

impl Default for Os {
    fn default() -> Self {
        Os::On
    }
}

impl From<u16> for Os {
    fn from(word: u16) -> Self {
        match (word >> OS_OFFSET) & 0x1 {
            0 => Os::Off,
            _ => Os::On,
        }
    }
}

/// Input multiplexer configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Mux {
    /// AINP = AIN0 and AINN = AIN1 (default)
    #[default]
    Ain0Ain1 = 0,
    /// AINP = AIN0 and AINN = AIN3
    Ain0Ain3 = 1,
    /// AINP = AIN1 and AINN = AIN3
    Ain1Ain3 = 2,
    /// AINP = AIN2 and AINN = AIN3
    Ain2Ain3 = 3,
    /// AINP = AIN0 and AINN = GND
    Ain0Gnd = 4,
    /// AINP = AIN1 and AINN = GND
    Ain1Gnd = 5,
    /// AINP = AIN2 and AINN = GND
    Ain2Gnd = 6,
    /// AINP = AIN3 and AINN = GND
    Ain3Gnd = 7,
}

impl Mux {
    /// Single-ended input for one of the four analog pins.
    pub fn single_ended(channel: u8) -> Result<Self> {
        Ok(match channel {
            0 => Self::Ain0Gnd,
            1 => Self::Ain1Gnd,
            2 => Self::Ain2Gnd,
            3 => Self::Ain3Gnd,
            _ => bail!("no analog input {}, expected 0-3", channel),
        })
    }
}

impl From<u16> for Mux {
    fn from(word: u16) -> Self {
        match (word >> MUX_OFFSET) & 0x7 {
            0 => Mux::Ain0Ain1,
            1 => Mux::Ain0Ain3,
            2 => Mux::Ain1Ain3,
            3 => Mux::Ain2Ain3,
            4 => Mux::Ain0Gnd,
            5 => Mux::Ain1Gnd,
            6 => Mux::Ain2Gnd,
            _ => Mux::Ain3Gnd,
        }
    }
}

/// Programmable gain amplifier full-scale range.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Pga {
    /// FSR = ±6.144 V
    Fsr6_144V = 0,
    /// FSR = ±4.096 V
    Fsr4_096V = 1,
    /// FSR = ±2.048 V (default)
    #[default]
    Fsr2_048V = 2,
    /// FSR = ±1.024 V
    Fsr1_024V = 3,
    /// FSR = ±0.512 V
    Fsr0_512V = 4,
    /// FSR = ±0.256 V
    Fsr0_256V = 5,
}

impl From<u16> for Pga {
    fn from(word: u16) -> Self {
        // Codes 5, 6 and 7 all select ±0.256 V
        match (word >> PGA_OFFSET) & 0x7 {
            0 => Pga::Fsr6_144V,
            1 => Pga::Fsr4_096V,
            2 => Pga::Fsr2_048V,
            3 => Pga::Fsr1_024V,
            4 => Pga::Fsr0_512V,
            _ => Pga::Fsr0_256V,
        }
    }
}

impl Pga {
    /// Positive full-scale voltage.
    pub fn full_scale(self) -> f64 {
        match self {
            Self::Fsr6_144V => 6.144,
            Self::Fsr4_096V => 4.096,
            Self::Fsr2_048V => 2.048,
            Self::Fsr1_024V => 1.024,
            Self::Fsr0_512V => 0.512,
            Self::Fsr0_256V => 0.256,
        }
    }

    /// Size of one LSB in volts for the given chip.
    pub fn lsb(self, model: Model) -> f64 {
        self.full_scale() / model.full_scale_counts()
    }
}

/// Device operating mode
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Mode {
    /// Continuous-conversion mode
    Continuous = 0,
    /// Single-shot mode or power-down state (default)
    #[default]
    SingleShot = 1,
}

impl From<u16> for Mode {
    fn from(word: u16) -> Self {
        match (word >> MODE_OFFSET) & 0x1 {
            0 => Mode::Continuous,
            _ => Mode::SingleShot,
        }
    }
}

/// Data rate code.
///
/// The same code selects a different rate on each chip, see [`DataRate::samples_per_second`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum DataRate {
    Dr0 = 0,
    Dr1 = 1,
    Dr2 = 2,
    Dr3 = 3,
    /// 1600 SPS on the ADS1015, 128 SPS on the ADS1115 (default)
    #[default]
    Dr4 = 4,
    Dr5 = 5,
    Dr6 = 6,
    Dr7 = 7,
}

impl From<u16> for DataRate {
    fn from(word: u16) -> Self {
        match (word >> DATA_RATE_OFFSET) & 0x7 {
            0 => DataRate::Dr0,
            1 => DataRate::Dr1,
            2 => DataRate::Dr2,
            3 => DataRate::Dr3,
            4 => DataRate::Dr4,
            5 => DataRate::Dr5,
            6 => DataRate::Dr6,
            _ => DataRate::Dr7,
        }
    }
}

impl DataRate {
    pub fn samples_per_second(self, model: Model) -> u32 {
        const ADS1015: [u32; 8] = [128, 250, 490, 920, 1600, 2400, 3300, 3300];
        const ADS1115: [u32; 8] = [8, 16, 32, 64, 128, 250, 475, 860];

        match model {
            Model::Ads1015 => ADS1015[self as usize],
            Model::Ads1115 => ADS1115[self as usize],
        }
    }

    /// Time one conversion takes at this rate.
    fn conversion_time(self, model: Model) -> Duration {
        Duration::from_micros(1_000_000 / self.samples_per_second(model) as u64)
    }
}

/// Comparator mode
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum CompMode {
    /// Traditional comparator (default)
    #[default]
    Traditional = 0,
    /// Window comparator
    Window = 1,
}

impl From<u16> for CompMode {
    fn from(word: u16) -> Self {
        match (word >> COMP_MODE_OFFSET) & 0x1 {
            0 => CompMode::Traditional,
            _ => CompMode::Window,
        }
    }
}

/// Polarity of the ALERT/RDY pin
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum CompPolarity {
    /// Active low (default)
    #[default]
    ActiveLow = 0,
    /// Active high
    ActiveHigh = 1,
}

impl From<u16> for CompPolarity {
    fn from(word: u16) -> Self {
        match (word >> COMP_POLARITY_OFFSET) & 0x1 {
            0 => CompPolarity::ActiveLow,
            _ => CompPolarity::ActiveHigh,
        }
    }
}

/// Whether the ALERT/RDY pin latches once asserted
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum CompLatch {
    /// Nonlatching comparator (default)
    #[default]
    Nonlatching = 0,
    /// Pin stays asserted until conversion data is read
    Latching = 1,
}

impl From<u16> for CompLatch {
    fn from(word: u16) -> Self {
        match (word >> COMP_LATCH_OFFSET) & 0x1 {
            0 => CompLatch::Nonlatching,
            _ => CompLatch::Latching,
        }
    }
}

/// Comparator queue and disable
///
/// Number of successive out-of-threshold conversions before ALERT/RDY asserts,
/// or `Disable` to turn the comparator off and leave the pin high-impedance.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum CompQueue {
    OneConversion = 0,
    TwoConversion = 1,
    FourConversion = 2,
    /// Disable comparator (default)
    #[default]
    Disable = 3,
}

impl From<u16> for CompQueue {
    fn from(word: u16) -> Self {
        match (word >> COMP_QUEUE_OFFSET) & 0x3 {
            0 => CompQueue::OneConversion,
            1 => CompQueue::TwoConversion,
            2 => CompQueue::FourConversion,
            _ => CompQueue::Disable,
        }
    }
}

/// The 16-bit Config register.
///
/// Each option is strongly typed, fields are private and set through the `with_*` builders.
/// For details see section 9.6.3 of the ADS1115 datasheet.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Config {
    os: Os,
    mux: Mux,
    pga: Pga,
    mode: Mode,
    data_rate: DataRate,
    comp_mode: CompMode,
    comp_polarity: CompPolarity,
    comp_latch: CompLatch,
    comp_queue: CompQueue,
}

impl From<u16> for Config {
    fn from(word: u16) -> Self {
        Self {
            os: Os::from(word),
            mux: Mux::from(word),
            pga: Pga::from(word),
            mode: Mode::from(word),
            data_rate: DataRate::from(word),
            comp_mode: CompMode::from(word),
            comp_polarity: CompPolarity::from(word),
            comp_latch: CompLatch::from(word),
            comp_queue: CompQueue::from(word),
        }
    }
}

impl From<Config> for u16 {
    fn from(config: Config) -> Self {
        let os = (config.os as u16) << OS_OFFSET;
        let mux = (config.mux as u16) << MUX_OFFSET;
        let pga = (config.pga as u16) << PGA_OFFSET;
        let mode = (config.mode as u16) << MODE_OFFSET;
        let data_rate = (config.data_rate as u16) << DATA_RATE_OFFSET;
        let comp_mode = (config.comp_mode as u16) << COMP_MODE_OFFSET;
        let comp_polarity = (config.comp_polarity as u16) << COMP_POLARITY_OFFSET;
        let comp_latch = (config.comp_latch as u16) << COMP_LATCH_OFFSET;
        let comp_queue = (config.comp_queue as u16) << COMP_QUEUE_OFFSET;

        os | mux | pga | mode | data_rate | comp_mode | comp_polarity | comp_latch | comp_queue
    }
}

impl Config {
    /// Single-shot conversion of one single-ended input.
    pub fn single_ended(channel: u8, gain: Gain) -> Result<Self> {
        Ok(Self::default()
            .with_os(Os::On)
            .with_mux(Mux::single_ended(channel)?)
            .with_pga(gain.into())
            .with_mode(Mode::SingleShot)
            .with_comp_queue(CompQueue::Disable))
    }

    pub fn with_os(mut self, os: Os) -> Self {
        self.os = os;
        self
    }

    pub fn with_mux(mut self, mux: Mux) -> Self {
        self.mux = mux;
        self
    }

    pub fn with_pga(mut self, pga: Pga) -> Self {
        self.pga = pga;
        self
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_comp_queue(mut self, comp_queue: CompQueue) -> Self {
        self.comp_queue = comp_queue;
        self
    }
}

/// In-memory ADS1x15 behind a register pointer, for targets without i2c-dev and for tests.
///
/// Registers hold 16 bit words sent MSB first. A single-shot start completes at once and
/// latches the code set with [`MockAds1x15::set_input`] for the selected input.
#[derive(Clone, Debug)]
pub struct MockAds1x15 {
    pointer: u8,
    registers: [u16; 4],
    inputs: [u16; 4],
}

impl Default for MockAds1x15 {
    fn default() -> Self {
        Self::new()
    }
}

impl MockAds1x15 {
    /// Mock in the power-on state, every input reading 0.
    pub fn new() -> Self {
        Self {
            pointer: CONVERSION_REG,
            registers: [0x0000, 0x8583, 0x8000, 0x7FFF],
            inputs: [0; 4],
        }
    }

    /// Code latched into the conversion register when `channel` is converted.
    pub fn set_input(&mut self, channel: u8, code: u16) {
        self.inputs[usize::from(channel & 0x3)] = code;
    }

    pub fn register(&self, register: u8) -> u16 {
        self.registers[usize::from(register & 0x3)]
    }

    fn start_conversion(&mut self) {
        let config = self.registers[usize::from(CONFIG_REG)];

        self.registers[usize::from(CONVERSION_REG)] = match Mux::from(config) {
            Mux::Ain0Gnd => self.inputs[0],
            Mux::Ain1Gnd => self.inputs[1],
            Mux::Ain2Gnd => self.inputs[2],
            Mux::Ain3Gnd => self.inputs[3],
            // Differential inputs are not simulated
            _ => 0,
        };
    }
}

fn unsupported(operation: &str) -> io::Error {
    io::Error::new(
        io::ErrorKind::Unsupported,
        format!("{} is not supported by the ADS1x15", operation),
    )
}

impl I2CDevice for MockAds1x15 {
    type Error = io::Error;

    fn read(&mut self, data: &mut [u8]) -> io::Result<()> {
        let word = self.register(self.pointer).to_be_bytes();

        if data.len() > word.len() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("read of {} bytes from a 16 bit register", data.len()),
            ));
        }

        data.copy_from_slice(&word[..data.len()]);
        Ok(())
    }

    fn write(&mut self, data: &[u8]) -> io::Result<()> {
        let (&pointer, payload) = data
            .split_first()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "empty write"))?;

        if pointer > HI_THRESH_REG {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("no register at {:#04x}", pointer),
            ));
        }
        self.pointer = pointer;

        match payload {
            [] => Ok(()),
            [msb, lsb] => {
                if pointer == CONVERSION_REG {
                    return Err(io::Error::new(
                        io::ErrorKind::PermissionDenied,
                        "conversion register is read-only",
                    ));
                }

                let word = u16::from_be_bytes([*msb, *lsb]);
                self.registers[usize::from(pointer)] = word;

                if pointer == CONFIG_REG && Os::from(word) == Os::On {
                    self.start_conversion();
                }
                Ok(())
            }
            _ => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("register writes take 2 bytes, got {}", payload.len()),
            )),
        }
    }

    fn smbus_write_quick(&mut self, _bit: bool) -> io::Result<()> {
        Err(unsupported("quick write"))
    }

    fn smbus_read_block_data(&mut self, _register: u8) -> io::Result<Vec<u8>> {
        Err(unsupported("block read"))
    }

    fn smbus_read_i2c_block_data(&mut self, _register: u8, _len: u8) -> io::Result<Vec<u8>> {
        Err(unsupported("block read"))
    }

    fn smbus_write_block_data(&mut self, _register: u8, _values: &[u8]) -> io::Result<()> {
        Err(unsupported("block write"))
    }

    fn smbus_write_i2c_block_data(&mut self, _register: u8, _values: &[u8]) -> io::Result<()> {
        Err(unsupported("block write"))
    }

    fn smbus_process_block(&mut self, _register: u8, _values: &[u8]) -> io::Result<Vec<u8>> {
        Err(unsupported("block process call"))
    }
}

/// One single-ended input of an ADS1x15.
///
/// Inputs of the same chip share its device handle. The handle stays locked from the
/// config write that starts a conversion until the result is read, so another input
/// cannot switch the multiplexer in between.
pub struct Ads1x15<D> {
    dev: SharedDevice<D>,
    model: Model,
    /// Configuration written at the start of every conversion
    config: Config,
}

impl<D> Ads1x15<D>
where
    D: I2CDevice,
    D::Error: Send + Sync + 'static,
{
    /// Bind `channel` of the chip behind `dev`.
    ///
    /// Will return an error if the single-shot config cannot be written to the chip and
    /// read back.
    pub fn new(dev: SharedDevice<D>, model: Model, channel: u8, gain: Gain) -> Result<Self> {
        let config = Config::single_ended(channel, gain)?;
        write_config(&mut *lock(&dev)?, config)?;

        Ok(Self { dev, model, config })
    }

    /// Start a single-shot conversion and return the signed result code.
    fn read_raw(&mut self) -> Result<i16> {
        let mut guard = lock(&self.dev)?;
        let dev = &mut *guard;

        write_word(dev, CONFIG_REG, self.config.with_os(Os::On).into())?;

        let wait = self.config.data_rate.conversion_time(self.model);
        let mut polls = 0;
        loop {
            std::thread::sleep(wait);

            if Os::from(read_word(dev, CONFIG_REG)?) == Os::On {
                break;
            }

            polls += 1;
            if polls >= CONVERSION_POLLS {
                bail!("conversion not ready after {} polls", polls);
            }
        }

        let word = read_word(dev, CONVERSION_REG)?;
        Ok(self.model.decode(word))
    }
}

impl<D> VoltageSource for Ads1x15<D>
where
    D: I2CDevice,
    D::Error: Send + Sync + 'static,
{
    fn read_voltage(&mut self) -> Result<f64> {
        let code = self.read_raw()?;

        Ok(code as f64 * self.config.pga.lsb(self.model))
    }
}

// The OS bit is excluded from the comparison since it reflects conversion state on read
fn write_config<D>(dev: &mut D, config: Config) -> Result<()>
where
    D: I2CDevice,
    D::Error: Send + Sync + 'static,
{
    write_word(dev, CONFIG_REG, config.into())?;
    let read_back = Config::from(read_word(dev, CONFIG_REG)?);

    ensure!(
        read_back.with_os(config.os) == config,
        "config read back as {:#06x}, wrote {:#06x}",
        u16::from(read_back),
        u16::from(config)
    );

    Ok(())
}

// SMBus words are little endian, the ADS1x15 sends its registers MSB first
fn read_word<D>(dev: &mut D, register: u8) -> Result<u16>
where
    D: I2CDevice,
    D::Error: Send + Sync + 'static,
{
    Ok(dev.smbus_read_word_data(register)?.swap_bytes())
}

fn write_word<D>(dev: &mut D, register: u8, word: u16) -> Result<()>
where
    D: I2CDevice,
    D::Error: Send + Sync + 'static,
{
    dev.smbus_write_word_data(register, word.swap_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn power_on_config_decodes_to_defaults() {
        let config = Config::from(0x8583);

        assert_eq!(config, Config::default());
        assert_eq!(u16::from(config), 0x8583);
    }

    #[test]
    fn single_ended_config_encodes_channel_and_gain() {
        let config = Config::single_ended(2, Gain::One).unwrap();
        let word = u16::from(config);

        assert_eq!((word >> MUX_OFFSET) & 0x7, Mux::Ain2Gnd as u16);
        assert_eq!((word >> PGA_OFFSET) & 0x7, Pga::Fsr4_096V as u16);
        assert_eq!(Config::from(word), config);
        assert!(Config::single_ended(4, Gain::One).is_err());
    }

    #[test]
    fn ads1015_results_are_sign_extended() {
        assert_eq!(Model::Ads1015.decode(0x7FF0), 2047);
        assert_eq!(Model::Ads1015.decode(0xFFF0), -1);
        assert_eq!(Model::Ads1015.decode(0x8000), -2048);
        assert_eq!(Model::Ads1115.decode(0x8000), i16::MIN);
    }

    #[test]
    fn lsb_matches_datasheet() {
        assert!((Pga::Fsr6_144V.lsb(Model::Ads1015) - 3E-3).abs() < 1E-12);
        assert!((Pga::Fsr0_256V.lsb(Model::Ads1015) - 0.125E-3).abs() < 1E-12);
        assert!((Pga::Fsr4_096V.lsb(Model::Ads1115) - 125E-6).abs() < 1E-12);
    }

    #[test]
    fn mock_registers_do_not_overlap() {
        let mut dev = MockAds1x15::new();

        assert_eq!(read_word(&mut dev, CONVERSION_REG).unwrap(), 0x0000);
        assert_eq!(read_word(&mut dev, CONFIG_REG).unwrap(), 0x8583);
        assert_eq!(read_word(&mut dev, LO_THRESH_REG).unwrap(), 0x8000);
        assert_eq!(read_word(&mut dev, HI_THRESH_REG).unwrap(), 0x7FFF);

        write_word(&mut dev, LO_THRESH_REG, 0x1234).unwrap();
        assert_eq!(read_word(&mut dev, CONFIG_REG).unwrap(), 0x8583);
        assert_eq!(read_word(&mut dev, HI_THRESH_REG).unwrap(), 0x7FFF);
        assert!(write_word(&mut dev, CONVERSION_REG, 0x4000).is_err());
    }

    #[test]
    fn reads_voltage_from_mock_device() {
        let mut mock = MockAds1x15::new();
        // 0x4000 is half of positive full scale
        mock.set_input(0, 0x4000);
        let dev = Arc::new(Mutex::new(mock));

        let mut adc = Ads1x15::new(dev.clone(), Model::Ads1115, 0, Gain::One).unwrap();
        let voltage = adc.read_voltage().unwrap();
        assert!((voltage - 2.048).abs() < 1E-9);

        let written = Config::from(dev.lock().unwrap().register(CONFIG_REG));
        assert_eq!(written, Config::single_ended(0, Gain::One).unwrap());
    }

    #[test]
    fn ads1015_reads_left_aligned_codes() {
        let mut mock = MockAds1x15::new();
        mock.set_input(3, 0x4000);
        let dev = Arc::new(Mutex::new(mock));

        let mut adc = Ads1x15::new(dev, Model::Ads1015, 3, Gain::One).unwrap();
        assert!((adc.read_voltage().unwrap() - 2.048).abs() < 1E-9);
    }

    #[test]
    fn inputs_sharing_a_chip_read_their_own_channel() {
        let mut mock = MockAds1x15::new();
        mock.set_input(0, 0x1000);
        mock.set_input(1, 0x3000);
        let dev = Arc::new(Mutex::new(mock));

        let workers: Vec<_> = [(0, 0x1000), (1, 0x3000)]
            .into_iter()
            .map(|(channel, code)| {
                let mut adc =
                    Ads1x15::new(dev.clone(), Model::Ads1115, channel, Gain::One).unwrap();
                let expected = code as f64 * Pga::Fsr4_096V.lsb(Model::Ads1115);

                std::thread::spawn(move || {
                    for _ in 0..20 {
                        let voltage = adc.read_voltage().unwrap();
                        assert!(
                            (voltage - expected).abs() < 1E-9,
                            "channel {} read {} V",
                            channel,
                            voltage
                        );
                    }
                })
            })
            .collect();

        for worker in workers {
            worker.join().unwrap();
        }
    }
}
