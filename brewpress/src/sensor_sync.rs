use crate::config::AppConfig;
use anyhow::Result;
use brewpress_hw::adc::ads1x15::{self, Ads1x15, PlatformDevice};
use brewpress_hw::adc::bus::I2cBus;
use brewpress_hw::host::ChannelHost;
use brewpress_hw::poll::{PressureSensor, RunState};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Start one polling thread per configured sensor.
///
/// Hardware reads block, so every sensor gets an OS thread of its own. Sensors at the same
/// address share one device handle and take turns on the chip, a hung read stalls only
/// the sensors of that chip. Threads exit once `running` is cleared and their current
/// sleep has elapsed.
pub fn spawn_sensors(
    config: &AppConfig,
    host: ChannelHost,
    running: &RunState,
) -> Result<Vec<JoinHandle<()>>> {
    let bus = Arc::new(I2cBus::<PlatformDevice>::new(
        config.i2c_bus.clone(),
        ads1x15::open_device,
    ));

    config
        .sensors
        .iter()
        .map(|props| -> Result<JoinHandle<()>> {
            let props = props.clone();
            let host = host.clone();
            let running = running.clone();
            let bus = bus.clone();
            let default_unit = config.default_pressure_unit.clone();

            let handle = std::thread::Builder::new()
                .name(format!("sensor-{}", props.id))
                .spawn(move || {
                    let mut sensor =
                        PressureSensor::new(&props, default_unit.as_deref(), host, |c| {
                            let dev = bus.device(c.device_address)?;
                            Ads1x15::new(dev, c.adc, c.channel_index, c.gain)
                        });
                    sensor.run(&running);
                })?;

            Ok(handle)
        })
        .collect()
}
