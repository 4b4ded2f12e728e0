mod config;
mod host_async;
mod sensor_sync;

use anyhow::Result;
use brewpress_api::remote::HostEvent;
use brewpress_hw::host::ChannelHost;
use brewpress_hw::poll::RunState;
use clap::Parser;
use config::AppConfig;
use ctrlc;
use host_async::HistoryLog;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tokio::runtime::Builder;
use tokio::sync::mpsc;
use tracing::{event, Level};
use tracing_subscriber::EnvFilter;

// Events buffered between the sensor threads and the tokio runtime
const EVENT_CAPACITY: usize = 64;

/// Poll I2C pressure transducers and publish their readings.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// TOML configuration file
    #[arg(default_value = "brewpress.toml")]
    config: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = AppConfig::load(&args.config)?;
    event!(
        Level::INFO,
        "loaded {} sensor(s) from {}",
        config.sensors.len(),
        args.config.display()
    );

    let (event_tx, event_rx) = mpsc::channel::<HostEvent>(EVENT_CAPACITY);

    // Create new single threaded runtime
    let rt = Builder::new_current_thread().enable_all().build()?;

    // Bind and open the history before any sensor starts so a bad address or path fails fast
    let (listener, history) = rt.block_on(async {
        let listener = TcpListener::bind(&config.bind_addr).await?;
        event!(Level::INFO, "state feed available on: {}", config.bind_addr);
        let history = HistoryLog::open(&config.history_path).await?;
        anyhow::Ok((listener, history))
    })?;

    // Run tokio runtime on its own thread
    // Fatal errors on the tokio runtime thread should not take the sensor threads down
    let tokio_handle = std::thread::spawn(move || {
        rt.block_on(async move {
            match host_async::tokio_main(event_rx, listener, history).await {
                Ok(()) => event!(Level::INFO, "tokio runtime exited successfully"),
                Err(e) => event!(Level::ERROR, "tokio runtime exited with error: {}", e),
            }
        });
    });

    // Hook into ctrl + c shut down signal
    // Sensors finish their current cycle, once the last one exits the event channel
    // closes and the tokio runtime drains it before returning
    let running = RunState::new(true);
    let running_c = running.clone();
    ctrlc::set_handler(move || {
        event!(Level::INFO, "exiting...");
        running_c.stop();
    })?;

    let sensors = sensor_sync::spawn_sensors(&config, ChannelHost::new(event_tx), &running)?;
    for sensor in sensors {
        if sensor.join().is_err() {
            event!(Level::ERROR, "sensor thread panicked");
        }
    }

    if tokio_handle.join().is_err() {
        event!(Level::ERROR, "tokio runtime thread panicked");
    }

    event!(Level::INFO, "exited");
    Ok(())
}
