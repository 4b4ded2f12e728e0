use anyhow::{bail, Context, Result};
use brewpress_hw::config::SensorProps;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Process configuration, read once at startup.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Address the WebSocket state feed listens on
    pub bind_addr: String,
    /// Linux path of the I2C bus the ADCs sit on
    pub i2c_bus: String,
    /// File the historical log is appended to, one line protocol entry per reading
    pub history_path: PathBuf,
    /// Unit for sensors that do not name one
    pub default_pressure_unit: Option<String>,
    #[serde(rename = "sensor")]
    pub sensors: Vec<SensorProps>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:9090".to_owned(),
            i2c_bus: "/dev/i2c-1".to_owned(),
            history_path: PathBuf::from("pressure_history.lp"),
            default_pressure_unit: None,
            sensors: Vec::new(),
        }
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;

        Self::parse(&text).with_context(|| format!("invalid config file {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;

        // Sensor ids key the live snapshot and the history log
        let mut ids = HashSet::new();
        for props in &config.sensors {
            if !ids.insert(props.id.as_str()) {
                bail!("sensor id `{}` is used more than once", props.id);
            }
        }

        Ok(config)
    }
}
