//! Device handles shared by every input read from one chip.

use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{event, Level};

/// An I2C device used from several poll threads.
pub type SharedDevice<D> = Arc<Mutex<D>>;

/// Lock a shared device for a sequence of transactions.
pub fn lock<D>(dev: &SharedDevice<D>) -> Result<MutexGuard<'_, D>> {
    dev.lock().map_err(|_| anyhow!("i2c device lock poisoned"))
}

/// The devices opened on one I2C bus, one handle per address.
pub struct I2cBus<D> {
    path: String,
    open: fn(&str, u16) -> Result<D>,
    devices: Mutex<HashMap<u16, SharedDevice<D>>>,
}

impl<D> I2cBus<D> {
    /// `open` is called at most once per address that opens successfully.
    pub fn new(path: impl Into<String>, open: fn(&str, u16) -> Result<D>) -> Self {
        Self {
            path: path.into(),
            open,
            devices: Mutex::new(HashMap::new()),
        }
    }

    /// Handle to the device at `addr`, opened on first use.
    ///
    /// A failed open is not remembered, the next caller tries again.
    pub fn device(&self, addr: u16) -> Result<SharedDevice<D>> {
        let mut devices = self
            .devices
            .lock()
            .map_err(|_| anyhow!("i2c bus lock poisoned"))?;

        if let Some(dev) = devices.get(&addr) {
            return Ok(dev.clone());
        }

        let dev = Arc::new(Mutex::new((self.open)(&self.path, addr)?));
        devices.insert(addr, dev.clone());
        event!(Level::DEBUG, "opened {:#04x} on {}", addr, self.path);

        Ok(dev)
    }
}
