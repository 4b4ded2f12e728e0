//! What a sensor needs from the process hosting it.

use brewpress_api::notify::Notification;
use brewpress_api::remote::HostEvent;
use brewpress_api::sensor::SensorReading;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{event, Level};

/// Publication side of the host. Calls are fire-and-forget and must not block the poll loop.
pub trait Host {
    /// Replace the value shown for the sensor.
    fn push_live_value(&self, reading: &SensorReading);

    /// Record the value in the historical log.
    fn append_history(&self, reading: &SensorReading);

    /// Tell the user about a condition that needs their attention.
    fn notify(&self, notification: Notification);
}

impl<H: Host + ?Sized> Host for &H {
    fn push_live_value(&self, reading: &SensorReading) {
        (**self).push_live_value(reading)
    }

    fn append_history(&self, reading: &SensorReading) {
        (**self).append_history(reading)
    }

    fn notify(&self, notification: Notification) {
        (**self).notify(notification)
    }
}

impl<H: Host + ?Sized> Host for Arc<H> {
    fn push_live_value(&self, reading: &SensorReading) {
        (**self).push_live_value(reading)
    }

    fn append_history(&self, reading: &SensorReading) {
        (**self).append_history(reading)
    }

    fn notify(&self, notification: Notification) {
        (**self).notify(notification)
    }
}

/// Host reached through a bounded channel into the tokio runtime.
///
/// Sends never wait. When the channel is full or closed the event is dropped and logged.
#[derive(Clone, Debug)]
pub struct ChannelHost {
    tx: mpsc::Sender<HostEvent>,
}

impl ChannelHost {
    pub fn new(tx: mpsc::Sender<HostEvent>) -> Self {
        Self { tx }
    }

    fn send(&self, host_event: HostEvent) {
        if let Err(e) = self.tx.try_send(host_event) {
            event!(Level::ERROR, "failed to send event to host runtime: {}", e);
        }
    }
}

impl Host for ChannelHost {
    fn push_live_value(&self, reading: &SensorReading) {
        self.send(HostEvent::Live(reading.clone()));
    }

    fn append_history(&self, reading: &SensorReading) {
        self.send(HostEvent::History(reading.clone()));
    }

    fn notify(&self, notification: Notification) {
        self.send(HostEvent::Notify(notification));
    }
}
