//! A pressure sensor instance and its poll loop.
//!
//! Each sensor owns its ADC handle, mapper constants, calibration and last reading.
//! [`PressureSensor::run`] is meant to get a thread of its own.

use crate::adc::VoltageSource;
use crate::config::{ChannelConfig, SensorProps};
use crate::error::{InitError, ReadError, SensorError};
use crate::host::Host;
use crate::sensor::{unit, CalibrationModel, LinearPressureMapper, Sensor, UnitConverter};
use anyhow::Result;
use brewpress_api::notify::Notification;
use brewpress_api::sensor::SensorReading;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{event, Level};

/// Start/stop flag shared between the host and any number of poll loops.
#[derive(Clone, Debug)]
pub struct RunState(Arc<AtomicBool>);

impl RunState {
    pub fn new(running: bool) -> Self {
        Self(Arc::new(AtomicBool::new(running)))
    }

    pub fn start(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn stop(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Read-only view of a sensor's last published reading, usable from any thread.
#[derive(Clone, Debug)]
pub struct StateHandle(watch::Receiver<Option<SensorReading>>);

impl StateHandle {
    pub fn get_current_state(&self) -> Option<SensorReading> {
        self.0.borrow().clone()
    }
}

/// Everything between a voltage and a published value.
struct Pipeline<S> {
    config: ChannelConfig,
    source: S,
    mapper: LinearPressureMapper,
    calibration: CalibrationModel,
    converter: UnitConverter,
}

impl<S: VoltageSource> Pipeline<S> {
    // Config and mapper are validated before the device is touched
    fn build<F>(config: ChannelConfig, open: F) -> Result<Self, SensorError>
    where
        F: FnOnce(&ChannelConfig) -> Result<S>,
    {
        let mapper = LinearPressureMapper::new(
            config.max_rated_pressure,
            config.min_voltage,
            config.max_voltage,
        )?;
        let calibration = CalibrationModel::fit(&config.calibration);
        let converter = UnitConverter::new(config.display_unit, config.offset);

        let source = open(&config).map_err(|e| InitError {
            address: config.device_address,
            channel: config.channel_index,
            source: e.into(),
        })?;

        Ok(Self {
            config,
            source,
            mapper,
            calibration,
            converter,
        })
    }

    fn sample(&mut self) -> Result<f64, ReadError> {
        let voltage = self
            .source
            .read_voltage()
            .map_err(|e| ReadError::Source(e.into()))?;

        let raw = self.mapper.conversion(voltage);
        let value = self.converter.convert(self.calibration.apply(raw));

        if !value.is_finite() {
            return Err(ReadError::NonFinite { voltage });
        }

        Ok(value)
    }
}

/// One pressure transducer published to a host.
///
/// A sensor whose configuration or hardware failed at construction stays inert: it has
/// notified the host once and never reads.
pub struct PressureSensor<S, H> {
    id: String,
    host: H,
    state: watch::Sender<Option<SensorReading>>,
    pipeline: Result<Pipeline<S>, SensorError>,
}

impl<S: VoltageSource, H: Host> PressureSensor<S, H> {
    /// Resolve the configuration, fit the calibration and open the voltage source.
    ///
    /// `default_unit` is the process-wide unit used when `props` names none. `open` is only
    /// called once the configuration is known to be valid.
    pub fn new<F>(props: &SensorProps, default_unit: Option<&str>, host: H, open: F) -> Self
    where
        F: FnOnce(&ChannelConfig) -> Result<S>,
    {
        let (display_unit, warning) = unit::resolve_unit(props.unit.as_deref(), default_unit);
        if let Some(warning) = warning {
            event!(Level::WARN, sensor = %props.id, "{}", warning.message);
            host.notify(warning);
        }

        let pipeline = ChannelConfig::from_props(props, display_unit)
            .map_err(SensorError::from)
            .and_then(|config| Pipeline::build(config, open));

        match &pipeline {
            Ok(p) => event!(
                Level::INFO,
                sensor = %props.id,
                "initialised at {:#04x} channel {}, calibration {:?}, unit {}",
                p.config.device_address,
                p.config.channel_index,
                p.calibration,
                display_unit
            ),
            Err(e) => {
                event!(Level::ERROR, sensor = %props.id, "sensor disabled: {}", e);
                host.notify(init_notification(e));
            }
        }

        let (state, _) = watch::channel(None);

        Self {
            id: props.id.clone(),
            host,
            state,
            pipeline,
        }
    }

    /// Construction error that left the sensor inert, if any.
    pub fn fault(&self) -> Option<&SensorError> {
        self.pipeline.as_ref().err()
    }

    pub fn is_functional(&self) -> bool {
        self.pipeline.is_ok()
    }

    /// Last published reading, `None` until the first successful poll.
    pub fn get_current_state(&self) -> Option<SensorReading> {
        self.state.borrow().clone()
    }

    pub fn state_handle(&self) -> StateHandle {
        StateHandle(self.state.subscribe())
    }

    /// Run one acquisition cycle and publish the result.
    ///
    /// A failed read is logged and publishes nothing, the previous reading stays current.
    /// Returns the published reading.
    pub fn tick(&mut self) -> Option<SensorReading> {
        let pipeline = self.pipeline.as_mut().ok()?;

        match pipeline.sample() {
            Ok(value) => {
                let reading = SensorReading::new(&self.id, value, pipeline.converter.unit());

                self.state.send_replace(Some(reading.clone()));
                self.host.push_live_value(&reading);
                self.host.append_history(&reading);

                Some(reading)
            }
            Err(e) => {
                event!(
                    Level::WARN,
                    sensor = %self.id,
                    "error reading address {:#04x} channel {}: {}",
                    pipeline.config.device_address,
                    pipeline.config.channel_index,
                    e
                );
                None
            }
        }
    }

    /// Poll until `running` is cleared.
    ///
    /// The flag is checked once per cycle, so a stop takes effect within one poll interval.
    /// Returns immediately for an inert sensor.
    pub fn run(&mut self, running: &RunState) {
        let interval = match &self.pipeline {
            Ok(p) => p.config.poll_interval(),
            Err(_) => {
                event!(Level::INFO, sensor = %self.id, "sensor is not functional, not polling");
                return;
            }
        };

        event!(Level::INFO, sensor = %self.id, "polling every {:?}", interval);

        while running.is_running() {
            self.tick();
            std::thread::sleep(interval);
        }

        event!(Level::INFO, sensor = %self.id, "polling stopped");
    }
}

fn init_notification(error: &SensorError) -> Notification {
    match error {
        SensorError::Config(e) => Notification::error(
            "Pressure Sensor Config Error",
            format!("Invalid sensor configuration: {}", e),
        ),
        SensorError::Init(e) => Notification::error(
            "Pressure Sensor Init Error",
            format!(
                "Cant read from input, Address: {:#04x}, Pin: {}, Error: {}",
                e.address, e.channel, e.source
            ),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;
    use anyhow::anyhow;
    use brewpress_api::notify::Severity;
    use brewpress_api::sensor::PressureUnit;
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;
    use std::rc::Rc;

    /// Plays back a fixed sequence of read results.
    struct ScriptedSource {
        script: VecDeque<Result<f64>>,
        reads: Rc<Cell<usize>>,
    }

    impl ScriptedSource {
        fn new(script: Vec<Result<f64>>) -> (Self, Rc<Cell<usize>>) {
            let reads = Rc::new(Cell::new(0));
            let source = Self {
                script: script.into(),
                reads: reads.clone(),
            };
            (source, reads)
        }
    }

    impl VoltageSource for ScriptedSource {
        fn read_voltage(&mut self) -> Result<f64> {
            self.reads.set(self.reads.get() + 1);
            self.script
                .pop_front()
                .unwrap_or_else(|| Err(anyhow!("script exhausted")))
        }
    }

    #[derive(Debug, PartialEq)]
    enum Published {
        Live(f64),
        History(f64),
        Notify(Notification),
    }

    #[derive(Default)]
    struct RecordingHost {
        events: RefCell<Vec<Published>>,
    }

    impl Host for RecordingHost {
        fn push_live_value(&self, reading: &SensorReading) {
            self.events.borrow_mut().push(Published::Live(reading.value));
        }

        fn append_history(&self, reading: &SensorReading) {
            self.events
                .borrow_mut()
                .push(Published::History(reading.value));
        }

        fn notify(&self, notification: Notification) {
            self.events
                .borrow_mut()
                .push(Published::Notify(notification));
        }
    }

    fn psi_props() -> SensorProps {
        SensorProps {
            id: "fermenter".to_owned(),
            unit: Some("PSI".to_owned()),
            ..SensorProps::default()
        }
    }

    #[test]
    fn publishes_live_then_history() {
        let host = RecordingHost::default();
        let (source, _) = ScriptedSource::new(vec![Ok(4.5)]);
        let mut sensor = PressureSensor::new(&psi_props(), None, &host, |_| Ok(source));

        let reading = sensor.tick().unwrap();

        assert!((reading.value - 80.0).abs() < 1E-9);
        assert_eq!(reading.unit, PressureUnit::Psi);
        assert_eq!(sensor.get_current_state(), Some(reading.clone()));
        assert_eq!(
            *host.events.borrow(),
            vec![
                Published::Live(reading.value),
                Published::History(reading.value)
            ]
        );
    }

    #[test]
    fn failed_read_keeps_previous_state() {
        let host = RecordingHost::default();
        let (source, reads) =
            ScriptedSource::new(vec![Ok(4.5), Err(anyhow!("bus timeout")), Ok(0.527)]);
        let mut sensor = PressureSensor::new(&psi_props(), None, &host, |_| Ok(source));
        let handle = sensor.state_handle();

        let first = sensor.tick().unwrap();
        assert!(sensor.tick().is_none());
        assert_eq!(sensor.get_current_state(), Some(first.clone()));
        assert_eq!(handle.get_current_state(), Some(first));
        assert_eq!(host.events.borrow().len(), 2);

        let third = sensor.tick().unwrap();
        assert!(third.value.abs() < 1E-9);
        assert_eq!(handle.get_current_state(), Some(third));
        assert_eq!(host.events.borrow().len(), 4);
        assert_eq!(reads.get(), 3);
    }

    #[test]
    fn non_finite_values_are_not_published() {
        let host = RecordingHost::default();
        let (source, _) = ScriptedSource::new(vec![Ok(f64::NAN)]);
        let mut sensor = PressureSensor::new(&psi_props(), None, &host, |_| Ok(source));

        assert!(sensor.tick().is_none());
        assert!(sensor.get_current_state().is_none());
        assert!(host.events.borrow().is_empty());
    }

    #[test]
    fn degenerate_range_never_opens_or_reads() {
        let host = RecordingHost::default();
        let props = SensorProps {
            min_voltage: 2.5,
            max_voltage: 2.5,
            ..psi_props()
        };
        let opened = Cell::new(false);
        let mut sensor = PressureSensor::new(&props, None, &host, |_| {
            opened.set(true);
            Ok(ScriptedSource::new(vec![Ok(1.0)]).0)
        });

        assert!(!opened.get());
        assert!(matches!(
            sensor.fault(),
            Some(SensorError::Config(ConfigError::DegenerateVoltageRange { .. }))
        ));
        assert!(sensor.tick().is_none());
        sensor.run(&RunState::new(true));

        let events = host.events.borrow();
        assert_eq!(events.len(), 1);
        match &events[0] {
            Published::Notify(n) => assert_eq!(n.severity, Severity::Error),
            other => panic!("expected a notification, got {:?}", other),
        }
    }

    #[test]
    fn open_failure_notifies_once_with_address() {
        let host = RecordingHost::default();
        let mut sensor: PressureSensor<ScriptedSource, _> =
            PressureSensor::new(&psi_props(), None, &host, |_| Err(anyhow!("no such device")));

        assert!(!sensor.is_functional());
        assert!(sensor.tick().is_none());
        assert!(sensor.tick().is_none());

        let events = host.events.borrow();
        assert_eq!(events.len(), 1);
        match &events[0] {
            Published::Notify(n) => {
                assert_eq!(n.title, "Pressure Sensor Init Error");
                assert!(n.message.contains("0x48"));
                assert!(n.message.contains("no such device"));
            }
            other => panic!("expected a notification, got {:?}", other),
        }
    }

    #[test]
    fn missing_unit_defaults_to_kpa_with_warning() {
        let host = RecordingHost::default();
        let props = SensorProps {
            unit: None,
            ..psi_props()
        };
        let (source, _) = ScriptedSource::new(vec![Ok(4.5)]);
        let mut sensor = PressureSensor::new(&props, None, &host, |_| Ok(source));

        assert!(sensor.is_functional());
        assert_eq!(sensor.tick().map(|r| r.value), Some(552.0));
        assert!(matches!(
            host.events.borrow()[0],
            Published::Notify(Notification {
                severity: Severity::Warning,
                ..
            })
        ));
    }

    #[test]
    fn stopped_run_state_does_not_poll() {
        let host = RecordingHost::default();
        let (source, reads) = ScriptedSource::new(vec![Ok(4.5)]);
        let mut sensor = PressureSensor::new(&psi_props(), None, &host, |_| Ok(source));

        sensor.run(&RunState::new(false));

        assert_eq!(reads.get(), 0);
    }

    /// Clears the run flag once a number of readings has been published.
    struct StopAfter {
        running: RunState,
        remaining: Cell<usize>,
        published: Cell<usize>,
    }

    impl Host for StopAfter {
        fn push_live_value(&self, _reading: &SensorReading) {}

        fn append_history(&self, _reading: &SensorReading) {
            self.published.set(self.published.get() + 1);
            self.remaining.set(self.remaining.get() - 1);
            if self.remaining.get() == 0 {
                self.running.stop();
            }
        }

        fn notify(&self, _notification: Notification) {}
    }

    #[test]
    fn run_survives_a_failed_read_and_stops_at_the_sleep_boundary() {
        let running = RunState::new(true);
        let host = StopAfter {
            running: running.clone(),
            remaining: Cell::new(2),
            published: Cell::new(0),
        };
        let props = SensorProps {
            interval: 1,
            ..psi_props()
        };
        let (source, reads) = ScriptedSource::new(vec![
            Ok(4.5),
            Err(anyhow!("bus timeout")),
            Ok(0.527),
            Ok(4.5),
        ]);
        let mut sensor = PressureSensor::new(&props, None, &host, |_| Ok(source));
        let handle = sensor.state_handle();

        sensor.run(&running);

        assert_eq!(reads.get(), 3);
        assert_eq!(host.published.get(), 2);
        assert!(handle.get_current_state().unwrap().value.abs() < 1E-9);
    }

    #[test]
    fn run_state_is_shared_between_clones() {
        let running = RunState::new(true);
        let remote = running.clone();

        remote.stop();
        assert!(!running.is_running());
        remote.start();
        assert!(running.is_running());
    }
}
