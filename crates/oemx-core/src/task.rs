//! Driver lifecycle and the streaming read loop
//!
//! [`CtdTask`] owns a [`CtdDriver`] and walks it through startup
//! (device info, handshake, watchdog) and then polls, parses and reports
//! samples until the supervisor stops it or a fatal fault occurs. Fatal
//! faults end the task with a [`RestartNeeded`] for the supervisor.

use std::time::{Duration, Instant};

use crate::config::{ConfigError, CtdConfig};
use crate::driver::{CtdDriver, DriverError, RestartNeeded, IO_FAILURE_BACKOFF};
use crate::protocol::{CommandReply, Transport};
use crate::supervisor::{EntityState, Supervisor};
use crate::watchdog::Watchdog;

/// Granularity of interruptible waits
const WAIT_SLICE: Duration = Duration::from_millis(100);

/// Settings of the task around the driver
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TaskSettings {
    /// Requested samples per second; validated by the initializer
    pub sample_rate: u32,
    /// Longest gap between valid samples
    pub input_timeout: Duration,
    /// Wait before the first exchange with the instrument
    pub startup_delay: Duration,
    /// Readiness poll timeout of each loop iteration
    pub poll_timeout: Duration,
}

impl TaskSettings {
    /// Settings taken from a validated configuration
    pub fn from_config(config: &CtdConfig) -> Self {
        Self {
            sample_rate: config.samples_per_second,
            input_timeout: config.input_timeout(),
            startup_delay: config.timing.startup_delay(),
            poll_timeout: config.timing.poll_timeout(),
        }
    }
}

/// Outcome of one loop iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Nothing to read within the poll timeout
    Idle,
    /// A valid sample was parsed and reported
    Sample,
    /// A line was read but skipped
    Skipped,
}

/// One driver instance together with its watchdog and supervisor
pub struct CtdTask<T: Transport, S: Supervisor> {
    driver: CtdDriver<T>,
    supervisor: S,
    settings: TaskSettings,
    watchdog: Watchdog,
    state: Option<EntityState>,
}

impl<T: Transport, S: Supervisor> CtdTask<T, S> {
    /// Build a task from a validated configuration
    pub fn new(transport: T, config: &CtdConfig, supervisor: S) -> Result<Self, ConfigError> {
        let driver = CtdDriver::with_options(transport, config.mounts()?, config.driver_options());
        Ok(Self::with_driver(
            driver,
            TaskSettings::from_config(config),
            supervisor,
        ))
    }

    /// Build a task around an existing driver
    pub fn with_driver(driver: CtdDriver<T>, settings: TaskSettings, supervisor: S) -> Self {
        Self {
            driver,
            supervisor,
            watchdog: Watchdog::new(settings.input_timeout),
            settings,
            state: None,
        }
    }

    /// Driver owned by the task
    pub fn driver(&self) -> &CtdDriver<T> {
        &self.driver
    }

    /// Driver owned by the task, mutably
    pub fn driver_mut(&mut self) -> &mut CtdDriver<T> {
        &mut self.driver
    }

    /// Host supervisor
    pub fn supervisor(&self) -> &S {
        &self.supervisor
    }

    /// Host supervisor, mutably
    pub fn supervisor_mut(&mut self) -> &mut S {
        &mut self.supervisor
    }

    /// Input watchdog
    pub fn watchdog_mut(&mut self) -> &mut Watchdog {
        &mut self.watchdog
    }

    /// Start up and stream until stopped
    pub fn execute(&mut self) -> Result<(), RestartNeeded> {
        if self.start()? {
            self.run()?;
        }
        Ok(())
    }

    /// Collect device info, run the handshake and arm the watchdog.
    ///
    /// Returns `Ok(false)` if the supervisor stopped the task meanwhile.
    pub fn start(&mut self) -> Result<bool, RestartNeeded> {
        self.report_state(EntityState::Booting);

        if !self.wait(self.settings.startup_delay) {
            return Ok(false);
        }

        let mounts = self.driver.mounts();
        tracing::info!(
            "P: {} | S: {} | T: {}",
            mounts.primary(),
            mounts.secondary(),
            mounts.sensor_count()
        );

        let info = match self.driver.collect_info(&self.supervisor) {
            Ok(Some(info)) => info,
            Ok(None) => return Ok(false),
            Err(e) => return Err(self.fault(e)),
        };

        tracing::info!("Firmware version: {}  SN: {}", info.version, info.serial);
        if mounts.primary() > 0 {
            tracing::info!("Primary Mount: {}", info.primary_mount);
        }
        for descriptor in &info.secondary_mounts {
            tracing::info!("Secondary Mount: {}", descriptor);
        }
        self.supervisor.on_device_info(&info);

        match self.driver.init_ctd(self.settings.sample_rate) {
            Ok(_) => {}
            Err(e @ DriverError::Handshake(_)) => {
                tracing::error!("{e}");
                return Err(RestartNeeded::new("failed to init CTD", IO_FAILURE_BACKOFF));
            }
            Err(e) => return Err(self.fault(e)),
        }

        self.watchdog.set_top(self.settings.input_timeout);
        Ok(true)
    }

    /// Stream samples until the supervisor stops the task.
    ///
    /// On a regular stop a closing command is sent to the instrument; its
    /// outcome does not matter.
    pub fn run(&mut self) -> Result<(), RestartNeeded> {
        while !self.supervisor.is_stopping() {
            self.step()?;
        }

        match self.driver.send_command(&CommandReply::closing()) {
            Ok(answered) => tracing::debug!("closing command answered: {answered}"),
            Err(e) => tracing::debug!("closing command failed: {e}"),
        }
        Ok(())
    }

    /// One iteration of the read loop
    pub fn step(&mut self) -> Result<StepOutcome, RestartNeeded> {
        self.supervisor.consume_messages();

        if self.watchdog.overflow() {
            return Err(self.fault(DriverError::WatchdogOverflow(self.watchdog.top())));
        }

        let poll_timeout = self.settings.poll_timeout;
        match self.driver.transport_mut().poll(poll_timeout) {
            Ok(true) => {}
            Ok(false) => return Ok(StepOutcome::Idle),
            Err(e) => return Err(self.fault(e.into())),
        }

        match self.driver.have_new_data() {
            Ok(m) => {
                tracing::info!(
                    "C: {:.4} | P: {:.4} | T: {:.4} | S: {:.4} | V: {:.4}",
                    m.conductivity,
                    m.pressure,
                    m.temperature,
                    m.salinity,
                    m.sound_speed
                );
                self.report_state(EntityState::Normal);
                self.supervisor.on_measurement(&m);
                self.watchdog.reset();
                Ok(StepOutcome::Sample)
            }
            Err(e) if !e.is_fatal() => {
                tracing::debug!("skipping line: {e}");
                Ok(StepOutcome::Skipped)
            }
            Err(e) => Err(self.fault(e)),
        }
    }

    /// Report the error state and turn `e` into the restart signal
    fn fault(&mut self, e: DriverError) -> RestartNeeded {
        tracing::error!("{e}");
        self.report_state(EntityState::Error);
        RestartNeeded::from(e)
    }

    fn report_state(&mut self, state: EntityState) {
        if self.state != Some(state) {
            self.state = Some(state);
            self.supervisor.set_entity_state(state);
        }
    }

    /// Sleep for `duration` unless stopped first; `false` when stopped
    fn wait(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if self.supervisor.is_stopping() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            std::thread::sleep(WAIT_SLICE.min(deadline - now));
        }
    }
}
