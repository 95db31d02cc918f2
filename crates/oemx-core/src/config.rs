//! Driver configuration
//!
//! Loaded from a JSON file by the host. Every field has a default so a
//! partial file only needs to name what differs.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::driver::{DriverOptions, MountConfiguration};
use crate::protocol::DEFAULT_BAUD_RATE;

/// Shortest accepted input timeout, in seconds
pub const MIN_INPUT_TIMEOUT_SECS: f64 = 1.0;

/// Errors that can occur while loading or validating configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Reading or writing the file failed
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The file is not valid configuration JSON
    #[error("Parse error: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Sensor lists the driver cannot read samples for
    #[error("Invalid mounts (primary {primary}, secondary {secondary}): {reason}")]
    InvalidMounts {
        /// Primary sensor count
        primary: usize,
        /// Secondary sensor count
        secondary: usize,
        /// Rule that was broken
        reason: String,
    },

    /// A value outside its accepted range
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue {
        /// Offending key
        field: String,
        /// Accepted range
        message: String,
    },
}

/// Serial port settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialSettings {
    /// Serial port device
    pub device: String,
    /// Baud rate
    pub baud_rate: u32,
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            device: String::new(),
            baud_rate: DEFAULT_BAUD_RATE,
        }
    }
}

/// Delays and timeouts, in seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingSettings {
    /// Wait after acquiring the port before talking to the instrument
    pub startup_delay: f64,
    /// Wait for a handshake reply
    pub exchange_timeout: f64,
    /// Pause between the wake-up CR and the handshake
    pub wake_delay: f64,
    /// Pause between command-mode probes while resynchronising
    pub resync_delay: f64,
    /// Readiness poll timeout of the read loop
    pub poll_timeout: f64,
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self {
            startup_delay: 5.0,
            exchange_timeout: 1.0,
            wake_delay: 1.0,
            resync_delay: 2.0,
            poll_timeout: 1.0,
        }
    }
}

impl TimingSettings {
    /// All delays zero and timeouts short, for simulated instruments
    pub fn immediate() -> Self {
        Self {
            startup_delay: 0.0,
            exchange_timeout: 0.1,
            wake_delay: 0.0,
            resync_delay: 0.0,
            poll_timeout: 0.1,
        }
    }

    /// Startup delay as a duration
    pub fn startup_delay(&self) -> Duration {
        secs(self.startup_delay)
    }

    /// Read-loop poll timeout as a duration
    pub fn poll_timeout(&self) -> Duration {
        secs(self.poll_timeout)
    }
}

/// Complete configuration of one CTD
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CtdConfig {
    /// Serial port the instrument is attached to
    pub serial: SerialSettings,
    /// Seconds without a valid sample before reporting an error
    pub input_timeout_secs: f64,
    /// Samples per second in monitor mode (1..=5)
    pub samples_per_second: u32,
    /// Sensors fitted to the primary mount
    pub primary_mount: Vec<String>,
    /// Sensors fitted to the secondary mount
    pub secondary_mount: Vec<String>,
    /// Added to conductivity before computing salinity (mS/cm)
    pub conductivity_offset: f64,
    /// Delays and timeouts
    pub timing: TimingSettings,
}

impl Default for CtdConfig {
    fn default() -> Self {
        Self {
            serial: SerialSettings::default(),
            input_timeout_secs: 4.0,
            samples_per_second: 1,
            primary_mount: Vec::new(),
            secondary_mount: Vec::new(),
            conductivity_offset: 0.0,
            timing: TimingSettings::default(),
        }
    }
}

impl CtdConfig {
    /// Load and validate a JSON configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parse and validate a JSON configuration string
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: CtdConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration as pretty-printed JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Reject values the driver cannot work with.
    ///
    /// The sample rate is deliberately not checked here: the initializer
    /// substitutes out-of-range rates with a warning.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.input_timeout_secs >= MIN_INPUT_TIMEOUT_SECS) {
            return Err(ConfigError::InvalidValue {
                field: "input_timeout_secs".into(),
                message: format!("must be at least {MIN_INPUT_TIMEOUT_SECS}"),
            });
        }

        let timing = [
            ("startup_delay", self.timing.startup_delay),
            ("exchange_timeout", self.timing.exchange_timeout),
            ("wake_delay", self.timing.wake_delay),
            ("resync_delay", self.timing.resync_delay),
            ("poll_timeout", self.timing.poll_timeout),
        ];
        for (field, value) in timing {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigError::InvalidValue {
                    field: format!("timing.{field}"),
                    message: "must be a non-negative number of seconds".into(),
                });
            }
        }

        if !self.conductivity_offset.is_finite() {
            return Err(ConfigError::InvalidValue {
                field: "conductivity_offset".into(),
                message: "must be finite".into(),
            });
        }

        self.mounts().map(|_| ())
    }

    /// Mount configuration derived from the sensor lists
    pub fn mounts(&self) -> Result<MountConfiguration, ConfigError> {
        MountConfiguration::new(self.primary_mount.len(), self.secondary_mount.len())
    }

    /// Watchdog interval
    pub fn input_timeout(&self) -> Duration {
        secs(self.input_timeout_secs)
    }

    /// Options for [`CtdDriver`](crate::driver::CtdDriver)
    pub fn driver_options(&self) -> DriverOptions {
        DriverOptions {
            exchange_timeout: secs(self.timing.exchange_timeout),
            wake_delay: secs(self.timing.wake_delay),
            resync_delay: secs(self.timing.resync_delay),
            conductivity_offset: self.conductivity_offset,
        }
    }
}

fn secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO)
}
