//! OEMX CTD driver
//!
//! Command/reply handshake, device-info harvesting and streaming-sample
//! parsing on top of a [`Transport`]. The driver is single-owner and
//! blocking; the read loop that drives it lives in [`crate::task`].

mod error;
mod exchange;
mod info;
mod init;
mod sample;

pub use error::{DriverError, HandshakeStep, RestartNeeded, IO_FAILURE_BACKOFF};
pub use info::{parse_info_dump, MAX_DUMP_SIZE};
pub use sample::{scan_fields, WireFields};

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::ConfigError;
use crate::protocol::{Transport, DEFAULT_TIMEOUT};

/// One set of physical quantities derived from a sample line
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// Temperature (°C)
    pub temperature: f64,
    /// Practical salinity (PSU), never negative
    pub salinity: f64,
    /// Pressure (dbar)
    pub pressure: f64,
    /// Conductivity (mS/cm)
    pub conductivity: f64,
    /// Speed of sound (m/s)
    pub sound_speed: f64,
}

/// Identification harvested from the instrument's option dump
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Firmware version
    pub version: String,
    /// Instrument serial number
    pub serial: String,
    /// Primary mount descriptor (empty without primary sensors)
    pub primary_mount: String,
    /// One descriptor per secondary-mount sensor
    pub secondary_mounts: Vec<String>,
}

/// Number of sensors fitted to each mount
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountConfiguration {
    primary: usize,
    secondary: usize,
}

impl MountConfiguration {
    /// Sensors a single mount can carry
    pub const MAX_PER_MOUNT: usize = 2;
    /// Channels a sample line can carry
    pub const MAX_SENSORS: usize = 3;

    /// Validate sensor counts: at most two per mount, one to three in total
    pub fn new(primary: usize, secondary: usize) -> Result<Self, ConfigError> {
        if primary > Self::MAX_PER_MOUNT || secondary > Self::MAX_PER_MOUNT {
            return Err(ConfigError::InvalidMounts {
                primary,
                secondary,
                reason: format!("at most {} sensors per mount", Self::MAX_PER_MOUNT),
            });
        }
        let total = primary + secondary;
        if total == 0 || total > Self::MAX_SENSORS {
            return Err(ConfigError::InvalidMounts {
                primary,
                secondary,
                reason: format!("total must be within 1..={}", Self::MAX_SENSORS),
            });
        }
        Ok(Self { primary, secondary })
    }

    /// Sensors on the primary mount
    pub fn primary(&self) -> usize {
        self.primary
    }

    /// Sensors on the secondary mount
    pub fn secondary(&self) -> usize {
        self.secondary
    }

    /// Number of numeric fields every sample line must carry
    pub fn sensor_count(&self) -> usize {
        self.primary + self.secondary
    }
}

/// Timing and calibration knobs of the driver
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriverOptions {
    /// Wait for a handshake reply
    pub exchange_timeout: Duration,
    /// Pause between the wake-up CR and the first handshake step
    pub wake_delay: Duration,
    /// Pause between failed command-mode probes while resynchronising
    pub resync_delay: Duration,
    /// Added to conductivity before computing salinity
    pub conductivity_offset: f64,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            exchange_timeout: DEFAULT_TIMEOUT,
            wake_delay: Duration::from_secs(1),
            resync_delay: Duration::from_secs(2),
            conductivity_offset: 0.0,
        }
    }
}

/// Driver for one OEMX CTD on an exclusively owned transport
pub struct CtdDriver<T: Transport> {
    transport: T,
    mounts: MountConfiguration,
    options: DriverOptions,
    info: DeviceInfo,
    measurement: Measurement,
}

impl<T: Transport> CtdDriver<T> {
    /// Driver with default timing
    pub fn new(transport: T, mounts: MountConfiguration) -> Self {
        Self::with_options(transport, mounts, DriverOptions::default())
    }

    /// Driver with explicit timing and calibration
    pub fn with_options(transport: T, mounts: MountConfiguration, options: DriverOptions) -> Self {
        Self {
            transport,
            mounts,
            options,
            info: DeviceInfo::default(),
            measurement: Measurement::default(),
        }
    }

    /// Configured mounts
    pub fn mounts(&self) -> MountConfiguration {
        self.mounts
    }

    /// Timing and calibration in use
    pub fn options(&self) -> &DriverOptions {
        &self.options
    }

    /// Device info collected at startup
    pub fn device_info(&self) -> &DeviceInfo {
        &self.info
    }

    /// Last successfully parsed measurement
    pub fn measurement(&self) -> &Measurement {
        &self.measurement
    }

    /// Underlying transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Underlying transport, mutably
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Release the transport, e.g. to hand it back to the host for closing
    pub fn into_transport(self) -> T {
        self.transport
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mount_limits() {
        assert!(MountConfiguration::new(0, 0).is_err());
        assert!(MountConfiguration::new(3, 0).is_err());
        assert!(MountConfiguration::new(2, 2).is_err());
        assert_eq!(MountConfiguration::new(1, 2).unwrap().sensor_count(), 3);
        assert_eq!(MountConfiguration::new(0, 1).unwrap().sensor_count(), 1);
    }
}
