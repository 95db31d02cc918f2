//! # OEMX Core Library
//!
//! Protocol and state-machine layer of the OEMX CTD driver.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//!
//! This library provides:
//! - The instrument's ASCII command dialect and its handshake
//! - Device-info harvesting from the option dump
//! - Streaming sample parsing with salinity and sound speed
//! - A watchdog-driven read loop that escalates communication loss
//!
//! ## Example
//!
//! ```rust,ignore
//! use oemx_core::{config::CtdConfig, protocol::{open_port, SerialTransport}, task::CtdTask};
//!
//! let config = CtdConfig::load("ctd.json")?;
//! let port = open_port(&config.serial.device, Some(config.serial.baud_rate))?;
//! let mut task = CtdTask::new(SerialTransport::new(port), &config, supervisor)?;
//!
//! // Runs until the supervisor stops it or a restart is needed
//! task.execute()?;
//! ```

pub mod config;
pub mod driver;
pub mod protocol;
pub mod science;
pub mod supervisor;
pub mod task;
pub mod watchdog;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{ConfigError, CtdConfig};
    pub use crate::driver::{
        CtdDriver, DeviceInfo, DriverError, DriverOptions, Measurement, MountConfiguration,
        RestartNeeded,
    };
    pub use crate::protocol::{SerialTransport, SimulatedCtd, Transport};
    pub use crate::supervisor::{EntityState, Supervisor};
    pub use crate::task::{CtdTask, TaskSettings};
    pub use crate::watchdog::Watchdog;
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
