//! Host capabilities the driver depends on.
//!
//! The driver never reaches into the host; it gets exactly this interface
//! at construction. Fatal faults are not part of it: they travel back to
//! the host as [`RestartNeeded`](crate::driver::RestartNeeded) values.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::driver::{DeviceInfo, Measurement};

/// Health of the driver as seen by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityState {
    /// Acquiring the transport and initializing the instrument
    Booting,
    /// Streaming valid samples
    Normal,
    /// Communication lost
    Error,
}

impl EntityState {
    /// Status text reported along with the state
    pub fn status(&self) -> &'static str {
        match self {
            EntityState::Booting => "initializing",
            EntityState::Normal => "active",
            EntityState::Error => "communication error",
        }
    }
}

impl fmt::Display for EntityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.status())
    }
}

/// Narrow interface to the host supervisor
pub trait Supervisor {
    /// Whether the host asked the driver to stop
    fn is_stopping(&self) -> bool;

    /// Drain control input queued for the driver
    fn consume_messages(&mut self) {}

    /// Driver health changed
    fn set_entity_state(&mut self, state: EntityState);

    /// Device info collected at startup
    fn on_device_info(&mut self, _info: &DeviceInfo) {}

    /// A valid sample was parsed
    fn on_measurement(&mut self, measurement: &Measurement);
}
