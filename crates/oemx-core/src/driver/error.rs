//! Driver errors and the restart signal

use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::protocol::ProtocolError;

/// Backoff requested after a fatal communication failure
pub const IO_FAILURE_BACKOFF: Duration = Duration::from_secs(5);

/// Handshake step that failed during initialization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeStep {
    /// Probe for command mode
    CommandMode,
    /// Set the sampling rate
    SampleRate,
    /// Enter monitor mode
    MonitorMode,
}

impl fmt::Display for HandshakeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HandshakeStep::CommandMode => "failed to enter command mode",
            HandshakeStep::SampleRate => "failed to set sampling rate",
            HandshakeStep::MonitorMode => "failed to enter monitor mode",
        })
    }
}

/// Errors raised while talking to the instrument
#[derive(Error, Debug)]
pub enum DriverError {
    /// A handshake step got no or the wrong reply
    #[error("{0}")]
    Handshake(HandshakeStep),

    /// The transport delivered nothing although it reported data
    #[error("I/O error: {0}")]
    IoFailure(String),

    /// A sample line with the wrong number of fields
    #[error("expected {expected} fields in sample line, found {found}")]
    ParseMiss {
        /// Configured sensor count
        expected: usize,
        /// Fields scanned before the first non-number
        found: usize,
    },

    /// A sample line longer than the sample buffer
    #[error("sample line exceeds {limit} bytes")]
    LineOverflow {
        /// Sample buffer size
        limit: usize,
    },

    /// No valid sample within the watchdog interval
    #[error("communication error: no valid sample within {0:?}")]
    WatchdogOverflow(Duration),

    /// Transport failure
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl DriverError {
    /// Whether the error ends the driver cycle.
    ///
    /// Parse misses and overlong lines are skipped; everything else is
    /// escalated to the supervisor.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            DriverError::ParseMiss { .. } | DriverError::LineOverflow { .. }
        )
    }
}

/// Request to tear the driver down and recreate it after `backoff`
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("restart needed: {message} (retry in {}s)", .backoff.as_secs())]
pub struct RestartNeeded {
    /// Reason reported to the host
    pub message: String,
    /// Wait before recreating the driver
    pub backoff: Duration,
}

impl RestartNeeded {
    /// Restart request with an explicit backoff
    pub fn new(message: impl Into<String>, backoff: Duration) -> Self {
        Self {
            message: message.into(),
            backoff,
        }
    }
}

impl From<DriverError> for RestartNeeded {
    fn from(e: DriverError) -> Self {
        let message = match &e {
            DriverError::Protocol(_) | DriverError::IoFailure(_) => "I/O error".to_string(),
            DriverError::WatchdogOverflow(_) => "communication error".to_string(),
            other => other.to_string(),
        };
        RestartNeeded::new(message, IO_FAILURE_BACKOFF)
    }
}
