//! Protocol errors

use thiserror::Error;

/// Errors raised by the transport underneath the driver
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Error reported by the serial port driver
    #[error("Serial port error: {0}")]
    SerialError(String),

    /// The named device does not exist
    #[error("Port not found: {0}")]
    PortNotFound(String),

    /// The transport is gone
    #[error("Transport closed")]
    Closed,

    /// Read or write failure
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<serialport::Error> for ProtocolError {
    fn from(e: serialport::Error) -> Self {
        match e.kind() {
            serialport::ErrorKind::NoDevice => ProtocolError::PortNotFound(e.description),
            _ => ProtocolError::SerialError(e.to_string()),
        }
    }
}
