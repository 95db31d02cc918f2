//! Serial Protocol Communication
//!
//! Implements the ASCII command dialect of the OEMX CTD instrument.
//!
//! The dialect has no length prefixes: replies are framed by line
//! terminators and the info dump by the `'>'` prompt byte.

pub mod commands;
mod error;
pub mod serial;
pub mod simulator;
mod transport;

pub use commands::{Command, CommandReply, ReplyMatch, SampleRate};
pub use error::ProtocolError;
pub use serial::{clear_input, configure_port, list_ports, open_port, PortInfo};
pub use simulator::SimulatedCtd;
pub use transport::{SerialTransport, Transport};

use std::time::Duration;

/// Default baud rate of the instrument
pub const DEFAULT_BAUD_RATE: u32 = 38400;

/// Default timeout for a command reply and for readiness polling
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// Maximum length of a handshake reply
pub const REPLY_BUFFER_SIZE: usize = 128;

/// Maximum length of a streaming sample line
pub const SAMPLE_BUFFER_SIZE: usize = 32;

/// Byte that terminates the instrument prompt
pub const PROMPT_BYTE: u8 = b'>';
