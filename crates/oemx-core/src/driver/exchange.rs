//! Single command/reply exchange

use super::{CtdDriver, DriverError};
use crate::protocol::{CommandReply, Transport, REPLY_BUFFER_SIZE};

impl<T: Transport> CtdDriver<T> {
    /// Send one command and wait for its reply.
    ///
    /// Returns `Ok(false)` when nothing arrives within the exchange timeout
    /// or the reply does not match. No retry is attempted, and whatever
    /// is already buffered is consumed as the reply, so callers that need
    /// a clean line flush first.
    pub fn send_command(&mut self, exchange: &CommandReply) -> Result<bool, DriverError> {
        tracing::debug!("command: {:?}", exchange.command);
        self.transport.write_str(&exchange.command)?;

        if !self.transport.poll(self.options.exchange_timeout)? {
            tracing::debug!("no reply to {:?}", exchange.command);
            return Ok(false);
        }

        let mut reply = [0u8; REPLY_BUFFER_SIZE];
        let n = self.transport.read_line(&mut reply)?;
        tracing::debug!("reply: {:?}", String::from_utf8_lossy(&reply[..n]));

        // A full buffer without terminator cannot be any expected reply,
        // the comparison below rejects it on its own.
        Ok(exchange.matches(&reply[..n]))
    }
}
