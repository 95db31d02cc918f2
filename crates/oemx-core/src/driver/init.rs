//! Three-step initialization handshake

use super::{CtdDriver, DriverError, HandshakeStep};
use crate::protocol::{Command, CommandReply, SampleRate, Transport};

impl<T: Transport> CtdDriver<T> {
    /// Bring the instrument from any state into monitor mode.
    ///
    /// A rate outside 1..=5 is replaced by 1 with a warning. The steps
    /// run strictly in order and the first failure aborts the rest.
    /// Returns the rate actually configured.
    pub fn init_ctd(&mut self, requested_rate: u32) -> Result<SampleRate, DriverError> {
        let (rate, substituted) = SampleRate::or_default(requested_rate);
        if substituted {
            tracing::warn!(
                "incorrect number of samples ({requested_rate}), setting {rate} sample/s"
            );
        }

        // Wake the instrument and drop whatever it was printing
        self.transport.write_str(&Command::CommandModeProbe.wire_text())?;
        if !self.options.wake_delay.is_zero() {
            std::thread::sleep(self.options.wake_delay);
        }
        self.transport.flush_input()?;

        let steps = [
            (CommandReply::probe(), HandshakeStep::CommandMode),
            (CommandReply::set_sample_rate(rate), HandshakeStep::SampleRate),
            (CommandReply::monitor(), HandshakeStep::MonitorMode),
        ];

        for (exchange, step) in steps {
            if !self.send_command(&exchange)? {
                tracing::error!("{step}");
                return Err(DriverError::Handshake(step));
            }
        }

        tracing::info!("monitor mode at {rate} sample/s");
        Ok(rate)
    }
}
