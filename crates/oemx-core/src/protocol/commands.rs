//! Protocol commands
//!
//! Defines the commands of the OEMX CTD dialect together with the exact
//! replies the instrument answers them with.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Sampling rate of the instrument in monitor mode, in samples per second
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct SampleRate(u8);

impl SampleRate {
    /// Slowest supported rate
    pub const MIN: u32 = 1;
    /// Fastest supported rate
    pub const MAX: u32 = 5;

    /// Create a sample rate, rejecting values outside 1..=5
    pub fn new(rate: u32) -> Option<Self> {
        if (Self::MIN..=Self::MAX).contains(&rate) {
            Some(Self(rate as u8))
        } else {
            None
        }
    }

    /// Create a sample rate, substituting 1 sample/s for out-of-range values.
    ///
    /// The second element is `true` when the substitution happened.
    pub fn or_default(rate: u32) -> (Self, bool) {
        match Self::new(rate) {
            Some(r) => (r, false),
            None => (Self::default(), true),
        }
    }

    /// Samples per second
    pub fn get(&self) -> u32 {
        self.0 as u32
    }
}

impl Default for SampleRate {
    fn default() -> Self {
        Self(1)
    }
}

impl TryFrom<u32> for SampleRate {
    type Error = String;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| format!("sample rate {value} outside 1..=5"))
    }
}

impl From<SampleRate> for u32 {
    fn from(rate: SampleRate) -> Self {
        rate.get()
    }
}

impl fmt::Display for SampleRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Commands understood by the instrument
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Bare carriage return, answered with an empty line in command mode
    CommandModeProbe,

    /// Configure the monitor-mode sampling rate
    SetSampleRate(SampleRate),

    /// Enter streaming (monitor) mode
    Monitor,

    /// Request the device-info dump
    DisplayOptions,
}

impl Command {
    /// Text sent on the wire
    pub fn wire_text(&self) -> String {
        match self {
            Command::CommandModeProbe => "\r".to_string(),
            Command::SetSampleRate(rate) => format!("SET S {rate} /s\r"),
            Command::Monitor => "MONITOR\r".to_string(),
            Command::DisplayOptions => "display options\r\r".to_string(),
        }
    }
}

/// How a received reply is compared with the expected one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyMatch {
    /// Reply must be byte-for-byte identical
    Exact,
    /// Reply must contain the expected text
    Contains,
}

/// A command and the reply that acknowledges it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandReply {
    /// Text written to the instrument
    pub command: String,
    /// Reply that counts as success
    pub reply: String,
    /// Comparison rule
    pub matching: ReplyMatch,
}

impl CommandReply {
    /// Exchange that succeeds only on an identical reply
    pub fn exact(command: impl Into<String>, reply: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            reply: reply.into(),
            matching: ReplyMatch::Exact,
        }
    }

    /// Exchange that succeeds when the reply contains `reply`
    pub fn containing(command: impl Into<String>, reply: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            reply: reply.into(),
            matching: ReplyMatch::Contains,
        }
    }

    /// Command-mode probe, answered with an empty line
    pub fn probe() -> Self {
        Self::exact(Command::CommandModeProbe.wire_text(), "\r\n")
    }

    /// Sampling-rate setting, echoed back by the instrument
    pub fn set_sample_rate(rate: SampleRate) -> Self {
        Self::exact(
            Command::SetSampleRate(rate).wire_text(),
            format!(">SET S {rate} /s\r\n"),
        )
    }

    /// Switch to monitor mode, echoed back by the instrument.
    ///
    /// The info dump has no such reply; it is framed by the prompt byte.
    pub fn monitor() -> Self {
        Self::exact(Command::Monitor.wire_text(), ">MONITOR\r\n")
    }

    /// Closing command sent on shutdown; any prompt counts as an answer
    pub fn closing() -> Self {
        Self::containing("\r", ">")
    }

    /// Check a received reply against this exchange
    pub fn matches(&self, received: &[u8]) -> bool {
        match self.matching {
            ReplyMatch::Exact => received == self.reply.as_bytes(),
            ReplyMatch::Contains => {
                let needle = self.reply.as_bytes();
                needle.is_empty() || received.windows(needle.len()).any(|w| w == needle)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_rate_range() {
        assert!(SampleRate::new(0).is_none());
        assert!(SampleRate::new(6).is_none());
        assert_eq!(SampleRate::new(3).map(|r| r.get()), Some(3));
    }

    #[test]
    fn test_sample_rate_substitution() {
        assert_eq!(SampleRate::or_default(0), (SampleRate::default(), true));
        assert_eq!(SampleRate::or_default(6).0.get(), 1);
        assert_eq!(SampleRate::or_default(5).1, false);
    }

    #[test]
    fn test_set_rate_wire_text() {
        let cmd = Command::SetSampleRate(SampleRate::new(3).unwrap());
        assert_eq!(cmd.wire_text(), "SET S 3 /s\r");

        let exchange = CommandReply::set_sample_rate(SampleRate::new(3).unwrap());
        assert_eq!(exchange.command, "SET S 3 /s\r");
        assert_eq!(exchange.reply, ">SET S 3 /s\r\n");
        assert_eq!(exchange.matching, ReplyMatch::Exact);
    }

    #[test]
    fn test_handshake_commands() {
        assert_eq!(CommandReply::probe(), CommandReply::exact("\r", "\r\n"));
        assert_eq!(
            CommandReply::monitor(),
            CommandReply::exact("MONITOR\r", ">MONITOR\r\n")
        );
        assert_eq!(Command::DisplayOptions.wire_text(), "display options\r\r");
    }

    #[test]
    fn test_reply_matching() {
        let exact = CommandReply::exact("\r", "\r\n");
        assert!(exact.matches(b"\r\n"));
        assert!(!exact.matches(b"\r\n>"));

        let closing = CommandReply::closing();
        assert!(closing.matches(b"\r\n>"));
        assert!(!closing.matches(b"\r\n"));
    }
}
