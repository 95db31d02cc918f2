#![allow(dead_code)]

use oemx_core::driver::{DeviceInfo, Measurement};
use oemx_core::protocol::{ProtocolError, Transport};
use oemx_core::supervisor::{EntityState, Supervisor};
use std::cell::Cell;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

pub const DUMP: &str = ">display options\r\n\
    Model=Micro.X\r\nFirmware=V6.2.1\r\nSN=012345\r\n\r\n\
    Primary Mount\r\nSensorName=Xchange CT\r\n\r\n\
    Secondary Mount\r\nSensorName=Xchange SV 1.X SN 301234 2.X SN 302345\r\nBoardSN=400123\r\n\r\n\
    >";

/// Scripted transport: replies are keyed by the exact command written
#[derive(Default)]
pub struct MockTransport {
    pub written: Vec<String>,
    pub flushes: usize,
    replies: HashMap<String, VecDeque<Vec<u8>>>,
    rx: VecDeque<u8>,
    /// Report readiness but deliver nothing once `rx` is drained
    pub hang_up: bool,
    /// Make the next poll fail
    pub fail_poll: bool,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply to `command`. The last queued reply repeats.
    pub fn on(&mut self, command: &str, reply: &str) -> &mut Self {
        self.replies
            .entry(command.to_string())
            .or_default()
            .push_back(reply.as_bytes().to_vec());
        self
    }

    /// Bytes the instrument sends unsolicited
    pub fn push_rx(&mut self, bytes: &str) -> &mut Self {
        self.rx.extend(bytes.bytes());
        self
    }

    /// Answer the full startup sequence for `rate`
    pub fn instrument(rate: u32) -> Self {
        let mut mock = Self::new();
        mock.on("\r", "\r\n")
            .on(&format!("SET S {rate} /s\r"), &format!(">SET S {rate} /s\r\n"))
            .on("MONITOR\r", ">MONITOR\r\n")
            .on("display options\r\r", DUMP);
        mock
    }

    pub fn wrote(&self, command: &str) -> bool {
        self.written.iter().any(|w| w == command)
    }
}

impl Transport for MockTransport {
    fn write_str(&mut self, text: &str) -> Result<(), ProtocolError> {
        self.written.push(text.to_string());
        if let Some(queue) = self.replies.get_mut(text) {
            let reply = if queue.len() > 1 {
                queue.pop_front()
            } else {
                queue.front().cloned()
            };
            if let Some(reply) = reply {
                self.rx.extend(reply);
            }
        }
        Ok(())
    }

    fn read_line(&mut self, buf: &mut [u8]) -> Result<usize, ProtocolError> {
        let mut len = 0;
        while len < buf.len() {
            let Some(b) = self.rx.pop_front() else {
                break;
            };
            buf[len] = b;
            len += 1;
            if b == b'\n' {
                break;
            }
        }
        Ok(len)
    }

    fn read_byte(&mut self) -> Result<Option<u8>, ProtocolError> {
        Ok(self.rx.pop_front())
    }

    fn flush_input(&mut self) -> Result<(), ProtocolError> {
        self.flushes += 1;
        self.rx.clear();
        Ok(())
    }

    fn poll(&mut self, _timeout: Duration) -> Result<bool, ProtocolError> {
        if self.fail_poll {
            return Err(ProtocolError::Closed);
        }
        Ok(!self.rx.is_empty() || self.hang_up)
    }
}

/// Supervisor that records everything it is told
#[derive(Default)]
pub struct RecordingSupervisor {
    pub states: Vec<EntityState>,
    pub samples: Vec<Measurement>,
    pub info: Option<DeviceInfo>,
    /// Stop once this many samples were reported
    pub stop_after_samples: Option<usize>,
    /// Stop after this many `is_stopping` checks
    pub stop_after_checks: Option<usize>,
    checks: Cell<usize>,
}

impl RecordingSupervisor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stopping_after_samples(n: usize) -> Self {
        Self {
            stop_after_samples: Some(n),
            ..Self::default()
        }
    }

    pub fn stopping_after_checks(n: usize) -> Self {
        Self {
            stop_after_checks: Some(n),
            ..Self::default()
        }
    }

    pub fn checks(&self) -> usize {
        self.checks.get()
    }
}

impl Supervisor for RecordingSupervisor {
    fn is_stopping(&self) -> bool {
        let checks = self.checks.get() + 1;
        self.checks.set(checks);

        if let Some(n) = self.stop_after_checks {
            if checks > n {
                return true;
            }
        }
        matches!(self.stop_after_samples, Some(n) if self.samples.len() >= n)
    }

    fn set_entity_state(&mut self, state: EntityState) {
        self.states.push(state);
    }

    fn on_device_info(&mut self, info: &DeviceInfo) {
        self.info = Some(info.clone());
    }

    fn on_measurement(&mut self, measurement: &Measurement) {
        self.samples.push(*measurement);
    }
}
