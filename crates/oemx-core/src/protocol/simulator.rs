//! Simulated CTD for running the driver without hardware
//!
//! Answers the command dialect with the instrument's exact replies and,
//! once in monitor mode, streams sample lines of a slowly descending
//! profile: pressure rising, temperature falling through a thermocline.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

use super::{Command, ProtocolError, SampleRate, Transport};
use crate::driver::MountConfiguration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Command,
    Monitor,
}

/// Instrument emulator implementing [`Transport`]
pub struct SimulatedCtd {
    mounts: MountConfiguration,
    mode: Mode,
    rate: SampleRate,
    rx: VecDeque<u8>,
    /// Whether samples are paced at the configured rate
    paced: bool,
    next_sample_at: Instant,
    /// Simulated time since monitor mode started (s)
    depth_time: f64,
    rng: StdRng,
}

impl SimulatedCtd {
    /// Simulator pacing samples at the configured rate
    pub fn new(mounts: MountConfiguration) -> Self {
        Self::with_rng(mounts, StdRng::from_entropy())
    }

    /// Reproducible simulator that streams samples as fast as they are read
    pub fn with_seed(mounts: MountConfiguration, seed: u64) -> Self {
        let mut sim = Self::with_rng(mounts, StdRng::seed_from_u64(seed));
        sim.paced = false;
        sim
    }

    fn with_rng(mounts: MountConfiguration, rng: StdRng) -> Self {
        Self {
            mounts,
            mode: Mode::Command,
            rate: SampleRate::default(),
            rx: VecDeque::new(),
            paced: true,
            next_sample_at: Instant::now(),
            depth_time: 0.0,
            rng,
        }
    }

    /// Whether the simulator is streaming samples
    pub fn is_monitoring(&self) -> bool {
        self.mode == Mode::Monitor
    }

    /// Rate set by the last accepted rate command
    pub fn sample_rate(&self) -> SampleRate {
        self.rate
    }

    fn reply(&mut self, text: &str) {
        self.rx.extend(text.bytes());
    }

    fn handle_command(&mut self, text: &str) {
        if self.mode == Mode::Monitor {
            // Any input interrupts streaming and brings the prompt back
            self.mode = Mode::Command;
            self.rx.clear();
            self.reply(">\r\n");
            return;
        }

        if text == Command::CommandModeProbe.wire_text() {
            self.reply("\r\n");
        } else if text == Command::Monitor.wire_text() {
            self.reply(">MONITOR\r\n");
            self.mode = Mode::Monitor;
            self.next_sample_at = Instant::now();
        } else if text == Command::DisplayOptions.wire_text() {
            let dump = self.option_dump();
            self.reply(&dump);
        } else if let Some(rate) = parse_set_rate(text) {
            self.rate = rate;
            self.reply(&format!(">SET S {rate} /s\r\n"));
        } else {
            self.reply(&format!(">{}\r\nERR\r\n", text.trim_end()));
        }
    }

    fn option_dump(&self) -> String {
        let mut dump = String::from(">display options\r\n");
        dump.push_str("Model=Micro.X\r\nFirmware=V6.2.1\r\nSN=012345\r\n\r\n");
        dump.push_str("Primary Mount\r\nSensorName=Xchange CT\r\n\r\n");
        dump.push_str("Secondary Mount\r\nSensorName=Xchange SV");
        for unit in 1..=self.mounts.secondary() {
            dump.push_str(&format!(" {unit}.X SN 30123{unit}"));
        }
        dump.push_str("\r\nBoardSN=400123\r\n\r\n>");
        dump
    }

    fn emit_sample(&mut self) {
        let period = 1.0 / self.rate.get() as f64;
        self.depth_time += period;

        // Descend at ~0.5 m/s through a thermocline at 30 m
        let pressure = 0.5 * self.depth_time + self.rng.gen_range(-0.02..0.02);
        let temperature =
            8.0 + 10.0 / (1.0 + (pressure - 30.0).exp() * 0.1) + self.rng.gen_range(-0.005..0.005);
        let conductivity = 32.0 + 0.9 * temperature + self.rng.gen_range(-0.01..0.01);

        let values = [conductivity, pressure.max(0.0), temperature];
        let mut line = String::new();
        for v in values.iter().take(self.mounts.sensor_count()) {
            line.push_str(&format!(" {v:.3}"));
        }
        line.push_str("\r\n");
        self.reply(&line);

        self.next_sample_at += Duration::from_secs_f64(period);
    }
}

fn parse_set_rate(text: &str) -> Option<SampleRate> {
    let rate = text.strip_prefix("SET S ")?.strip_suffix(" /s\r")?;
    SampleRate::new(rate.parse().ok()?)
}

impl Transport for SimulatedCtd {
    fn write_str(&mut self, text: &str) -> Result<(), ProtocolError> {
        self.handle_command(text);
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
        self.rx.clear();
        Ok(())
    }

    fn poll(&mut self, timeout: Duration) -> Result<bool, ProtocolError> {
        if !self.rx.is_empty() {
            return Ok(true);
        }
        if self.mode != Mode::Monitor {
            return Ok(false);
        }
        if !self.paced {
            self.emit_sample();
            return Ok(true);
        }

        let now = Instant::now();
        let wait = self.next_sample_at.saturating_duration_since(now);
        if wait > timeout {
            std::thread::sleep(timeout);
            return Ok(false);
        }
        std::thread::sleep(wait);
        self.emit_sample();
        Ok(true)
    }
}
