//! Device-info dump: resync, request, framing and text extraction.
//!
//! The dump is free-form text. Sections are separated by a blank line
//! (`"\r\n\r\n"`) and fields are found by scanning for fixed marker
//! literals, so a firmware that rewords its dump yields empty fields
//! rather than an error.

use super::{CtdDriver, DeviceInfo, DriverError, MountConfiguration};
use crate::protocol::{Command, CommandReply, Transport, PROMPT_BYTE};
use crate::supervisor::Supervisor;

const SECTION_DELIMITER: &str = "\r\n\r\n";
const FIRMWARE_MARKER: &str = "Firmware=V";
const SERIAL_MARKER: &str = "SN=";
const SENSOR_NAME_MARKER: &str = "SensorName=";
const UNIT_MARKER: &str = ".X SN ";
const BOARD_SERIAL_MARKER: &str = "BoardSN=";

/// Width of the version and serial fields
const FIELD_WIDTH: usize = 6;

/// Longest dump accepted before reading stops without the closing prompt
pub const MAX_DUMP_SIZE: usize = 4096;

impl<T: Transport> CtdDriver<T> {
    /// Harvest firmware, serial and mount descriptors from the instrument.
    ///
    /// Probes for command mode until it answers (pausing and flushing
    /// between attempts), then reads the option dump byte by byte until
    /// the second prompt or [`MAX_DUMP_SIZE`] bytes. Both loops only end
    /// early when the supervisor is stopping, in which case `Ok(None)` is
    /// returned.
    pub fn collect_info<S: Supervisor + ?Sized>(
        &mut self,
        supervisor: &S,
    ) -> Result<Option<DeviceInfo>, DriverError> {
        let probe = CommandReply::probe();
        loop {
            if supervisor.is_stopping() {
                return Ok(None);
            }
            if self.send_command(&probe)? {
                break;
            }
            tracing::debug!("instrument not in command mode, retrying");
            if !self.options.resync_delay.is_zero() {
                std::thread::sleep(self.options.resync_delay);
            }
            self.transport.flush_input()?;
        }

        self.transport.write_str(&Command::DisplayOptions.wire_text())?;

        let mut dump = Vec::new();
        let mut prompts = 0;
        loop {
            if supervisor.is_stopping() {
                return Ok(None);
            }
            if !self.transport.poll(self.options.exchange_timeout)? {
                continue;
            }
            let Some(byte) = self.transport.read_byte()? else {
                continue;
            };
            dump.push(byte);

            // The first prompt is the echo of our request, the second ends the dump
            if byte == PROMPT_BYTE {
                prompts += 1;
                if prompts == 2 {
                    break;
                }
            }
            if dump.len() >= MAX_DUMP_SIZE {
                tracing::warn!(
                    "info dump reached {MAX_DUMP_SIZE} bytes without closing prompt, parsing what was read"
                );
                break;
            }
        }

        let text = String::from_utf8_lossy(&dump);
        self.info = parse_info_dump(&text, self.mounts);
        Ok(Some(self.info.clone()))
    }
}

/// Extract device info from a complete option dump
pub fn parse_info_dump(text: &str, mounts: MountConfiguration) -> DeviceInfo {
    let sections: Vec<&str> = text.split(SECTION_DELIMITER).collect();
    let section = |i: usize| sections.get(i).copied().unwrap_or("");

    for (i, s) in sections.iter().enumerate() {
        tracing::trace!("dump section {i}: {s:?}");
    }

    let identity = section(0);
    let mut info = DeviceInfo {
        version: fixed_field(identity, FIRMWARE_MARKER),
        serial: fixed_field(identity, SERIAL_MARKER),
        ..DeviceInfo::default()
    };

    if mounts.primary() > 0 {
        info.primary_mount = after(section(1), SENSOR_NAME_MARKER)
            .map(line_breaks_to_spaces)
            .unwrap_or_default();
    }

    if mounts.secondary() > 0 {
        info.secondary_mounts = secondary_mounts(section(2), mounts.secondary());
    }

    info
}

fn secondary_mounts(section: &str, count: usize) -> Vec<String> {
    let units = after(section, SENSOR_NAME_MARKER).unwrap_or(section);
    let board = fixed_field(section, BOARD_SERIAL_MARKER);

    let first = units.find(UNIT_MARKER);
    let second = first.and_then(|i| {
        let from = i + UNIT_MARKER.len();
        units.get(from..)?.find(UNIT_MARKER).map(|j| from + j)
    });

    // The unit index is the character right before each marker, and the
    // shared name ends with a space in front of that index.
    let name = first
        .and_then(|i| units.get(..i.checked_sub(2)?))
        .unwrap_or("");

    let mut mounts = Vec::with_capacity(count);

    let unit = first
        .and_then(|i| {
            let end = second.map(|j| j - 1).unwrap_or(units.len());
            units.get(i.checked_sub(1)?..end)
        })
        .unwrap_or("");
    mounts.push(describe(name, unit, &board));

    if count > 1 {
        let unit = second
            .and_then(|j| {
                let end = units[j..].find("\r\n").map(|k| j + k).unwrap_or(units.len());
                units.get(j - 1..end)
            })
            .unwrap_or("");
        mounts.push(describe(name, unit, &board));
    }

    mounts
}

fn describe(name: &str, unit: &str, board: &str) -> String {
    format!(
        "{} {} {}",
        name.trim(),
        line_breaks_to_spaces(unit).trim(),
        board
    )
}

/// Text following the first occurrence of `marker`
fn after<'a>(text: &'a str, marker: &str) -> Option<&'a str> {
    text.find(marker).map(|i| &text[i + marker.len()..])
}

/// The six characters following `marker`, without line breaks
fn fixed_field(text: &str, marker: &str) -> String {
    after(text, marker)
        .map(|rest| {
            rest.chars()
                .take(FIELD_WIDTH)
                .filter(|c| *c != '\r' && *c != '\n')
                .collect()
        })
        .unwrap_or_default()
}

fn line_breaks_to_spaces(text: &str) -> String {
    text.replace(['\r', '\n'], " ")
}
