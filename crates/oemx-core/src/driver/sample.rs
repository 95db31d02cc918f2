//! Streaming sample lines

use super::{CtdDriver, DriverError, Measurement};
use crate::protocol::{Transport, SAMPLE_BUFFER_SIZE};
use crate::science::{compute_salinity, compute_sound_speed};

/// Numeric fields scanned from a sample line, in wire order:
/// conductivity, pressure, temperature
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WireFields {
    values: [f64; 3],
    count: usize,
}

impl WireFields {
    /// Number of fields scanned
    pub fn count(&self) -> usize {
        self.count
    }

    /// Scanned values in wire order
    pub fn values(&self) -> &[f64] {
        &self.values[..self.count]
    }
}

/// Scan up to three whitespace-separated numbers from `line`.
///
/// Scanning stops at the first token that is not a finite number; the
/// count of values read before it is what decides whether the line is
/// usable.
pub fn scan_fields(line: &str) -> WireFields {
    let mut fields = WireFields::default();
    for token in line.split_whitespace() {
        if fields.count == fields.values.len() {
            // One field too many is enough to reject a line
            if token.parse::<f64>().map(f64::is_finite).unwrap_or(false) {
                fields.count += 1;
            }
            break;
        }
        match token.parse::<f64>() {
            Ok(v) if v.is_finite() => {
                fields.values[fields.count] = v;
                fields.count += 1;
            }
            _ => break,
        }
    }
    fields
}

/// Apply scanned fields on top of the previous measurement and derive
/// salinity and sound speed.
///
/// Channels the line does not carry keep their previous value.
fn derive(previous: &Measurement, fields: &WireFields, conductivity_offset: f64) -> Measurement {
    let mut m = *previous;
    let targets = [&mut m.conductivity, &mut m.pressure, &mut m.temperature];
    for (target, value) in targets.into_iter().zip(fields.values()) {
        *target = *value;
    }

    let salinity = compute_salinity(m.conductivity + conductivity_offset, m.pressure, m.temperature);
    // NaN fails the comparison too
    m.salinity = if salinity >= 0.0 { salinity } else { 0.0 };
    m.sound_speed = compute_sound_speed(m.salinity, m.pressure, m.temperature);
    m
}

impl<T: Transport> CtdDriver<T> {
    /// Read and parse one sample line.
    ///
    /// A zero-byte read is a fatal [`DriverError::IoFailure`]. A line with
    /// the wrong number of fields is a [`DriverError::ParseMiss`] and
    /// leaves the previous measurement untouched. A line longer than the
    /// sample buffer is read to its end and reported as
    /// [`DriverError::LineOverflow`].
    pub fn have_new_data(&mut self) -> Result<Measurement, DriverError> {
        let mut line = [0u8; SAMPLE_BUFFER_SIZE];
        let n = self.transport.read_line(&mut line)?;

        if n == 0 {
            return Err(DriverError::IoFailure("zero-byte read".to_string()));
        }
        if n == line.len() && line[n - 1] != b'\n' {
            self.discard_rest_of_line(&mut line)?;
            return Err(DriverError::LineOverflow {
                limit: SAMPLE_BUFFER_SIZE,
            });
        }

        let text = String::from_utf8_lossy(&line[..n]);
        let fields = scan_fields(&text);
        let expected = self.mounts.sensor_count();
        if fields.count() != expected {
            return Err(DriverError::ParseMiss {
                expected,
                found: fields.count(),
            });
        }

        self.measurement = derive(&self.measurement, &fields, self.options.conductivity_offset);
        Ok(self.measurement)
    }

    /// Drop the tail of an overlong line so it is not taken for a sample
    fn discard_rest_of_line(&mut self, scratch: &mut [u8]) -> Result<(), DriverError> {
        let mut dropped = 0;
        loop {
            let n = self.transport.read_line(scratch)?;
            dropped += n;
            if n == 0 || scratch[n - 1] == b'\n' {
                break;
            }
        }
        tracing::debug!("dropped {dropped} bytes of overlong sample line");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_wire_order() {
        let fields = scan_fields(" 42.914 10.5 15.0\r\n");
        assert_eq!(fields.values(), &[42.914, 10.5, 15.0]);
    }

    #[test]
    fn test_scan_stops_at_garbage() {
        assert_eq!(scan_fields(" 42.9 x 15.0\r\n").count(), 1);
        assert_eq!(scan_fields(">\r\n").count(), 0);
        assert_eq!(scan_fields("\r\n").count(), 0);
        assert_eq!(scan_fields(" 1 nan 3\r\n").count(), 1);
    }

    #[test]
    fn test_scan_extra_field() {
        assert_eq!(scan_fields(" 1 2 3 4\r\n").count(), 4);
        assert_eq!(scan_fields(" 1 2 3 >\r\n").count(), 3);
    }

    #[test]
    fn test_derive_full_line() {
        let fields = scan_fields(" 42.914 0 15\r\n");
        let m = derive(&Measurement::default(), &fields, 0.0);
        assert!((m.salinity - 35.0).abs() < 1e-4);
        assert_eq!(m.pressure, 0.0);
        assert!(m.sound_speed > 1400.0);
    }

    #[test]
    fn test_negative_salinity_clamped() {
        let fields = scan_fields(" 0 0 0\r\n");
        let m = derive(&Measurement::default(), &fields, 0.0);
        assert_eq!(m.salinity, 0.0);
    }

    #[test]
    fn test_nan_salinity_clamped() {
        let fields = scan_fields(" -5 0 10\r\n");
        let m = derive(&Measurement::default(), &fields, 0.0);
        assert_eq!(m.salinity, 0.0);
        assert!(m.sound_speed.is_finite());
    }

    #[test]
    fn test_partial_line_keeps_previous_channels() {
        let previous = Measurement {
            temperature: 12.0,
            pressure: 3.0,
            ..Measurement::default()
        };
        let fields = scan_fields(" 40.1\r\n");
        let m = derive(&previous, &fields, 0.0);
        assert_eq!(m.conductivity, 40.1);
        assert_eq!(m.pressure, 3.0);
        assert_eq!(m.temperature, 12.0);
    }

    #[test]
    fn test_conductivity_offset_only_affects_salinity() {
        let fields = scan_fields(" 42.414 0 15\r\n");
        let m = derive(&Measurement::default(), &fields, 0.5);
        assert_eq!(m.conductivity, 42.414);
        assert!((m.salinity - 35.0).abs() < 1e-4);
    }
}
