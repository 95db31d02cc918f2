use serialport::SerialPort;
use std::io::{self, Read, Write};
use std::time::{Duration, Instant};

use super::{serial::clear_input, ProtocolError, DEFAULT_TIMEOUT};

/// Byte channel to the instrument.
///
/// The driver owns its transport exclusively; every blocking call is
/// bounded by a timeout.
pub trait Transport {
    /// Write `text` verbatim
    fn write_str(&mut self, text: &str) -> Result<(), ProtocolError>;

    /// Read one line into `buf`.
    ///
    /// Stops after a `'\n'` or when `buf` is full, whichever comes first,
    /// and returns the number of bytes stored. Zero means the channel
    /// produced nothing although it was reported ready.
    fn read_line(&mut self, buf: &mut [u8]) -> Result<usize, ProtocolError>;

    /// Read a single byte, `None` if nothing arrived in time
    fn read_byte(&mut self) -> Result<Option<u8>, ProtocolError>;

    /// Discard buffered input
    fn flush_input(&mut self) -> Result<(), ProtocolError>;

    /// Wait up to `timeout` for input to become readable
    fn poll(&mut self, timeout: Duration) -> Result<bool, ProtocolError>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn write_str(&mut self, text: &str) -> Result<(), ProtocolError> {
        (**self).write_str(text)
    }

    fn read_line(&mut self, buf: &mut [u8]) -> Result<usize, ProtocolError> {
        (**self).read_line(buf)
    }

    fn read_byte(&mut self) -> Result<Option<u8>, ProtocolError> {
        (**self).read_byte()
    }

    fn flush_input(&mut self) -> Result<(), ProtocolError> {
        (**self).flush_input()
    }

    fn poll(&mut self, timeout: Duration) -> Result<bool, ProtocolError> {
        (**self).poll(timeout)
    }
}

/// Serial port wrapper implementing [`Transport`]
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
    /// Longest wait for the rest of a line once its first byte arrived
    line_timeout: Duration,
    /// Sleep between `bytes_to_read()` checks while polling
    poll_interval: Duration,
}

impl SerialTransport {
    /// Wrap an opened and configured port
    pub fn new(port: Box<dyn SerialPort>) -> Self {
        Self {
            port,
            line_timeout: DEFAULT_TIMEOUT,
            poll_interval: Duration::from_millis(2),
        }
    }

    fn read_one(&mut self) -> Result<Option<u8>, ProtocolError> {
        let mut byte = [0u8; 1];
        match self.port.read(&mut byte) {
            Ok(0) => Ok(None),
            Ok(_) => Ok(Some(byte[0])),
            Err(ref e)
                if e.kind() == io::ErrorKind::TimedOut || e.kind() == io::ErrorKind::WouldBlock =>
            {
                Ok(None)
            }
            Err(e) => Err(ProtocolError::IoError(e)),
        }
    }
}

impl Transport for SerialTransport {
    fn write_str(&mut self, text: &str) -> Result<(), ProtocolError> {
        tracing::trace!("tx {:?}", text);
        self.port.write_all(text.as_bytes())?;
        self.port.flush()?;
        Ok(())
    }

    fn read_line(&mut self, buf: &mut [u8]) -> Result<usize, ProtocolError> {
        let start = Instant::now();
        let mut len = 0;

        while len < buf.len() {
            match self.read_one()? {
                Some(b) => {
                    buf[len] = b;
                    len += 1;
                    if b == b'\n' {
                        break;
                    }
                }
                None if start.elapsed() > self.line_timeout => break,
                None => continue,
            }
        }

        tracing::trace!("rx {:?}", String::from_utf8_lossy(&buf[..len]));
        Ok(len)
    }

    fn read_byte(&mut self) -> Result<Option<u8>, ProtocolError> {
        self.read_one()
    }

    fn flush_input(&mut self) -> Result<(), ProtocolError> {
        clear_input(self.port.as_mut())
    }

    fn poll(&mut self, timeout: Duration) -> Result<bool, ProtocolError> {
        let start = Instant::now();
        loop {
            if self.port.bytes_to_read()? > 0 {
                return Ok(true);
            }
            if start.elapsed() >= timeout {
                return Ok(false);
            }
            std::thread::sleep(self.poll_interval);
        }
    }
}
