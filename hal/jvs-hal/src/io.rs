//! Adapter from `std::io` streams to the serial traits
//!
//! Serial port handles on the host expose `Read + Write` with a per-call
//! timeout. That timeout surfaces as `TimedOut` (or `WouldBlock` for
//! non-blocking handles); [`IoSerial`] keeps polling through those until the
//! caller's [`Deadline`] passes. Configure the underlying handle with a read
//! timeout well below the response deadline so a single poll cannot
//! overshoot it.

use std::io::{self, ErrorKind, Read, Write};
use std::thread;
use std::time::Duration;

use crate::deadline::Deadline;
use crate::serial::{ReadError, SerialRx, SerialTx};

/// Back-off between polls of a non-blocking handle
const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Serial transport over any `std::io` stream
#[derive(Debug)]
pub struct IoSerial<T> {
    inner: T,
}

impl<T> IoSerial<T> {
    /// Wrap an I/O handle
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    /// Borrow the wrapped handle
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the wrapped handle
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Unwrap the I/O handle
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: Write> SerialTx for IoSerial<T> {
    type Error = io::Error;

    fn write_all(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        self.inner.write_all(data)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.inner.flush()
    }
}

impl<T: Read> SerialRx for IoSerial<T> {
    type Error = io::Error;

    fn read_byte(&mut self, deadline: Deadline) -> Result<u8, ReadError<Self::Error>> {
        let mut buf = [0u8; 1];
        loop {
            match self.inner.read(&mut buf) {
                // End of stream: nothing more will ever arrive
                Ok(0) => return Err(ReadError::Timeout),
                Ok(_) => return Ok(buf[0]),
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) if e.kind() == ErrorKind::TimedOut => {
                    if deadline.has_elapsed() {
                        return Err(ReadError::Timeout);
                    }
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => {
                    if deadline.has_elapsed() {
                        return Err(ReadError::Timeout);
                    }
                    thread::sleep(POLL_INTERVAL);
                }
                Err(e) => return Err(ReadError::Io(e)),
            }
        }
    }
}
