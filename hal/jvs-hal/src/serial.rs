//! Serial communication abstractions
//!
//! Provides blocking, deadline-bounded traits for byte transports. The JVS
//! bus is strictly request/response, so there is no async variant: the
//! master writes one frame and then blocks for exactly one reply.

use std::io;
use std::time::Duration;

use thiserror::Error;

use crate::deadline::Deadline;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Failure of a single byte read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReadError<E> {
    /// The deadline passed, or the stream ended, before a byte arrived
    #[error("read timed out")]
    Timeout,
    /// The underlying transport failed
    #[error("transport error: {0}")]
    Io(E),
}

/// Serial transmitter
pub trait SerialTx {
    /// Error type for transmit operations
    type Error;

    /// Write all of `data` to the transport
    ///
    /// Blocks until all data has been written or an error occurs.
    fn write_all(&mut self, data: &[u8]) -> Result<(), Self::Error>;

    /// Flush any buffered data
    fn flush(&mut self) -> Result<(), Self::Error>;
}

/// Serial receiver
pub trait SerialRx {
    /// Error type for receive operations
    type Error;

    /// Read a single raw byte
    ///
    /// Must return [`ReadError::Timeout`] rather than block past `deadline`.
    fn read_byte(&mut self, deadline: Deadline) -> Result<u8, ReadError<Self::Error>>;
}

/// Combined serial interface
///
/// For host transports that provide both directions on one handle and
/// report failures as `std::io::Error`.
pub trait SerialPort: SerialTx<Error = io::Error> + SerialRx<Error = io::Error> {}

// Blanket implementation
impl<T> SerialPort for T where T: SerialTx<Error = io::Error> + SerialRx<Error = io::Error> {}

/// Serial line configuration
///
/// Handed to whatever opens the port. The response timeout is turned into a
/// [`Deadline`] per exchange instead of being baked into the port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SerialConfig {
    /// Baud rate in bits per second
    pub baudrate: u32,
    /// Number of data bits (typically 8)
    pub data_bits: DataBits,
    /// Parity mode
    pub parity: Parity,
    /// Number of stop bits
    pub stop_bits: StopBits,
    /// How long to wait for a reply; `None` or 0 waits forever
    pub response_timeout_ms: Option<u64>,
}

impl SerialConfig {
    /// JVS line speed
    pub const JVS_BAUDRATE: u32 = 115_200;

    /// Default reply timeout
    pub const DEFAULT_RESPONSE_TIMEOUT_MS: u64 = 1000;

    /// Response timeout as a [`Duration`]
    pub fn response_timeout(&self) -> Option<Duration> {
        self.response_timeout_ms
            .filter(|&ms| ms > 0)
            .map(Duration::from_millis)
    }

    /// Deadline for an exchange starting now
    pub fn response_deadline(&self) -> Deadline {
        Deadline::from(self.response_timeout())
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baudrate: Self::JVS_BAUDRATE,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
            response_timeout_ms: Some(Self::DEFAULT_RESPONSE_TIMEOUT_MS),
        }
    }
}

/// Number of data bits per character
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "u8", into = "u8"))]
pub enum DataBits {
    Seven,
    Eight,
}

impl TryFrom<u8> for DataBits {
    type Error = LineSettingError;

    fn try_from(bits: u8) -> Result<Self, Self::Error> {
        match bits {
            7 => Ok(DataBits::Seven),
            8 => Ok(DataBits::Eight),
            other => Err(LineSettingError::DataBits(other)),
        }
    }
}

impl From<DataBits> for u8 {
    fn from(bits: DataBits) -> Self {
        match bits {
            DataBits::Seven => 7,
            DataBits::Eight => 8,
        }
    }
}

/// Parity mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Parity {
    None,
    Even,
    Odd,
}

/// Number of stop bits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "u8", into = "u8"))]
pub enum StopBits {
    One,
    Two,
}

impl TryFrom<u8> for StopBits {
    type Error = LineSettingError;

    fn try_from(bits: u8) -> Result<Self, Self::Error> {
        match bits {
            1 => Ok(StopBits::One),
            2 => Ok(StopBits::Two),
            other => Err(LineSettingError::StopBits(other)),
        }
    }
}

impl From<StopBits> for u8 {
    fn from(bits: StopBits) -> Self {
        match bits {
            StopBits::One => 1,
            StopBits::Two => 2,
        }
    }
}

/// Unsupported numeric line setting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LineSettingError {
    #[error("unsupported number of data bits: {0}")]
    DataBits(u8),
    #[error("unsupported number of stop bits: {0}")]
    StopBits(u8),
}
