//! Byte stuffing for the JVS wire format
//!
//! Two raw values are reserved on the bus:
//! - `STX` (0xE0) marks the start of a frame and is never escaped
//! - `ESC` (0xD0) introduces an escaped byte
//!
//! A logical byte equal to either marker is sent as `ESC, value - 1`:
//!
//! ```text
//! 0xE0 -> D0 DF
//! 0xD0 -> D0 CF
//! ```
//!
//! Everything after the start marker (address, length, payload, checksum)
//! goes through the same transform.

/// Frame start marker
pub const STX: u8 = 0xE0;

/// Escape marker
pub const ESC: u8 = 0xD0;

/// Wire form of one logical byte (one or two raw bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Escaped {
    bytes: [u8; 2],
    len: u8,
}

impl Escaped {
    /// Raw bytes to put on the wire
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }
}

/// Escape a single logical byte
pub fn escape(value: u8) -> Escaped {
    match value {
        STX | ESC => Escaped {
            bytes: [ESC, value - 1],
            len: 2,
        },
        _ => Escaped {
            bytes: [value, 0],
            len: 1,
        },
    }
}

/// Result of unescaping raw bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LogicalByte {
    /// A data value
    Data(u8),
    /// A raw start marker where data was expected
    FrameStart,
}

/// Incremental unescaper with one byte of lookahead
#[derive(Debug, Clone, Copy, Default)]
pub struct Unescaper {
    escaped: bool,
}

impl Unescaper {
    /// Create an unescaper with no pending escape
    pub const fn new() -> Self {
        Self { escaped: false }
    }

    /// Drop any pending escape
    pub fn reset(&mut self) {
        self.escaped = false;
    }

    /// Returns true if the last raw byte was an unfinished escape
    pub fn is_pending(&self) -> bool {
        self.escaped
    }

    /// Feed one raw byte
    ///
    /// Returns `None` after a bare `ESC` (the value follows in the next byte).
    /// The byte after `ESC` is always taken as data plus one; otherwise a raw
    /// `STX` is reported as [`LogicalByte::FrameStart`].
    pub fn push(&mut self, raw: u8) -> Option<LogicalByte> {
        if self.escaped {
            self.escaped = false;
            return Some(LogicalByte::Data(raw.wrapping_add(1)));
        }

        if raw == STX {
            return Some(LogicalByte::FrameStart);
        }

        if raw == ESC {
            self.escaped = true;
            return None;
        }

        Some(LogicalByte::Data(raw))
    }
}
