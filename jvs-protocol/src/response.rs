//! Board replies
//!
//! Every reply payload begins with a status byte. When the status is
//! normal it is followed by a report byte for the command and then the
//! command's data.

use thiserror::Error;

use crate::frame::Frame;

// Status values
const STATUS_NORMAL: u8 = 0x01;
const STATUS_UNKNOWN_COMMAND: u8 = 0x02;
const STATUS_CHECKSUM_ERROR: u8 = 0x03;
const STATUS_OVERFLOW: u8 = 0x04;

// Report values
const REPORT_NORMAL: u8 = 0x01;
const REPORT_PARAMETER_COUNT: u8 = 0x02;
const REPORT_PARAMETER_DATA: u8 = 0x03;
const REPORT_BUSY: u8 = 0x04;

/// Frame-level status returned by the board
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Status {
    /// Request accepted
    Normal,
    /// Board did not recognise the command
    UnknownCommand,
    /// Board saw a checksum error in the request
    ChecksumError,
    /// Reply did not fit in the board's buffer
    Overflow,
    /// Any other value
    Other(u8),
}

impl Status {
    /// Parse a status from its wire byte
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            STATUS_NORMAL => Status::Normal,
            STATUS_UNKNOWN_COMMAND => Status::UnknownCommand,
            STATUS_CHECKSUM_ERROR => Status::ChecksumError,
            STATUS_OVERFLOW => Status::Overflow,
            other => Status::Other(other),
        }
    }

    /// Convert to wire byte
    pub fn to_byte(self) -> u8 {
        match self {
            Status::Normal => STATUS_NORMAL,
            Status::UnknownCommand => STATUS_UNKNOWN_COMMAND,
            Status::ChecksumError => STATUS_CHECKSUM_ERROR,
            Status::Overflow => STATUS_OVERFLOW,
            Status::Other(byte) => byte,
        }
    }
}

/// Per-command report returned by the board
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Report {
    /// Command executed
    Normal,
    /// Wrong number of parameters
    ParameterCount,
    /// Parameter out of range
    ParameterData,
    /// Board busy
    Busy,
    /// Any other value
    Other(u8),
}

impl Report {
    /// Parse a report from its wire byte
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            REPORT_NORMAL => Report::Normal,
            REPORT_PARAMETER_COUNT => Report::ParameterCount,
            REPORT_PARAMETER_DATA => Report::ParameterData,
            REPORT_BUSY => Report::Busy,
            other => Report::Other(other),
        }
    }

    /// Convert to wire byte
    pub fn to_byte(self) -> u8 {
        match self {
            Report::Normal => REPORT_NORMAL,
            Report::ParameterCount => REPORT_PARAMETER_COUNT,
            Report::ParameterData => REPORT_PARAMETER_DATA,
            Report::Busy => REPORT_BUSY,
            Report::Other(byte) => byte,
        }
    }
}

/// Errors interpreting a reply payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ResponseError {
    /// Reply carried no status byte
    #[error("empty reply")]
    Empty,
    /// Normal status without the report byte that must follow it
    #[error("reply missing report byte")]
    MissingReport,
    /// Reply data shorter than the command requires
    #[error("reply too short: need {needed} bytes, got {got}")]
    TooShort { needed: usize, got: usize },
}

/// A reply split into status, report and data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Response<'a> {
    /// Address the reply came from
    pub address: u8,
    pub status: Status,
    /// Missing when the status is not normal
    pub report: Option<Report>,
    /// Command-specific data after status and report
    pub data: &'a [u8],
}

impl<'a> Response<'a> {
    /// Split a received frame
    pub fn parse(frame: &'a Frame) -> Result<Self, ResponseError> {
        let (&status, rest) = frame.payload.split_first().ok_or(ResponseError::Empty)?;
        let (report, data) = match rest.split_first() {
            Some((&report, data)) => (Some(Report::from_byte(report)), data),
            None => (None, rest),
        };

        Ok(Self {
            address: frame.address,
            status: Status::from_byte(status),
            report,
            data,
        })
    }

    /// Returns true if both status and report are normal
    pub fn is_ok(&self) -> bool {
        self.status == Status::Normal && self.report == Some(Report::Normal)
    }

    /// Data, checked to hold at least `needed` bytes
    pub fn data_at_least(&self, needed: usize) -> Result<&'a [u8], ResponseError> {
        if self.data.len() < needed {
            return Err(ResponseError::TooShort {
                needed,
                got: self.data.len(),
            });
        }
        Ok(self.data)
    }
}

/// Revision number packed as BCD, e.g. `0x13` is 1.3
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Version {
    pub major: u8,
    pub minor: u8,
}

impl Version {
    /// Unpack a BCD revision byte
    pub fn from_bcd(byte: u8) -> Self {
        Self {
            major: byte >> 4,
            minor: byte & 0x0F,
        }
    }
}

impl core::fmt::Display for Version {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Switch inputs returned by the read switches command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchState {
    /// System switches (test, tilt)
    pub system: u8,
    /// Player switch bytes, `bytes_per_player` per player, MSB first
    pub players: Vec<Vec<u8>>,
}

impl SwitchState {
    /// Parse reply data for `players` players of `bytes_per_player` bytes each
    pub fn parse(data: &[u8], players: u8, bytes_per_player: u8) -> Result<Self, ResponseError> {
        let per_player = bytes_per_player as usize;
        let needed = 1 + players as usize * per_player;
        if data.len() < needed {
            return Err(ResponseError::TooShort {
                needed,
                got: data.len(),
            });
        }

        let players = if per_player == 0 {
            vec![Vec::new(); players as usize]
        } else {
            data[1..needed]
                .chunks_exact(per_player)
                .map(<[u8]>::to_vec)
                .collect()
        };

        Ok(Self {
            system: data[0],
            players,
        })
    }

    /// Returns true if switch `index` of `player` is pressed
    ///
    /// Switches are numbered from the most significant bit of the first byte.
    pub fn is_pressed(&self, player: usize, index: usize) -> bool {
        self.players
            .get(player)
            .and_then(|bytes| bytes.get(index / 8))
            .is_some_and(|byte| byte & (0x80 >> (index % 8)) != 0)
    }
}

/// Bytes needed to hold `switches` switch bits
pub fn switch_bytes(switches: u8) -> u8 {
    switches.div_ceil(8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_roundtrip() {
        for byte in 0..=u8::MAX {
            assert_eq!(Status::from_byte(byte).to_byte(), byte);
            assert_eq!(Report::from_byte(byte).to_byte(), byte);
        }
    }

    #[test]
    fn test_parse_normal_reply() {
        let frame = Frame::new(0x00, &[0x01, 0x01, 0x13]).unwrap();
        let response = Response::parse(&frame).unwrap();

        assert_eq!(response.address, 0x00);
        assert_eq!(response.status, Status::Normal);
        assert_eq!(response.report, Some(Report::Normal));
        assert_eq!(response.data, &[0x13]);
        assert!(response.is_ok());
    }

    #[test]
    fn test_parse_status_only() {
        let frame = Frame::new(0x00, &[0x02]).unwrap();
        let response = Response::parse(&frame).unwrap();

        assert_eq!(response.status, Status::UnknownCommand);
        assert_eq!(response.report, None);
        assert!(response.data.is_empty());
        assert!(!response.is_ok());
    }

    #[test]
    fn test_parse_empty_reply() {
        let frame = Frame::empty(0x00);
        assert_eq!(Response::parse(&frame), Err(ResponseError::Empty));
    }

    #[test]
    fn test_busy_report_is_not_ok() {
        let frame = Frame::new(0x00, &[0x01, 0x04]).unwrap();
        let response = Response::parse(&frame).unwrap();
        assert_eq!(response.report, Some(Report::Busy));
        assert!(!response.is_ok());
    }

    #[test]
    fn test_data_at_least() {
        let frame = Frame::new(0x00, &[0x01, 0x01, 0x10]).unwrap();
        let response = Response::parse(&frame).unwrap();
        assert_eq!(response.data_at_least(1), Ok(&[0x10][..]));
        assert_eq!(
            response.data_at_least(2),
            Err(ResponseError::TooShort { needed: 2, got: 1 })
        );
    }

    #[test]
    fn test_version_from_bcd() {
        let version = Version::from_bcd(0x13);
        assert_eq!(version, Version { major: 1, minor: 3 });
        assert_eq!(version.to_string(), "1.3");
    }

    #[test]
    fn test_switch_state() {
        let state = SwitchState::parse(&[0x80, 0x80, 0x01, 0x40, 0x00], 2, 2).unwrap();

        assert_eq!(state.system, 0x80);
        assert_eq!(state.players, vec![vec![0x80, 0x01], vec![0x40, 0x00]]);
        assert!(state.is_pressed(0, 0));
        assert!(state.is_pressed(0, 15));
        assert!(state.is_pressed(1, 1));
        assert!(!state.is_pressed(1, 0));
        assert!(!state.is_pressed(2, 0));
    }

    #[test]
    fn test_switch_state_too_short() {
        assert_eq!(
            SwitchState::parse(&[0x00, 0x00], 2, 1),
            Err(ResponseError::TooShort { needed: 3, got: 2 })
        );
    }

    #[test]
    fn test_switch_bytes() {
        assert_eq!(switch_bytes(0), 0);
        assert_eq!(switch_bytes(8), 1);
        assert_eq!(switch_bytes(13), 2);
        assert_eq!(switch_bytes(255), 32);
    }
}
