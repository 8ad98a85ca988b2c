//! Command set for the master side of the bus
//!
//! A request payload starts with a command code followed by its
//! parameters. Only the commands needed to bring up a board and poll its
//! switches are modelled here.

use crate::frame::{Frame, FrameError};

/// Broadcast address, also used by boards that have not been assigned one
pub const BROADCAST: u8 = 0xFF;

/// Address of the master; every board reply is sent here
pub const MASTER_ADDRESS: u8 = 0x00;

// Command codes
pub const CMD_RESET: u8 = 0xF0;
pub const CMD_ASSIGN_ADDRESS: u8 = 0xF1;
pub const CMD_READ_ID: u8 = 0x10;
pub const CMD_COMMAND_VERSION: u8 = 0x11;
pub const CMD_JVS_VERSION: u8 = 0x12;
pub const CMD_PROTOCOL_VERSION: u8 = 0x13;
pub const CMD_READ_FEATURES: u8 = 0x14;
pub const CMD_READ_SWITCHES: u8 = 0x20;

/// Requests sent by the master
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    /// Reset every board on the bus
    Reset,
    /// Give the next unaddressed board an address
    AssignAddress(u8),
    /// Read the identification string
    ReadId,
    /// Read the command format revision
    CommandVersion,
    /// Read the JVS revision
    JvsVersion,
    /// Read the communication protocol revision
    ProtocolVersion,
    /// Read the feature table
    ReadFeatures,
    /// Read player switch inputs
    ReadSwitches { players: u8, bytes_per_player: u8 },
}

impl Command {
    /// Command code (first payload byte)
    pub fn code(&self) -> u8 {
        match self {
            Command::Reset => CMD_RESET,
            Command::AssignAddress(_) => CMD_ASSIGN_ADDRESS,
            Command::ReadId => CMD_READ_ID,
            Command::CommandVersion => CMD_COMMAND_VERSION,
            Command::JvsVersion => CMD_JVS_VERSION,
            Command::ProtocolVersion => CMD_PROTOCOL_VERSION,
            Command::ReadFeatures => CMD_READ_FEATURES,
            Command::ReadSwitches { .. } => CMD_READ_SWITCHES,
        }
    }

    /// Returns true if the board answers this command
    ///
    /// Boards stay silent after a reset.
    pub fn expects_reply(&self) -> bool {
        !matches!(self, Command::Reset)
    }

    /// Encode this command into a frame addressed to `address`
    pub fn to_frame(&self, address: u8) -> Result<Frame, FrameError> {
        match *self {
            Command::AssignAddress(assigned) => Frame::new(address, &[self.code(), assigned]),
            Command::ReadSwitches {
                players,
                bytes_per_player,
            } => Frame::new(address, &[self.code(), players, bytes_per_player]),
            _ => Frame::new(address, &[self.code()]),
        }
    }
}
