//! JVS Link Layer
//!
//! This crate implements the master side of the JAMMA Video Standard
//! serial protocol used by arcade I/O boards: framing, byte stuffing,
//! checksums, and decoding of the board's feature table.
//!
//! # Protocol Overview
//!
//! All messages use the same escaped binary frame:
//! ```text
//! ┌───────┬─────────┬────────┬─────────────┬──────────┐
//! │ START │ ADDRESS │ LENGTH │ PAYLOAD     │ CHECKSUM │
//! │ E0    │ 1B      │ n + 1  │ 0–254B      │ 1B       │
//! └───────┴─────────┴────────┴─────────────┴──────────┘
//! ```
//!
//! Bytes after START that equal `E0` or `D0` are sent as `D0, value - 1`.
//! The bus is strictly request/response: the master sends one frame, then
//! waits for exactly one reply before sending the next.

#![deny(unsafe_code)]

pub mod commands;
pub mod escape;
pub mod features;
pub mod frame;
pub mod response;

pub use commands::{Command, BROADCAST, MASTER_ADDRESS};
pub use escape::{LogicalByte, ESC, STX};
pub use features::{Feature, FeatureRecord, FeatureTable};
pub use frame::{
    decode, encode, Frame, FrameError, FrameParser, InvalidFrameKind, RecvError, MAX_FRAME_SIZE,
    MAX_PAYLOAD_SIZE,
};
pub use response::{Report, Response, ResponseError, Status, SwitchState, Version};
