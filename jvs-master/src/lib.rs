//! Host-side session for JVS I/O boards
//!
//! Drives the board bring-up sequence (reset, address assignment,
//! identification, feature discovery) and switch polling over any
//! [`jvs_hal::SerialPort`], i.e. a transport reporting `std::io::Error`
//! in both directions. The session owns the port exclusively and
//! issues one request at a time; it never retries, leaving that policy to
//! the caller.

#![deny(unsafe_code)]

pub mod config;
pub mod device;
pub mod error;
pub mod master;

mod hex;

pub use config::{ConfigError, MasterConfig};
pub use device::DeviceInfo;
pub use error::MasterError;
pub use master::JvsMaster;
