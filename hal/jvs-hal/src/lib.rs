//! JVS Hardware Abstraction Layer
//!
//! This crate defines the transport traits the JVS link layer is written
//! against. The protocol crate never touches a serial port directly; it
//! reads and writes through these traits, so the same codec runs against a
//! USB RS-485 adapter, a socket, or a scripted test double.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Session (jvs-master)                   │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  Wire protocol (jvs-protocol)           │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  jvs-hal (this crate - traits)          │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  IoSerial<T: Read + Write> / test port  │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Traits
//!
//! - [`serial::SerialTx`], [`serial::SerialRx`] - Byte transport
//! - [`deadline::Deadline`] - Per-read cut-off threaded through every receive

#![deny(unsafe_code)]

pub mod deadline;
pub mod io;
pub mod serial;

// Re-export key types at crate root for convenience
pub use deadline::Deadline;
pub use io::IoSerial;
pub use serial::{LineSettingError, ReadError, SerialConfig, SerialPort, SerialRx, SerialTx};
