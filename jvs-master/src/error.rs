//! Error types for the session layer.

use std::io;

use jvs_protocol::{FrameError, RecvError, Report, ResponseError, Status};
use thiserror::Error;

/// Failure of one request/response exchange
#[derive(Debug, Error)]
pub enum MasterError {
    /// Encoding or decoding a frame failed
    #[error(transparent)]
    Frame(#[from] FrameError),

    /// The serial transport failed
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The reply payload was malformed
    #[error("malformed reply: {0}")]
    Response(#[from] ResponseError),

    /// The board rejected the request
    #[error("board returned status {0:?}")]
    Status(Status),

    /// The board could not execute the command
    #[error("board returned report {0:?}")]
    Report(Report),

    /// The reply was not addressed to the master
    #[error("reply addressed to {got:#04x}, expected {expected:#04x}")]
    UnexpectedAddress { expected: u8, got: u8 },
}

impl From<RecvError<io::Error>> for MasterError {
    fn from(e: RecvError<io::Error>) -> Self {
        match e {
            RecvError::Frame(e) => MasterError::Frame(e),
            RecvError::Transport(e) => MasterError::Io(e),
        }
    }
}

impl MasterError {
    /// Returns true if no reply arrived in time
    pub fn is_timeout(&self) -> bool {
        matches!(self, MasterError::Frame(FrameError::Timeout))
    }
}

/// Result type alias using MasterError.
pub type Result<T> = std::result::Result<T, MasterError>;
