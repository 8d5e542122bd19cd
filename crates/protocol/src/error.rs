use thiserror::Error;

use crate::state::ConnectionState;

/// Errors produced while packing or unpacking a frame
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FrameError {
    #[error("Failed to encode frame: {0}")]
    Encode(String),

    #[error("Failed to decode frame: {0}")]
    Decode(String),

    #[error("Frame is not an array (got {0})")]
    NotAnArray(String),

    #[error("Frame has {0} trailing bytes")]
    TrailingBytes(usize),

    #[error("Frame is empty")]
    Empty,

    #[error("Invalid opcode: {0}")]
    InvalidOpcode(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProtocolError {
    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition {
        from: ConnectionState,
        to: ConnectionState,
    },

    #[error(transparent)]
    Frame(#[from] FrameError),
}

pub type Result<T> = std::result::Result<T, ProtocolError>;
pub type FrameResult<T> = std::result::Result<T, FrameError>;
