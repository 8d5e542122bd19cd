//! Transport state machine for a room connection
//!
//! State transitions:
//! ```text
//! CLOSED → CONNECTING → OPEN → CLOSING → CLOSED
//!            │            │                 ↑
//!            └────────────┴─────────────────┘
//!                  (transport closed or failed)
//! ```

use crate::error::{ProtocolError, Result};

/// State of the single socket a client multiplexes its rooms over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No socket, or the socket has finished closing
    #[default]
    Closed,

    /// Socket handshake in progress, outbound calls are queued
    Connecting,

    /// Socket open, outbound calls go straight to the transport
    Open,

    /// Close requested, waiting for the transport to report closed
    Closing,
}

impl ConnectionState {
    /// Validates a state transition
    pub fn can_transition_to(&self, next: ConnectionState) -> bool {
        use ConnectionState::*;

        match (self, next) {
            (Closed, Connecting) => true,

            (Connecting, Open) => true,
            (Connecting, Closing) => true, // closed before the handshake finished
            (Connecting, Closed) => true,  // handshake failed

            (Open, Closing) => true,
            (Open, Closed) => true, // peer went away

            (Closing, Closed) => true,

            (a, b) if a == &b => true,

            _ => false,
        }
    }

    /// Attempts to transition to a new state
    ///
    /// Returns Ok(()) if transition is valid, Err otherwise
    pub fn transition_to(&mut self, next: ConnectionState) -> Result<()> {
        if self.can_transition_to(next) {
            *self = next;
            Ok(())
        } else {
            Err(ProtocolError::InvalidStateTransition {
                from: *self,
                to: next,
            })
        }
    }

    /// Returns true if frames may be written to the transport
    #[inline]
    pub fn is_open(&self) -> bool {
        matches!(self, ConnectionState::Open)
    }

    /// Returns true if the connection is closed
    #[inline]
    pub fn is_closed(&self) -> bool {
        matches!(self, ConnectionState::Closed)
    }

    /// Returns true while the connection is shutting down or already down
    #[inline]
    pub fn is_closing_or_closed(&self) -> bool {
        matches!(self, ConnectionState::Closing | ConnectionState::Closed)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Closed => write!(f, "Closed"),
            ConnectionState::Connecting => write!(f, "Connecting"),
            ConnectionState::Open => write!(f, "Open"),
            ConnectionState::Closing => write!(f, "Closing"),
        }
    }
}
