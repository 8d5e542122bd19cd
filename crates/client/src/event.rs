//! Notifications delivered to application code
//!
//! The connection publishes [`ClientEvent`]s on the channel returned by
//! `Client::new`/`Client::connect`; each room publishes [`RoomEvent`]s on
//! its own channel (see `Room::events`). Errors travel on the same channels
//! as regular traffic.

use std::sync::Arc;

use bytes::Bytes;
use roomlink_protocol::{RoomId, Value};

use crate::room::Room;
use crate::ClientError;

/// Connection-level events
#[derive(Debug)]
pub enum ClientEvent {
    /// The server assigned this client its identifier
    Open { client_id: String },

    /// A room received data; also delivered to the room itself
    Message { room: Arc<Room>, payload: Value },

    /// A frame was dropped, a join was rejected or the transport failed
    Error(ClientError),

    /// The socket is closed and every room has been left
    Close,
}

/// Server clock values sent alongside a state snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RemoteClock {
    /// Server's current time
    pub time: f64,

    /// Time elapsed on the server since the room was created
    pub elapsed: f64,
}

/// Room-level events
#[derive(Debug, Clone, PartialEq)]
pub enum RoomEvent {
    /// The server confirmed the join and assigned the room its id
    Joined { id: RoomId },

    /// A full state snapshot replaced the room's state
    StateChanged { state: Value, clock: RemoteClock },

    /// An incremental state patch, as one contiguous buffer
    Patch(Bytes),

    /// Application data sent by the room
    Data(Value),

    /// The join was rejected or the room reported an error
    Error(String),

    /// The room was left; no further events follow
    Left,
}
