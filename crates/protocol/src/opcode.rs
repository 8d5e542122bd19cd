//! Opcodes of the room protocol
//!
//! Every frame starts with one of these integers. The numeric values are
//! shared with the server and must not change.

/// Server → Client: assigns the client identifier, `[USER_ID, client_id]`
pub const USER_ID: u8 = 1;

/// Client → Server: `[JOIN_ROOM, name, options?]`
/// Server → Client: `[JOIN_ROOM, room_id, name]`
pub const JOIN_ROOM: u8 = 10;

/// Server → Client: `[JOIN_ERROR, name, reason?]`
pub const JOIN_ERROR: u8 = 11;

/// Bidirectional: `[LEAVE_ROOM, room_id]`
pub const LEAVE_ROOM: u8 = 12;

/// Bidirectional: `[ROOM_DATA, room_id, payload]`
pub const ROOM_DATA: u8 = 13;

/// Server → Client: `[ROOM_STATE, room_id, state, remote_clock, remote_elapsed]`
pub const ROOM_STATE: u8 = 14;

/// Server → Client: `[ROOM_STATE_PATCH, room_id, bytes]`
pub const ROOM_STATE_PATCH: u8 = 15;

/// Typed view of the opcodes above
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    UserId,
    JoinRoom,
    JoinError,
    LeaveRoom,
    RoomData,
    RoomState,
    RoomStatePatch,
}

impl Opcode {
    /// Maps a wire value to an opcode, `None` for codes this client does not know
    pub fn from_code(code: u64) -> Option<Self> {
        let code = u8::try_from(code).ok()?;
        match code {
            USER_ID => Some(Opcode::UserId),
            JOIN_ROOM => Some(Opcode::JoinRoom),
            JOIN_ERROR => Some(Opcode::JoinError),
            LEAVE_ROOM => Some(Opcode::LeaveRoom),
            ROOM_DATA => Some(Opcode::RoomData),
            ROOM_STATE => Some(Opcode::RoomState),
            ROOM_STATE_PATCH => Some(Opcode::RoomStatePatch),
            _ => None,
        }
    }

    /// Wire value of this opcode
    pub fn code(self) -> u8 {
        match self {
            Opcode::UserId => USER_ID,
            Opcode::JoinRoom => JOIN_ROOM,
            Opcode::JoinError => JOIN_ERROR,
            Opcode::LeaveRoom => LEAVE_ROOM,
            Opcode::RoomData => ROOM_DATA,
            Opcode::RoomState => ROOM_STATE,
            Opcode::RoomStatePatch => ROOM_STATE_PATCH,
        }
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Opcode::UserId => write!(f, "USER_ID"),
            Opcode::JoinRoom => write!(f, "JOIN_ROOM"),
            Opcode::JoinError => write!(f, "JOIN_ERROR"),
            Opcode::LeaveRoom => write!(f, "LEAVE_ROOM"),
            Opcode::RoomData => write!(f, "ROOM_DATA"),
            Opcode::RoomState => write!(f, "ROOM_STATE"),
            Opcode::RoomStatePatch => write!(f, "ROOM_STATE_PATCH"),
        }
    }
}
