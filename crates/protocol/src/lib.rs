//! # roomlink protocol
//!
//! Wire-level definitions shared by every roomlink client:
//! - `opcode`: the fixed opcode set agreed with the server
//! - `codec`: MessagePack packing of frames into binary messages
//! - `Frame` / `RoomKey`: typed access to decoded positional arguments
//! - `ConnectionState`: socket state machine
//! - `Transport`: the socket abstraction the client loop is driven by
//!
//! ## Example
//!
//! ```
//! use roomlink_protocol::{codec, Frame, Opcode, RoomKey};
//! use roomlink_protocol::opcode::JOIN_ROOM;
//! use rmpv::Value;
//!
//! let bytes = codec::encode(&[Value::from(JOIN_ROOM), Value::from(3), Value::from("lobby")]).unwrap();
//! let frame = Frame::decode(&bytes).unwrap();
//!
//! assert_eq!(frame.opcode(), Some(Opcode::JoinRoom));
//! assert_eq!(frame.room_key(0).unwrap(), RoomKey::Id(3));
//! assert_eq!(frame.room_key(1).unwrap(), RoomKey::Name("lobby".into()));
//! ```

pub mod codec;
pub mod error;
pub mod frame;
pub mod opcode;
pub mod state;
pub mod transport;

pub use error::{FrameError, FrameResult, ProtocolError, Result};
pub use frame::{Frame, RoomId, RoomKey};
pub use opcode::Opcode;
pub use rmpv::Value;
pub use state::ConnectionState;
pub use transport::{Transport, TransportEvent};
