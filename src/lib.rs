//! # roomlink
//!
//! Client-side engine that multiplexes many game rooms over one
//! WebSocket connection to a real-time multiplayer server.
//!
//! ## Components
//!
//! - `roomlink-protocol`: frame codec, opcodes, connection states and the
//!   transport abstraction
//! - `roomlink-client`: the client event loop, rooms and built-in transports
//!
//! ## Example
//!
//! See `demos/lobby_client.rs`.

pub use roomlink_client as client;
pub use roomlink_protocol as protocol;
