//! # roomlink client
//!
//! Client-side event loop that multiplexes one socket across any number of
//! rooms.
//!
//! ## Example
//!
//! ```no_run
//! use roomlink_client::{Client, ClientConfig, ClientEvent};
//!
//! #[tokio::main]
//! async fn main() {
//!     let (client, mut events) = Client::connect_websocket(&ClientConfig::default());
//!
//!     let room = client.join("battle").await.unwrap();
//!     let room_events = room.events().unwrap();
//!
//!     while let Some(event) = events.recv().await {
//!         if let ClientEvent::Close = event {
//!             break;
//!         }
//!     }
//! #   drop(room_events);
//! }
//! ```

pub mod call_queue;
pub mod config;
mod connection;
pub mod event;
pub mod registry;
pub mod room;
pub mod transport;

use std::sync::Arc;

use bytes::Bytes;
use roomlink_protocol::{codec, FrameError, Opcode, RoomKey, Transport, TransportEvent, Value};
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};

use crate::connection::{Command, Connection};
use crate::transport::websocket::WebSocketClient;

pub use config::ClientConfig;
pub use event::{ClientEvent, RemoteClock, RoomEvent};
pub use room::Room;

/// Client event loop
///
/// Owns the connection state and processes transport events and
/// application commands strictly one at a time, in the order they are
/// received from each channel.
pub struct Client {
    /// Events from the transport layer
    transport_rx: mpsc::Receiver<TransportEvent>,

    /// Requests from [`ClientHandle`]s and rooms
    commands_rx: mpsc::UnboundedReceiver<Command>,

    connection: Connection,
}

impl Client {
    /// Creates a client loop bound to a transport's channels
    ///
    /// Returns the loop itself (drive it with [`Client::run`]), a handle for
    /// application code and the receiver for connection-level events.
    pub fn new(
        transport_rx: mpsc::Receiver<TransportEvent>,
        outgoing_tx: mpsc::UnboundedSender<Bytes>,
    ) -> (Self, ClientHandle, mpsc::UnboundedReceiver<ClientEvent>) {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let mut connection = Connection::new(outgoing_tx, commands_tx.clone(), events_tx);
        if let Err(e) = connection.begin_connect() {
            tracing::warn!(error = %e, "Unexpected initial connection state");
        }

        let client = Self {
            transport_rx,
            commands_rx,
            connection,
        };

        (client, ClientHandle { commands_tx }, events_rx)
    }

    /// Connects over `transport` and spawns the event loop
    ///
    /// Must be called from within a Tokio runtime. Connection failures are
    /// reported as [`ClientEvent::Error`] followed by [`ClientEvent::Close`].
    pub fn connect<T: Transport>(
        transport: T,
        config: &ClientConfig,
    ) -> (ClientHandle, mpsc::UnboundedReceiver<ClientEvent>) {
        let (transport_tx, transport_rx) = mpsc::channel(config.channel_capacity.max(1));
        let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();

        let (client, handle, events) = Client::new(transport_rx, outgoing_tx);

        transport::spawn(transport, transport_tx, outgoing_rx);
        tokio::spawn(client.run());

        (handle, events)
    }

    /// Connects to `config.url` over WebSocket
    pub fn connect_websocket(
        config: &ClientConfig,
    ) -> (ClientHandle, mpsc::UnboundedReceiver<ClientEvent>) {
        Self::connect(WebSocketClient::new(config.url.clone()), config)
    }

    /// Runs the main event loop
    ///
    /// Returns once the transport has reported the connection closed.
    pub async fn run(mut self) {
        loop {
            tokio::select! {
                event = self.transport_rx.recv() => {
                    match event {
                        Some(event) => self.connection.handle_transport_event(event),
                        None => self.connection.handle_transport_event(TransportEvent::Closed),
                    }
                }

                Some(command) = self.commands_rx.recv() => {
                    self.connection.handle_command(command);
                }
            }

            if self.connection.state().is_closed() {
                tracing::info!("Client shutting down: connection closed");
                break;
            }
        }
    }
}

/// Cloneable handle used by application code to drive a [`Client`]
#[derive(Debug, Clone)]
pub struct ClientHandle {
    commands_tx: mpsc::UnboundedSender<Command>,
}

impl ClientHandle {
    /// Joins the room called `name`
    ///
    /// Joining a name that is already pending or joined returns the same
    /// [`Room`] without sending another request.
    pub async fn join(&self, name: impl Into<String>) -> Result<Arc<Room>, ClientError> {
        self.request_join(name.into(), None).await
    }

    /// Joins the room called `name`, sending `options` with the request
    pub async fn join_with_options<T: Serialize + ?Sized>(
        &self,
        name: impl Into<String>,
        options: &T,
    ) -> Result<Arc<Room>, ClientError> {
        let options = codec::to_value(options).map_err(ClientError::Encode)?;
        self.request_join(name.into(), Some(options)).await
    }

    /// Sends a raw frame; queued while the socket is still opening
    ///
    /// Failures after the call is accepted are reported as
    /// [`ClientEvent::Error`].
    pub fn send(&self, args: Vec<Value>) -> Result<(), ClientError> {
        self.command(Command::Send(args))
    }

    /// Closes the connection, leaving every room
    pub fn close(&self) -> Result<(), ClientError> {
        self.command(Command::Close)
    }

    async fn request_join(
        &self,
        name: String,
        options: Option<Value>,
    ) -> Result<Arc<Room>, ClientError> {
        let (reply, response) = oneshot::channel();
        self.command(Command::Join {
            name,
            options,
            reply,
        })?;

        response.await.map_err(|_| ClientError::ConnectionClosed)?
    }

    fn command(&self, command: Command) -> Result<(), ClientError> {
        self.commands_tx
            .send(command)
            .map_err(|_| ClientError::ConnectionClosed)
    }
}

/// Client errors
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Failed to decode frame: {0}")]
    Decode(FrameError),

    #[error("Failed to encode frame: {0}")]
    Encode(FrameError),

    #[error("Malformed {opcode} frame: {source}")]
    MalformedFrame {
        opcode: Opcode,
        #[source]
        source: FrameError,
    },

    #[error("{opcode} frame references unknown room {key}")]
    UnresolvedRoom { opcode: Opcode, key: RoomKey },

    #[error("Room {room:?} confirmed with id {id}, which room {holder:?} already holds")]
    RoomIdConflict {
        id: roomlink_protocol::RoomId,
        room: String,
        holder: String,
    },

    #[error("Join to room {room:?} rejected: {reason}")]
    JoinRejected { room: String, reason: String },

    #[error("Room {0:?} has no server-assigned id")]
    RoomNotJoined(String),

    #[error("Connection is closed")]
    ConnectionClosed,

    #[error("Failed to send frame through channel")]
    ChannelSendError,

    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),
}

impl ClientError {
    pub(crate) fn malformed(opcode: Opcode, source: FrameError) -> Self {
        ClientError::MalformedFrame { opcode, source }
    }
}
