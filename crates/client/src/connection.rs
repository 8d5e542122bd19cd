//! Connection state and protocol dispatch
//!
//! [`Connection`] owns everything that must only be touched from one place
//! at a time: the socket state, the room registry and the call queue. The
//! client event loop feeds it transport events and application commands one
//! by one, so no locking is needed here.

use std::sync::Arc;

use bytes::Bytes;
use roomlink_protocol::{
    codec, opcode, ConnectionState, Frame, Opcode, RoomId, RoomKey, TransportEvent, Value,
};
use tokio::sync::{mpsc, oneshot};

use crate::call_queue::{self, CallQueue, PendingCall};
use crate::event::ClientEvent;
use crate::registry::{Activation, RoomRegistry};
use crate::room::Room;
use crate::ClientError;

/// Requests from application code to the event loop
#[derive(Debug)]
pub(crate) enum Command {
    Join {
        name: String,
        options: Option<Value>,
        reply: oneshot::Sender<Result<Arc<Room>, ClientError>>,
    },
    Send(Vec<Value>),
    Leave(Arc<Room>),
    Close,
}

pub(crate) struct Connection {
    state: ConnectionState,

    /// Assigned by the server's USER_ID frame
    client_id: Option<String>,

    registry: RoomRegistry,

    queue: CallQueue,

    /// Frames to the transport; dropped to ask the transport to close
    outgoing_tx: Option<mpsc::UnboundedSender<Bytes>>,

    /// Handed to every room so it can reach this connection
    commands_tx: mpsc::UnboundedSender<Command>,

    events_tx: mpsc::UnboundedSender<ClientEvent>,
}

impl Connection {
    pub(crate) fn new(
        outgoing_tx: mpsc::UnboundedSender<Bytes>,
        commands_tx: mpsc::UnboundedSender<Command>,
        events_tx: mpsc::UnboundedSender<ClientEvent>,
    ) -> Self {
        Self {
            state: ConnectionState::Closed,
            client_id: None,
            registry: RoomRegistry::new(),
            queue: CallQueue::new(),
            outgoing_tx: Some(outgoing_tx),
            commands_tx,
            events_tx,
        }
    }

    /// Marks the socket handshake as started; calls are queued from now on
    pub(crate) fn begin_connect(&mut self) -> Result<(), ClientError> {
        self.state
            .transition_to(ConnectionState::Connecting)
            .map_err(|e| ClientError::InvalidStateTransition(e.to_string()))
    }

    pub(crate) fn state(&self) -> ConnectionState {
        self.state
    }

    #[cfg(test)]
    pub(crate) fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref()
    }

    #[cfg(test)]
    pub(crate) fn registry(&self) -> &RoomRegistry {
        &self.registry
    }

    #[cfg(test)]
    pub(crate) fn queued_calls(&self) -> usize {
        self.queue.len()
    }

    pub(crate) fn handle_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Opened => self.on_open(),
            TransportEvent::Message(bytes) => self.handle_message(&bytes),
            TransportEvent::Error(message) => {
                tracing::error!(error = %message, "Transport error");
                self.emit(ClientEvent::Error(ClientError::Transport(message)));
            }
            TransportEvent::Closed => self.on_closed(),
        }
    }

    pub(crate) fn handle_command(&mut self, command: Command) {
        match command {
            Command::Join {
                name,
                options,
                reply,
            } => {
                let result = self.join(name, options);
                // The caller may have stopped waiting
                let _ = reply.send(result);
            }
            Command::Send(args) => {
                if let Err(e) = self.send(args) {
                    self.report(e);
                }
            }
            Command::Leave(room) => self.leave_room(&room, true),
            Command::Close => self.close(),
        }
    }

    /// Returns the live room for `name`, or registers one and requests the join
    pub(crate) fn join(
        &mut self,
        name: String,
        options: Option<Value>,
    ) -> Result<Arc<Room>, ClientError> {
        if self.state.is_closing_or_closed() {
            return Err(ClientError::ConnectionClosed);
        }

        let commands_tx = self.commands_tx.clone();
        let (room, created) = self
            .registry
            .get_or_insert_with(&name, || Room::new(name.clone(), commands_tx));

        if !created {
            tracing::debug!(room = %name, "Join already requested, reusing room");
            return Ok(room);
        }

        tracing::info!(room = %name, "Requesting join");

        let mut args = vec![Value::from(opcode::JOIN_ROOM), Value::from(name.as_str())];
        if let Some(options) = options {
            args.push(options);
        }

        if let Err(e) = self.send(args) {
            self.registry.remove_room(&room);
            return Err(e);
        }

        Ok(room)
    }

    /// Writes a frame now if the socket is open, queues it while connecting
    pub(crate) fn send(&mut self, args: Vec<Value>) -> Result<(), ClientError> {
        match self.state {
            ConnectionState::Open => self.transmit(&args),
            ConnectionState::Connecting => {
                tracing::debug!(queued = self.queue.len() + 1, "Socket not open, queueing call");
                self.queue.enqueue(call_queue::SEND, args);
                Ok(())
            }
            ConnectionState::Closing | ConnectionState::Closed => Err(ClientError::ConnectionClosed),
        }
    }

    /// Removes `room` and emits its `Left` event
    ///
    /// With `notify_server` the server is sent `[LEAVE_ROOM, id]` if the room
    /// has an id. A room still waiting for its id is left as soon as the
    /// server confirms the join.
    pub(crate) fn leave_room(&mut self, room: &Arc<Room>, notify_server: bool) {
        if room.has_left() {
            return;
        }

        let registered = self.registry.remove_room(room);

        if notify_server && registered {
            match room.id() {
                Some(id) => self.request_leave(id),
                None => {
                    tracing::debug!(room = %room.name(), "Leaving before join confirmation");
                    self.registry.abandon(room.name());
                }
            }
        }

        room.mark_left();

        tracing::info!(room = %room.name(), id = ?room.id(), notify_server, "Left room");
    }

    /// Starts closing the socket and leaves every room locally
    pub(crate) fn close(&mut self) {
        if self.state.is_closing_or_closed() {
            return;
        }

        tracing::info!(rooms = self.registry.len(), "Closing connection");

        if let Err(e) = self.state.transition_to(ConnectionState::Closing) {
            tracing::warn!(error = %e, "Unexpected state while closing");
        }

        self.teardown();

        // Dropping the sender tells the transport to close the socket
        self.outgoing_tx = None;
    }

    /// Sends `[LEAVE_ROOM, id]` and expects the server to echo it
    fn request_leave(&mut self, id: RoomId) {
        let args = vec![Value::from(opcode::LEAVE_ROOM), Value::from(id)];
        match self.send(args) {
            Ok(()) => self.registry.retire(id),
            Err(e) => self.report(e),
        }
    }

    fn on_open(&mut self) {
        if self.state.is_closing_or_closed() {
            tracing::debug!(state = %self.state, "Transport opened after close was requested");
            return;
        }

        if let Err(e) = self.state.transition_to(ConnectionState::Open) {
            self.report(ClientError::InvalidStateTransition(e.to_string()));
            return;
        }

        tracing::info!(queued = self.queue.len(), "Transport open, flushing queued calls");

        for call in self.queue.drain() {
            self.execute(call);
        }
    }

    fn on_closed(&mut self) {
        if self.state.is_closed() {
            return;
        }

        self.state = ConnectionState::Closed;
        self.teardown();
        self.outgoing_tx = None;

        tracing::info!("Connection closed");
        self.emit(ClientEvent::Close);
    }

    fn teardown(&mut self) {
        for room in self.registry.drain() {
            room.mark_left();
        }

        let dropped = self.queue.clear();
        if dropped > 0 {
            tracing::debug!(dropped, "Discarded queued calls");
        }
    }

    fn execute(&mut self, call: PendingCall) {
        match call.method.as_str() {
            call_queue::SEND => {
                if let Err(e) = self.transmit(&call.args) {
                    self.report(e);
                }
            }
            other => {
                tracing::debug!(method = other, "Skipping queued call with unknown method");
            }
        }
    }

    fn transmit(&mut self, args: &[Value]) -> Result<(), ClientError> {
        let bytes = codec::encode(args).map_err(ClientError::Encode)?;
        let outgoing_tx = self
            .outgoing_tx
            .as_ref()
            .ok_or(ClientError::ConnectionClosed)?;

        tracing::trace!(len = bytes.len(), "Sending frame");

        outgoing_tx
            .send(bytes)
            .map_err(|_| ClientError::ChannelSendError)
    }

    /// Decodes and dispatches one inbound frame
    ///
    /// Any failure drops just this frame and is reported as a
    /// [`ClientEvent::Error`].
    pub(crate) fn handle_message(&mut self, bytes: &[u8]) {
        let frame = match Frame::decode(bytes) {
            Ok(frame) => frame,
            Err(e) => {
                self.report(ClientError::Decode(e));
                return;
            }
        };

        if let Err(e) = self.dispatch(frame) {
            self.report(e);
        }
    }

    fn dispatch(&mut self, frame: Frame) -> Result<(), ClientError> {
        let Some(opcode) = frame.opcode() else {
            tracing::warn!(opcode = frame.code(), "Unknown opcode, ignoring frame");
            return Ok(());
        };

        tracing::debug!(%opcode, args = frame.args().len(), "Client received frame");

        match opcode {
            Opcode::UserId => self.handle_user_id(&frame),
            Opcode::JoinRoom => self.handle_join_room(&frame),
            Opcode::JoinError => self.handle_join_error(&frame),
            Opcode::LeaveRoom => self.handle_leave_room(&frame),
            Opcode::RoomState => self.handle_room_state(frame),
            Opcode::RoomStatePatch => self.handle_room_state_patch(&frame),
            Opcode::RoomData => self.handle_room_data(frame),
        }
    }

    fn handle_user_id(&mut self, frame: &Frame) -> Result<(), ClientError> {
        let client_id = frame
            .string(0)
            .map_err(|e| ClientError::malformed(Opcode::UserId, e))?;

        if let Some(current) = &self.client_id {
            tracing::warn!(current = %current, ignored = %client_id, "Client id already assigned");
            return Ok(());
        }

        tracing::info!(client_id = %client_id, "Client id assigned");
        self.client_id = Some(client_id.clone());
        self.emit(ClientEvent::Open { client_id });

        Ok(())
    }

    fn handle_join_room(&mut self, frame: &Frame) -> Result<(), ClientError> {
        let id = frame
            .room_id(0)
            .map_err(|e| ClientError::malformed(Opcode::JoinRoom, e))?;
        let name = frame
            .string(1)
            .map_err(|e| ClientError::malformed(Opcode::JoinRoom, e))?;

        if self.registry.take_abandoned(&name) {
            tracing::info!(room = %name, id, "Join confirmed for a room already left, leaving");
            self.request_leave(id);
            return Ok(());
        }

        let room = match self.registry.activate(&name, id) {
            Activation::Joined(room) => room,
            Activation::IdInUse { holder } => {
                return Err(ClientError::RoomIdConflict {
                    id,
                    room: name,
                    holder: holder.name().to_string(),
                });
            }
            Activation::Unresolved => {
                return Err(ClientError::UnresolvedRoom {
                    opcode: Opcode::JoinRoom,
                    key: RoomKey::Name(name),
                });
            }
        };

        if room.joined(id) {
            tracing::info!(room = %name, id, "Joined room");
        } else {
            tracing::debug!(room = %name, id, "Repeated join confirmation");
        }

        Ok(())
    }

    fn handle_join_error(&mut self, frame: &Frame) -> Result<(), ClientError> {
        let key = frame
            .room_key(0)
            .map_err(|e| ClientError::malformed(Opcode::JoinError, e))?;
        let reason = frame
            .args()
            .get(1)
            .and_then(Value::as_str)
            .unwrap_or("join rejected")
            .to_string();

        if let RoomKey::Name(name) = &key {
            if self.registry.take_abandoned(name) {
                tracing::debug!(room = %name, reason = %reason, "Join rejected for a room already left");
                return Ok(());
            }
        }

        let room = self
            .registry
            .get(&key)
            .cloned()
            .ok_or_else(|| ClientError::UnresolvedRoom {
                opcode: Opcode::JoinError,
                key: key.clone(),
            })?;

        tracing::warn!(room = %room.name(), reason = %reason, "Join rejected");

        room.emit_error(reason.clone());
        self.emit(ClientEvent::Error(ClientError::JoinRejected {
            room: room.name().to_string(),
            reason,
        }));
        self.registry.remove(&key);
        room.mark_left();

        Ok(())
    }

    fn handle_leave_room(&mut self, frame: &Frame) -> Result<(), ClientError> {
        let key = frame
            .room_key(0)
            .map_err(|e| ClientError::malformed(Opcode::LeaveRoom, e))?;

        if let Some(room) = self.registry.get(&key).cloned() {
            self.leave_room(&room, false);
            return Ok(());
        }

        // Server acknowledging a leave we already performed
        if let RoomKey::Id(id) = key {
            if self.registry.take_retired(id) {
                tracing::debug!(id, "Leave confirmed for room already left");
                return Ok(());
            }
        }

        Err(ClientError::UnresolvedRoom {
            opcode: Opcode::LeaveRoom,
            key,
        })
    }

    fn handle_room_state(&mut self, mut frame: Frame) -> Result<(), ClientError> {
        let room = self.resolve(Opcode::RoomState, &frame)?;

        let remote_time = frame
            .number(2)
            .map_err(|e| ClientError::malformed(Opcode::RoomState, e))?;
        let remote_elapsed = frame
            .number(3)
            .map_err(|e| ClientError::malformed(Opcode::RoomState, e))?;
        let snapshot = frame
            .take_arg(1)
            .map_err(|e| ClientError::malformed(Opcode::RoomState, e))?;

        room.set_state(snapshot, remote_time, remote_elapsed);

        Ok(())
    }

    fn handle_room_state_patch(&mut self, frame: &Frame) -> Result<(), ClientError> {
        let room = self.resolve(Opcode::RoomStatePatch, frame)?;
        let patch = frame
            .bytes(1)
            .map_err(|e| ClientError::malformed(Opcode::RoomStatePatch, e))?;

        tracing::trace!(room = %room.name(), len = patch.len(), "Applying state patch");
        room.apply_patch(patch);

        Ok(())
    }

    fn handle_room_data(&mut self, mut frame: Frame) -> Result<(), ClientError> {
        let room = self.resolve(Opcode::RoomData, &frame)?;
        let payload = frame
            .take_arg(1)
            .map_err(|e| ClientError::malformed(Opcode::RoomData, e))?;

        room.receive_data(payload.clone());
        self.emit(ClientEvent::Message { room, payload });

        Ok(())
    }

    /// Looks up the room named by the frame's first argument
    fn resolve(&self, opcode: Opcode, frame: &Frame) -> Result<Arc<Room>, ClientError> {
        let key = frame
            .room_key(0)
            .map_err(|e| ClientError::malformed(opcode, e))?;

        self.registry
            .get(&key)
            .cloned()
            .ok_or(ClientError::UnresolvedRoom { opcode, key })
    }

    fn report(&self, error: ClientError) {
        tracing::warn!(error = %error, "Dropping frame or call");
        self.emit(ClientEvent::Error(error));
    }

    fn emit(&self, event: ClientEvent) {
        // Nobody listening is fine, events are informational
        let _ = self.events_tx.send(event);
    }
}
