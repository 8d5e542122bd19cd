//! Client-side handle for a joined (or joining) room
//!
//! A [`Room`] is created once per join request and shared between the
//! connection's registry and application code. Its identity never changes:
//! when the server confirms the join, the registry re-keys the same `Arc`
//! under the numeric id and the room records that id.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use bytes::Bytes;
use roomlink_protocol::{codec, opcode, RoomId, Value};
use serde::Serialize;
use tokio::sync::mpsc;

use crate::connection::Command;
use crate::event::{RemoteClock, RoomEvent};
use crate::ClientError;

#[derive(Debug, Default)]
struct ReplicatedState {
    snapshot: Option<Value>,
    clock: RemoteClock,
}

pub struct Room {
    name: String,

    /// Set exactly once, when JOIN_ROOM confirms the join
    id: OnceLock<RoomId>,

    state: Mutex<ReplicatedState>,

    left: AtomicBool,

    events_tx: mpsc::UnboundedSender<RoomEvent>,

    /// Handed out once through [`Room::events`]
    events_rx: Mutex<Option<mpsc::UnboundedReceiver<RoomEvent>>>,

    commands_tx: mpsc::UnboundedSender<Command>,
}

impl Room {
    pub(crate) fn new(name: impl Into<String>, commands_tx: mpsc::UnboundedSender<Command>) -> Arc<Self> {
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        Arc::new(Self {
            name: name.into(),
            id: OnceLock::new(),
            state: Mutex::new(ReplicatedState::default()),
            left: AtomicBool::new(false),
            events_tx,
            events_rx: Mutex::new(Some(events_rx)),
            commands_tx,
        })
    }

    /// Name the room was requested with
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Server-assigned id, `None` until the join is confirmed
    pub fn id(&self) -> Option<RoomId> {
        self.id.get().copied()
    }

    pub fn has_joined(&self) -> bool {
        self.id.get().is_some()
    }

    pub fn has_left(&self) -> bool {
        self.left.load(Ordering::Acquire)
    }

    /// Latest full snapshot received from the server
    pub fn state(&self) -> Option<Value> {
        self.lock_state().snapshot.clone()
    }

    /// Server clock values that accompanied the latest snapshot
    pub fn remote_clock(&self) -> RemoteClock {
        self.lock_state().clock
    }

    /// Takes the receiver for this room's events
    ///
    /// Events are buffered from the moment the room is created, so nothing
    /// is lost between `join` returning and this call. Only the first call
    /// returns `Some`.
    pub fn events(&self) -> Option<mpsc::UnboundedReceiver<RoomEvent>> {
        self.events_rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Sends a payload to the room as `[ROOM_DATA, id, data]`
    ///
    /// Fails with [`ClientError::RoomNotJoined`] until the server has
    /// assigned an id. While the socket is still opening the call is queued.
    pub fn send(&self, data: impl Into<Value>) -> Result<(), ClientError> {
        if self.has_left() {
            return Err(ClientError::RoomNotJoined(self.name.clone()));
        }

        let id = self
            .id()
            .ok_or_else(|| ClientError::RoomNotJoined(self.name.clone()))?;

        self.commands_tx
            .send(Command::Send(vec![
                Value::from(opcode::ROOM_DATA),
                Value::from(id),
                data.into(),
            ]))
            .map_err(|_| ClientError::ConnectionClosed)
    }

    /// Serializes `message` and sends it like [`Room::send`]
    pub fn send_message<T: Serialize + ?Sized>(&self, message: &T) -> Result<(), ClientError> {
        let value = codec::to_value(message).map_err(ClientError::Encode)?;
        self.send(value)
    }

    /// Asks the server to remove us from the room and forgets the room locally
    pub fn leave(self: &Arc<Self>) -> Result<(), ClientError> {
        if self.has_left() {
            return Ok(());
        }

        self.commands_tx
            .send(Command::Leave(Arc::clone(self)))
            .map_err(|_| ClientError::ConnectionClosed)
    }

    /// Records the server-assigned id; returns false if one was already set
    pub(crate) fn joined(&self, id: RoomId) -> bool {
        if self.id.set(id).is_err() {
            return false;
        }
        self.emit(RoomEvent::Joined { id });
        true
    }

    pub(crate) fn set_state(&self, snapshot: Value, remote_time: f64, remote_elapsed: f64) {
        let clock = RemoteClock {
            time: remote_time,
            elapsed: remote_elapsed,
        };

        {
            let mut state = self.lock_state();
            state.snapshot = Some(snapshot.clone());
            state.clock = clock;
        }

        self.emit(RoomEvent::StateChanged {
            state: snapshot,
            clock,
        });
    }

    pub(crate) fn apply_patch(&self, patch: Bytes) {
        self.emit(RoomEvent::Patch(patch));
    }

    pub(crate) fn receive_data(&self, payload: Value) {
        self.emit(RoomEvent::Data(payload));
    }

    pub(crate) fn emit_error(&self, message: impl Into<String>) {
        self.emit(RoomEvent::Error(message.into()));
    }

    /// Marks the room as left; only the first call emits [`RoomEvent::Left`]
    pub(crate) fn mark_left(&self) -> bool {
        if self.left.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.emit(RoomEvent::Left);
        true
    }

    fn emit(&self, event: RoomEvent) {
        // The application may have dropped its receiver; that is not an error
        let _ = self.events_tx.send(event);
    }

    fn lock_state(&self) -> MutexGuard<'_, ReplicatedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Room {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Room")
            .field("name", &self.name)
            .field("id", &self.id())
            .field("left", &self.has_left())
            .finish()
    }
}
