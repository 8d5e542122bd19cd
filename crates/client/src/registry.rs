//! Registry of the rooms a connection owns
//!
//! Rooms are first registered under the name they were requested with.
//! When the server confirms a join, [`RoomRegistry::activate`] moves the
//! same `Arc<Room>` from its name key to its numeric id key.
//!
//! Lookups that miss return `None`; deciding whether a miss is an error is
//! left to the caller.
//!
//! Besides the live rooms the registry remembers two kinds of leftovers
//! from leaves the server has not seen through yet: ids we sent LEAVE_ROOM
//! for, until the server echoes it, and names left before their join was
//! confirmed, until the confirmation arrives.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use roomlink_protocol::{RoomId, RoomKey};

use crate::room::Room;

#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: HashMap<RoomKey, Arc<Room>>,

    /// Ids we sent LEAVE_ROOM for and whose echo has not arrived
    retired: HashSet<RoomId>,

    /// Names left while pending, with the number of confirmations still owed
    abandoned: HashMap<String, usize>,
}

/// Outcome of [`RoomRegistry::activate`]
#[derive(Debug)]
pub enum Activation {
    /// The room now answers to the id
    Joined(Arc<Room>),

    /// Another live room already holds the id; nothing was re-keyed
    IdInUse { holder: Arc<Room> },

    /// Neither the name nor the id resolves
    Unresolved,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &RoomKey) -> Option<&Arc<Room>> {
        self.rooms.get(key)
    }

    pub fn resolve_by_id(&self, id: RoomId) -> Option<&Arc<Room>> {
        self.rooms.get(&RoomKey::Id(id))
    }

    pub fn resolve_by_name(&self, name: &str) -> Option<&Arc<Room>> {
        self.rooms.get(&RoomKey::Name(name.to_string()))
    }

    /// Finds a live room requested under `name`, pending or already active
    pub fn find_by_name(&self, name: &str) -> Option<&Arc<Room>> {
        self.resolve_by_name(name)
            .or_else(|| self.rooms.values().find(|room| room.name() == name))
    }

    /// Returns the live room for `name`, or registers the one built by `create`
    ///
    /// The boolean is true when a new room was registered.
    pub fn get_or_insert_with(
        &mut self,
        name: &str,
        create: impl FnOnce() -> Arc<Room>,
    ) -> (Arc<Room>, bool) {
        if let Some(room) = self.find_by_name(name) {
            return (Arc::clone(room), false);
        }

        let room = create();
        self.rooms
            .insert(RoomKey::Name(name.to_string()), Arc::clone(&room));
        (room, true)
    }

    /// Re-keys the room pending under `name` to `id`
    ///
    /// When nothing is pending under `name` (a repeated confirmation, for
    /// example) the room already registered under `id` is returned instead.
    /// A pending room is never re-keyed onto an id another room holds.
    pub fn activate(&mut self, name: &str, id: RoomId) -> Activation {
        let name_key = RoomKey::Name(name.to_string());
        let id_key = RoomKey::Id(id);

        let Some(pending) = self.rooms.get(&name_key) else {
            return match self.rooms.get(&id_key) {
                Some(room) => Activation::Joined(Arc::clone(room)),
                None => Activation::Unresolved,
            };
        };

        if let Some(holder) = self.rooms.get(&id_key) {
            if !Arc::ptr_eq(holder, pending) {
                return Activation::IdInUse {
                    holder: Arc::clone(holder),
                };
            }
        }

        match self.rooms.remove(&name_key) {
            Some(room) => {
                self.rooms.insert(id_key, Arc::clone(&room));
                Activation::Joined(room)
            }
            None => Activation::Unresolved,
        }
    }

    /// Removes whatever room is registered under `key`
    pub fn remove(&mut self, key: &RoomKey) -> Option<Arc<Room>> {
        self.rooms.remove(key)
    }

    /// Removes `room` if this exact instance is still registered
    pub fn remove_room(&mut self, room: &Arc<Room>) -> bool {
        let key = match room.id() {
            Some(id) => RoomKey::Id(id),
            None => RoomKey::Name(room.name().to_string()),
        };

        match self.rooms.get(&key) {
            Some(registered) if Arc::ptr_eq(registered, room) => {
                self.rooms.remove(&key);
                true
            }
            _ => false,
        }
    }

    /// Remembers that LEAVE_ROOM was sent for `id`
    pub fn retire(&mut self, id: RoomId) {
        self.retired.insert(id);
    }

    /// Consumes the record of a LEAVE_ROOM sent for `id`
    ///
    /// True exactly once per [`RoomRegistry::retire`], when the server's echo
    /// for that id arrives.
    pub fn take_retired(&mut self, id: RoomId) -> bool {
        self.retired.remove(&id)
    }

    /// Remembers that a join for `name` was abandoned before it was confirmed
    pub fn abandon(&mut self, name: &str) {
        *self.abandoned.entry(name.to_string()).or_insert(0) += 1;
    }

    /// Consumes one abandoned join for `name`, if any is owed a confirmation
    pub fn take_abandoned(&mut self, name: &str) -> bool {
        match self.abandoned.get_mut(name) {
            Some(count) if *count > 1 => {
                *count -= 1;
                true
            }
            Some(_) => {
                self.abandoned.remove(name);
                true
            }
            None => false,
        }
    }

    /// Removes every room, returning them
    ///
    /// Leave bookkeeping is dropped too: after a drain no echo or
    /// confirmation is expected any more.
    pub fn drain(&mut self) -> Vec<Arc<Room>> {
        self.retired.clear();
        self.abandoned.clear();
        self.rooms.drain().map(|(_, room)| room).collect()
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}
