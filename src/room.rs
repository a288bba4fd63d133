//! Room directory and subscription index
//!
//! Tracks known rooms with their optional owner, plus the two mirrored
//! subscription maps (room → users, user → rooms). Every mutation goes
//! through `link`/`unlink` so both sides always change together.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::error::RoomError;
use crate::message::RoomListing;
use crate::types::normalize_room;

/// A named group-messaging scope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    /// Normalized room name
    pub name: String,
    /// Creator, None for default or auto-created rooms
    pub owner: Option<String>,
}

impl Room {
    fn new(name: String, owner: Option<String>) -> Self {
        Self { name, owner }
    }

    /// Owner name, empty when unowned
    pub fn owner_name(&self) -> &str {
        self.owner.as_deref().unwrap_or("")
    }

    /// Case-sensitive ownership check
    pub fn is_owned_by(&self, user: &str) -> bool {
        self.owner.as_deref() == Some(user)
    }
}

/// Room directory plus the bidirectional subscription index
#[derive(Debug, Default)]
pub struct RoomDirectory {
    /// Normalized name → room, kept sorted for listings
    rooms: BTreeMap<String, Room>,
    room_users: HashMap<String, HashSet<String>>,
    user_rooms: HashMap<String, HashSet<String>>,
}

fn normalized(room: &str) -> Result<String, RoomError> {
    normalize_room(room).ok_or(RoomError::InvalidName)
}

impl RoomDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sure an ownerless room exists, returning its normalized name
    pub fn ensure(&mut self, room: &str) -> Option<String> {
        let name = normalize_room(room)?;
        self.rooms
            .entry(name.clone())
            .or_insert_with(|| Room::new(name.clone(), None));
        Some(name)
    }

    /// Create a room owned by `owner` and subscribe the owner to it
    pub fn create(&mut self, owner: &str, room: &str) -> Result<String, RoomError> {
        let name = normalized(room)?;
        if self.rooms.contains_key(&name) {
            return Err(RoomError::AlreadyExists);
        }

        let owner = Some(owner.to_string()).filter(|o| !o.is_empty());
        self.rooms.insert(name.clone(), Room::new(name.clone(), owner.clone()));
        if let Some(owner) = owner {
            self.link(&owner, &name);
        }
        Ok(name)
    }

    /// Delete a room on behalf of its owner
    ///
    /// Owner comparison ignores case. On success the room, its owner record
    /// and every subscription to it are gone; the former subscribers are
    /// returned so their group threads can be dropped too.
    pub fn delete(&mut self, owner: &str, room: &str) -> Result<Vec<String>, RoomError> {
        let name = normalized(room)?;
        let existing = self.rooms.get(&name).ok_or(RoomError::NotFound)?;
        let recorded = existing.owner.as_deref().ok_or(RoomError::NoOwner)?;
        if recorded.to_lowercase() != owner.to_lowercase() {
            return Err(RoomError::NotOwner);
        }

        let subscribers = self.subscribers(&name);
        for user in &subscribers {
            self.unlink(user, &name);
        }
        self.room_users.remove(&name);
        self.rooms.remove(&name);
        Ok(subscribers)
    }

    /// Subscribe `user` to an existing room
    pub fn subscribe(&mut self, user: &str, room: &str) -> Result<String, RoomError> {
        let name = normalized(room)?;
        if !self.rooms.contains_key(&name) {
            return Err(RoomError::NotFound);
        }
        self.link(user, &name);
        Ok(name)
    }

    /// Remove `user`'s subscription
    ///
    /// Owners cannot leave their own room. Leaving a room one never joined
    /// succeeds without changing anything.
    pub fn unsubscribe(&mut self, user: &str, room: &str) -> Result<String, RoomError> {
        let name = normalized(room)?;
        if self.rooms.get(&name).is_some_and(|r| r.is_owned_by(user)) {
            return Err(RoomError::OwnerCannotUnsubscribe);
        }
        self.unlink(user, &name);
        Ok(name)
    }

    /// All rooms with `user`'s subscription state, sorted by name
    pub fn list_for(&self, user: &str) -> Vec<RoomListing> {
        self.rooms
            .values()
            .map(|room| RoomListing {
                room: room.name.clone(),
                subscribed: self.is_subscribed(user, &room.name),
                owner: room.owner_name().to_string(),
                is_owner: room.is_owned_by(user),
            })
            .collect()
    }

    /// Subscribers of a normalized room name, sorted
    pub fn subscribers(&self, room: &str) -> Vec<String> {
        let mut users: Vec<String> = self
            .room_users
            .get(room)
            .map(|users| users.iter().cloned().collect())
            .unwrap_or_default();
        users.sort();
        users
    }

    /// Rooms `user` is subscribed to, sorted
    pub fn rooms_of(&self, user: &str) -> Vec<String> {
        let mut rooms: Vec<String> = self
            .user_rooms
            .get(user)
            .map(|rooms| rooms.iter().cloned().collect())
            .unwrap_or_default();
        rooms.sort();
        rooms
    }

    pub fn is_subscribed(&self, user: &str, room: &str) -> bool {
        self.user_rooms
            .get(user)
            .is_some_and(|rooms| rooms.contains(room))
    }

    pub fn get(&self, room: &str) -> Option<&Room> {
        self.rooms.get(room)
    }

    pub fn contains(&self, room: &str) -> bool {
        self.rooms.contains_key(room)
    }

    fn link(&mut self, user: &str, room: &str) {
        self.user_rooms
            .entry(user.to_string())
            .or_default()
            .insert(room.to_string());
        self.room_users
            .entry(room.to_string())
            .or_default()
            .insert(user.to_string());
    }

    fn unlink(&mut self, user: &str, room: &str) {
        if let Some(rooms) = self.user_rooms.get_mut(user) {
            rooms.remove(room);
            if rooms.is_empty() {
                self.user_rooms.remove(user);
            }
        }
        if let Some(users) = self.room_users.get_mut(room) {
            users.remove(user);
            if users.is_empty() {
                self.room_users.remove(room);
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn assert_index_mirrored(&self) {
        for (room, users) in &self.room_users {
            assert!(!users.is_empty(), "empty user set kept for {}", room);
            for user in users {
                assert!(self.user_rooms.get(user).is_some_and(|r| r.contains(room)));
            }
        }
        for (user, rooms) in &self.user_rooms {
            assert!(!rooms.is_empty(), "empty room set kept for {}", user);
            for room in rooms {
                assert!(self.room_users.get(room).is_some_and(|u| u.contains(user)));
            }
        }
    }
}
