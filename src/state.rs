//! Shared broker state
//!
//! Registry, room directory and inbox form one aggregate behind one lock.
//! Operations that touch more than one part live here so that a single
//! write guard covers the whole update.

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::error::RoomError;
use crate::inbox::InboxStore;
use crate::registry::Registry;
use crate::room::RoomDirectory;
use crate::types::{group_thread, normalize_room};

/// State shared between the router and query handlers
pub type SharedState = Arc<RwLock<ChatState>>;

/// The broker's aggregate state
#[derive(Debug, Default)]
pub struct ChatState {
    pub registry: Registry,
    pub rooms: RoomDirectory,
    pub inbox: InboxStore,
}

impl ChatState {
    /// Empty state with `default_room` already in the directory
    pub fn new(default_room: &str) -> Self {
        let mut state = Self::default();
        state.rooms.ensure(default_room);
        state
    }

    pub fn shared(self) -> SharedState {
        Arc::new(RwLock::new(self))
    }

    /// Delete a room and every subscriber's group thread for it
    pub fn delete_room(&mut self, owner: &str, room: &str) -> Result<String, RoomError> {
        let name = normalize_room(room).ok_or(RoomError::InvalidName)?;
        let former = self.rooms.delete(owner, &name)?;

        let thread_id = group_thread(&name);
        for user in &former {
            self.inbox.remove_thread(user, &thread_id);
        }
        Ok(name)
    }

    /// Leave a room and drop the caller's group thread for it
    pub fn unsubscribe(&mut self, user: &str, room: &str) -> Result<String, RoomError> {
        let name = self.rooms.unsubscribe(user, room)?;
        self.inbox.remove_thread(user, &group_thread(&name));
        Ok(name)
    }
}
