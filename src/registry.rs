//! Registry of connected sessions
//!
//! Indexes live clients by connection id and by display name. Names are
//! not unique: a later registration shadows an earlier one in the name
//! index, and when the shadowing session leaves the name falls back to the
//! most recent remaining session that carries it.

use std::collections::HashMap;

use crate::client::Client;
use crate::message::ClientInfo;
use crate::types::ClientId;

#[derive(Debug)]
struct Registered {
    client: Client,
    /// Registration order, used to pick the fallback owner of a name
    seq: u64,
}

/// Connected sessions, by id and by name
#[derive(Debug, Default)]
pub struct Registry {
    by_id: HashMap<ClientId, Registered>,
    by_name: HashMap<String, ClientId>,
    next_seq: u64,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a client
    ///
    /// Re-registering an id replaces the previous entry.
    pub fn register(&mut self, client: Client) {
        if self.by_id.contains_key(&client.id) {
            self.unregister(client.id);
        }

        let seq = self.next_seq;
        self.next_seq += 1;

        self.by_name.insert(client.name.clone(), client.id);
        self.by_id.insert(client.id, Registered { client, seq });
    }

    /// Unregister a client, returning it if it was registered
    pub fn unregister(&mut self, id: ClientId) -> Option<Client> {
        let removed = self.by_id.remove(&id)?.client;

        if self.by_name.get(&removed.name) == Some(&id) {
            self.by_name.remove(&removed.name);

            let fallback = self
                .by_id
                .values()
                .filter(|r| r.client.name == removed.name)
                .max_by_key(|r| r.seq)
                .map(|r| r.client.id);
            if let Some(fallback) = fallback {
                self.by_name.insert(removed.name.clone(), fallback);
            }
        }

        Some(removed)
    }

    /// Look up a client by connection id
    pub fn get(&self, id: ClientId) -> Option<&Client> {
        self.by_id.get(&id).map(|r| &r.client)
    }

    /// Look up the client currently holding a display name
    pub fn by_name(&self, name: &str) -> Option<&Client> {
        self.by_name.get(name).and_then(|id| self.get(*id))
    }

    /// All connected clients, in no particular order
    pub fn clients(&self) -> impl Iterator<Item = &Client> {
        self.by_id.values().map(|r| &r.client)
    }

    /// Connected clients sorted by name
    ///
    /// `exclude` drops every entry whose id or name equals it.
    pub fn list(&self, exclude: Option<&str>) -> Vec<ClientInfo> {
        let exclude = exclude.filter(|e| !e.is_empty());
        let mut out: Vec<ClientInfo> = self
            .clients()
            .map(|c| ClientInfo {
                id: c.id.to_string(),
                name: c.name.clone(),
            })
            .filter(|info| match exclude {
                Some(token) => info.id != token && info.name != token,
                None => true,
            })
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        out
    }

    /// Number of connected clients
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Number of distinct names resolvable through the name index
    pub fn name_count(&self) -> usize {
        self.by_name.len()
    }
}
