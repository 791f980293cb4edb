//! Registry of admitted sessions
//!
//! Owned exclusively by the `ChatServer` actor, so every mutation and every
//! broadcast snapshot happens on the same serialized command stream.
//!
//! A session is *admitted* from accept until teardown and *registered* once
//! its name is set. Population counts admitted sessions; broadcasts only see
//! registered ones.

use std::collections::HashMap;

use crate::client::Client;
use crate::types::SessionId;

/// Session id → client mapping
#[derive(Debug, Default)]
pub struct Registry {
    clients: HashMap<SessionId, Client>,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit a freshly accepted session
    ///
    /// Returns the population including the new arrival.
    pub fn admit(&mut self, client: Client) -> usize {
        self.clients.insert(client.id, client);
        self.clients.len()
    }

    /// Complete the handshake for a session
    ///
    /// Returns None if the session is unknown or already named.
    pub fn register(&mut self, id: SessionId, name: String) -> Option<&Client> {
        let client = self.clients.get_mut(&id)?;
        if client.is_registered() {
            return None;
        }
        client.set_name(name);
        Some(client)
    }

    /// Remove a session (teardown)
    ///
    /// Only the first call for a given id returns the client.
    pub fn remove(&mut self, id: SessionId) -> Option<Client> {
        self.clients.remove(&id)
    }

    /// Every registered session except `id`
    pub fn snapshot_excluding(&self, id: SessionId) -> Vec<&Client> {
        self.clients
            .values()
            .filter(|c| c.id != id && c.is_registered())
            .collect()
    }

    /// Display name of a registered session
    pub fn lookup_name(&self, id: SessionId) -> Option<&str> {
        self.clients.get(&id).and_then(|c| c.name.as_deref())
    }

    /// Look up an admitted session
    pub fn get(&self, id: SessionId) -> Option<&Client> {
        self.clients.get(&id)
    }

    /// Number of admitted sessions, named or not
    pub fn population(&self) -> usize {
        self.clients.len()
    }

    /// Number of sessions that completed the handshake
    pub fn registered_count(&self) -> usize {
        self.clients.values().filter(|c| c.is_registered()).count()
    }
}
