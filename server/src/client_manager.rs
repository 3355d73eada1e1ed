//! Session registry for connected players
//!
//! This module tracks every open WebSocket session on the server side:
//! - Session lifecycle (register on connect, unregister on close or eviction)
//! - Per-session score, which only grows through validated hits
//! - Liveness bookkeeping used by the liveness monitor
//! - The outbound channel each session's writer task drains
//!
//! The registry is owned by the event loop, so it never needs a lock.

use log::info;
use std::collections::BTreeMap;
use std::time::Instant;
use tokio::sync::mpsc;

pub type ClientId = u32;

/// Work items for a session's socket writer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// One encoded event, sent as a single binary frame
    Frame(Vec<u8>),
    /// Liveness probe
    Ping,
    /// Close the transport without further notice
    Terminate,
}

/// Server-side state for one connected player
#[derive(Debug)]
pub struct Client {
    /// Unique session identifier assigned by the server
    pub id: ClientId,
    /// Number of targets this session has claimed
    pub score: u16,
    /// Cleared when a probe is sent, set again when the pong arrives
    pub alive: bool,
    /// Last time any frame was exchanged with this session
    pub last_message: Instant,
    sender: mpsc::UnboundedSender<Outbound>,
}

impl Client {
    /// Creates a fresh session with zero score, marked alive
    pub fn new(id: ClientId, sender: mpsc::UnboundedSender<Outbound>) -> Self {
        Self {
            id,
            score: 0,
            alive: true,
            last_message: Instant::now(),
            sender,
        }
    }

    /// Returns true while the session's writer task is still receiving
    pub fn is_open(&self) -> bool {
        !self.sender.is_closed()
    }

    /// Queues work for the writer task. Returns false if the transport is gone.
    pub fn push(&self, outbound: Outbound) -> bool {
        self.sender.send(outbound).is_ok()
    }

    /// Checks whether the session has been quiet for longer than `timeout`
    pub fn is_idle(&self, now: Instant, timeout: std::time::Duration) -> bool {
        now.saturating_duration_since(self.last_message) > timeout
    }
}

/// Owns all open sessions
///
/// Sessions are kept in id order, which is also connection order since ids
/// come from a counter.
pub struct ClientManager {
    clients: BTreeMap<ClientId, Client>,
    next_client_id: ClientId,
}

impl ClientManager {
    /// Creates an empty registry. Client IDs start from 1.
    pub fn new() -> Self {
        Self {
            clients: BTreeMap::new(),
            next_client_id: 1,
        }
    }

    /// Registers a new session and returns its identifier
    pub fn add_client(&mut self, sender: mpsc::UnboundedSender<Outbound>) -> ClientId {
        let client_id = self.next_client_id;
        self.next_client_id = self.next_client_id.wrapping_add(1).max(1);

        self.clients.insert(client_id, Client::new(client_id, sender));
        info!("Client {} connected", client_id);

        client_id
    }

    /// Removes a session. Returns false if it was already gone.
    pub fn remove_client(&mut self, client_id: &ClientId) -> bool {
        if let Some(client) = self.clients.remove(client_id) {
            info!("Client {} disconnected with score {}", client.id, client.score);
            true
        } else {
            false
        }
    }

    pub fn get(&self, client_id: &ClientId) -> Option<&Client> {
        self.clients.get(client_id)
    }

    pub fn get_mut(&mut self, client_id: &ClientId) -> Option<&mut Client> {
        self.clients.get_mut(client_id)
    }

    /// Applies `f` to every session whose transport is still open
    pub fn for_each_open<F>(&mut self, mut f: F)
    where
        F: FnMut(&mut Client),
    {
        for client in self.clients.values_mut().filter(|c| c.is_open()) {
            f(client);
        }
    }

    /// Credits one validated hit and returns the new score
    pub fn record_hit(&mut self, client_id: &ClientId) -> Option<u16> {
        let client = self.clients.get_mut(client_id)?;
        client.score = client.score.saturating_add(1);
        Some(client.score)
    }

    /// Marks a session as responsive after a pong
    pub fn mark_alive(&mut self, client_id: &ClientId) -> bool {
        match self.clients.get_mut(client_id) {
            Some(client) => {
                client.alive = true;
                true
            }
            None => false,
        }
    }

    /// Refreshes the activity timestamp after an inbound frame
    pub fn touch(&mut self, client_id: &ClientId, now: Instant) {
        if let Some(client) = self.clients.get_mut(client_id) {
            client.last_message = now;
        }
    }

    pub fn client_ids(&self) -> Vec<ClientId> {
        self.clients.keys().copied().collect()
    }

    /// Returns the number of registered sessions
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Returns true if nobody is connected
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

impl Default for ClientManager {
    fn default() -> Self {
        Self::new()
    }
}
