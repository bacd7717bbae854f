//! Connection state management

use crate::auth::AuthContext;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Message to send to a client
#[derive(Debug, Clone)]
pub struct OutboundMessage {
    pub payload: Vec<u8>,
}

/// An authenticated realtime connection
pub struct ClientConnection {
    /// Unique connection ID
    pub id: Uuid,
    /// Claims attached at handshake; live for the whole connection
    pub context: AuthContext,
    /// The raw credential presented at handshake, passed through to room
    /// joins so the room abstraction owns its own extraction
    pub token: String,
    /// Rooms this connection has joined
    pub rooms: RwLock<HashSet<String>>,
    /// Channel for sending messages to this client
    pub tx: mpsc::Sender<OutboundMessage>,
}

impl ClientConnection {
    pub fn new(context: AuthContext, token: String, tx: mpsc::Sender<OutboundMessage>) -> Self {
        Self {
            id: Uuid::new_v4(),
            context,
            token,
            rooms: RwLock::new(HashSet::new()),
            tx,
        }
    }

    /// Send a message to this client
    pub async fn send(
        &self,
        msg: OutboundMessage,
    ) -> Result<(), mpsc::error::SendError<OutboundMessage>> {
        self.tx.send(msg).await
    }

    pub fn track_room(&self, room: &str) {
        self.rooms.write().insert(room.to_string());
    }

    pub fn untrack_room(&self, room: &str) {
        self.rooms.write().remove(room);
    }
}

/// Manages all active connections
#[derive(Clone, Default)]
pub struct ConnectionManager {
    connections: Arc<DashMap<Uuid, Arc<ClientConnection>>>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new connection
    pub fn add(&self, conn: Arc<ClientConnection>) {
        self.connections.insert(conn.id, conn);
    }

    /// Remove a connection
    pub fn remove(&self, id: Uuid) -> Option<Arc<ClientConnection>> {
        self.connections.remove(&id).map(|(_, conn)| conn)
    }

    /// Get a connection by ID
    pub fn get(&self, id: Uuid) -> Option<Arc<ClientConnection>> {
        self.connections.get(&id).map(|r| r.clone())
    }

    /// Get total connection count
    pub fn count(&self) -> usize {
        self.connections.len()
    }

    /// Get all connections authenticated as the given subject
    pub fn find_by_subject(&self, subject: &str) -> Vec<Arc<ClientConnection>> {
        self.connections
            .iter()
            .filter(|entry| entry.value().context.subject() == subject)
            .map(|entry| entry.value().clone())
            .collect()
    }
}
