//! Room-based service and its join authorization hook
//!
//! The room abstraction owns credential extraction: `JoinOptions` carries
//! whatever the client sent with its join request, and the configured
//! `RoomGuard` decides how to pull a credential out of it. The default
//! guard reads the `token` field and runs it through the shared verifier,
//! synchronously, during the room's own join step.

use crate::auth::{AuthContext, AuthError, TokenVerifier};
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Options presented by a client when joining a room.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JoinOptions {
    /// Service token, if the client supplied one.
    pub token: Option<String>,
}

/// Per-room authorization hook.
pub trait RoomGuard: Send + Sync {
    /// Authorize a join attempt from its options.
    fn authorize(&self, options: &JoinOptions) -> Result<AuthContext, AuthError>;
}

/// Default guard: verify the `token` join option.
pub struct TokenRoomGuard {
    verifier: TokenVerifier,
}

impl TokenRoomGuard {
    pub fn new(verifier: TokenVerifier) -> Self {
        Self { verifier }
    }
}

impl RoomGuard for TokenRoomGuard {
    fn authorize(&self, options: &JoinOptions) -> Result<AuthContext, AuthError> {
        let token = options
            .token
            .as_deref()
            .ok_or(AuthError::CredentialMissing)?;
        let claims = self.verifier.verify(token)?;
        Ok(AuthContext::new(claims))
    }
}

/// A member of a room.
#[derive(Debug, Clone)]
pub struct RoomMember {
    pub subject: String,
    pub role: String,
}

/// A named room with its current members, keyed by a member id chosen by
/// the transport (e.g. the connection id).
pub struct Room {
    pub name: String,
    members: RwLock<HashMap<String, RoomMember>>,
}

impl Room {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            members: RwLock::new(HashMap::new()),
        }
    }

    pub fn member_count(&self) -> usize {
        self.members.read().len()
    }

    pub fn members(&self) -> Vec<RoomMember> {
        self.members.read().values().cloned().collect()
    }

    pub fn contains(&self, member_id: &str) -> bool {
        self.members.read().contains_key(member_id)
    }
}

/// Registry of active rooms.
pub struct RoomRegistry {
    rooms: DashMap<String, Arc<Room>>,
    guard: Arc<dyn RoomGuard>,
}

impl RoomRegistry {
    pub fn new(guard: Arc<dyn RoomGuard>) -> Self {
        Self {
            rooms: DashMap::new(),
            guard,
        }
    }

    /// Authorize and add a member; the room is created on first join.
    ///
    /// No room state is touched until the guard has accepted the join.
    pub fn join(
        &self,
        room_name: &str,
        member_id: &str,
        options: &JoinOptions,
    ) -> Result<AuthContext, AuthError> {
        let context = self.guard.authorize(options)?;

        // The member is inserted while the registry entry is still held;
        // a concurrent leave cannot observe the room empty and drop it
        // between room creation and the insert.
        let room = self
            .rooms
            .entry(room_name.to_string())
            .or_insert_with(|| Arc::new(Room::new(room_name)));
        room.members.write().insert(
            member_id.to_string(),
            RoomMember {
                subject: context.subject().to_string(),
                role: context.role().to_string(),
            },
        );
        drop(room);

        debug!(room = %room_name, subject = %context.subject(), "member joined");
        Ok(context)
    }

    /// Remove a member; empty rooms are dropped.
    pub fn leave(&self, room_name: &str, member_id: &str) {
        if let Some(room) = self.rooms.get(room_name) {
            room.members.write().remove(member_id);
        }
        self.rooms.remove_if(room_name, |_, room| room.member_count() == 0);
    }

    pub fn get(&self, room_name: &str) -> Option<Arc<Room>> {
        self.rooms.get(room_name).map(|r| r.clone())
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}
