//! External login-session seam
//!
//! The federated login provider is an external collaborator; this module
//! only models the lookup it exposes: an opaque session id resolving to
//! the authenticated user, or nothing. The provider's own protocol
//! (OAuth flows, cookie format) stays outside the gateway.

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use dashmap::DashMap;
use rand::Rng;
use thiserror::Error;

/// The external record of an already-authenticated browser user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    pub role: Option<String>,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

impl Session {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            role: None,
            email: None,
            display_name: None,
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }
}

/// Session lookup errors
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    #[error("session lookup failed: {0}")]
    Lookup(String),
}

/// Lookup against the login provider's session store.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Resolve a session id; `None` means unauthenticated.
    async fn current(&self, session_id: &str) -> Result<Option<Session>, SessionError>;
}

/// In-memory provider for development and tests.
#[derive(Default)]
pub struct InMemorySessions {
    sessions: DashMap<String, Session>,
}

impl InMemorySessions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a session under a fresh opaque id and return the id.
    pub fn insert(&self, session: Session) -> String {
        let mut rng = rand::rng();
        let mut bytes = [0u8; 16];
        rng.fill(&mut bytes);

        let id = URL_SAFE_NO_PAD.encode(bytes);
        self.sessions.insert(id.clone(), session);
        id
    }

    /// Store a session under a caller-chosen id.
    pub fn insert_with_id(&self, id: impl Into<String>, session: Session) {
        self.sessions.insert(id.into(), session);
    }

    pub fn remove(&self, id: &str) {
        self.sessions.remove(id);
    }
}

#[async_trait]
impl SessionProvider for InMemorySessions {
    async fn current(&self, session_id: &str) -> Result<Option<Session>, SessionError> {
        Ok(self.sessions.get(session_id).map(|s| s.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_and_lookup() {
        let store = InMemorySessions::new();
        let id = store.insert(Session::new("u1").with_role("admin"));

        let session = store.current(&id).await.unwrap().unwrap();
        assert_eq!(session.user_id, "u1");
        assert_eq!(session.role.as_deref(), Some("admin"));
    }

    #[tokio::test]
    async fn test_unknown_id_is_unauthenticated() {
        let store = InMemorySessions::new();
        assert!(store.current("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_removed_session_disappears() {
        let store = InMemorySessions::new();
        let id = store.insert(Session::new("u1"));
        store.remove(&id);

        assert!(store.current(&id).await.unwrap().is_none());
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let store = InMemorySessions::new();
        let a = store.insert(Session::new("u1"));
        let b = store.insert(Session::new("u2"));
        assert_ne!(a, b);
    }
}
