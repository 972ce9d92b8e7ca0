//! Session storage for form tokens.
//!
//! Forms talk to a [`SessionStore`]; the HTTP layer bridges that to
//! `tower_sessions::Session` with [`load`] and [`persist`].

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use parking_lot::Mutex;
use tower_sessions::cookie::SameSite;
use tower_sessions::cookie::time::Duration;
use tower_sessions::{Expiry, MemoryStore, Session, SessionManagerLayer};
use uuid::Uuid;

use crate::config::Config;

/// Session key holding the anti-forgery token.
pub const TOKEN_SESSION_KEY: &str = "form_token";

/// Key/value storage scoped to one visitor session.
pub trait SessionStore {
    /// Identifier of the session, used as token seed material.
    fn id(&self) -> String;

    fn get(&self, key: &str) -> Option<String>;

    fn insert(&mut self, key: &str, value: String);

    /// Return the stored value, creating it with `make` when absent.
    ///
    /// `make` receives the session id. Stores shared between threads must
    /// override this so the read and the write happen under one lock.
    fn get_or_insert_with(&mut self, key: &str, make: &mut dyn FnMut(&str) -> String) -> String {
        if let Some(value) = self.get(key) {
            return value;
        }
        let value = make(&self.id());
        self.insert(key, value.clone());
        value
    }
}

/// Plain in-memory session.
#[derive(Debug, Clone, Default)]
pub struct MemorySession {
    id: String,
    values: HashMap<String, String>,
}

impl MemorySession {
    /// Create a session with a fresh random id.
    pub fn new() -> Self {
        Self::with_id(Uuid::now_v7().to_string())
    }

    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            values: HashMap::new(),
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.values.remove(key)
    }
}

impl SessionStore for MemorySession {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn insert(&mut self, key: &str, value: String) {
        self.values.insert(key.to_string(), value);
    }
}

/// A session shared between concurrent requests of the same visitor.
///
/// Clones share the same underlying storage.
#[derive(Debug, Clone, Default)]
pub struct SharedSession {
    inner: Arc<Mutex<MemorySession>>,
}

impl SharedSession {
    pub fn new(session: MemorySession) -> Self {
        Self {
            inner: Arc::new(Mutex::new(session)),
        }
    }

    /// Copy of the current session contents.
    pub fn snapshot(&self) -> MemorySession {
        self.inner.lock().clone()
    }
}

impl SessionStore for SharedSession {
    fn id(&self) -> String {
        self.inner.lock().id()
    }

    fn get(&self, key: &str) -> Option<String> {
        self.inner.lock().get(key)
    }

    fn insert(&mut self, key: &str, value: String) {
        self.inner.lock().insert(key, value);
    }

    fn get_or_insert_with(&mut self, key: &str, make: &mut dyn FnMut(&str) -> String) -> String {
        let mut guard = self.inner.lock();
        guard.get_or_insert_with(key, make)
    }
}

/// Copy the form-related session state out of a tower session.
pub async fn load(session: &Session) -> Result<MemorySession> {
    let id = session
        .id()
        .map(|id| id.to_string())
        .unwrap_or_else(|| Uuid::now_v7().to_string());

    let mut store = MemorySession::with_id(id);

    let token: Option<String> = session
        .get(TOKEN_SESSION_KEY)
        .await
        .context("failed to read form token from session")?;

    if let Some(token) = token {
        store.insert(TOKEN_SESSION_KEY, token);
    }

    Ok(store)
}

/// Write the form-related session state back into a tower session.
pub async fn persist(session: &Session, store: &MemorySession) -> Result<()> {
    if let Some(token) = store.get(TOKEN_SESSION_KEY) {
        session
            .insert(TOKEN_SESSION_KEY, token)
            .await
            .context("failed to store form token in session")?;
    }
    Ok(())
}

/// Create the session layer backed by an in-process store.
pub fn create_session_layer(config: &Config) -> SessionManagerLayer<MemoryStore> {
    let same_site = match config.cookie_same_site.as_str() {
        "lax" => SameSite::Lax,
        "none" => SameSite::None,
        _ => SameSite::Strict,
    };

    SessionManagerLayer::new(MemoryStore::default())
        .with_secure(config.cookie_secure)
        .with_http_only(true)
        .with_same_site(same_site)
        .with_expiry(Expiry::OnInactivity(Duration::hours(
            config.session_expiry_hours,
        )))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_get_or_insert_with_creates_once() {
        let mut session = MemorySession::with_id("abc");
        let mut calls = 0;
        let first = session.get_or_insert_with("k", &mut |id| {
            calls += 1;
            format!("{id}-value")
        });
        let second = session.get_or_insert_with("k", &mut |_| {
            calls += 1;
            "other".to_string()
        });

        assert_eq!(first, "abc-value");
        assert_eq!(second, "abc-value");
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_shared_session_clones_share_storage() {
        let mut a = SharedSession::new(MemorySession::with_id("s"));
        let b = a.clone();
        a.insert("k", "v".to_string());
        assert_eq!(b.get("k"), Some("v".to_string()));
        assert_eq!(b.snapshot().get("k"), Some("v".to_string()));
    }

    #[test]
    fn test_memory_session_remove() {
        let mut session = MemorySession::new();
        session.insert("k", "v".to_string());
        assert_eq!(session.remove("k"), Some("v".to_string()));
        assert!(session.get("k").is_none());
    }
}
