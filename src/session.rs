use std::{collections::HashMap, path::PathBuf, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::models::User;

/// Session
///
/// Proof of authentication held for one browser: the backend bearer token plus the
/// user resolved for it. Created at sign-in (or when an unknown token is confirmed by
/// the backend), destroyed at sign-out, when the backend rejects the token, or once
/// `expires_at` has passed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user: User,
    pub created_at: DateTime<Utc>,
    /// After this instant the cached user is no longer trusted. `None` never expires.
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new(token: impl Into<String>, user: User) -> Self {
        Self {
            token: token.into(),
            user,
            created_at: Utc::now(),
            expires_at: None,
        }
    }

    pub fn with_expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Expiry relative to `created_at`, e.g. the backend's `expires_in`. A lifetime
    /// that does not fit a timestamp leaves the session without expiry.
    pub fn with_lifetime(mut self, lifetime: std::time::Duration) -> Self {
        self.expires_at = TimeDelta::from_std(lifetime)
            .ok()
            .and_then(|lifetime| self.created_at.checked_add_signed(lifetime));
        self
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

#[derive(Debug, Error)]
pub enum SessionStoreError {
    #[error("session file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("session file is not valid JSON: {0}")]
    Serde(#[from] serde_json::Error),
}

// 1. SessionStore Contract
/// SessionStore
///
/// Keyed by bearer token. Readers (the route guard, the `AuthUser` extractor) never
/// write except to cache a principal confirmed by the backend or to drop a session the
/// backend rejected.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, token: &str) -> Result<Option<Session>, SessionStoreError>;

    /// Inserts or replaces the session for `session.token`.
    async fn put(&self, session: Session) -> Result<(), SessionStoreError>;

    /// Returns whether a session was actually removed.
    async fn remove(&self, token: &str) -> Result<bool, SessionStoreError>;
}

/// SessionState
///
/// The concrete type used to share the session store across the application state.
pub type SessionState = Arc<dyn SessionStore>;

// 2. In-Memory Implementation
/// MemorySessionStore
///
/// Sessions live for the lifetime of the process. Used in tests and when no session
/// file is configured.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, token: &str) -> Result<Option<Session>, SessionStoreError> {
        Ok(self.sessions.read().await.get(token).cloned())
    }

    async fn put(&self, session: Session) -> Result<(), SessionStoreError> {
        self.sessions
            .write()
            .await
            .insert(session.token.clone(), session);
        Ok(())
    }

    async fn remove(&self, token: &str) -> Result<bool, SessionStoreError> {
        Ok(self.sessions.write().await.remove(token).is_some())
    }
}

// 3. Durable Implementation
/// FileSessionStore
///
/// Keeps sessions in memory and mirrors every change to a JSON file, so a gateway
/// restart does not sign every user out. The whole map is rewritten on each change
/// through a temporary file and a rename.
pub struct FileSessionStore {
    path: PathBuf,
    sessions: RwLock<HashMap<String, Session>>,
}

impl FileSessionStore {
    /// open
    ///
    /// Loads the existing session file, or starts empty when it does not exist yet.
    /// Sessions that expired while the gateway was down are not loaded.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, SessionStoreError> {
        let path = path.into();
        let sessions = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.is_empty() => HashMap::new(),
            Ok(bytes) => {
                let stored: Vec<Session> = serde_json::from_slice(&bytes)?;
                stored
                    .into_iter()
                    .filter(|session| !session.is_expired())
                    .map(|session| (session.token.clone(), session))
                    .collect()
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };

        tracing::info!(
            path = %path.display(),
            sessions = sessions.len(),
            "Session file loaded"
        );

        Ok(Self {
            path,
            sessions: RwLock::new(sessions),
        })
    }

    async fn persist(&self, sessions: &HashMap<String, Session>) -> Result<(), SessionStoreError> {
        let stored: Vec<&Session> = sessions.values().collect();
        let bytes = serde_json::to_vec_pretty(&stored)?;

        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn get(&self, token: &str) -> Result<Option<Session>, SessionStoreError> {
        Ok(self.sessions.read().await.get(token).cloned())
    }

    async fn put(&self, session: Session) -> Result<(), SessionStoreError> {
        // The write lock is held across the file write so concurrent changes are
        // persisted in the order they were applied.
        let mut sessions = self.sessions.write().await;
        sessions.insert(session.token.clone(), session);
        self.persist(&sessions).await
    }

    async fn remove(&self, token: &str) -> Result<bool, SessionStoreError> {
        let mut sessions = self.sessions.write().await;
        let removed = sessions.remove(token).is_some();
        if removed {
            self.persist(&sessions).await?;
        }
        Ok(removed)
    }
}
