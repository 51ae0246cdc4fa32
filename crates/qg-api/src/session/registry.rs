//! Live sessions, one async mutex each
//!
//! The map lock is only held for lookups and inserts; all session work happens
//! under the per-session mutex so every session has a single writer.

use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock},
};

use chrono::{DateTime, Duration, Utc};
use qg_core::{Phase, Session};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::ApiError;

#[derive(Debug)]
pub struct SessionEntry {
    pub session: Session,
    pub last_active: DateTime<Utc>,
}

impl SessionEntry {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            last_active: Utc::now(),
        }
    }

    pub fn touch(&mut self) {
        self.last_active = Utc::now();
    }
}

pub type SessionHandle = Arc<Mutex<SessionEntry>>;

#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<Uuid, SessionHandle>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `session` under `id`, failing if the id is taken
    pub fn insert(&self, id: Uuid, session: Session) -> Result<SessionHandle, ApiError> {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        if sessions.contains_key(&id) {
            return Err(ApiError::SessionExists);
        }
        let handle = Arc::new(Mutex::new(SessionEntry::new(session)));
        sessions.insert(id, handle.clone());
        crate::metrics::set_active_sessions(sessions.len());
        Ok(handle)
    }

    pub fn get(&self, id: Uuid) -> Result<SessionHandle, ApiError> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
            .ok_or(ApiError::SessionNotFound)
    }

    /// Forget a session, handing back its handle; saved progress is left in the store
    pub fn remove(&self, id: Uuid) -> Option<SessionHandle> {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let removed = sessions.remove(&id);
        crate::metrics::set_active_sessions(sessions.len());
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop sessions idle for longer than `max_idle`, returning how many went
    ///
    /// Sessions that are locked or waiting for a generation result are kept.
    pub fn sweep_idle(&self, max_idle: Duration) -> usize {
        let cutoff = Utc::now() - max_idle;
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let before = sessions.len();

        sessions.retain(|id, handle| match handle.try_lock() {
            Ok(entry) => {
                let idle = entry.last_active < cutoff && entry.session.phase() != Phase::Generating;
                if idle {
                    tracing::debug!(session_id = %id, "Dropping idle session");
                }
                !idle
            }
            Err(_) => true,
        });

        crate::metrics::set_active_sessions(sessions.len());
        before - sessions.len()
    }
}
