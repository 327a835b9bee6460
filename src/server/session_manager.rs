use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, MutexGuard};
use tracing::debug;

use crate::{common::types::SessionId, player::SessionState};

/// One session: its state behind a short-lived lock, plus a membership lane
/// that serializes join, leave and reconnect end to end.
pub struct SessionEntry {
    pub session_id: SessionId,
    state: Mutex<SessionState>,
    membership: Mutex<()>,
}

impl SessionEntry {
    fn new(session_id: SessionId) -> Self {
        Self {
            state: Mutex::new(SessionState::new(session_id.clone())),
            membership: Mutex::new(()),
            session_id,
        }
    }

    pub async fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().await
    }

    pub async fn membership(&self) -> MutexGuard<'_, ()> {
        self.membership.lock().await
    }

    /// Background work backs off instead of queueing behind a user command.
    pub fn try_membership(&self) -> Option<MutexGuard<'_, ()>> {
        self.membership.try_lock().ok()
    }
}

/// Process-wide map of sessions, created on first reference.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: DashMap<SessionId, Arc<SessionEntry>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create(&self, session_id: &SessionId) -> Arc<SessionEntry> {
        if let Some(entry) = self.sessions.get(session_id) {
            return entry.clone();
        }
        self.sessions
            .entry(session_id.clone())
            .or_insert_with(|| {
                debug!("[{}] creating session", session_id);
                Arc::new(SessionEntry::new(session_id.clone()))
            })
            .clone()
    }

    pub fn get(&self, session_id: &SessionId) -> Option<Arc<SessionEntry>> {
        self.sessions.get(session_id).map(|e| e.clone())
    }

    /// Snapshot of the entries so callers never hold a shard across an await.
    pub fn entries(&self) -> Vec<Arc<SessionEntry>> {
        self.sessions.iter().map(|e| e.value().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
