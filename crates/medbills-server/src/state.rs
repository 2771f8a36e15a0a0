use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
    time::{Duration, Instant},
};

use medbills_core::{App, Session};
use tracing::debug;
use uuid::Uuid;

/// Sessions idle longer than this are dropped.
pub const SESSION_IDLE_TIMEOUT: Duration = Duration::from_secs(12 * 60 * 60);

pub type SharedSession = Arc<Mutex<Session>>;

struct SessionEntry {
    session: SharedSession,
    last_seen: Instant,
}

/// Shared server state: the app services plus the per-browser session registry.
pub struct State {
    pub app: Arc<App>,
    sessions: Mutex<HashMap<Uuid, SessionEntry>>,
}

impl State {
    pub fn new(app: App) -> Arc<Self> {
        Arc::new(Self {
            app: Arc::new(app),
            sessions: Mutex::new(HashMap::new()),
        })
    }

    /// Look up the caller's session and mark it as seen.
    pub fn session(&self, id: Option<Uuid>) -> Option<SharedSession> {
        let id = id?;
        let mut sessions = self.lock();
        let entry = sessions.get_mut(&id)?;
        entry.last_seen = Instant::now();
        Some(entry.session.clone())
    }

    /// Keep a session that has logged in. Idle sessions are pruned first.
    pub fn register(&self, session: Session) -> Uuid {
        let now = Instant::now();
        let mut sessions = self.lock();
        sessions.retain(|_, entry| now.duration_since(entry.last_seen) < SESSION_IDLE_TIMEOUT);

        let id = Uuid::new_v4();
        sessions.insert(
            id,
            SessionEntry {
                session: Arc::new(Mutex::new(session)),
                last_seen: now,
            },
        );
        debug!(sessions = sessions.len(), "Session created");
        id
    }

    /// Forget a session.
    pub fn end_session(&self, id: Uuid) {
        if self.lock().remove(&id).is_some() {
            debug!("Session ended");
        }
    }

    pub fn session_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, SessionEntry>> {
        self.sessions.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medbills_core::{CredentialGate, SqliteStore};

    fn state() -> Arc<State> {
        State::new(App::new(
            Box::new(SqliteStore::open_in_memory().unwrap()),
            CredentialGate::new("u", "p"),
        ))
    }

    #[test]
    fn test_unknown_id_has_no_session() {
        let state = state();
        assert!(state.session(Some(Uuid::new_v4())).is_none());
        assert!(state.session(None).is_none());
        assert_eq!(state.session_count(), 0);
    }

    #[test]
    fn test_registered_session_found() {
        let state = state();
        let id = state.register(Session::default());
        assert!(state.session(Some(id)).is_some());
        assert_eq!(state.session_count(), 1);
    }

    #[test]
    fn test_end_session() {
        let state = state();
        let id = state.register(Session::default());
        state.end_session(id);
        assert_eq!(state.session_count(), 0);
        assert!(state.session(Some(id)).is_none());
    }
}
