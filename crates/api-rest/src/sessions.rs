//! In-memory store for open capture sessions.
//!
//! Sessions that go untouched for longer than the idle TTL are evicted the next time the
//! store is used. A session with a submit in flight is never evicted.

use portal_core::CaptureSession;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Idle time after which an open capture session is dropped.
pub const DEFAULT_SESSION_IDLE_TTL: Duration = Duration::from_secs(30 * 60);

/// Resolve the session idle TTL from an optional `PORTAL_SESSION_TTL_SECS` value.
///
/// # Errors
///
/// Returns an error if the value is present but not a whole number of seconds.
pub fn session_ttl_from_env_value(raw: Option<String>) -> anyhow::Result<Duration> {
    match raw.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(DEFAULT_SESSION_IDLE_TTL),
        Some(v) => v
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|e| anyhow::anyhow!("PORTAL_SESSION_TTL_SECS must be whole seconds: {e}")),
    }
}

struct SessionEntry {
    session: CaptureSession,
    last_touched: Instant,
}

pub(crate) struct SessionStore {
    entries: HashMap<Uuid, SessionEntry>,
    idle_ttl: Duration,
}

impl SessionStore {
    pub(crate) fn new(idle_ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            idle_ttl,
        }
    }

    pub(crate) fn insert(&mut self, id: Uuid, session: CaptureSession) {
        let now = Instant::now();
        self.evict_idle_at(now);
        self.entries.insert(
            id,
            SessionEntry {
                session,
                last_touched: now,
            },
        );
    }

    /// Look up a live session and mark it as used.
    pub(crate) fn get_mut(&mut self, id: &Uuid) -> Option<&mut CaptureSession> {
        let now = Instant::now();
        self.evict_idle_at(now);
        self.entries.get_mut(id).map(|entry| {
            entry.last_touched = now;
            &mut entry.session
        })
    }

    pub(crate) fn remove(&mut self, id: &Uuid) -> Option<CaptureSession> {
        self.entries.remove(id).map(|entry| entry.session)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Drop every idle session older than the TTL at `now`; returns how many went.
    pub(crate) fn evict_idle_at(&mut self, now: Instant) -> usize {
        let before = self.entries.len();
        let ttl = self.idle_ttl;
        self.entries.retain(|_, entry| {
            entry.session.is_in_flight() || now.saturating_duration_since(entry.last_touched) <= ttl
        });
        let evicted = before - self.entries.len();
        if evicted > 0 {
            tracing::info!("evicted {evicted} idle capture sessions");
        }
        evicted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> CaptureSession {
        CaptureSession::new(Vec::new(), false)
    }

    #[test]
    fn idle_sessions_are_evicted_after_the_ttl() {
        let ttl = Duration::from_secs(60);
        let mut store = SessionStore::new(ttl);
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        store.insert(a, session());
        store.insert(b, session());

        assert_eq!(store.evict_idle_at(Instant::now()), 0);
        assert_eq!(store.len(), 2);

        assert_eq!(store.evict_idle_at(Instant::now() + ttl + Duration::from_secs(1)), 2);
        assert_eq!(store.len(), 0);
        assert!(store.get_mut(&a).is_none());
    }

    #[test]
    fn in_flight_sessions_survive_eviction() {
        let ttl = Duration::from_secs(60);
        let mut store = SessionStore::new(ttl);
        let (busy, idle) = (Uuid::new_v4(), Uuid::new_v4());
        store.insert(busy, session());
        store.insert(idle, session());
        store
            .get_mut(&busy)
            .expect("live")
            .begin_submit()
            .expect("first submit");

        assert_eq!(store.evict_idle_at(Instant::now() + ttl * 2), 1);
        assert!(store.get_mut(&busy).is_some());
        assert!(store.get_mut(&idle).is_none());
    }

    #[test]
    fn removed_sessions_are_gone() {
        let mut store = SessionStore::new(DEFAULT_SESSION_IDLE_TTL);
        let id = Uuid::new_v4();
        store.insert(id, session());
        assert!(store.remove(&id).is_some());
        assert!(store.remove(&id).is_none());
    }

    #[test]
    fn ttl_env_value_parses_seconds() {
        assert_eq!(session_ttl_from_env_value(None).unwrap(), DEFAULT_SESSION_IDLE_TTL);
        assert_eq!(
            session_ttl_from_env_value(Some("  ".into())).unwrap(),
            DEFAULT_SESSION_IDLE_TTL
        );
        assert_eq!(
            session_ttl_from_env_value(Some("90".into())).unwrap(),
            Duration::from_secs(90)
        );
        assert!(session_ttl_from_env_value(Some("soon".into())).is_err());
    }
}
