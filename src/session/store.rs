//! Concurrent session store with idle-timeout reclamation.
//!
//! Locking is per-id: the map lock is held only for lookup, insert, and
//! remove, while each entry carries its own mutex that serializes that
//! session's read-modify-write. `last_seen` lives outside the entry mutex as
//! an atomic so the sweep can inspect idle times holding the map lock alone;
//! no code path ever holds two locks at once.
//!
//! A sweep can race an in-flight update: the handler keeps its `Arc` and
//! commits into an entry the map no longer references. That is fine; the
//! next call for that id simply recreates the session.

use crate::session::SessionState;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

/// One live session: its composite state plus an idle clock.
pub struct SessionEntry {
    /// Milliseconds since store creation at the last touch. Monotonic.
    last_seen_ms: AtomicU64,

    /// The composite analysis state; locked for the full duration of one
    /// analyze call's read-modify-write.
    pub state: Mutex<SessionState>,
}

impl SessionEntry {
    fn new(now_ms: u64) -> Self {
        Self {
            last_seen_ms: AtomicU64::new(now_ms),
            state: Mutex::new(SessionState::default()),
        }
    }

    pub fn touch(&self, now_ms: u64) {
        self.last_seen_ms.store(now_ms, Ordering::Relaxed);
    }

    pub fn last_seen_ms(&self) -> u64 {
        self.last_seen_ms.load(Ordering::Relaxed)
    }
}

/// Concurrent mapping from session id to per-session state.
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Arc<SessionEntry>>>,
    epoch: Instant,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            epoch: Instant::now(),
        }
    }

    /// Milliseconds since the store was created. Monotonic clock for
    /// `last_seen` bookkeeping.
    pub fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    /// Fetch the entry for `id`, creating a default-initialized one if
    /// absent, and refresh its idle clock.
    pub fn get_or_create(&self, id: &str) -> Arc<SessionEntry> {
        let now = self.now_ms();

        if let Some(entry) = self.sessions.read().unwrap().get(id) {
            entry.touch(now);
            return entry.clone();
        }

        let mut sessions = self.sessions.write().unwrap();
        let entry = sessions
            .entry(id.to_string())
            .or_insert_with(|| Arc::new(SessionEntry::new(now)));
        entry.touch(now);
        entry.clone()
    }

    /// Fetch without creating.
    pub fn get(&self, id: &str) -> Option<Arc<SessionEntry>> {
        self.sessions.read().unwrap().get(id).cloned()
    }

    /// Remove an entry. Idempotent: returns whether it was present. Absence
    /// is a valid terminal state, not an error.
    pub fn delete(&self, id: &str) -> bool {
        self.sessions.write().unwrap().remove(id).is_some()
    }

    /// Evict every entry whose last touch is older than `ttl`. Returns the
    /// number of evicted sessions.
    pub fn sweep(&self, ttl: Duration) -> usize {
        let now = self.now_ms();
        let ttl_ms = ttl.as_millis() as u64;
        let mut sessions = self.sessions.write().unwrap();
        let before = sessions.len();
        sessions.retain(|_, entry| now.saturating_sub(entry.last_seen_ms()) <= ttl_ms);
        before - sessions.len()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().unwrap().is_empty()
    }

    pub fn session_ids(&self) -> Vec<String> {
        self.sessions.read().unwrap().keys().cloned().collect()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_or_create_creates_once() {
        let store = SessionStore::new();
        let a = store.get_or_create("s1");
        let b = store.get_or_create("s1");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_get_or_create_refreshes_idle_clock() {
        let store = SessionStore::new();
        let entry = store.get_or_create("s1");
        entry.touch(0);
        std::thread::sleep(Duration::from_millis(5));

        // Looking the session up again counts as activity on its own.
        store.get_or_create("s1");
        assert!(entry.last_seen_ms() > 0);

        let evicted = store.sweep(Duration::from_millis(60_000));
        assert_eq!(evicted, 0);
    }

    #[test]
    fn test_delete_is_idempotent() {
        let store = SessionStore::new();
        store.get_or_create("gone");
        assert!(store.delete("gone"));
        assert!(!store.delete("gone"));
        assert!(!store.delete("never-existed"));
    }

    #[test]
    fn test_sweep_evicts_stale_keeps_fresh() {
        let store = SessionStore::new();
        let stale = store.get_or_create("stale");
        let fresh = store.get_or_create("fresh");

        // Age one entry past the TTL; the other stays recently touched.
        stale.touch(0);
        std::thread::sleep(Duration::from_millis(10));
        fresh.touch(store.now_ms());

        let evicted = store.sweep(Duration::from_millis(5));
        assert_eq!(evicted, 1);
        assert!(store.get("stale").is_none());
        assert!(store.get("fresh").is_some());
    }

    #[test]
    fn test_lookup_after_delete_recreates() {
        let store = SessionStore::new();
        {
            let entry = store.get_or_create("s");
            entry.state.lock().unwrap().audio.speech_ms = 500;
        }
        store.delete("s");

        let entry = store.get_or_create("s");
        assert_eq!(entry.state.lock().unwrap().audio.speech_ms, 0);
    }

    #[test]
    fn test_in_flight_update_survives_sweep() {
        let store = SessionStore::new();
        let entry = store.get_or_create("racing");
        entry.touch(0);
        std::thread::sleep(Duration::from_millis(5));
        store.sweep(Duration::from_millis(1));

        // The handler's Arc is still valid; the commit goes through even
        // though the map has dropped the entry.
        entry.state.lock().unwrap().audio.silence_ms = 100;
        assert!(store.get("racing").is_none());
    }
}
