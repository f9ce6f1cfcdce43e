//! Session registry implementation
//!
//! Directory of live broadcast sessions keyed by stream key. Every operation is
//! a single map access under one lock; nothing here awaits or does I/O, so a
//! plain `std::sync::RwLock` is enough and callers never hold it across a write
//! to a socket.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::entry::{NewSession, Session};
use crate::connection::ConnectionId;

/// Central registry for all active sessions
pub struct SessionRegistry {
    /// Map of stream key to session
    sessions: RwLock<HashMap<String, Session>>,

    /// Next numeric session id
    next_id: AtomicU64,
}

impl SessionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Start a session
    ///
    /// Insert-if-absent: returns `false` without touching the existing entry
    /// when the key is already live.
    pub fn start(&self, stream_key: &str, title: &str, streamer_id: i64) -> bool {
        self.start_with(NewSession::new(stream_key, title, streamer_id))
            .is_some()
    }

    /// Start a session from full parameters
    ///
    /// Returns the stored session, or `None` if the key is already live.
    pub fn start_with(&self, new: NewSession) -> Option<Session> {
        let mut sessions = self.write();

        if sessions.contains_key(&new.stream_key) {
            tracing::debug!(stream = %new.stream_key, "Start rejected, stream already active");
            return None;
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let session = new.into_session(id);
        sessions.insert(session.stream_key.clone(), session.clone());

        tracing::info!(
            stream = %session.stream_key,
            session_id = id,
            streamer_id = session.streamer_id,
            "Session started"
        );

        Some(session)
    }

    /// Stop a session
    ///
    /// Returns `false` if no session with this key is live.
    pub fn stop(&self, stream_key: &str) -> bool {
        self.remove(stream_key).is_some()
    }

    /// Remove a session and return it
    pub fn remove(&self, stream_key: &str) -> Option<Session> {
        let removed = self.write().remove(stream_key);

        if let Some(ref session) = removed {
            tracing::info!(stream = %stream_key, session_id = session.id, "Session stopped");
        }

        removed
    }

    /// Remove every session started by the given connection
    pub fn stop_owned_by(&self, owner: ConnectionId) -> Vec<Session> {
        let mut sessions = self.write();

        let keys: Vec<String> = sessions
            .values()
            .filter(|s| s.owner == Some(owner))
            .map(|s| s.stream_key.clone())
            .collect();

        keys.iter()
            .filter_map(|key| sessions.remove(key))
            .inspect(|s| {
                tracing::info!(
                    stream = %s.stream_key,
                    connection_id = owner,
                    "Session stopped with its connection"
                )
            })
            .collect()
    }

    /// Point lookup
    pub fn get(&self, stream_key: &str) -> Option<Session> {
        self.read().get(stream_key).cloned()
    }

    /// Snapshot of all live sessions, in no particular order
    pub fn list_active(&self) -> Vec<Session> {
        self.read().values().cloned().collect()
    }

    /// Check if a session with this key is live
    pub fn is_active(&self, stream_key: &str) -> bool {
        self.read().contains_key(stream_key)
    }

    /// Number of live sessions
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Check if no session is live
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    // A panic while holding the lock cannot leave a half-written entry (every
    // mutation is a single insert/remove), so poisoning is safe to ignore.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Session>> {
        self.sessions.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Session>> {
        self.sessions.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Barrier};
    use std::thread;

    use super::*;

    #[test]
    fn test_start_and_lookup() {
        let registry = SessionRegistry::new();

        assert!(registry.start("key1", "My Show", 7));
        assert!(registry.is_active("key1"));

        let session = registry.get("key1").unwrap();
        assert_eq!(session.title, "My Show");
        assert_eq!(session.streamer_id, 7);
        assert!(session.active);

        let listed = registry.list_active();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].streamer_id, 7);
    }

    #[test]
    fn test_start_does_not_overwrite() {
        let registry = SessionRegistry::new();

        assert!(registry.start("key1", "First", 1));
        assert!(!registry.start("key1", "Second", 2));

        let session = registry.get("key1").unwrap();
        assert_eq!(session.title, "First");
        assert_eq!(session.streamer_id, 1);
    }

    #[test]
    fn test_stop_unknown_key() {
        let registry = SessionRegistry::new();
        registry.start("key1", "Show", 1);

        assert!(!registry.stop("missing"));
        assert_eq!(registry.len(), 1);
        assert!(registry.is_active("key1"));
    }

    #[test]
    fn test_stop_removes_session() {
        let registry = SessionRegistry::new();
        registry.start("key1", "Show", 1);

        assert!(registry.stop("key1"));
        assert!(!registry.is_active("key1"));
        assert!(registry.get("key1").is_none());
        assert!(!registry.stop("key1"));
    }

    #[test]
    fn test_ids_are_unique() {
        let registry = SessionRegistry::new();
        let a = registry.start_with(NewSession::new("a", "A", 1)).unwrap();
        registry.stop("a");
        let b = registry.start_with(NewSession::new("a", "A", 1)).unwrap();

        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_stop_owned_by() {
        let registry = SessionRegistry::new();
        registry.start_with(NewSession::new("a", "A", 1).owner(10));
        registry.start_with(NewSession::new("b", "B", 1).owner(10));
        registry.start_with(NewSession::new("c", "C", 2).owner(11));
        registry.start_with(NewSession::new("d", "D", 3));

        let mut stopped: Vec<String> = registry
            .stop_owned_by(10)
            .into_iter()
            .map(|s| s.stream_key)
            .collect();
        stopped.sort();

        assert_eq!(stopped, vec!["a".to_string(), "b".to_string()]);
        assert!(registry.is_active("c"));
        assert!(registry.is_active("d"));
    }

    #[test]
    fn test_concurrent_start_single_winner() {
        const CALLERS: usize = 16;

        let registry = Arc::new(SessionRegistry::new());
        let barrier = Arc::new(Barrier::new(CALLERS));

        let handles: Vec<_> = (0..CALLERS)
            .map(|i| {
                let registry = Arc::clone(&registry);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    registry.start("contested", "Race", i as i64)
                })
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();

        assert_eq!(winners, 1);
        assert_eq!(registry.len(), 1);
    }
}
