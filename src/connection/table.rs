//! Connection table
//!
//! Set of open realtime connections. Broadcasters never iterate the live map:
//! they take a [`ConnectionTable::snapshot`] and write against that copy after
//! the lock is released, so concurrent add/remove is never observed
//! mid-iteration.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::handle::{ConnectionHandle, ConnectionId};

/// Concurrency-safe set of open connections
pub struct ConnectionTable {
    connections: RwLock<HashMap<ConnectionId, ConnectionHandle>>,
    next_id: AtomicU64,
}

impl ConnectionTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Allocate a connection id (never reused)
    pub fn next_id(&self) -> ConnectionId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Register an admitted connection and mark it open
    ///
    /// The phase moves to `Open` after the insert, under the same write lock.
    pub fn add(&self, handle: ConnectionHandle) {
        let id = handle.id();
        let mut connections = self.write();
        connections.insert(id, handle);
        if let Some(conn) = connections.get(&id) {
            conn.state().open();
        }
        drop(connections);

        tracing::debug!(connection_id = id, "Connection added");
    }

    /// Remove a connection
    ///
    /// Idempotent: removing an absent id is a no-op and returns `None`.
    pub fn remove(&self, id: ConnectionId) -> Option<ConnectionHandle> {
        let removed = self.write().remove(&id);

        if removed.is_some() {
            tracing::debug!(connection_id = id, "Connection removed");
        }

        removed
    }

    /// Point-in-time copy of all open connections
    pub fn snapshot(&self) -> Vec<ConnectionHandle> {
        self.read().values().cloned().collect()
    }

    /// Look up a connection
    pub fn get(&self, id: ConnectionId) -> Option<ConnectionHandle> {
        self.read().get(&id).cloned()
    }

    /// Check if a connection is registered
    pub fn contains(&self, id: ConnectionId) -> bool {
        self.read().contains_key(&id)
    }

    /// Number of open connections
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Check if there are no open connections
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<ConnectionId, ConnectionHandle>> {
        self.connections.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<ConnectionId, ConnectionHandle>> {
        self.connections.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for ConnectionTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::connection::ConnectionPhase;

    fn handle(table: &ConnectionTable) -> ConnectionHandle {
        let (handle, _rx) = ConnectionHandle::new(table.next_id(), None, 8, CancellationToken::new());
        handle
    }

    #[test]
    fn test_add_marks_open() {
        let table = ConnectionTable::new();
        let conn = handle(&table);
        assert_eq!(conn.phase(), ConnectionPhase::Connecting);

        table.add(conn.clone());
        assert_eq!(conn.phase(), ConnectionPhase::Open);
        assert_eq!(table.get(conn.id()).unwrap().phase(), ConnectionPhase::Open);
        assert!(table.contains(conn.id()));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let table = ConnectionTable::new();
        let conn = handle(&table);
        table.add(conn.clone());

        assert!(table.remove(conn.id()).is_some());
        assert!(table.remove(conn.id()).is_none());
        assert!(table.is_empty());
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let table = ConnectionTable::new();
        let a = handle(&table);
        let b = handle(&table);
        table.add(a.clone());
        table.add(b.clone());

        let snapshot = table.snapshot();
        table.remove(a.id());
        table.add(handle(&table));

        assert_eq!(snapshot.len(), 2);
        assert_eq!(table.len(), 2);
        assert!(!table.contains(a.id()));
    }

    #[test]
    fn test_ids_are_never_reused() {
        let table = ConnectionTable::new();
        let first = table.next_id();
        let second = table.next_id();
        assert_ne!(first, second);
    }
}
