//! Broadcast router
//!
//! Fans one frame out to every open connection except the sender.
//!
//! ```text
//!   reader task (sender A)
//!          │ broadcast(frame, excluding = A)
//!          ▼
//!   table.snapshot() ──► [B] try_send ──► B queue ──► B writer ──► socket
//!                        [C] try_send ──► C queue ──► C writer ──► socket
//!                        [D] try_send ✗ full/closed
//!                             └─► warn, cancel D, remove D from table
//! ```
//!
//! Each destination has its own bounded queue and writer task, so `try_send`
//! never waits on a socket. A destination that cannot take the frame is
//! dropped from the table and asked to close; the loop moves on. Frames from
//! one sender enter each destination queue in send order, and each queue has
//! a single consumer, so per-path ordering holds.

use std::sync::Arc;

use crate::connection::{ConnectionHandle, ConnectionId, ConnectionTable, DeliveryError};
use crate::protocol::Frame;

/// Outcome of one broadcast
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Destinations the frame was queued for
    pub delivered: usize,
    /// Destinations dropped because the frame could not be queued
    pub failed: usize,
}

/// Best-effort fan-out over the connection table
#[derive(Clone)]
pub struct BroadcastRouter {
    table: Arc<ConnectionTable>,
}

impl BroadcastRouter {
    /// Create a router over `table`
    pub fn new(table: Arc<ConnectionTable>) -> Self {
        Self { table }
    }

    /// The table this router delivers to
    pub fn table(&self) -> &Arc<ConnectionTable> {
        &self.table
    }

    /// Send `frame` to every open connection other than `excluding`
    pub fn broadcast(&self, frame: &Frame, excluding: Option<ConnectionId>) -> BroadcastReport {
        let mut report = BroadcastReport::default();

        for conn in self.table.snapshot() {
            if Some(conn.id()) == excluding {
                continue;
            }

            match conn.try_send(frame.clone()) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    self.drop_connection(&conn, e);
                    report.failed += 1;
                }
            }
        }

        tracing::trace!(
            kind = ?frame.kind(),
            bytes = frame.len(),
            delivered = report.delivered,
            failed = report.failed,
            "Broadcast"
        );

        report
    }

    /// Send `frame` to a single connection
    ///
    /// Returns `false` if the connection is gone or could not take the frame;
    /// in the latter case it is dropped like any failed broadcast target.
    pub fn send_to(&self, id: ConnectionId, frame: Frame) -> bool {
        let Some(conn) = self.table.get(id) else {
            return false;
        };

        match conn.try_send(frame) {
            Ok(()) => true,
            Err(e) => {
                self.drop_connection(&conn, e);
                false
            }
        }
    }

    fn drop_connection(&self, conn: &ConnectionHandle, error: DeliveryError) {
        tracing::warn!(
            connection_id = conn.id(),
            error = %error,
            "Delivery failed, dropping connection"
        );

        conn.state().close();
        conn.cancel();
        self.table.remove(conn.id());
    }
}
