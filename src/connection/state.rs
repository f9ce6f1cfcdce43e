//! Connection state machine
//!
//! Tracks a realtime connection from admission to teardown:
//!
//! ```text
//! Connecting ──► Open ──► Closing ──► Closed
//!     │                      ▲
//!     └──────────────────────┘
//! ```
//!
//! Phases only move forward. The phase is shared between the connection's
//! own tasks and any table snapshot that holds a clone of its handle, so it is
//! stored in an atomic.

use std::sync::atomic::{AtomicU8, Ordering};

/// Connection lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum ConnectionPhase {
    /// Upgrade accepted, not yet in the connection table
    Connecting = 0,
    /// In the connection table, frames flowing
    Open = 1,
    /// Close requested (client close, I/O error, or shutdown)
    Closing = 2,
    /// Socket released and removed from the table
    Closed = 3,
}

impl ConnectionPhase {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ConnectionPhase::Connecting,
            1 => ConnectionPhase::Open,
            2 => ConnectionPhase::Closing,
            _ => ConnectionPhase::Closed,
        }
    }
}

/// Shared, forward-only phase cell
#[derive(Debug)]
pub struct ConnectionState {
    phase: AtomicU8,
}

impl ConnectionState {
    /// Create a state in the `Connecting` phase
    pub fn new() -> Self {
        Self {
            phase: AtomicU8::new(ConnectionPhase::Connecting as u8),
        }
    }

    /// Current phase
    pub fn phase(&self) -> ConnectionPhase {
        ConnectionPhase::from_u8(self.phase.load(Ordering::Acquire))
    }

    /// Mark the connection open
    pub fn open(&self) -> bool {
        self.advance(ConnectionPhase::Open)
    }

    /// Start closing the connection
    pub fn close(&self) -> bool {
        self.advance(ConnectionPhase::Closing)
    }

    /// Mark the connection closed
    pub fn finish(&self) -> bool {
        self.advance(ConnectionPhase::Closed)
    }

    /// Check if the connection is open
    pub fn is_open(&self) -> bool {
        self.phase() == ConnectionPhase::Open
    }

    /// Move to `next` if it is later than the current phase
    ///
    /// Returns `true` if this call performed the transition.
    fn advance(&self, next: ConnectionPhase) -> bool {
        let next = next as u8;
        self.phase
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                (current < next).then_some(next)
            })
            .is_ok()
    }
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self::new()
    }
}
