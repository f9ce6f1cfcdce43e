//! Connection handle
//!
//! The handle is the only way to push frames to a client. It wraps the
//! sending half of the connection's bounded outbound queue; the receiving half
//! is drained by that connection's writer task, which owns the socket sink.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

use super::state::{ConnectionPhase, ConnectionState};
use crate::protocol::Frame;

/// Process-unique connection identifier
pub type ConnectionId = u64;

/// Why a frame could not be queued for a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    /// Outbound queue is full (the client is not keeping up)
    #[error("outbound queue full")]
    QueueFull,
    /// Writer task has exited
    #[error("connection closed")]
    Closed,
}

/// Handle to one realtime client
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    identity: Option<Arc<str>>,
    state: Arc<ConnectionState>,
    outbound: mpsc::Sender<Frame>,
    cancel: CancellationToken,
}

impl ConnectionHandle {
    /// Create a handle and the receiving end of its outbound queue
    ///
    /// `cancel` is usually a child of the gateway's shutdown token, so a
    /// shutdown reaches every connection without walking the table.
    pub fn new(
        id: ConnectionId,
        identity: Option<String>,
        capacity: usize,
        cancel: CancellationToken,
    ) -> (Self, mpsc::Receiver<Frame>) {
        let (outbound, rx) = mpsc::channel(capacity.max(1));

        let handle = Self {
            id,
            identity: identity.map(Arc::from),
            state: Arc::new(ConnectionState::new()),
            outbound,
            cancel,
        };

        (handle, rx)
    }

    /// Connection id
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Authenticated identity, if any
    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }

    /// Shared lifecycle state
    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    /// Current phase
    pub fn phase(&self) -> ConnectionPhase {
        self.state.phase()
    }

    /// Queue a frame without waiting
    pub fn try_send(&self, frame: Frame) -> Result<(), DeliveryError> {
        self.outbound.try_send(frame).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => DeliveryError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }

    /// Ask the connection's tasks to close the socket
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Check if a close has been requested
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Wait until a close is requested
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.cancel.cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_send_full_and_closed() {
        let (handle, rx) = ConnectionHandle::new(1, None, 1, CancellationToken::new());

        assert!(handle.try_send(Frame::text("a")).is_ok());
        assert_eq!(handle.try_send(Frame::text("b")), Err(DeliveryError::QueueFull));

        drop(rx);
        assert_eq!(handle.try_send(Frame::text("c")), Err(DeliveryError::Closed));
    }

    #[test]
    fn test_identity() {
        let (handle, _rx) =
            ConnectionHandle::new(7, Some("alice".into()), 4, CancellationToken::new());
        assert_eq!(handle.id(), 7);
        assert_eq!(handle.identity(), Some("alice"));
        assert_eq!(handle.phase(), ConnectionPhase::Connecting);
    }

    #[test]
    fn test_cancelled_wakes_waiter() {
        let (handle, _rx) = ConnectionHandle::new(1, None, 4, CancellationToken::new());
        let mut cancelled = tokio_test::task::spawn(handle.cancelled());

        tokio_test::assert_pending!(cancelled.poll());
        handle.cancel();
        assert!(cancelled.is_woken());
        tokio_test::assert_ready!(cancelled.poll());
    }

    #[test]
    fn test_cancel_follows_parent() {
        let parent = CancellationToken::new();
        let (handle, _rx) = ConnectionHandle::new(1, None, 4, parent.child_token());

        assert!(!handle.is_cancelled());
        parent.cancel();
        assert!(handle.is_cancelled());
    }
}
