//! Session coordinator
//!
//! Owns the session registry and the connection table and drives each
//! connection's lifecycle:
//!
//! ```text
//!  upgrade ─► admit() ─► Open ─► receive loop ─┬─► control ─► registry ─► notify all
//!                          │                   ├─► chat ────► broadcast (not self)
//!                          │                   └─► binary ──► broadcast (not self)
//!                          ▼
//!                     writer task ◄── outbound queue ◄── BroadcastRouter
//!
//!  close / read error / write error / shutdown
//!        ─► Closing ─► removed from table ─► writer flushes + sends Close ─► Closed
//!                                            (or drops a stalled socket)
//! ```
//!
//! One coordinator is built at startup and shared as `Arc<Coordinator>`.
//! Every connection runs in its own task; a failure in one only ends that
//! task.

use std::fmt::Display;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::admission::AdmissionGate;
use crate::broadcast::BroadcastRouter;
use crate::connection::{ConnectionHandle, ConnectionId, ConnectionTable};
use crate::error::Result;
use crate::protocol::{
    chat_line, classify, ControlMessage, Frame, ServerEvent, StartStream, TextPayload,
};
use crate::registry::{NewSession, RegistryError, Session, SessionRegistry};
use crate::server::GatewayConfig;
use crate::stats::{GatewayStats, StatsSnapshot};

/// Grace for a pending write after cancellation, and for the final flush
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// Orchestrates the registry, the connection table and fan-out
pub struct Coordinator {
    registry: Arc<SessionRegistry>,
    table: Arc<ConnectionTable>,
    router: BroadcastRouter,
    gate: AdmissionGate,
    stats: GatewayStats,
    config: GatewayConfig,
    shutdown: CancellationToken,
    tasks: TaskTracker,
}

impl Coordinator {
    /// Create a coordinator from configuration
    pub fn new(config: GatewayConfig) -> Result<Self> {
        let gate = config.admission_gate()?;
        Ok(Self::with_gate(config, gate))
    }

    /// Create a coordinator with an explicit admission gate
    pub fn with_gate(config: GatewayConfig, gate: AdmissionGate) -> Self {
        let table = Arc::new(ConnectionTable::new());

        Self {
            registry: Arc::new(SessionRegistry::new()),
            router: BroadcastRouter::new(Arc::clone(&table)),
            table,
            gate,
            stats: GatewayStats::new(),
            config,
            shutdown: CancellationToken::new(),
            tasks: TaskTracker::new(),
        }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    pub fn table(&self) -> &Arc<ConnectionTable> {
        &self.table
    }

    pub fn router(&self) -> &BroadcastRouter {
        &self.router
    }

    pub fn gate(&self) -> &AdmissionGate {
        &self.gate
    }

    pub fn stats(&self) -> &GatewayStats {
        &self.stats
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Tracker for connection tasks, waited on during shutdown
    pub fn tasks(&self) -> &TaskTracker {
        &self.tasks
    }

    /// Counters plus live gauges
    pub fn stats_snapshot(&self) -> StatsSnapshot {
        self.stats.snapshot(self.table.len(), self.registry.len())
    }

    /// Check if shutdown has begun
    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Register a newly admitted connection
    ///
    /// Returns its handle (already `Open` and in the table) and the receiving
    /// end of its outbound queue, which the caller's writer must drain.
    pub fn admit(&self, identity: Option<String>) -> (ConnectionHandle, mpsc::Receiver<Frame>) {
        let (handle, outbound) = ConnectionHandle::new(
            self.table.next_id(),
            identity,
            self.config.outbound_capacity,
            self.shutdown.child_token(),
        );

        self.table.add(handle.clone());
        self.stats.connection_opened();

        (handle, outbound)
    }

    /// Start a session and announce it to every connection
    pub fn start_session(
        &self,
        request: StartStream,
        origin: Option<ConnectionId>,
    ) -> std::result::Result<Session, RegistryError> {
        if request.stream_key.trim().is_empty() {
            return Err(RegistryError::EmptyStreamKey);
        }

        let stream_key = request.stream_key.clone();
        let mut new = NewSession::new(
            request.stream_key,
            request.title.unwrap_or_default(),
            request.streamer_id,
        )
        .thumbnail(request.thumbnail);
        if let Some(origin) = origin {
            new = new.owner(origin);
        }

        let session = self
            .registry
            .start_with(new)
            .ok_or(RegistryError::AlreadyActive(stream_key))?;

        self.stats.session_started();
        self.notify(&ServerEvent::StreamStarted {
            stream: session.clone(),
        });

        Ok(session)
    }

    /// Stop a session and announce it to every connection
    pub fn stop_session(&self, stream_key: &str) -> std::result::Result<Session, RegistryError> {
        if stream_key.trim().is_empty() {
            return Err(RegistryError::EmptyStreamKey);
        }

        let session = self
            .registry
            .remove(stream_key)
            .ok_or_else(|| RegistryError::NotActive(stream_key.to_string()))?;

        self.stats.sessions_stopped(1);
        self.notify(&ServerEvent::StreamStopped {
            stream_key: session.stream_key.clone(),
        });

        Ok(session)
    }

    /// Handle one inbound frame from `conn`
    ///
    /// Returns `Break` when the client asked to close.
    pub fn handle_frame(&self, conn: &ConnectionHandle, frame: Frame) -> ControlFlow<()> {
        match frame {
            Frame::Close(reason) => {
                tracing::debug!(connection_id = conn.id(), reason = ?reason, "Client sent close");
                return ControlFlow::Break(());
            }
            Frame::Binary(_) => self.relay(&frame, conn.id()),
            Frame::Text(ref text) => match classify(text) {
                Ok(TextPayload::Chat) => {
                    let line = chat_line(conn.identity(), text);
                    self.relay(&Frame::Text(line), conn.id());
                }
                Ok(TextPayload::Control(control)) => self.handle_control(conn, control),
                Err(e) => {
                    tracing::debug!(connection_id = conn.id(), error = %e, "Rejected control frame");
                    self.reply(conn, ServerEvent::error("malformed_control", e.to_string()));
                }
            },
        }

        ControlFlow::Continue(())
    }

    /// Drive one upgraded socket until it closes
    pub async fn run_connection(self: Arc<Self>, socket: WebSocket, identity: Option<String>) {
        let (handle, outbound) = self.admit(identity);
        let id = handle.id();

        tracing::info!(connection_id = id, identity = ?handle.identity(), "Connection open");

        let (sink, stream) = socket.split();
        self.drive(&handle, sink, stream, outbound).await;

        tracing::info!(connection_id = id, "Connection closed");
    }

    /// Refuse new connections and cancel every open one
    pub fn begin_shutdown(&self) {
        if !self.shutdown.is_cancelled() {
            tracing::info!(connections = self.table.len(), "Shutting down connections");
        }
        self.shutdown.cancel();
    }

    /// Stop accepting work and wait for every connection to close
    ///
    /// Returns `false` if connections were still draining when
    /// `shutdown_timeout` expired.
    pub async fn shutdown(&self) -> bool {
        self.begin_shutdown();
        self.tasks.close();

        let drained = tokio::time::timeout(self.config.shutdown_timeout, self.tasks.wait())
            .await
            .is_ok();

        if drained {
            tracing::info!("All connections drained");
        } else {
            tracing::warn!(
                remaining = self.table.len(),
                timeout_ms = self.config.shutdown_timeout.as_millis() as u64,
                "Shutdown timed out with connections still open"
            );
        }

        drained
    }

    /// Closing: leave the table and tell the writer to send Close
    pub(crate) fn begin_close(&self, handle: &ConnectionHandle) {
        handle.state().close();
        self.table.remove(handle.id());
        handle.cancel();
    }

    /// Closed: socket released; apply the session binding policy
    pub(crate) fn finish_close(&self, handle: &ConnectionHandle) {
        handle.state().finish();

        if !self.config.bind_sessions_to_connections {
            return;
        }

        let stopped = self.registry.stop_owned_by(handle.id());
        self.stats.sessions_stopped(stopped.len());
        for session in stopped {
            self.notify(&ServerEvent::StreamStopped {
                stream_key: session.stream_key,
            });
        }
    }

    /// Run the writer task and the receive loop, then tear down
    async fn drive<S, R, E>(
        &self,
        handle: &ConnectionHandle,
        sink: S,
        stream: R,
        outbound: mpsc::Receiver<Frame>,
    ) where
        S: Sink<Message> + Unpin + Send + 'static,
        S::Error: Display + Send,
        R: Stream<Item = std::result::Result<Message, E>> + Unpin,
        E: Display,
    {
        let writer = self.tasks.spawn(write_loop(
            sink,
            outbound,
            handle.clone(),
            Arc::clone(&self.table),
            self.shutdown.clone(),
        ));

        self.receive_loop(stream, handle).await;

        self.begin_close(handle);
        if let Err(e) = writer.await {
            tracing::warn!(connection_id = handle.id(), error = %e, "Writer task failed");
        }
        self.finish_close(handle);
    }

    async fn receive_loop<R, E>(&self, mut stream: R, handle: &ConnectionHandle)
    where
        R: Stream<Item = std::result::Result<Message, E>> + Unpin,
        E: Display,
    {
        loop {
            let message = tokio::select! {
                biased;
                _ = handle.cancelled() => {
                    tracing::debug!(connection_id = handle.id(), "Close requested");
                    break;
                }
                message = stream.next() => message,
            };

            let message = match message {
                Some(Ok(message)) => message,
                Some(Err(e)) => {
                    tracing::debug!(connection_id = handle.id(), error = %e, "Read error");
                    break;
                }
                None => break,
            };

            let Some(frame) = Frame::from_message(message) else {
                continue;
            };

            self.stats.frame_received();
            if self.handle_frame(handle, frame).is_break() {
                break;
            }
        }
    }

    fn handle_control(&self, conn: &ConnectionHandle, control: ControlMessage) {
        let result = match control {
            ControlMessage::Start(request) => self.start_session(request, Some(conn.id())).map(drop),
            ControlMessage::Stop(request) => self.stop_session(&request.stream_key).map(drop),
        };

        if let Err(e) = result {
            tracing::debug!(connection_id = conn.id(), error = %e, "Control request rejected");
            self.reply(conn, ServerEvent::error(e.code(), e.to_string()));
        }
    }

    fn relay(&self, frame: &Frame, sender: ConnectionId) {
        let report = self.router.broadcast(frame, Some(sender));
        self.stats.record_delivery(report.delivered, report.failed);
    }

    fn notify(&self, event: &ServerEvent) {
        let report = self.router.broadcast(&event.to_frame(), None);
        self.stats.record_delivery(report.delivered, report.failed);
    }

    fn reply(&self, conn: &ConnectionHandle, event: ServerEvent) {
        self.router.send_to(conn.id(), event.to_frame());
    }
}

/// Drain a connection's outbound queue into its socket
///
/// Runs until the connection is cancelled or a write fails. A write that is
/// still pending `CLOSE_TIMEOUT` after cancellation is abandoned and the sink
/// dropped, so a peer that stopped reading cannot hold the connection open.
/// Otherwise frames already queued are flushed and a Close frame is sent.
async fn write_loop<S>(
    mut sink: S,
    mut outbound: mpsc::Receiver<Frame>,
    handle: ConnectionHandle,
    table: Arc<ConnectionTable>,
    shutdown: CancellationToken,
) where
    S: Sink<Message> + Unpin,
    S::Error: Display,
{
    loop {
        let frame = tokio::select! {
            biased;
            _ = handle.cancelled() => break,
            frame = outbound.recv() => frame,
        };

        let Some(frame) = frame else {
            break;
        };

        let deadline = async {
            handle.cancelled().await;
            tokio::time::sleep(CLOSE_TIMEOUT).await;
        };

        let sent = tokio::select! {
            biased;
            sent = sink.send(frame.into_message()) => sent,
            _ = deadline => {
                tracing::warn!(
                    connection_id = handle.id(),
                    "Peer stopped reading, releasing connection"
                );
                return;
            }
        };

        if let Err(e) = sent {
            tracing::warn!(
                connection_id = handle.id(),
                error = %e,
                "Write failed, dropping connection"
            );
            handle.state().close();
            handle.cancel();
            table.remove(handle.id());
            return;
        }
    }

    let reason = if shutdown.is_cancelled() {
        "server shutting down"
    } else {
        "connection closed"
    };
    let close = Frame::Close(Some(reason.to_string())).into_message();

    // The peer may already be gone; the flush and close are best effort
    let _ = tokio::time::timeout(CLOSE_TIMEOUT, async {
        while let Ok(frame) = outbound.try_recv() {
            sink.feed(frame.into_message()).await?;
        }
        sink.send(close).await?;
        sink.close().await
    })
    .await;
}
