//! Statistics for the gateway

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;

/// Gateway-wide counters
///
/// Updated from many connection tasks at once, so every field is atomic.
#[derive(Debug)]
pub struct GatewayStats {
    started_at: Instant,
    connections_total: AtomicU64,
    admissions_rejected: AtomicU64,
    frames_received: AtomicU64,
    frames_delivered: AtomicU64,
    delivery_failures: AtomicU64,
    sessions_started: AtomicU64,
    sessions_stopped: AtomicU64,
}

impl GatewayStats {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            connections_total: AtomicU64::new(0),
            admissions_rejected: AtomicU64::new(0),
            frames_received: AtomicU64::new(0),
            frames_delivered: AtomicU64::new(0),
            delivery_failures: AtomicU64::new(0),
            sessions_started: AtomicU64::new(0),
            sessions_stopped: AtomicU64::new(0),
        }
    }

    pub fn connection_opened(&self) {
        self.connections_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn admission_rejected(&self) {
        self.admissions_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn frame_received(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the outcome of one fan-out
    pub fn record_delivery(&self, delivered: usize, failed: usize) {
        self.frames_delivered
            .fetch_add(delivered as u64, Ordering::Relaxed);
        self.delivery_failures
            .fetch_add(failed as u64, Ordering::Relaxed);
    }

    pub fn session_started(&self) {
        self.sessions_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn sessions_stopped(&self, count: usize) {
        self.sessions_stopped
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Time since the gateway started
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Copy the counters, adding the live gauges supplied by the caller
    pub fn snapshot(&self, active_connections: usize, active_sessions: usize) -> StatsSnapshot {
        StatsSnapshot {
            uptime_secs: self.uptime().as_secs(),
            active_connections: active_connections as u64,
            active_sessions: active_sessions as u64,
            connections_total: self.connections_total.load(Ordering::Relaxed),
            admissions_rejected: self.admissions_rejected.load(Ordering::Relaxed),
            frames_received: self.frames_received.load(Ordering::Relaxed),
            frames_delivered: self.frames_delivered.load(Ordering::Relaxed),
            delivery_failures: self.delivery_failures.load(Ordering::Relaxed),
            sessions_started: self.sessions_started.load(Ordering::Relaxed),
            sessions_stopped: self.sessions_stopped.load(Ordering::Relaxed),
        }
    }
}

impl Default for GatewayStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of the gateway counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    /// Seconds since start
    pub uptime_secs: u64,
    /// Connections currently open
    pub active_connections: u64,
    /// Sessions currently live
    pub active_sessions: u64,
    /// Connections ever admitted
    pub connections_total: u64,
    /// Upgrade requests refused by the gate
    pub admissions_rejected: u64,
    /// Frames read from clients
    pub frames_received: u64,
    /// Frames queued to clients
    pub frames_delivered: u64,
    /// Per-destination delivery failures
    pub delivery_failures: u64,
    /// Sessions ever started
    pub sessions_started: u64,
    /// Sessions ever stopped
    pub sessions_stopped: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_stats_new() {
        let stats = GatewayStats::new();
        let snapshot = stats.snapshot(0, 0);

        assert_eq!(snapshot.connections_total, 0);
        assert_eq!(snapshot.frames_delivered, 0);
        assert_eq!(snapshot.delivery_failures, 0);
        assert_eq!(snapshot.sessions_started, 0);
    }

    #[test]
    fn test_record_delivery() {
        let stats = GatewayStats::new();
        stats.record_delivery(3, 1);
        stats.record_delivery(2, 0);

        let snapshot = stats.snapshot(4, 1);
        assert_eq!(snapshot.frames_delivered, 5);
        assert_eq!(snapshot.delivery_failures, 1);
        assert_eq!(snapshot.active_connections, 4);
        assert_eq!(snapshot.active_sessions, 1);
    }

    #[test]
    fn test_session_counters() {
        let stats = GatewayStats::new();
        stats.session_started();
        stats.session_started();
        stats.sessions_stopped(2);

        let snapshot = stats.snapshot(0, 0);
        assert_eq!(snapshot.sessions_started, 2);
        assert_eq!(snapshot.sessions_stopped, 2);
    }

    #[test]
    fn test_snapshot_serializes_camel_case() {
        let json = serde_json::to_value(GatewayStats::new().snapshot(1, 2)).unwrap();
        assert_eq!(json["activeConnections"], 1);
        assert_eq!(json["activeSessions"], 2);
        assert!(json.get("uptimeSecs").is_some());
    }
}
