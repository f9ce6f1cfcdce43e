//! Gateway statistics

pub mod metrics;

pub use metrics::{GatewayStats, StatsSnapshot};
