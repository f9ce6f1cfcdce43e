//! streamnet: real-time signaling gateway for live streaming
//!
//! This library provides the control plane of a live streaming service:
//! - A session registry of live broadcasts keyed by stream key
//! - A WebSocket gateway that relays chat and binary frames between clients
//! - Start/stop control messages and `streamStarted`/`streamStopped` events
//! - Optional JWT bearer-token admission
//! - A JSON listing API over the registry
//!
//! Audio/video bytes never pass through the gateway; publishers push to an
//! external media server using the RTMP URL returned when a session starts.
//!
//! # Example: Gateway
//!
//! ```no_run
//! use streamnet::{GatewayConfig, GatewayServer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = GatewayConfig::default().bind_sessions_to_connections(true);
//!     let server = GatewayServer::new(config)?;
//!     server
//!         .run_until(async {
//!             let _ = tokio::signal::ctrl_c().await;
//!         })
//!         .await?;
//!     Ok(())
//! }
//! ```

pub mod admission;
pub mod broadcast;
pub mod connection;
pub mod coordinator;
pub mod error;
pub mod media;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod stats;

// Re-export main types for convenience
pub use admission::{AdmissionGate, TokenValidator};
pub use broadcast::BroadcastRouter;
pub use coordinator::Coordinator;
pub use error::{Error, Result};
pub use registry::{Session, SessionRegistry};
pub use server::config::GatewayConfig;
pub use server::listener::GatewayServer;
