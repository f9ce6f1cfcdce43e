//! HTTP and WebSocket surface
//!
//! - `config`: gateway configuration
//! - `listener`: bind, serve and shut down
//! - `realtime`: the WebSocket upgrade endpoint
//! - `api`: JSON session listing endpoints

pub mod api;
pub mod config;
pub mod listener;
pub mod realtime;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::coordinator::Coordinator;

pub use config::GatewayConfig;
pub use listener::GatewayServer;

/// Build the router for a coordinator
///
/// The realtime path is served with and without its trailing slash.
pub fn router(coordinator: Arc<Coordinator>) -> Router {
    let ws_path = coordinator.config().ws_path.clone();

    let mut app = Router::new().route(&ws_path, get(realtime::upgrade));

    let trimmed = ws_path.trim_end_matches('/');
    if !trimmed.is_empty() && trimmed != ws_path {
        app = app.route(trimmed, get(realtime::upgrade));
    }

    app.route("/api/streams", get(api::list_streams))
        .route("/api/streams/start", post(api::start_stream))
        .route("/api/streams/stop", post(api::stop_stream))
        .route("/api/streams/active/{stream_key}", get(api::is_active))
        .route("/api/streams/{stream_key}", get(api::get_stream))
        .route("/api/stream/status", get(api::status))
        .layer(TraceLayer::new_for_http())
        .with_state(coordinator)
}
