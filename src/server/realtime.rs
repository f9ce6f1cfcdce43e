//! WebSocket upgrade endpoint
//!
//! Admission runs on the raw request headers before the upgrade is accepted;
//! a refused request gets a plain HTTP error and never reaches the
//! connection table.

use std::sync::Arc;

use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::{State, WebSocketUpgrade};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};

use crate::admission::AdmissionError;
use crate::coordinator::Coordinator;

pub async fn upgrade(
    State(coordinator): State<Arc<Coordinator>>,
    headers: HeaderMap,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    if coordinator.is_shutting_down() {
        return reject(&coordinator, AdmissionError::ShuttingDown);
    }

    let identity = match coordinator.gate().admit(&headers) {
        Ok(identity) => identity,
        Err(e) => return reject(&coordinator, e),
    };

    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => {
            tracing::debug!(error = %rejection, "Upgrade extractor rejected request");
            return reject(&coordinator, AdmissionError::NotUpgrade);
        }
    };

    let max_message_size = coordinator.config().max_message_size;
    let tasks = coordinator.tasks().clone();

    ws.max_message_size(max_message_size)
        .max_frame_size(max_message_size)
        .on_upgrade(move |socket| tasks.track_future(coordinator.run_connection(socket, identity)))
}

fn reject(coordinator: &Coordinator, error: AdmissionError) -> Response {
    tracing::debug!(error = %error, status = %error.status(), "Upgrade refused");
    coordinator.stats().admission_rejected();
    error.into_response()
}
