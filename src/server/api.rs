//! Session listing API
//!
//! JSON endpoints over the registry. Start and stop go through the
//! coordinator, so a session started over HTTP is announced to realtime
//! clients exactly like one started by a control frame.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::coordinator::Coordinator;
use crate::protocol::StartStream;
use crate::registry::{RegistryError, Session};
use crate::stats::StatsSnapshot;

impl IntoResponse for RegistryError {
    fn into_response(self) -> Response {
        let status = match self {
            RegistryError::AlreadyActive(_) => StatusCode::CONFLICT,
            RegistryError::NotActive(_) => StatusCode::NOT_FOUND,
            RegistryError::EmptyStreamKey => StatusCode::BAD_REQUEST,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopRequest {
    pub stream_key: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartResponse {
    pub success: bool,
    pub stream: Session,
    pub rtmp_url: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    #[serde(flatten)]
    pub stats: StatsSnapshot,
}

pub async fn list_streams(State(coordinator): State<Arc<Coordinator>>) -> Json<Vec<Session>> {
    Json(coordinator.registry().list_active())
}

pub async fn get_stream(
    State(coordinator): State<Arc<Coordinator>>,
    Path(stream_key): Path<String>,
) -> Result<Json<Session>, RegistryError> {
    coordinator
        .registry()
        .get(&stream_key)
        .map(Json)
        .ok_or(RegistryError::NotActive(stream_key))
}

pub async fn is_active(
    State(coordinator): State<Arc<Coordinator>>,
    Path(stream_key): Path<String>,
) -> Json<bool> {
    Json(coordinator.registry().is_active(&stream_key))
}

pub async fn start_stream(
    State(coordinator): State<Arc<Coordinator>>,
    Json(request): Json<StartStream>,
) -> Result<Json<StartResponse>, RegistryError> {
    let session = coordinator.start_session(request, None)?;

    tracing::info!(
        stream = %session.stream_key,
        streamer_id = session.streamer_id,
        "Session started over HTTP"
    );

    Ok(Json(StartResponse {
        success: true,
        rtmp_url: coordinator.config().rtmp_url(&session.stream_key),
        stream: session,
    }))
}

pub async fn stop_stream(
    State(coordinator): State<Arc<Coordinator>>,
    Json(request): Json<StopRequest>,
) -> Result<Json<serde_json::Value>, RegistryError> {
    let session = coordinator.stop_session(&request.stream_key)?;

    tracing::info!(stream = %session.stream_key, "Session stopped over HTTP");

    Ok(Json(json!({ "success": true })))
}

pub async fn status(State(coordinator): State<Arc<Coordinator>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "Server is running",
        stats: coordinator.stats_snapshot(),
    })
}
