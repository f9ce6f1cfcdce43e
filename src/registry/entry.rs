//! Session entry types
//!
//! A `Session` is one live broadcast. It is removed from the registry when the
//! broadcast stops, so `active` is always true for anything the registry hands
//! out; the field exists for the listing API's wire shape.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::connection::ConnectionId;

/// One active broadcast session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Numeric id, unique for the process lifetime
    pub id: u64,

    /// Stream key (unique identity of the session)
    pub stream_key: String,

    /// Human-readable title
    pub title: String,

    /// Id of the streaming user
    pub streamer_id: i64,

    /// Optional thumbnail URL
    pub thumbnail: Option<String>,

    /// When the session started
    #[serde(rename = "timestamp")]
    pub started_at: DateTime<Utc>,

    /// Always true while registered
    pub active: bool,

    /// Connection that started the session, if it came in over a socket
    #[serde(skip)]
    pub owner: Option<ConnectionId>,
}

/// Parameters for starting a session
#[derive(Debug, Clone, Default)]
pub struct NewSession {
    /// Stream key
    pub stream_key: String,
    /// Title; an empty title becomes "Stream <key>"
    pub title: String,
    /// Id of the streaming user
    pub streamer_id: i64,
    /// Optional thumbnail URL
    pub thumbnail: Option<String>,
    /// Owning connection
    pub owner: Option<ConnectionId>,
}

impl NewSession {
    /// Create start parameters with no thumbnail and no owner
    pub fn new(stream_key: impl Into<String>, title: impl Into<String>, streamer_id: i64) -> Self {
        Self {
            stream_key: stream_key.into(),
            title: title.into(),
            streamer_id,
            thumbnail: None,
            owner: None,
        }
    }

    /// Set the thumbnail URL
    pub fn thumbnail(mut self, thumbnail: Option<String>) -> Self {
        self.thumbnail = thumbnail;
        self
    }

    /// Set the owning connection
    pub fn owner(mut self, owner: ConnectionId) -> Self {
        self.owner = Some(owner);
        self
    }

    pub(crate) fn into_session(self, id: u64) -> Session {
        let title = if self.title.trim().is_empty() {
            format!("Stream {}", self.stream_key)
        } else {
            self.title
        };

        Session {
            id,
            stream_key: self.stream_key,
            title,
            streamer_id: self.streamer_id,
            thumbnail: self.thumbnail,
            started_at: Utc::now(),
            active: true,
            owner: self.owner,
        }
    }
}
