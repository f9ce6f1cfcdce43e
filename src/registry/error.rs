//! Registry error types
//!
//! The registry itself answers start/stop with a boolean; these errors are the
//! typed form handed back to whoever asked (a control frame or the HTTP API).

/// Error type for session start/stop requests
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// A session with this key is already live
    #[error("stream already active: {0}")]
    AlreadyActive(String),

    /// No live session with this key
    #[error("stream not active: {0}")]
    NotActive(String),

    /// Request carried an empty stream key
    #[error("stream key is required")]
    EmptyStreamKey,
}

impl RegistryError {
    /// Short machine-readable code sent to clients in error events
    pub fn code(&self) -> &'static str {
        match self {
            RegistryError::AlreadyActive(_) => "already_active",
            RegistryError::NotActive(_) => "not_active",
            RegistryError::EmptyStreamKey => "empty_stream_key",
        }
    }
}
