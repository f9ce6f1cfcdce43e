//! Crate-level error type
//!
//! Component errors (registry conflicts, admission failures) have their own
//! types; this one covers what can stop the gateway from starting or running.

use crate::admission::TokenError;
use crate::registry::RegistryError;

/// Error type for gateway setup and runtime
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Socket or process I/O failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or incomplete configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Token could not be issued
    #[error(transparent)]
    Token(#[from] TokenError),

    /// Session start/stop was refused
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, Error>;
