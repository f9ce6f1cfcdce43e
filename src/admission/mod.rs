//! Admission of realtime connections
//!
//! The gate validates the upgrade request (protocol, then optional bearer
//! token) before anything is created. The token validator is local and
//! stateless.

pub mod gate;
pub mod token;

pub use gate::{is_upgrade_request, AdmissionError, AdmissionGate};
pub use token::{Claims, TokenError, TokenValidator};
