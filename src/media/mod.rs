//! Media transport collaborator
//!
//! Audio/video is moved by an external media server. This module only
//! supervises that process.

pub mod process;

pub use process::MediaServer;
