//! Session registry
//!
//! The registry tracks which broadcasts are live, keyed by stream key. It is
//! pure in-memory state: starting a key that is already live is rejected, and
//! stopping removes the entry outright.
//!
//! # Architecture
//!
//! ```text
//!                     Arc<SessionRegistry>
//!                ┌───────────────────────────┐
//!                │ sessions: HashMap<Key,    │
//!                │   Session { id, title,    │
//!                │     streamer_id, owner }  │
//!                │ >                         │
//!                └─────────────┬─────────────┘
//!                              │
//!          ┌───────────────────┼────────────────────┐
//!          │                   │                    │
//!          ▼                   ▼                    ▼
//!   [control frame]      [POST /start]        [GET /streams]
//!   Coordinator          Coordinator          list_active()
//!   start_session()      start_session()
//! ```
//!
//! Session lifetime is independent of any connection unless the deployment
//! turns on `bind_sessions_to_connections`, in which case the coordinator
//! calls [`SessionRegistry::stop_owned_by`] when a connection closes.

pub mod entry;
pub mod error;
pub mod store;

pub use entry::{NewSession, Session};
pub use error::RegistryError;
pub use store::SessionRegistry;
