//! Realtime connections
//!
//! - `state`: the Connecting → Open → Closing → Closed phase machine
//! - `handle`: the outbound handle for one client
//! - `table`: the set of open connections, iterated only through snapshots

pub mod handle;
pub mod state;
pub mod table;

pub use handle::{ConnectionHandle, ConnectionId, DeliveryError};
pub use state::{ConnectionPhase, ConnectionState};
pub use table::ConnectionTable;
