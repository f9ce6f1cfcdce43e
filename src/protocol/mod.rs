//! Wire model for realtime traffic
//!
//! - `frame`: the Text/Binary/Close frame type and its WebSocket mapping
//! - `control`: start/stop control messages, chat classification, and the
//!   events the gateway pushes to clients

pub mod control;
pub mod frame;

pub use control::{
    chat_line, classify, ControlMessage, ControlParseError, ServerEvent, StartStream, StopStream,
    TextPayload,
};
pub use frame::{Frame, FrameKind};
