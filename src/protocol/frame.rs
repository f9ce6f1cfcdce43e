//! Realtime frame type
//!
//! `Frame` is the gateway's own view of WebSocket traffic. It is cheap to
//! clone for binary payloads (`Bytes` is reference counted), which matters
//! because one inbound frame is cloned once per destination during fan-out.

use axum::extract::ws::{close_code, CloseFrame, Message};
use bytes::Bytes;

/// Kind of a frame, without its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// UTF-8 text (chat and control)
    Text,
    /// Opaque binary payload (media relay)
    Binary,
    /// End of connection
    Close,
}

/// A unit of realtime traffic
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// UTF-8 text
    Text(String),
    /// Opaque bytes
    Binary(Bytes),
    /// Close with an optional human-readable reason
    Close(Option<String>),
}

impl Frame {
    /// Create a text frame
    pub fn text(text: impl Into<String>) -> Self {
        Frame::Text(text.into())
    }

    /// Create a binary frame
    pub fn binary(data: impl Into<Bytes>) -> Self {
        Frame::Binary(data.into())
    }

    /// Get the kind of this frame
    pub fn kind(&self) -> FrameKind {
        match self {
            Frame::Text(_) => FrameKind::Text,
            Frame::Binary(_) => FrameKind::Binary,
            Frame::Close(_) => FrameKind::Close,
        }
    }

    /// Payload size in bytes
    pub fn len(&self) -> usize {
        match self {
            Frame::Text(text) => text.len(),
            Frame::Binary(data) => data.len(),
            Frame::Close(reason) => reason.as_ref().map_or(0, |r| r.len()),
        }
    }

    /// Check if the payload is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Convert an inbound WebSocket message
    ///
    /// Returns `None` for ping/pong, which the socket answers on its own.
    pub fn from_message(message: Message) -> Option<Self> {
        match message {
            Message::Text(text) => Some(Frame::Text(text.as_str().to_owned())),
            Message::Binary(data) => Some(Frame::Binary(data)),
            Message::Close(close) => Some(Frame::Close(
                close
                    .map(|c| c.reason.as_str().to_owned())
                    .filter(|reason| !reason.is_empty()),
            )),
            Message::Ping(_) | Message::Pong(_) => None,
        }
    }

    /// Convert into an outbound WebSocket message
    pub fn into_message(self) -> Message {
        match self {
            Frame::Text(text) => Message::Text(text.into()),
            Frame::Binary(data) => Message::Binary(data),
            Frame::Close(reason) => Message::Close(Some(CloseFrame {
                code: close_code::NORMAL,
                reason: reason.unwrap_or_default().into(),
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_and_len() {
        assert_eq!(Frame::text("hello").kind(), FrameKind::Text);
        assert_eq!(Frame::binary(vec![1, 2, 3]).len(), 3);
        assert!(Frame::Close(None).is_empty());
    }

    #[test]
    fn test_ping_is_not_a_frame() {
        assert!(Frame::from_message(Message::Ping(Bytes::new())).is_none());
        assert!(Frame::from_message(Message::Pong(Bytes::new())).is_none());
    }

    #[test]
    fn test_close_reason() {
        let frame = Frame::from_message(Message::Close(Some(CloseFrame {
            code: close_code::NORMAL,
            reason: "bye".into(),
        })));
        assert_eq!(frame, Some(Frame::Close(Some("bye".into()))));

        let frame = Frame::from_message(Message::Close(None));
        assert_eq!(frame, Some(Frame::Close(None)));
    }

    #[test]
    fn test_binary_message_keeps_bytes() {
        let data = Bytes::from_static(&[0xde, 0xad, 0xbe, 0xef]);
        match Frame::binary(data.clone()).into_message() {
            Message::Binary(out) => assert_eq!(out, data),
            other => panic!("unexpected message: {:?}", other),
        }
    }
}
