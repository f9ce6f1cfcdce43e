//! Control messages and server events
//!
//! Text frames are either chat or control. Control messages are JSON objects
//! tagged by `type`; anything that starts with `{` must parse as one, so a
//! broken start/stop request is reported back instead of being relayed as
//! chat. Everything else is chat.
//!
//! ```text
//! client → server   {"type":"start","streamKey":"k","title":"t","streamerId":7}
//!                   {"type":"stop","streamKey":"k"}
//! server → client   {"type":"streamStarted","stream":{...}}
//!                   {"type":"streamStopped","streamKey":"k"}
//!                   {"type":"error","code":"already_active","message":"..."}
//! ```

use serde::{Deserialize, Serialize};

use crate::registry::Session;

use super::frame::Frame;

/// Request to start a session (control frame and HTTP body)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartStream {
    /// Stream key
    pub stream_key: String,
    /// Title (defaults to "Stream <key>")
    #[serde(default)]
    pub title: Option<String>,
    /// Id of the streaming user
    pub streamer_id: i64,
    /// Optional thumbnail URL
    #[serde(default)]
    pub thumbnail: Option<String>,
}

/// Request to stop a session (control frame and HTTP body)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopStream {
    /// Stream key
    pub stream_key: String,
}

/// Control message sent by a client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ControlMessage {
    /// Start a session
    Start(StartStream),
    /// Stop a session
    Stop(StopStream),
}

/// Classification of an inbound text payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextPayload {
    /// Session start/stop
    Control(ControlMessage),
    /// Anything else, relayed to other clients
    Chat,
}

/// A text payload looked like a control message but did not parse
#[derive(Debug, thiserror::Error)]
#[error("malformed control message: {0}")]
pub struct ControlParseError(#[from] serde_json::Error);

/// Classify a text payload as control or chat
pub fn classify(text: &str) -> Result<TextPayload, ControlParseError> {
    if !text.trim_start().starts_with('{') {
        return Ok(TextPayload::Chat);
    }

    let message = serde_json::from_str::<ControlMessage>(text)?;
    Ok(TextPayload::Control(message))
}

/// Build the relayed chat line for a sender
///
/// Authenticated senders are attributed as `"<identity>: <message>"`;
/// anonymous chat passes through untouched.
pub fn chat_line(identity: Option<&str>, text: &str) -> String {
    match identity {
        Some(identity) => format!("{}: {}", identity, text),
        None => text.to_owned(),
    }
}

/// Event pushed from the gateway to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerEvent {
    /// A session went live
    StreamStarted {
        /// The new session
        stream: Session,
    },

    /// A session ended
    #[serde(rename_all = "camelCase")]
    StreamStopped {
        /// Stream key of the ended session
        stream_key: String,
    },

    /// A request from this client was rejected
    Error {
        /// Machine-readable code
        code: String,
        /// Human-readable detail
        message: String,
    },
}

impl ServerEvent {
    /// Create an error event
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        ServerEvent::Error {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Encode as a text frame
    pub fn to_frame(&self) -> Frame {
        // Serializing these plain structs cannot fail
        let json = serde_json::to_string(self).unwrap_or_default();
        Frame::Text(json)
    }
}

#[cfg(test)]
mod tests {
    use crate::registry::NewSession;

    use super::*;

    #[test]
    fn test_classify_start() {
        let text = r#"{"type":"start","streamKey":"key1","title":"My Show","streamerId":7}"#;
        let payload = classify(text).unwrap();

        assert_eq!(
            payload,
            TextPayload::Control(ControlMessage::Start(StartStream {
                stream_key: "key1".into(),
                title: Some("My Show".into()),
                streamer_id: 7,
                thumbnail: None,
            }))
        );
    }

    #[test]
    fn test_classify_stop() {
        let payload = classify(r#" {"type":"stop","streamKey":"key1"}"#).unwrap();
        assert_eq!(
            payload,
            TextPayload::Control(ControlMessage::Stop(StopStream {
                stream_key: "key1".into()
            }))
        );
    }

    #[test]
    fn test_classify_chat() {
        assert_eq!(classify("alice: hello").unwrap(), TextPayload::Chat);
        assert_eq!(classify("").unwrap(), TextPayload::Chat);
    }

    #[test]
    fn test_classify_rejects_malformed_control() {
        // Missing streamerId
        assert!(classify(r#"{"type":"start","streamKey":"key1"}"#).is_err());
        // Unknown tag
        assert!(classify(r#"{"type":"pause","streamKey":"key1"}"#).is_err());
        // Not JSON at all
        assert!(classify("{oops").is_err());
    }

    #[test]
    fn test_chat_line() {
        assert_eq!(chat_line(Some("alice"), "hi"), "alice: hi");
        assert_eq!(chat_line(None, "hi"), "hi");
    }

    #[test]
    fn test_event_encoding() {
        let session = NewSession::new("key1", "My Show", 7).into_session(1);
        let frame = ServerEvent::StreamStarted { stream: session }.to_frame();

        let Frame::Text(text) = frame else {
            panic!("expected text frame");
        };
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["type"], "streamStarted");
        assert_eq!(json["stream"]["streamKey"], "key1");
        assert_eq!(json["stream"]["streamerId"], 7);

        let Frame::Text(text) = (ServerEvent::StreamStopped {
            stream_key: "key1".into(),
        })
        .to_frame() else {
            panic!("expected text frame");
        };
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["type"], "streamStopped");
        assert_eq!(json["streamKey"], "key1");
    }
}
