//! The JSON message framing of the push hub.
//!
//! Every message is a JSON object terminated by the ASCII record separator.
//! A client opens with a handshake naming the protocol, after which the hub
//! sends invocations of client methods, keep-alive pings and finally a close
//! message.

use serde::Deserialize;
use serde_json::{Value, json};

use crate::Error;

/// Terminates every message on the wire.
pub const RECORD_SEPARATOR: char = '\u{1e}';

const INVOCATION: u64 = 1;
const PING: u64 = 6;
const CLOSE: u64 = 7;

/// The first message a client sends, selecting the JSON protocol.
pub fn handshake_request() -> String {
    frame(&json!({ "protocol": "json", "version": 1 }))
}

/// A keep-alive message.
pub fn ping_message() -> String {
    frame(&json!({ "type": PING }))
}

fn frame(message: &Value) -> String {
    format!("{message}{RECORD_SEPARATOR}")
}

/// Splits the text received from the hub into complete messages.
///
/// A message may be split over several reads and one read may contain
/// several messages, so incomplete text is kept until its separator arrives.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    pending: String,
}

impl FrameBuffer {
    /// Add `text` and take every message it completes.
    pub fn push(&mut self, text: &str) -> Vec<String> {
        self.pending.push_str(text);

        let Some(last_separator) = self.pending.rfind(RECORD_SEPARATOR) else {
            return Vec::new();
        };

        let remainder = self.pending.split_off(last_separator + RECORD_SEPARATOR.len_utf8());
        let complete = std::mem::replace(&mut self.pending, remainder);

        complete
            .split(RECORD_SEPARATOR)
            .filter(|message| !message.trim().is_empty())
            .map(str::to_owned)
            .collect()
    }
}

/// A message sent by the hub.
#[derive(Debug, Clone, PartialEq)]
pub enum HubMessage {
    /// The answer to [handshake_request], `error` is set if it was rejected.
    HandshakeResponse { error: Option<String> },
    /// The hub calls the client method `target`.
    Invocation {
        target: String,
        arguments: Vec<Value>,
    },
    Ping,
    /// The hub is closing the connection.
    Close {
        error: Option<String>,
        allow_reconnect: bool,
    },
    /// A message type the dashboard does not use, e.g. stream items.
    Other(u64),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMessage {
    #[serde(rename = "type")]
    message_type: Option<u64>,
    target: Option<String>,
    #[serde(default)]
    arguments: Vec<Value>,
    error: Option<String>,
    #[serde(default)]
    allow_reconnect: bool,
}

/// Decode one message without its record separator.
///
/// # Errors
/// Returns [Error::InvalidResponse] if `text` is not a JSON object or an
/// invocation has no target.
pub fn parse_message(text: &str) -> Result<HubMessage, Error> {
    let raw: RawMessage = serde_json::from_str(text)
        .map_err(|error| Error::InvalidResponse(format!("invalid hub message: {error}")))?;

    let message = match raw.message_type {
        None => HubMessage::HandshakeResponse { error: raw.error },
        Some(INVOCATION) => HubMessage::Invocation {
            target: raw.target.ok_or_else(|| {
                Error::InvalidResponse("hub invocation without a target".to_owned())
            })?,
            arguments: raw.arguments,
        },
        Some(PING) => HubMessage::Ping,
        Some(CLOSE) => HubMessage::Close {
            error: raw.error,
            allow_reconnect: raw.allow_reconnect,
        },
        Some(other) => HubMessage::Other(other),
    };

    Ok(message)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::Error;

    use super::{FrameBuffer, HubMessage, RECORD_SEPARATOR, handshake_request, parse_message};

    #[test]
    fn handshake_is_terminated() {
        let handshake = handshake_request();

        assert!(handshake.ends_with(RECORD_SEPARATOR));
        let body: serde_json::Value =
            serde_json::from_str(handshake.trim_end_matches(RECORD_SEPARATOR)).unwrap();
        assert_eq!(body, json!({ "protocol": "json", "version": 1 }));
    }

    #[test]
    fn reassembles_split_frames() {
        let mut buffer = FrameBuffer::default();

        assert!(buffer.push("{\"type\":").is_empty());
        let frames = buffer.push("6}\u{1e}{\"type\":1,\"target\":\"A\"}\u{1e}{\"ty");

        assert_eq!(frames, ["{\"type\":6}", "{\"type\":1,\"target\":\"A\"}"]);
        assert_eq!(buffer.push("pe\":6}\u{1e}"), ["{\"type\":6}"]);
    }

    #[test]
    fn parses_handshake_response() {
        assert_eq!(
            parse_message("{}").unwrap(),
            HubMessage::HandshakeResponse { error: None }
        );
        assert_eq!(
            parse_message("{\"error\":\"unsupported\"}").unwrap(),
            HubMessage::HandshakeResponse {
                error: Some("unsupported".to_owned())
            }
        );
    }

    #[test]
    fn parses_invocation() {
        let message =
            parse_message(r#"{"type":1,"target":"ReceiveTransaction","arguments":[{"id":4}]}"#)
                .unwrap();

        assert_eq!(
            message,
            HubMessage::Invocation {
                target: "ReceiveTransaction".to_owned(),
                arguments: vec![json!({ "id": 4 })],
            }
        );
    }

    #[test]
    fn parses_close() {
        assert_eq!(
            parse_message(r#"{"type":7,"error":"shutting down","allowReconnect":true}"#).unwrap(),
            HubMessage::Close {
                error: Some("shutting down".to_owned()),
                allow_reconnect: true
            }
        );
        assert_eq!(
            parse_message(r#"{"type":7}"#).unwrap(),
            HubMessage::Close {
                error: None,
                allow_reconnect: false
            }
        );
    }

    #[test]
    fn rejects_malformed_messages() {
        assert!(matches!(
            parse_message("not json"),
            Err(Error::InvalidResponse(_))
        ));
        assert!(matches!(
            parse_message(r#"{"type":1}"#),
            Err(Error::InvalidResponse(_))
        ));
        assert_eq!(parse_message(r#"{"type":3}"#).unwrap(), HubMessage::Other(3));
    }
}
