//! Text packet framing for the relay's Socket.IO transport.
//!
//! Each WebSocket text frame holds one Engine.IO v4 packet, identified by its
//! first character. Engine.IO `message` packets (`4`) wrap one Socket.IO v5
//! packet, identified by the second character:
//!
//! | Frame            | Meaning                                   |
//! |------------------|-------------------------------------------|
//! | `0{...}`         | open handshake (`sid`, heartbeat timings) |
//! | `1`              | close                                     |
//! | `2` / `3`        | ping / pong                               |
//! | `6`              | noop                                      |
//! | `40` / `40{...}` | namespace connect request / ack           |
//! | `41`             | namespace disconnect                      |
//! | `42[...]`        | event array                               |
//! | `44{...}`        | namespace connect error                   |
//!
//! Only the default namespace is supported. Acknowledgement ids between the
//! packet type and the payload are accepted and discarded.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ChatError, Result};

/// Engine.IO open handshake sent by the relay as the first frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenHandshake {
    /// Engine.IO session id.
    pub sid: String,
    /// Transport upgrades offered (empty on a direct WebSocket connection).
    #[serde(default)]
    pub upgrades: Vec<String>,
    /// Interval between server pings, in milliseconds.
    pub ping_interval: u64,
    /// Time the server waits for a pong, in milliseconds.
    pub ping_timeout: u64,
    /// Largest payload the server accepts, in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_payload: Option<u64>,
}

impl OpenHandshake {
    /// How long the connection may stay silent before it is considered dead.
    pub fn heartbeat_window(&self) -> Duration {
        Duration::from_millis(self.ping_interval.saturating_add(self.ping_timeout))
    }
}

#[derive(Deserialize)]
struct ConnectAck {
    sid: Option<String>,
}

/// One decoded frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    /// Engine.IO open handshake.
    Open(OpenHandshake),
    /// Engine.IO close.
    Close,
    /// Engine.IO heartbeat ping.
    Ping,
    /// Engine.IO heartbeat pong.
    Pong,
    /// Engine.IO noop.
    Noop,
    /// Socket.IO namespace connect. The relay's ack carries a socket id.
    Connect {
        /// Socket id assigned by the relay, absent on the client's request.
        sid: Option<String>,
    },
    /// Socket.IO namespace disconnect.
    Disconnect,
    /// Socket.IO event array (`["name", payload]`).
    Event(Value),
    /// Socket.IO namespace connect refusal.
    ConnectError(String),
}

impl Packet {
    /// Decode one text frame.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::Protocol`] for empty frames, unknown packet types,
    /// and foreign namespaces, and [`ChatError::Serialization`] for malformed
    /// JSON payloads.
    pub fn decode(frame: &str) -> Result<Self> {
        let mut chars = frame.chars();
        let kind = chars
            .next()
            .ok_or_else(|| ChatError::Protocol("empty frame".into()))?;
        let rest = chars.as_str();

        match kind {
            '0' => Ok(Self::Open(serde_json::from_str(rest)?)),
            '1' => Ok(Self::Close),
            // Probe payloads only appear during transport upgrades; ignored.
            '2' => Ok(Self::Ping),
            '3' => Ok(Self::Pong),
            '4' => decode_socket_packet(rest),
            '6' => Ok(Self::Noop),
            other => Err(ChatError::Protocol(format!(
                "unsupported engine packet type {other:?}"
            ))),
        }
    }

    /// Encode this packet as one text frame.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::Serialization`] if a JSON payload cannot be encoded.
    pub fn encode(&self) -> Result<String> {
        let frame = match self {
            Self::Open(handshake) => format!("0{}", serde_json::to_string(handshake)?),
            Self::Close => "1".to_owned(),
            Self::Ping => "2".to_owned(),
            Self::Pong => "3".to_owned(),
            Self::Noop => "6".to_owned(),
            Self::Connect { sid: None } => "40".to_owned(),
            Self::Connect { sid: Some(sid) } => {
                format!("40{}", serde_json::json!({ "sid": sid }))
            }
            Self::Disconnect => "41".to_owned(),
            Self::Event(array) => format!("42{}", serde_json::to_string(array)?),
            Self::ConnectError(message) => {
                format!("44{}", serde_json::json!({ "message": message }))
            }
        };
        Ok(frame)
    }
}

fn decode_socket_packet(body: &str) -> Result<Packet> {
    let mut chars = body.chars();
    let kind = chars
        .next()
        .ok_or_else(|| ChatError::Protocol("empty socket packet".into()))?;
    let mut rest = chars.as_str();

    if rest.starts_with('/') {
        let (namespace, tail) = rest.split_once(',').unwrap_or((rest, ""));
        if namespace != "/" {
            return Err(ChatError::Protocol(format!(
                "unsupported namespace {namespace:?}"
            )));
        }
        rest = tail;
    }

    // Ack ids are not used by this client.
    let rest = rest.trim_start_matches(|c: char| c.is_ascii_digit());

    match kind {
        '0' if rest.is_empty() => Ok(Packet::Connect { sid: None }),
        '0' => {
            let ack: ConnectAck = serde_json::from_str(rest)?;
            Ok(Packet::Connect { sid: ack.sid })
        }
        '1' => Ok(Packet::Disconnect),
        '2' => Ok(Packet::Event(serde_json::from_str(rest)?)),
        '4' => {
            let message = match serde_json::from_str::<Value>(rest) {
                Ok(Value::Object(map)) => match map.get("message") {
                    Some(Value::String(message)) => message.clone(),
                    _ => Value::Object(map).to_string(),
                },
                Ok(other) => other.to_string(),
                Err(_) => rest.to_owned(),
            };
            Ok(Packet::ConnectError(message))
        }
        other => Err(ChatError::Protocol(format!(
            "unsupported socket packet type {other:?}"
        ))),
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use serde_json::json;

    const OPEN_FRAME: &str = r#"0{"sid":"lv_VI97HAXpY6yYWAAAC","upgrades":[],"pingInterval":25000,"pingTimeout":20000,"maxPayload":1000000}"#;

    #[test]
    fn decodes_open_handshake() {
        let Packet::Open(handshake) = Packet::decode(OPEN_FRAME).unwrap() else {
            panic!("expected open packet");
        };
        assert_eq!(handshake.sid, "lv_VI97HAXpY6yYWAAAC");
        assert_eq!(handshake.ping_interval, 25_000);
        assert_eq!(handshake.max_payload, Some(1_000_000));
        assert_eq!(handshake.heartbeat_window(), Duration::from_secs(45));
    }

    #[test]
    fn decodes_heartbeats_and_close() {
        assert_eq!(Packet::decode("2").unwrap(), Packet::Ping);
        assert_eq!(Packet::decode("2probe").unwrap(), Packet::Ping);
        assert_eq!(Packet::decode("3").unwrap(), Packet::Pong);
        assert_eq!(Packet::decode("1").unwrap(), Packet::Close);
        assert_eq!(Packet::decode("6").unwrap(), Packet::Noop);
    }

    #[test]
    fn decodes_connect_ack_with_sid() {
        let packet = Packet::decode(r#"40{"sid":"wZX3oN0bSVIhsaknAAAI"}"#).unwrap();
        assert_eq!(
            packet,
            Packet::Connect {
                sid: Some("wZX3oN0bSVIhsaknAAAI".into())
            }
        );
    }

    #[test]
    fn decodes_event_with_and_without_ack_id() {
        let plain = Packet::decode(r#"42["user-joined","Ben"]"#).unwrap();
        assert_eq!(plain, Packet::Event(json!(["user-joined", "Ben"])));

        let with_ack = Packet::decode(r#"4213["user-left","Ben"]"#).unwrap();
        assert_eq!(with_ack, Packet::Event(json!(["user-left", "Ben"])));
    }

    #[test]
    fn default_namespace_prefix_is_accepted() {
        let packet = Packet::decode(r#"42/,["send","x"]"#).unwrap();
        assert_eq!(packet, Packet::Event(json!(["send", "x"])));
    }

    #[test]
    fn foreign_namespace_is_rejected() {
        let err = Packet::decode(r#"42/admin,["send","x"]"#).unwrap_err();
        assert!(matches!(err, ChatError::Protocol(_)));
    }

    #[test]
    fn connect_error_extracts_message() {
        let packet = Packet::decode(r#"44{"message":"Not authorized"}"#).unwrap();
        assert_eq!(packet, Packet::ConnectError("Not authorized".into()));
    }

    #[test]
    fn rejects_empty_and_unknown_frames() {
        assert!(matches!(Packet::decode(""), Err(ChatError::Protocol(_))));
        assert!(matches!(Packet::decode("9"), Err(ChatError::Protocol(_))));
        assert!(matches!(Packet::decode("4"), Err(ChatError::Protocol(_))));
        assert!(matches!(Packet::decode("47"), Err(ChatError::Protocol(_))));
    }

    #[test]
    fn malformed_event_json_is_serialization_error() {
        let err = Packet::decode(r#"42["send","#).unwrap_err();
        assert!(matches!(err, ChatError::Serialization(_)));
    }

    #[test]
    fn encodes_client_frames() {
        assert_eq!(Packet::Connect { sid: None }.encode().unwrap(), "40");
        assert_eq!(Packet::Pong.encode().unwrap(), "3");
        assert_eq!(
            Packet::Event(json!(["send", "hello"])).encode().unwrap(),
            r#"42["send","hello"]"#
        );
    }

    #[test]
    fn encoded_open_frame_decodes_to_same_handshake() {
        let Packet::Open(original) = Packet::decode(OPEN_FRAME).unwrap() else {
            panic!("expected open packet");
        };
        let frame = Packet::Open(original.clone()).encode().unwrap();
        assert_eq!(Packet::decode(&frame).unwrap(), Packet::Open(original));
    }
}
