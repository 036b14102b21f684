//! Named chat events exchanged with the relay.
//!
//! The relay speaks Socket.IO, so every event travels as a JSON array whose
//! first element is the event name and whose second element is the payload:
//!
//! ```text
//! ["send", "hello"]
//! ["receive", {"name": "Ben", "message": "hi"}]
//! ```
//!
//! [`ClientEvent`] covers what this client emits, [`RelayEvent`] covers what
//! the relay broadcasts. The framing around these arrays lives in
//! [`framing`](crate::framing).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ChatError, Result};

// ── Wire names ──────────────────────────────────────────────────────

/// Wire name of the one-time identity announcement.
pub const IDENTITY_ANNOUNCE: &str = "new-user-joined";
/// Wire name of outgoing chat text.
pub const SEND: &str = "send";
/// Wire name of a remote participant joining.
pub const PARTICIPANT_JOINED: &str = "user-joined";
/// Wire name of a broadcast chat message.
pub const MESSAGE_RECEIVED: &str = "receive";
/// Wire name of a remote participant leaving.
pub const PARTICIPANT_LEFT: &str = "user-left";

/// Name shown for a participant the relay reports without one.
pub const UNNAMED_PARTICIPANT: &str = "Someone";

// ── Payloads ────────────────────────────────────────────────────────

/// Payload of the relay's `receive` broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceivedMessage {
    /// Display name of the sender.
    pub name: String,
    /// Chat text as sent.
    pub message: String,
}

// ── Client → relay ──────────────────────────────────────────────────

/// Events sent from this client to the relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// Announce the local participant. Sent once per connection epoch.
    IdentityAnnounce {
        /// Display name chosen during onboarding.
        display_name: String,
    },
    /// Outgoing chat text.
    Send {
        /// Message body, already validated as non-blank.
        body: String,
    },
}

impl ClientEvent {
    /// The Socket.IO event name used on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            Self::IdentityAnnounce { .. } => IDENTITY_ANNOUNCE,
            Self::Send { .. } => SEND,
        }
    }

    /// Build the `["name", payload]` array for this event.
    pub fn to_event_array(&self) -> Value {
        let payload = match self {
            Self::IdentityAnnounce { display_name } => Value::String(display_name.clone()),
            Self::Send { body } => Value::String(body.clone()),
        };
        Value::Array(vec![Value::String(self.name().to_owned()), payload])
    }

    /// Parse a client event array. Used by relay-side tooling and tests.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::Protocol`] for unknown names or malformed arrays and
    /// [`ChatError::Serialization`] when the payload has the wrong shape.
    pub fn from_event_array(value: Value) -> Result<Self> {
        let (name, payload) = split_event_array(value)?;
        match name.as_str() {
            IDENTITY_ANNOUNCE => Ok(Self::IdentityAnnounce {
                display_name: serde_json::from_value(payload)?,
            }),
            SEND => Ok(Self::Send {
                body: serde_json::from_value(payload)?,
            }),
            other => Err(ChatError::Protocol(format!("unknown client event {other:?}"))),
        }
    }
}

// ── Relay → client ──────────────────────────────────────────────────

/// Events broadcast by the relay to this client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayEvent {
    /// Another participant announced itself.
    ParticipantJoined {
        /// The announced display name.
        name: String,
    },
    /// Someone's chat text, broadcast by the relay.
    MessageReceived(ReceivedMessage),
    /// A participant's session ended.
    ParticipantLeft {
        /// Display name of the departed participant.
        name: String,
    },
}

impl RelayEvent {
    /// The Socket.IO event name used on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ParticipantJoined { .. } => PARTICIPANT_JOINED,
            Self::MessageReceived(_) => MESSAGE_RECEIVED,
            Self::ParticipantLeft { .. } => PARTICIPANT_LEFT,
        }
    }

    /// Build the `["name", payload]` array for this event.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::Serialization`] if the payload cannot be encoded.
    pub fn to_event_array(&self) -> Result<Value> {
        let payload = match self {
            Self::ParticipantJoined { name } | Self::ParticipantLeft { name } => {
                Value::String(name.clone())
            }
            Self::MessageReceived(msg) => serde_json::to_value(msg)?,
        };
        Ok(Value::Array(vec![
            Value::String(self.name().to_owned()),
            payload,
        ]))
    }

    /// Parse a relay event array.
    ///
    /// Returns `Ok(None)` for event names this client does not handle so the
    /// caller can skip them.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::Protocol`] for malformed arrays and
    /// [`ChatError::Serialization`] when a known event carries the wrong payload.
    pub fn from_event_array(value: Value) -> Result<Option<Self>> {
        let (name, payload) = split_event_array(value)?;
        let event = match name.as_str() {
            PARTICIPANT_JOINED => Self::ParticipantJoined {
                name: participant_name(payload)?,
            },
            MESSAGE_RECEIVED => Self::MessageReceived(serde_json::from_value(payload)?),
            PARTICIPANT_LEFT => Self::ParticipantLeft {
                name: participant_name(payload)?,
            },
            _ => return Ok(None),
        };
        Ok(Some(event))
    }
}

/// Presence payload as a display name. A socket that left before announcing
/// itself is reported with `null`.
fn participant_name(payload: Value) -> Result<String> {
    match payload {
        Value::Null => Ok(UNNAMED_PARTICIPANT.to_owned()),
        other => Ok(serde_json::from_value(other)?),
    }
}

/// Split `["name", payload, ...]` into its name and first argument.
///
/// A missing payload is treated as `null`; extra arguments are ignored.
fn split_event_array(value: Value) -> Result<(String, Value)> {
    let Value::Array(items) = value else {
        return Err(ChatError::Protocol("event payload is not an array".into()));
    };
    let mut items = items.into_iter();
    let name = match items.next() {
        Some(Value::String(name)) => name,
        Some(other) => {
            return Err(ChatError::Protocol(format!(
                "event name must be a string, got {other}"
            )))
        }
        None => return Err(ChatError::Protocol("empty event array".into())),
    };
    Ok((name, items.next().unwrap_or(Value::Null)))
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

    #[test]
    fn client_events_use_relay_wire_names() {
        let announce = ClientEvent::IdentityAnnounce {
            display_name: "Ana".into(),
        };
        assert_eq!(announce.to_event_array(), json!(["new-user-joined", "Ana"]));

        let send = ClientEvent::Send {
            body: "hello".into(),
        };
        assert_eq!(send.to_event_array(), json!(["send", "hello"]));
    }

    #[test]
    fn receive_payload_decodes_name_and_message() {
        let event =
            RelayEvent::from_event_array(json!(["receive", {"name": "Ben", "message": "hi"}]))
                .unwrap()
                .unwrap();
        assert_eq!(
            event,
            RelayEvent::MessageReceived(ReceivedMessage {
                name: "Ben".into(),
                message: "hi".into(),
            })
        );
    }

    #[test]
    fn presence_events_decode() {
        let joined = RelayEvent::from_event_array(json!(["user-joined", "Ben"])).unwrap();
        assert_eq!(
            joined,
            Some(RelayEvent::ParticipantJoined { name: "Ben".into() })
        );
        let left = RelayEvent::from_event_array(json!(["user-left", "Ben"])).unwrap();
        assert_eq!(left, Some(RelayEvent::ParticipantLeft { name: "Ben".into() }));
    }

    #[test]
    fn null_presence_name_uses_placeholder() {
        let left = RelayEvent::from_event_array(json!(["user-left", null])).unwrap();
        assert_eq!(
            left,
            Some(RelayEvent::ParticipantLeft {
                name: UNNAMED_PARTICIPANT.into()
            })
        );
        let joined = RelayEvent::from_event_array(json!(["user-joined"])).unwrap();
        assert_eq!(
            joined,
            Some(RelayEvent::ParticipantJoined {
                name: UNNAMED_PARTICIPANT.into()
            })
        );
        // Non-string names are still rejected.
        assert!(RelayEvent::from_event_array(json!(["user-left", 7])).is_err());
    }

    #[test]
    fn unknown_relay_event_is_skipped() {
        let event = RelayEvent::from_event_array(json!(["typing", "Ben"])).unwrap();
        assert!(event.is_none());
    }

    #[test]
    fn wrong_payload_shape_is_serialization_error() {
        let err = RelayEvent::from_event_array(json!(["receive", "just text"])).unwrap_err();
        assert!(matches!(err, ChatError::Serialization(_)));
    }

    #[test]
    fn non_array_and_empty_arrays_are_protocol_errors() {
        assert!(matches!(
            RelayEvent::from_event_array(json!({"name": "x"})),
            Err(ChatError::Protocol(_))
        ));
        assert!(matches!(
            RelayEvent::from_event_array(json!([])),
            Err(ChatError::Protocol(_))
        ));
        assert!(matches!(
            RelayEvent::from_event_array(json!([42, "x"])),
            Err(ChatError::Protocol(_))
        ));
    }

    #[test]
    fn relay_event_array_matches_original_broadcast_shape() {
        let event = RelayEvent::MessageReceived(ReceivedMessage {
            name: "Ben".into(),
            message: "hi".into(),
        });
        assert_eq!(
            event.to_event_array().unwrap(),
            json!(["receive", {"name": "Ben", "message": "hi"}])
        );
    }

    #[test]
    fn client_event_parse_rejects_unknown_name() {
        let err = ClientEvent::from_event_array(json!(["whisper", "x"])).unwrap_err();
        assert!(matches!(err, ChatError::Protocol(_)));
    }
}
