#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
//! Wire fixture tests for the Relay Chat Client.
//!
//! Feeds frames captured from a Socket.IO chat relay through the framing and
//! protocol layers into a `ChatCore`, and checks the frames the core asks to
//! send. No runtime or transport is involved.

use relay_chat_client::chat::ChatCore;
use relay_chat_client::framing::Packet;
use relay_chat_client::protocol::{ClientEvent, ReceivedMessage, RelayEvent, UNNAMED_PARTICIPANT};
use relay_chat_client::{
    ChatEntry, ConnectionState, EchoPolicy, NotificationDispatcher, SessionEvent,
};
use serde_json::json;

// ════════════════════════════════════════════════════════════════════
// Helpers
// ════════════════════════════════════════════════════════════════════

fn core() -> ChatCore {
    ChatCore::new(
        true,
        EchoPolicy::ExcludesSender,
        NotificationDispatcher::default(),
    )
}

/// Decode a relay frame all the way to a session event.
fn relay(frame: &str) -> SessionEvent {
    let Packet::Event(array) = Packet::decode(frame).expect("decode") else {
        panic!("expected event packet in {frame}");
    };
    let event = RelayEvent::from_event_array(array)
        .expect("valid event")
        .expect("known event");
    SessionEvent::Relay(event)
}

/// Encode what the core wants to send.
fn frame(event: &ClientEvent) -> String {
    Packet::Event(event.to_event_array()).encode().expect("encode")
}

// ════════════════════════════════════════════════════════════════════
// Relay → client fixtures
// ════════════════════════════════════════════════════════════════════

#[test]
fn relay_fixtures_decode_to_events() {
    assert_eq!(
        relay(r#"42["user-joined","Ben"]"#),
        SessionEvent::Relay(RelayEvent::ParticipantJoined { name: "Ben".into() })
    );
    assert_eq!(
        relay(r#"42["receive",{"name":"Ben","message":"hi"}]"#),
        SessionEvent::Relay(RelayEvent::MessageReceived(ReceivedMessage {
            name: "Ben".into(),
            message: "hi".into(),
        }))
    );
    assert_eq!(
        relay(r#"42["user-left","Ben"]"#),
        SessionEvent::Relay(RelayEvent::ParticipantLeft { name: "Ben".into() })
    );
}

#[test]
fn departure_without_announced_name_uses_placeholder() {
    // A socket that never announced leaves with an undefined name, which
    // the relay serializes as null.
    let Packet::Event(array) = Packet::decode(r#"42["user-left",null]"#).unwrap() else {
        panic!("expected event packet");
    };
    let event = RelayEvent::from_event_array(array).unwrap();
    assert_eq!(
        event,
        Some(RelayEvent::ParticipantLeft {
            name: UNNAMED_PARTICIPANT.into()
        })
    );

    let mut core = core();
    core.handle_session_event(SessionEvent::Relay(RelayEvent::ParticipantLeft {
        name: UNNAMED_PARTICIPANT.into(),
    }));
    assert_eq!(
        core.log().entries(),
        vec![ChatEntry::system("Someone has left the chat.")]
    );
}

#[test]
fn extra_event_arguments_are_ignored() {
    let Packet::Event(array) = Packet::decode(r#"42["user-joined","Ben","extra"]"#).unwrap()
    else {
        panic!("expected event packet");
    };
    assert_eq!(
        RelayEvent::from_event_array(array).unwrap(),
        Some(RelayEvent::ParticipantJoined { name: "Ben".into() })
    );
}

#[test]
fn message_text_is_preserved_verbatim() {
    let mut core = core();
    let body = "  héllo <b>wörld</b> \"quoted\" \\ 🎉  ";
    let array = json!(["receive", { "name": "Zoë", "message": body }]);
    let frame = Packet::Event(array).encode().unwrap();

    core.handle_session_event(relay(&frame));
    assert_eq!(core.log().entries(), vec![ChatEntry::user("Zoë", body)]);
}

// ════════════════════════════════════════════════════════════════════
// Full conversation
// ════════════════════════════════════════════════════════════════════

#[test]
fn conversation_from_captured_frames() {
    let mut core = core();
    core.request_notification_permission();

    assert_eq!(core.set_display_name("Ana").unwrap(), None);
    core.handle_session_event(SessionEvent::Connecting);
    let announce = core
        .handle_session_event(SessionEvent::Connected)
        .expect("handshake due on connect");
    assert_eq!(frame(&announce), r#"42["new-user-joined","Ana"]"#);

    core.handle_session_event(relay(r#"42["user-joined","Ben"]"#));
    let send = core.append_local("hello Ben").unwrap();
    assert_eq!(frame(&send), r#"42["send","hello Ben"]"#);
    core.handle_session_event(relay(r#"42["receive",{"name":"Ben","message":"hi Ana"}]"#));
    core.handle_session_event(relay(r#"42["user-left","Ben"]"#));

    assert_eq!(
        core.log().entries(),
        vec![
            ChatEntry::system("Ben has joined the chat!"),
            ChatEntry::user("Ana", "hello Ben"),
            ChatEntry::user("Ben", "hi Ana"),
            ChatEntry::system("Ben has left the chat."),
        ]
    );
    assert_eq!(core.state(), ConnectionState::Connected);
}

#[test]
fn reconnect_reannounces_exactly_once() {
    let mut core = core();
    core.set_display_name("Ana").unwrap();
    core.handle_session_event(SessionEvent::Connecting);

    let mut announcements = 0;
    for _ in 0..3 {
        if core.handle_session_event(SessionEvent::Connected).is_some() {
            announcements += 1;
        }
        // A duplicate connect notification within the same epoch is silent.
        assert_eq!(core.handle_session_event(SessionEvent::Connected), None);
        core.handle_session_event(SessionEvent::Disconnected { will_retry: true });
    }

    assert_eq!(announcements, 3);
    assert_eq!(core.supervisor().epoch(), 3);
}
