//! Integration-style client tests for the Relay Chat Client.
//!
//! Uses the shared `MockTransport`/`MockConnector` from `tests/common` to
//! script relay behaviour and verify that `ChatClient` applies it correctly,
//! including state transitions, identity handshakes, log contents and event
//! delivery.

mod common;

use std::sync::atomic::Ordering;
use std::time::Duration;

use relay_chat_client::{
    ChatClient, ChatConfig, ChatEntry, ChatError, ChatEvent, ConnectionState, EchoPolicy,
    EntryKind, NotificationDispatcher, ReconnectPolicy,
};

use common::{
    announce_frame, expect_entry, expect_state, joined_frame, left_frame, received_frame,
    send_frame, MockConnector, MockTransport, CONNECT_ACK,
};

// ════════════════════════════════════════════════════════════════════
// Helpers
// ════════════════════════════════════════════════════════════════════

/// A fast reconnect policy for tests that exercise retries.
fn quick_retries(max_attempts: u32) -> ReconnectPolicy {
    ReconnectPolicy::default()
        .with_max_attempts(max_attempts)
        .with_delays(Duration::from_millis(10), Duration::from_millis(10))
}

fn start(
    connector: MockConnector,
    config: ChatConfig,
) -> (ChatClient, tokio::sync::mpsc::Receiver<ChatEvent>) {
    ChatClient::start(connector, config, NotificationDispatcher::default())
}

fn as_ana() -> ChatConfig {
    ChatConfig::new().with_display_name("Ana")
}

// ════════════════════════════════════════════════════════════════════
// Happy path
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn ana_and_ben_exchange_messages() {
    let (transport, relay) =
        MockTransport::accepting(&[joined_frame("Ben"), received_frame("Ben", "hi")]);
    let (mut client, mut events) = start(MockConnector::single(transport), as_ana());

    expect_state(&mut events, ConnectionState::Connecting).await;
    expect_state(&mut events, ConnectionState::Connected).await;
    assert_eq!(
        expect_entry(&mut events).await,
        ChatEntry::system("Ben has joined the chat!")
    );
    assert_eq!(expect_entry(&mut events).await, ChatEntry::user("Ben", "hi"));

    client.send_message("hello").expect("send_message");
    assert_eq!(expect_entry(&mut events).await, ChatEntry::user("Ana", "hello"));

    let sent = relay.wait_for_sent(3).await;
    assert_eq!(
        sent,
        vec![
            CONNECT_ACK.to_owned(),
            announce_frame("Ana"),
            send_frame("hello"),
        ]
    );

    assert_eq!(
        client.subscribe().entries(),
        vec![
            ChatEntry::system("Ben has joined the chat!"),
            ChatEntry::user("Ben", "hi"),
            ChatEntry::user("Ana", "hello"),
        ]
    );
    assert_eq!(client.connection_state(), ConnectionState::Connected);

    client.shutdown().await;
}

#[tokio::test]
async fn remote_messages_append_in_arrival_order() {
    let frames: Vec<String> = (0..20)
        .map(|i| received_frame("Ben", &format!("msg {i}")))
        .collect();
    let (transport, _relay) = MockTransport::accepting(&frames);
    let (mut client, mut events) = start(MockConnector::single(transport), as_ana());

    expect_state(&mut events, ConnectionState::Connecting).await;
    expect_state(&mut events, ConnectionState::Connected).await;
    for i in 0..20 {
        let entry = expect_entry(&mut events).await;
        assert_eq!(entry.author_label(), "Ben");
        assert_eq!(entry.body(), format!("msg {i}"));
    }

    let mut view = client.subscribe();
    let batch = view.next_entries().await.expect("entries");
    assert_eq!(batch.len(), 20);
    assert_eq!(view.cursor(), 20);

    client.shutdown().await;
}

#[tokio::test]
async fn presence_broadcasts_become_system_entries() {
    let (transport, _relay) = MockTransport::accepting(&[
        joined_frame("Ben"),
        joined_frame("Ben"),
        left_frame("Ben"),
    ]);
    let (mut client, mut events) = start(MockConnector::single(transport), as_ana());

    expect_state(&mut events, ConnectionState::Connecting).await;
    expect_state(&mut events, ConnectionState::Connected).await;

    let bodies = [
        "Ben has joined the chat!",
        "Ben has joined the chat!",
        "Ben has left the chat.",
    ];
    for body in bodies {
        let entry = expect_entry(&mut events).await;
        assert_eq!(entry.kind(), EntryKind::System);
        assert_eq!(entry.author_label(), "System");
        assert_eq!(entry.body(), body);
    }

    client.shutdown().await;
}

#[tokio::test]
async fn unknown_and_malformed_frames_are_skipped() {
    let (transport, relay) = MockTransport::accepting(&[
        r#"42["typing","Ben"]"#.to_owned(),
        "42[not json".to_owned(),
        r#"42["receive","no object"]"#.to_owned(),
        "2".to_owned(),
        received_frame("Ben", "still here"),
    ]);
    let (mut client, mut events) = start(MockConnector::single(transport), as_ana());

    expect_state(&mut events, ConnectionState::Connecting).await;
    expect_state(&mut events, ConnectionState::Connected).await;
    assert_eq!(
        expect_entry(&mut events).await,
        ChatEntry::user("Ben", "still here")
    );

    // The ping was answered with a pong.
    let sent = relay.wait_for_sent(3).await;
    assert_eq!(sent[2], "3");
    assert_eq!(client.connection_state(), ConnectionState::Connected);

    client.shutdown().await;
}

// ════════════════════════════════════════════════════════════════════
// Identity handshake
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn handshake_waits_for_display_name() {
    let (transport, relay) = MockTransport::accepting(&[]);
    let (mut client, mut events) = start(MockConnector::single(transport), ChatConfig::new());

    expect_state(&mut events, ConnectionState::Connecting).await;
    expect_state(&mut events, ConnectionState::Connected).await;
    assert_eq!(relay.wait_for_sent(1).await, vec![CONNECT_ACK.to_owned()]);

    client.set_display_name("Ana").expect("set_display_name");
    let sent = relay.wait_for_sent(2).await;
    assert_eq!(sent[1], announce_frame("Ana"));

    // A second name is ignored; the next frame is the chat text.
    client.set_display_name("Bob").expect("queued");
    client.send_message("hi").expect("send_message");
    assert_eq!(expect_entry(&mut events).await, ChatEntry::user("Ana", "hi"));
    let sent = relay.wait_for_sent(3).await;
    assert_eq!(sent.len(), 3);
    assert_eq!(sent[2], send_frame("hi"));

    client.shutdown().await;
}

#[tokio::test]
async fn handshake_repeats_once_per_reconnect() {
    let (first, first_relay) = MockTransport::accepting(&[]);
    let (second, second_relay) = MockTransport::accepting(&[]);
    let (connector, connects) = MockConnector::new(vec![Some(first), Some(second)]);
    let config = as_ana().with_reconnect(quick_retries(3));
    let (mut client, mut events) = start(connector, config);

    expect_state(&mut events, ConnectionState::Connecting).await;
    expect_state(&mut events, ConnectionState::Connected).await;
    first_relay.wait_for_sent(2).await;

    first_relay.hang_up();
    expect_state(&mut events, ConnectionState::Reconnecting).await;
    expect_state(&mut events, ConnectionState::Connected).await;

    assert_eq!(
        first_relay.sent(),
        vec![
            CONNECT_ACK.to_owned(),
            announce_frame("Ana"),
            "41".to_owned()
        ]
    );
    assert!(first_relay.is_closed());
    assert_eq!(
        second_relay.wait_for_sent(2).await,
        vec![CONNECT_ACK.to_owned(), announce_frame("Ana")]
    );
    assert_eq!(connects.load(Ordering::SeqCst), 2);

    client.shutdown().await;
}

#[tokio::test]
async fn reconnect_without_reannounce_stays_silent() {
    let (first, first_relay) = MockTransport::accepting(&[]);
    let (second, second_relay) = MockTransport::accepting(&[]);
    let (connector, _) = MockConnector::new(vec![Some(first), Some(second)]);
    let config = as_ana()
        .with_reconnect(quick_retries(3))
        .with_reannounce_on_reconnect(false);
    let (mut client, mut events) = start(connector, config);

    expect_state(&mut events, ConnectionState::Connecting).await;
    expect_state(&mut events, ConnectionState::Connected).await;
    first_relay.wait_for_sent(2).await;

    first_relay.fail("connection reset");
    expect_state(&mut events, ConnectionState::Reconnecting).await;
    expect_state(&mut events, ConnectionState::Connected).await;

    assert_eq!(
        second_relay.wait_for_sent(1).await,
        vec![CONNECT_ACK.to_owned()]
    );

    client.shutdown().await;
}

// ════════════════════════════════════════════════════════════════════
// Input validation and optimistic echo
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn blank_input_is_rejected_without_side_effects() {
    let (transport, relay) = MockTransport::accepting(&[]);
    let (mut client, mut events) = start(MockConnector::single(transport), as_ana());

    expect_state(&mut events, ConnectionState::Connecting).await;
    expect_state(&mut events, ConnectionState::Connected).await;

    assert!(matches!(
        client.send_message(""),
        Err(ChatError::EmptyMessage)
    ));
    assert!(matches!(
        client.send_message(" \t\n"),
        Err(ChatError::EmptyMessage)
    ));
    assert!(matches!(
        client.set_display_name("   "),
        Err(ChatError::EmptyDisplayName)
    ));

    assert!(client.subscribe().is_empty());
    assert_eq!(relay.wait_for_sent(2).await.len(), 2);

    client.shutdown().await;
}

#[tokio::test]
async fn local_send_is_appended_while_relay_is_unreachable() {
    let (connector, _) = MockConnector::new(vec![]);
    let (mut client, mut events) = start(connector, as_ana());

    expect_state(&mut events, ConnectionState::Connecting).await;
    expect_state(&mut events, ConnectionState::Reconnecting).await;

    client.send_message("anyone?").expect("send_message");
    assert_eq!(
        expect_entry(&mut events).await,
        ChatEntry::user("Ana", "anyone?")
    );

    client.shutdown().await;
    assert_eq!(client.connection_state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn local_send_is_kept_when_transport_send_fails() {
    let (transport, _relay) = MockTransport::accepting(&[]);
    let transport = transport.failing_sends_after(2);
    let (mut client, mut events) = start(MockConnector::single(transport), as_ana());

    expect_state(&mut events, ConnectionState::Connecting).await;
    expect_state(&mut events, ConnectionState::Connected).await;

    client.send_message("hello").expect("send_message");
    assert_eq!(expect_entry(&mut events).await, ChatEntry::user("Ana", "hello"));
    expect_state(&mut events, ConnectionState::Reconnecting).await;

    assert_eq!(client.subscribe().len(), 1);

    client.shutdown().await;
}

#[tokio::test]
async fn echoed_own_message_is_absorbed() {
    let (transport, relay) = MockTransport::accepting(&[]);
    let config = as_ana().with_echo_policy(EchoPolicy::EchoesToSender);
    let (mut client, mut events) = start(MockConnector::single(transport), config);

    expect_state(&mut events, ConnectionState::Connecting).await;
    expect_state(&mut events, ConnectionState::Connected).await;

    client.send_message("hello").expect("send_message");
    assert_eq!(expect_entry(&mut events).await, ChatEntry::user("Ana", "hello"));
    relay.wait_for_sent(3).await;

    relay.push(received_frame("Ana", "hello"));
    relay.push(received_frame("Ben", "yo"));
    assert_eq!(expect_entry(&mut events).await, ChatEntry::user("Ben", "yo"));
    assert_eq!(client.subscribe().len(), 2);

    client.shutdown().await;
}

// ════════════════════════════════════════════════════════════════════
// Failure and shutdown
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn exhausted_reconnects_fail_terminally() {
    let (connector, connects) = MockConnector::new(vec![]);
    let config = as_ana().with_reconnect(quick_retries(2));
    let (mut client, mut events) = start(connector, config);

    expect_state(&mut events, ConnectionState::Connecting).await;
    expect_state(&mut events, ConnectionState::Reconnecting).await;
    expect_state(&mut events, ConnectionState::Failed).await;

    assert_eq!(connects.load(Ordering::SeqCst), 3);
    assert_eq!(client.connection_state(), ConnectionState::Failed);

    client.shutdown().await;
    assert_eq!(client.connection_state(), ConnectionState::Failed);
}

#[tokio::test]
async fn local_send_is_appended_after_failure() {
    let (connector, connects) = MockConnector::new(vec![]);
    let config = as_ana().with_reconnect(quick_retries(1));
    let (mut client, mut events) = start(connector, config);

    expect_state(&mut events, ConnectionState::Connecting).await;
    expect_state(&mut events, ConnectionState::Reconnecting).await;
    expect_state(&mut events, ConnectionState::Failed).await;

    client.send_message("anyone there?").expect("send_message");
    assert_eq!(
        expect_entry(&mut events).await,
        ChatEntry::user("Ana", "anyone there?")
    );
    assert_eq!(client.subscribe().len(), 1);
    // No new attempt and no state change.
    assert_eq!(connects.load(Ordering::SeqCst), 2);
    assert_eq!(client.connection_state(), ConnectionState::Failed);

    client.shutdown().await;
    assert!(matches!(
        client.send_message("late"),
        Err(ChatError::ClientClosed)
    ));
}

#[tokio::test]
async fn initial_failure_without_reconnect_fails() {
    let (connector, connects) = MockConnector::new(vec![None]);
    let config = as_ana().with_reconnect(ReconnectPolicy::disabled());
    let (_client, mut events) = start(connector, config);

    expect_state(&mut events, ConnectionState::Connecting).await;
    expect_state(&mut events, ConnectionState::Failed).await;
    assert_eq!(connects.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn drop_without_reconnect_returns_to_disconnected() {
    let (transport, relay) = MockTransport::accepting(&[]);
    let config = as_ana().with_reconnect(ReconnectPolicy::disabled());
    let (mut client, mut events) = start(MockConnector::single(transport), config);

    expect_state(&mut events, ConnectionState::Connecting).await;
    expect_state(&mut events, ConnectionState::Connected).await;

    relay.hang_up();
    expect_state(&mut events, ConnectionState::Disconnected).await;
    relay.wait_for_close().await;

    // The log keeps accepting local messages while offline.
    client.send_message("hello").expect("send_message");
    assert_eq!(expect_entry(&mut events).await, ChatEntry::user("Ana", "hello"));
    assert_eq!(client.connection_state(), ConnectionState::Disconnected);
    assert_eq!(relay.sent().last().map(String::as_str), Some("41"));
}

#[tokio::test]
async fn shutdown_closes_transport() {
    let (transport, relay) = MockTransport::accepting(&[]);
    let (mut client, mut events) = start(MockConnector::single(transport), as_ana());

    expect_state(&mut events, ConnectionState::Connecting).await;
    expect_state(&mut events, ConnectionState::Connected).await;

    client.shutdown().await;
    relay.wait_for_close().await;
    assert_eq!(relay.sent().last().map(String::as_str), Some("41"));
    assert_eq!(client.connection_state(), ConnectionState::Disconnected);
    expect_state(&mut events, ConnectionState::Disconnected).await;
}

#[tokio::test]
async fn shutdown_during_connect() {
    // The relay never sends the open packet.
    let (transport, relay) = MockTransport::new();
    let (connector, connects) = MockConnector::new(vec![Some(transport)]);
    let (mut client, mut events) = start(connector, as_ana());

    expect_state(&mut events, ConnectionState::Connecting).await;
    common::wait_until(|| connects.load(Ordering::SeqCst) == 1).await;
    client.shutdown().await;
    expect_state(&mut events, ConnectionState::Disconnected).await;
    assert_eq!(client.connection_state(), ConnectionState::Disconnected);
    relay.wait_for_close().await;
    assert!(relay.sent().is_empty());
}

#[tokio::test]
async fn dropping_client_closes_transport() {
    let (transport, relay) = MockTransport::accepting(&[]);
    let (client, mut events) = start(MockConnector::single(transport), as_ana());

    expect_state(&mut events, ConnectionState::Connecting).await;
    expect_state(&mut events, ConnectionState::Connected).await;

    drop(client);
    relay.wait_for_close().await;
    assert_eq!(relay.sent().last().map(String::as_str), Some("41"));
    expect_state(&mut events, ConnectionState::Disconnected).await;
}

#[tokio::test(start_paused = true)]
async fn connect_timeout_covers_connect_and_handshake() {
    // The connector spends most of the budget; the relay never sends the
    // open packet, so the handshake must give up when the budget runs out.
    let (transport, relay) = MockTransport::new();
    let (connector, _) = MockConnector::new(vec![Some(transport)]);
    let connector = connector.with_delay(Duration::from_secs(8));
    let config = as_ana()
        .with_reconnect(ReconnectPolicy::disabled())
        .with_connect_timeout(Duration::from_secs(10));
    let (_client, mut events) = start(connector, config);

    let started = tokio::time::Instant::now();
    expect_state(&mut events, ConnectionState::Connecting).await;
    assert_eq!(
        events.recv().await,
        Some(ChatEvent::StateChanged(ConnectionState::Failed))
    );
    assert!(started.elapsed() <= Duration::from_secs(10));
    assert!(relay.is_closed());
}

#[tokio::test]
async fn watch_state_observes_transitions() {
    let (transport, _relay) = MockTransport::accepting(&[]);
    let (mut client, mut events) = start(MockConnector::single(transport), as_ana());
    let mut state = client.watch_state();

    expect_state(&mut events, ConnectionState::Connecting).await;
    expect_state(&mut events, ConnectionState::Connected).await;
    state.changed().await.expect("state watch");
    assert_eq!(*state.borrow_and_update(), ConnectionState::Connected);

    client.shutdown().await;
    assert_eq!(*state.borrow(), ConnectionState::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn silent_relay_is_dropped_after_heartbeat_window() {
    let (transport, _relay) = MockTransport::accepting(&[]);
    let config = as_ana().with_reconnect(ReconnectPolicy::disabled());
    let (_client, mut events) = start(MockConnector::single(transport), config);

    let started = tokio::time::Instant::now();
    assert_eq!(
        events.recv().await,
        Some(ChatEvent::StateChanged(ConnectionState::Connecting))
    );
    assert_eq!(
        events.recv().await,
        Some(ChatEvent::StateChanged(ConnectionState::Connected))
    );
    assert_eq!(
        events.recv().await,
        Some(ChatEvent::StateChanged(ConnectionState::Disconnected))
    );
    // pingInterval + pingTimeout from the open packet.
    assert!(started.elapsed() >= Duration::from_secs(45));
}
