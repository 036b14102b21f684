#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing,
    dead_code
)]
//! Shared test utilities for Relay Chat Client integration tests.
//!
//! Provides a channel-backed [`MockTransport`] driven through a [`MockRelay`]
//! handle, a [`MockConnector`] that hands out scripted connection attempts,
//! and helpers for building relay frames.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;
use relay_chat_client::protocol::{ClientEvent, ReceivedMessage, RelayEvent};
use relay_chat_client::{ChatEntry, ChatError, ChatEvent, ConnectionState, Connector, Transport};
use tokio::sync::mpsc;

/// Upper bound for any single wait in these tests.
pub const WAIT: Duration = Duration::from_secs(2);

// ── MockTransport ───────────────────────────────────────────────────

type Incoming = Option<Result<String, ChatError>>;

/// A channel-backed mock transport.
///
/// Frames pushed through the paired [`MockRelay`] are returned by `recv()` in
/// order; once the relay handle is dropped `recv()` hangs forever. All frames
/// sent by the client are recorded.
pub struct MockTransport {
    incoming: mpsc::UnboundedReceiver<Incoming>,
    sent: Arc<StdMutex<Vec<String>>>,
    closed: Arc<AtomicBool>,
    fail_sends_after: Option<usize>,
}

impl MockTransport {
    /// Create a transport and the relay handle that drives it.
    pub fn new() -> (Self, MockRelay) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sent = Arc::new(StdMutex::new(Vec::new()));
        let closed = Arc::new(AtomicBool::new(false));
        let transport = Self {
            incoming: rx,
            sent: Arc::clone(&sent),
            closed: Arc::clone(&closed),
            fail_sends_after: None,
        };
        (transport, MockRelay { tx, sent, closed })
    }

    /// A transport whose relay has already sent the open packet and the
    /// namespace ack, followed by `frames`.
    pub fn accepting(frames: &[String]) -> (Self, MockRelay) {
        let (transport, relay) = Self::new();
        relay.push(open_frame());
        relay.push(CONNECT_ACK);
        for frame in frames {
            relay.push(frame.clone());
        }
        (transport, relay)
    }

    /// Fail every send after the first `n` succeeded.
    pub fn failing_sends_after(mut self, n: usize) -> Self {
        self.fail_sends_after = Some(n);
        self
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, frame: String) -> Result<(), ChatError> {
        let mut sent = self.sent.lock().unwrap();
        if self.fail_sends_after.is_some_and(|n| sent.len() >= n) {
            return Err(ChatError::TransportSend("mock send failure".into()));
        }
        sent.push(frame);
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<String, ChatError>> {
        match self.incoming.recv().await {
            Some(item) => item,
            // Relay handle dropped: stay silent until shutdown.
            None => std::future::pending().await,
        }
    }

    async fn close(&mut self) -> Result<(), ChatError> {
        self.closed.store(true, Ordering::Relaxed);
        Ok(())
    }
}

/// The relay side of a [`MockTransport`].
pub struct MockRelay {
    tx: mpsc::UnboundedSender<Incoming>,
    sent: Arc<StdMutex<Vec<String>>>,
    closed: Arc<AtomicBool>,
}

impl MockRelay {
    /// Deliver one frame to the client.
    pub fn push(&self, frame: impl Into<String>) {
        let _ = self.tx.send(Some(Ok(frame.into())));
    }

    /// Hang up: the client's next `recv()` returns `None`.
    pub fn hang_up(&self) {
        let _ = self.tx.send(None);
    }

    /// Make the client's next `recv()` fail.
    pub fn fail(&self, message: &str) {
        let _ = self
            .tx
            .send(Some(Err(ChatError::TransportReceive(message.into()))));
    }

    /// Frames the client has sent so far.
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    /// Whether the client closed the transport.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Relaxed)
    }

    /// Wait until the client has sent at least `n` frames.
    pub async fn wait_for_sent(&self, n: usize) -> Vec<String> {
        wait_until(|| self.sent.lock().unwrap().len() >= n).await;
        self.sent()
    }

    /// Wait until the client closed the transport.
    pub async fn wait_for_close(&self) {
        wait_until(|| self.is_closed()).await;
    }
}

/// Poll `condition` until it holds, panicking after [`WAIT`].
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(WAIT, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not met in time");
}

// ── MockConnector ───────────────────────────────────────────────────

/// Hands out scripted connection attempts in order.
///
/// `None` entries refuse the attempt; once the script runs out every
/// further attempt is refused.
pub struct MockConnector {
    attempts: StdMutex<VecDeque<Option<MockTransport>>>,
    connects: Arc<AtomicUsize>,
    delay: Duration,
}

impl MockConnector {
    /// Create a connector and a counter of connection attempts made.
    pub fn new(attempts: Vec<Option<MockTransport>>) -> (Self, Arc<AtomicUsize>) {
        let connects = Arc::new(AtomicUsize::new(0));
        let connector = Self {
            attempts: StdMutex::new(VecDeque::from(attempts)),
            connects: Arc::clone(&connects),
            delay: Duration::ZERO,
        };
        (connector, connects)
    }

    /// Make every attempt take `delay` before it resolves.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// A connector whose single attempt succeeds with `transport`.
    pub fn single(transport: MockTransport) -> Self {
        Self::new(vec![Some(transport)]).0
    }
}

#[async_trait]
impl Connector for MockConnector {
    type Transport = MockTransport;

    async fn connect(&self) -> Result<MockTransport, ChatError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.attempts
            .lock()
            .unwrap()
            .pop_front()
            .flatten()
            .ok_or_else(|| ChatError::TransportSend("connection refused".into()))
    }
}

// ── Frame helpers ───────────────────────────────────────────────────

/// The relay's namespace connect acknowledgement.
pub const CONNECT_ACK: &str = "40";

/// The Engine.IO open packet with the relay's default heartbeat timings.
pub fn open_frame() -> String {
    r#"0{"sid":"test-sid","upgrades":[],"pingInterval":25000,"pingTimeout":20000,"maxPayload":1000000}"#
        .to_owned()
}

fn relay_frame(event: &RelayEvent) -> String {
    let array = event.to_event_array().expect("relay event array");
    format!("42{array}")
}

/// A `user-joined` broadcast.
pub fn joined_frame(name: &str) -> String {
    relay_frame(&RelayEvent::ParticipantJoined { name: name.into() })
}

/// A `user-left` broadcast.
pub fn left_frame(name: &str) -> String {
    relay_frame(&RelayEvent::ParticipantLeft { name: name.into() })
}

/// A `receive` broadcast.
pub fn received_frame(name: &str, message: &str) -> String {
    relay_frame(&RelayEvent::MessageReceived(ReceivedMessage {
        name: name.into(),
        message: message.into(),
    }))
}

/// The frame the client sends to announce `name`.
pub fn announce_frame(name: &str) -> String {
    let event = ClientEvent::IdentityAnnounce {
        display_name: name.into(),
    };
    format!("42{}", event.to_event_array())
}

/// The frame the client sends for chat text.
pub fn send_frame(body: &str) -> String {
    let event = ClientEvent::Send { body: body.into() };
    format!("42{}", event.to_event_array())
}

// ── Event helpers ───────────────────────────────────────────────────

/// Receive the next event, panicking after [`WAIT`].
pub async fn next_event(rx: &mut mpsc::Receiver<ChatEvent>) -> ChatEvent {
    tokio::time::timeout(WAIT, rx.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event channel closed")
}

/// Receive the next event and assert it is a state change to `expected`.
pub async fn expect_state(rx: &mut mpsc::Receiver<ChatEvent>, expected: ConnectionState) {
    let ev = next_event(rx).await;
    assert_eq!(
        ev,
        ChatEvent::StateChanged(expected),
        "expected state {expected:?}, got {ev:?}"
    );
}

/// Receive the next event and assert it is an appended entry.
pub async fn expect_entry(rx: &mut mpsc::Receiver<ChatEvent>) -> ChatEntry {
    match next_event(rx).await {
        ChatEvent::EntryAppended(entry) => entry,
        other => panic!("expected EntryAppended, got {other:?}"),
    }
}
