//! One Socket.IO session on top of a [`Transport`], plus the reconnect policy.
//!
//! [`RelaySession::open`] performs the Engine.IO/Socket.IO handshake on a
//! freshly connected transport. Afterwards the session loop reads frames with
//! [`RelaySession::recv_frame`] (cancel-safe) and hands each one to
//! [`RelaySession::handle_frame`], which answers heartbeats and decodes chat
//! events.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::{ChatError, Result};
use crate::framing::{OpenHandshake, Packet};
use crate::protocol::{ClientEvent, RelayEvent};
use crate::transport::Transport;

/// Default number of reconnection attempts per outage.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default delay before the first reconnection attempt.
const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Default upper bound on the reconnection delay.
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(5);

/// Bounded exponential backoff for reconnection.
///
/// # Example
///
/// ```
/// use relay_chat_client::session::ReconnectPolicy;
/// use std::time::Duration;
///
/// let policy = ReconnectPolicy::default();
/// assert_eq!(policy.delay_for(1), Duration::from_secs(1));
/// assert_eq!(policy.delay_for(2), Duration::from_secs(2));
/// assert_eq!(policy.delay_for(10), Duration::from_secs(5));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Whether to reconnect at all.
    pub enabled: bool,
    /// Reconnection attempts allowed per outage. Reset after every
    /// successful connection.
    pub max_attempts: u32,
    /// Delay before the first attempt; doubled for each further attempt.
    pub base_delay: Duration,
    /// Upper bound on the delay.
    pub max_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
        }
    }
}

impl ReconnectPolicy {
    /// A policy that never reconnects.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            max_attempts: 0,
            ..Self::default()
        }
    }

    /// Set the attempt budget per outage.
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set the base and maximum backoff delays.
    #[must_use]
    pub fn with_delays(mut self, base_delay: Duration, max_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self.max_delay = max_delay.max(base_delay);
        self
    }

    /// Attempts available per outage; zero when disabled.
    pub fn attempt_budget(&self) -> u32 {
        if self.enabled {
            self.max_attempts
        } else {
            0
        }
    }

    /// Whether attempt number `attempt` (1-based) may run.
    pub fn allows(&self, attempt: u32) -> bool {
        attempt >= 1 && attempt <= self.attempt_budget()
    }

    /// Delay before attempt number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay
            .saturating_mul(1_u32 << exponent)
            .min(self.max_delay)
    }
}

/// What a received frame amounted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// A chat event for the core.
    Event(RelayEvent),
    /// Heartbeat, noop, unknown or malformed frame. Nothing to do.
    Ignored,
    /// The relay ended the session.
    Closed,
}

/// A handshaken Socket.IO session.
#[derive(Debug)]
pub struct RelaySession<T> {
    transport: T,
    handshake: OpenHandshake,
    socket_id: Option<String>,
    last_seen: Instant,
}

impl<T: Transport> RelaySession<T> {
    /// Run the open/connect handshake on a connected transport.
    ///
    /// On failure the transport is closed before the error is returned.
    ///
    /// # Errors
    ///
    /// - [`ChatError::Timeout`] if the handshake does not finish in `timeout`
    /// - [`ChatError::ConnectRejected`] if the relay refuses the namespace
    /// - [`ChatError::TransportClosed`] if the relay hangs up mid-handshake
    /// - [`ChatError::Protocol`] if the first frame is not an open packet
    pub async fn open(mut transport: T, timeout: Duration) -> Result<Self> {
        let result = tokio::time::timeout(timeout, negotiate(&mut transport))
            .await
            .unwrap_or(Err(ChatError::Timeout));

        match result {
            Ok((handshake, socket_id)) => Ok(Self::established(transport, handshake, socket_id)),
            Err(e) => {
                if let Err(close_err) = transport.close().await {
                    debug!("closing transport after failed handshake: {close_err}");
                }
                Err(e)
            }
        }
    }

    /// Wrap a transport on which [`negotiate`] succeeded.
    pub(crate) fn established(
        transport: T,
        handshake: OpenHandshake,
        socket_id: Option<String>,
    ) -> Self {
        debug!(sid = %handshake.sid, ?socket_id, "relay session open");
        Self {
            transport,
            handshake,
            socket_id,
            last_seen: Instant::now(),
        }
    }

    /// The Engine.IO handshake parameters.
    pub fn handshake(&self) -> &OpenHandshake {
        &self.handshake
    }

    /// The Socket.IO socket id assigned by the relay, if any.
    pub fn socket_id(&self) -> Option<&str> {
        self.socket_id.as_deref()
    }

    /// Instant after which silence means the connection is dead.
    pub fn deadline(&self) -> Instant {
        self.last_seen + self.handshake.heartbeat_window()
    }

    /// Read the next raw frame. Cancel-safe.
    pub async fn recv_frame(&mut self) -> Option<Result<String>> {
        self.transport.recv().await
    }

    /// Process one frame read by [`recv_frame`](Self::recv_frame).
    ///
    /// Pings are answered here. Frames that fail to decode are logged and
    /// reported as [`Inbound::Ignored`].
    ///
    /// # Errors
    ///
    /// Returns a transport error if the pong cannot be sent.
    pub async fn handle_frame(&mut self, frame: &str) -> Result<Inbound> {
        self.last_seen = Instant::now();

        let packet = match Packet::decode(frame) {
            Ok(packet) => packet,
            Err(e) => {
                warn!("failed to decode relay frame: {e} (raw: {frame})");
                return Ok(Inbound::Ignored);
            }
        };

        match packet {
            Packet::Ping => {
                self.transport.send(Packet::Pong.encode()?).await?;
                Ok(Inbound::Ignored)
            }
            Packet::Event(array) => match RelayEvent::from_event_array(array) {
                Ok(Some(event)) => Ok(Inbound::Event(event)),
                Ok(None) => {
                    warn!("skipping unknown relay event (raw: {frame})");
                    Ok(Inbound::Ignored)
                }
                Err(e) => {
                    warn!("malformed relay event: {e} (raw: {frame})");
                    Ok(Inbound::Ignored)
                }
            },
            Packet::Close | Packet::Disconnect => {
                debug!("relay closed the session");
                Ok(Inbound::Closed)
            }
            Packet::ConnectError(message) => {
                warn!(%message, "relay revoked the namespace connection");
                Ok(Inbound::Closed)
            }
            Packet::Pong | Packet::Noop | Packet::Open(_) | Packet::Connect { .. } => {
                Ok(Inbound::Ignored)
            }
        }
    }

    /// Put one client event on the wire.
    ///
    /// # Errors
    ///
    /// Returns a serialization or transport error.
    pub async fn emit(&mut self, event: &ClientEvent) -> Result<()> {
        let frame = Packet::Event(event.to_event_array()).encode()?;
        debug!(event = event.name(), "emitting client event");
        self.transport.send(frame).await
    }

    /// Leave the namespace and close the transport.
    ///
    /// # Errors
    ///
    /// Returns the transport's close error; the transport is released either way.
    pub async fn close(mut self) -> Result<()> {
        if let Ok(frame) = Packet::Disconnect.encode() {
            if let Err(e) = self.transport.send(frame).await {
                debug!("namespace disconnect not sent: {e}");
            }
        }
        self.transport.close().await
    }
}

/// Wait for the open packet, request the default namespace, await the ack.
///
/// Cancel-safe with respect to the transport: dropping the future leaves the
/// transport with the caller, which stays responsible for closing it.
pub(crate) async fn negotiate<T: Transport>(transport: &mut T) -> Result<(OpenHandshake, Option<String>)> {
    let first = next_frame(transport).await?;
    let handshake = match Packet::decode(&first)? {
        Packet::Open(handshake) => handshake,
        other => {
            return Err(ChatError::Protocol(format!(
                "expected open packet, got {other:?}"
            )))
        }
    };

    transport.send(Packet::Connect { sid: None }.encode()?).await?;

    loop {
        let frame = next_frame(transport).await?;
        match Packet::decode(&frame)? {
            Packet::Connect { sid } => return Ok((handshake, sid)),
            Packet::ConnectError(message) => return Err(ChatError::ConnectRejected(message)),
            Packet::Ping => transport.send(Packet::Pong.encode()?).await?,
            Packet::Close | Packet::Disconnect => return Err(ChatError::TransportClosed),
            other => debug!(?other, "ignoring frame before connect ack"),
        }
    }
}

async fn next_frame<T: Transport>(transport: &mut T) -> Result<String> {
    transport.recv().await.unwrap_or(Err(ChatError::TransportClosed))
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
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    const OPEN: &str = r#"0{"sid":"abc","upgrades":[],"pingInterval":25000,"pingTimeout":20000}"#;

    #[derive(Debug)]
    struct Scripted {
        incoming: VecDeque<Option<Result<String>>>,
        sent: Arc<Mutex<Vec<String>>>,
        closed: Arc<AtomicBool>,
    }

    impl Scripted {
        fn new(frames: &[&str]) -> (Self, Arc<Mutex<Vec<String>>>, Arc<AtomicBool>) {
            let sent = Arc::new(Mutex::new(Vec::new()));
            let closed = Arc::new(AtomicBool::new(false));
            let transport = Self {
                incoming: frames.iter().map(|f| Some(Ok((*f).to_owned()))).collect(),
                sent: Arc::clone(&sent),
                closed: Arc::clone(&closed),
            };
            (transport, sent, closed)
        }
    }

    #[async_trait]
    impl Transport for Scripted {
        async fn send(&mut self, frame: String) -> Result<()> {
            self.sent.lock().unwrap().push(frame);
            Ok(())
        }

        async fn recv(&mut self) -> Option<Result<String>> {
            match self.incoming.pop_front() {
                Some(item) => item,
                None => std::future::pending().await,
            }
        }

        async fn close(&mut self) -> Result<()> {
            self.closed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn open_requests_namespace_and_records_socket_id() {
        let (transport, sent, _) = Scripted::new(&[OPEN, "2", r#"40{"sid":"sock"}"#]);
        let session = RelaySession::open(transport, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(session.socket_id(), Some("sock"));
        assert_eq!(session.handshake().sid, "abc");
        assert_eq!(*sent.lock().unwrap(), vec!["40", "3"]);
    }

    #[tokio::test]
    async fn connect_error_rejects_and_closes_transport() {
        let (transport, _, closed) = Scripted::new(&[OPEN, r#"44{"message":"nope"}"#]);
        let err = RelaySession::open(transport, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::ConnectRejected(m) if m == "nope"));
        assert!(closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn first_frame_must_be_open() {
        let (transport, _, _) = Scripted::new(&[r#"42["send","x"]"#]);
        let err = RelaySession::open(transport, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::Protocol(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn silent_relay_times_out_handshake() {
        let (transport, _, closed) = Scripted::new(&[OPEN]);
        let err = RelaySession::open(transport, Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::Timeout));
        assert!(closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn frames_are_classified() {
        let (transport, sent, _) = Scripted::new(&[OPEN, "40"]);
        let mut session = RelaySession::open(transport, Duration::from_secs(1))
            .await
            .unwrap();

        assert_eq!(session.handle_frame("2").await.unwrap(), Inbound::Ignored);
        assert_eq!(sent.lock().unwrap().last().unwrap(), "3");

        assert_eq!(
            session
                .handle_frame(r#"42["user-left","Ben"]"#)
                .await
                .unwrap(),
            Inbound::Event(RelayEvent::ParticipantLeft { name: "Ben".into() })
        );
        assert_eq!(
            session.handle_frame(r#"42["typing","Ben"]"#).await.unwrap(),
            Inbound::Ignored
        );
        assert_eq!(session.handle_frame("garbage").await.unwrap(), Inbound::Ignored);
        assert_eq!(session.handle_frame("41").await.unwrap(), Inbound::Closed);
    }

    #[tokio::test]
    async fn emit_and_close_write_expected_frames() {
        let (transport, sent, closed) = Scripted::new(&[OPEN, "40"]);
        let mut session = RelaySession::open(transport, Duration::from_secs(1))
            .await
            .unwrap();
        session
            .emit(&ClientEvent::Send { body: "hi".into() })
            .await
            .unwrap();
        session.close().await.unwrap();

        assert_eq!(
            *sent.lock().unwrap(),
            vec!["40", r#"42["send","hi"]"#, "41"]
        );
        assert!(closed.load(Ordering::SeqCst));
    }

    #[test]
    fn backoff_doubles_up_to_cap() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for(3), Duration::from_secs(4));
        assert_eq!(policy.delay_for(4), Duration::from_secs(5));
        assert_eq!(policy.delay_for(u32::MAX), Duration::from_secs(5));
    }

    #[test]
    fn attempt_budget() {
        let policy = ReconnectPolicy::default();
        assert!(!policy.allows(0));
        assert!(policy.allows(5));
        assert!(!policy.allows(6));
        assert!(!ReconnectPolicy::disabled().allows(1));
        assert_eq!(ReconnectPolicy::disabled().attempt_budget(), 0);
    }
}
