//! Async client for the relay chat.
//!
//! [`ChatClient`] is a thin handle that talks to a background session loop
//! over an unbounded MPSC channel. The loop owns the [`ChatCore`] and the live
//! [`RelaySession`], connects through a [`Connector`], reconnects with the
//! configured [`ReconnectPolicy`] and applies every transport callback and
//! user command one at a time.
//!
//! # Example
//!
//! ```rust,ignore
//! let config = ChatConfig::new().with_display_name("Ana");
//! let (client, mut events) =
//!     ChatClient::connect("https://relay.example.com", config, NotificationDispatcher::default());
//!
//! client.send_message("hello")?;
//!
//! while let Some(event) = events.recv().await {
//!     match event {
//!         ChatEvent::EntryAppended(entry) => println!("{}: {}", entry.author_label(), entry.body()),
//!         ChatEvent::StateChanged(ConnectionState::Failed) => break,
//!         _ => {}
//!     }
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn};

use crate::chat::ChatCore;
use crate::error::{ChatError, Result};
use crate::event::{ChatEvent, SessionEvent};
use crate::log::{validate_body, EchoPolicy, LogView};
use crate::notify::NotificationDispatcher;
use crate::protocol::ClientEvent;
use crate::session::{self, Inbound, ReconnectPolicy, RelaySession};
use crate::supervisor::ConnectionState;
use crate::transport::{Connector, Transport};

/// Default capacity of the bounded event channel.
const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 256;

/// Default timeout for the graceful shutdown.
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

/// Default timeout for one connection attempt, handshake included.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(20);

// ── Configuration ───────────────────────────────────────────────────

/// Configuration for a [`ChatClient`].
///
/// # Example
///
/// ```
/// use relay_chat_client::client::ChatConfig;
/// use relay_chat_client::log::EchoPolicy;
/// use std::time::Duration;
///
/// let config = ChatConfig::new()
///     .with_display_name("Ana")
///     .with_echo_policy(EchoPolicy::EchoesToSender)
///     .with_shutdown_timeout(Duration::from_secs(5));
/// assert_eq!(config.display_name.as_deref(), Some("Ana"));
/// assert!(config.reannounce_on_reconnect);
/// ```
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Display name known up front. Without it the identity handshake waits
    /// for [`ChatClient::set_display_name`].
    pub display_name: Option<String>,
    /// Reconnection behaviour after a drop or a failed attempt.
    pub reconnect: ReconnectPolicy,
    /// Repeat the identity handshake on every successful reconnect so peers
    /// learn the participant is back.
    ///
    /// Defaults to **true**.
    pub reannounce_on_reconnect: bool,
    /// Whether the relay echoes a sender's own messages back to it.
    pub echo_policy: EchoPolicy,
    /// Capacity of the bounded event channel.
    ///
    /// When the consumer falls behind, entry events are dropped with a
    /// warning; the [`LogView`] stays complete.
    ///
    /// Defaults to **256**. Values below 1 are clamped to 1.
    pub event_channel_capacity: usize,
    /// Time allowed for one connection attempt including the handshake.
    ///
    /// Defaults to **20 seconds**.
    pub connect_timeout: Duration,
    /// Time the session loop gets to close the transport on
    /// [`ChatClient::shutdown`] or drop before it is aborted.
    ///
    /// Defaults to **1 second**.
    pub shutdown_timeout: Duration,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self {
            display_name: None,
            reconnect: ReconnectPolicy::default(),
            reannounce_on_reconnect: true,
            echo_policy: EchoPolicy::default(),
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }

    /// Set the display name up front.
    #[must_use]
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Set the reconnect policy.
    #[must_use]
    pub fn with_reconnect(mut self, reconnect: ReconnectPolicy) -> Self {
        self.reconnect = reconnect;
        self
    }

    /// Enable or disable re-announcing on reconnect.
    #[must_use]
    pub fn with_reannounce_on_reconnect(mut self, reannounce: bool) -> Self {
        self.reannounce_on_reconnect = reannounce;
        self
    }

    /// Set the echo policy.
    #[must_use]
    pub fn with_echo_policy(mut self, echo_policy: EchoPolicy) -> Self {
        self.echo_policy = echo_policy;
        self
    }

    /// Set the capacity of the bounded event channel. Clamped to at least 1.
    #[must_use]
    pub fn with_event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity.max(1);
        self
    }

    /// Set the per-attempt connect timeout.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the graceful shutdown timeout.
    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}

// ── Client handle ───────────────────────────────────────────────────

/// User actions queued to the session loop.
#[derive(Debug)]
enum Command {
    SetDisplayName(String),
    Send(String),
}

/// Async client handle.
///
/// Created via [`ChatClient::start`], which spawns the session loop and
/// returns this handle together with an event receiver.
pub struct ChatClient {
    cmd_tx: mpsc::UnboundedSender<Command>,
    state: Arc<watch::Sender<ConnectionState>>,
    log: LogView,
    task: Option<tokio::task::JoinHandle<()>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    shutdown_timeout: Duration,
}

impl ChatClient {
    /// Start the session loop and return a handle plus event receiver.
    ///
    /// Notification permission is resolved before the loop starts. Must be
    /// called from within a Tokio runtime.
    #[must_use = "the event receiver must be used to receive events"]
    pub fn start<C: Connector>(
        connector: C,
        config: ChatConfig,
        dispatcher: NotificationDispatcher,
    ) -> (Self, mpsc::Receiver<ChatEvent>) {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let capacity = config.event_channel_capacity.max(1);
        let (event_tx, event_rx) = mpsc::channel(capacity);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let mut core = ChatCore::new(
            config.reannounce_on_reconnect,
            config.echo_policy,
            dispatcher,
        );
        core.request_notification_permission();
        if let Some(name) = &config.display_name {
            if let Err(e) = core.set_display_name(name) {
                warn!("ignoring configured display name: {e}");
            }
        }

        let log = core.subscribe();
        let state = Arc::new(watch::Sender::new(core.state()));
        let driver = Driver {
            feed: core.subscribe(),
            core,
            event_tx,
            state: Arc::clone(&state),
        };

        let task = tokio::spawn(session_loop(
            connector,
            driver,
            cmd_rx,
            shutdown_rx,
            config.reconnect,
            config.connect_timeout,
        ));

        let client = Self {
            cmd_tx,
            state,
            log,
            task: Some(task),
            shutdown_tx: Some(shutdown_tx),
            shutdown_timeout: config.shutdown_timeout,
        };
        (client, event_rx)
    }

    /// Start a client against a relay base URL over WebSocket.
    #[cfg(feature = "transport-websocket")]
    #[must_use = "the event receiver must be used to receive events"]
    pub fn connect(
        relay_url: &str,
        config: ChatConfig,
        dispatcher: NotificationDispatcher,
    ) -> (Self, mpsc::Receiver<ChatEvent>) {
        let connector = crate::transports::WebSocketConnector::new(relay_url)
            .with_timeout(config.connect_timeout);
        Self::start(connector, config, dispatcher)
    }

    // ── Public API methods ──────────────────────────────────────────

    /// Submit the display name. The identity handshake follows as soon as the
    /// session is connected.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::EmptyDisplayName`] for a blank name and
    /// [`ChatError::ClientClosed`] once the session loop has stopped.
    pub fn set_display_name(&self, name: &str) -> Result<()> {
        if name.trim().is_empty() {
            return Err(ChatError::EmptyDisplayName);
        }
        self.queue(Command::SetDisplayName(name.to_owned()))
    }

    /// Send chat text. The local entry is appended immediately whether or not
    /// the relay is reachable, including after the connection has failed.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::EmptyMessage`] for blank text and
    /// [`ChatError::ClientClosed`] after shutdown.
    pub fn send_message(&self, body: &str) -> Result<()> {
        validate_body(body)?;
        self.queue(Command::Send(body.to_owned()))
    }

    /// Shut down the client, closing the transport and stopping the loop.
    pub async fn shutdown(&mut self) {
        debug!("ChatClient: shutdown requested");

        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(mut task) = self.task.take() {
            match tokio::time::timeout(self.shutdown_timeout, &mut task).await {
                Ok(Ok(())) => {}
                Ok(Err(join_err)) => {
                    warn!("session loop terminated with join error: {join_err}");
                }
                Err(_) => {
                    warn!("session loop did not exit within timeout; aborting task");
                    task.abort();
                    if let Err(join_err) = task.await {
                        debug!("session loop aborted: {join_err}");
                    }
                }
            }
        }

        self.state.send_if_modified(|state| {
            if state.is_terminal() || *state == ConnectionState::Disconnected {
                return false;
            }
            *state = ConnectionState::Disconnected;
            true
        });
    }

    // ── State accessors ─────────────────────────────────────────────

    /// Current connection state.
    pub fn connection_state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// A receiver that observes every connection state change.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// A read view over the message log, positioned at its start.
    pub fn subscribe(&self) -> LogView {
        let mut view = self.log.clone();
        view.restart();
        view
    }

    // ── Internal helpers ────────────────────────────────────────────

    fn queue(&self, cmd: Command) -> Result<()> {
        self.cmd_tx.send(cmd).map_err(|_| ChatError::ClientClosed)
    }
}

impl std::fmt::Debug for ChatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatClient")
            .field("state", &self.connection_state())
            .field("entries", &self.log.len())
            .field("has_task", &self.task.is_some())
            .finish()
    }
}

impl Drop for ChatClient {
    fn drop(&mut self) {
        // Let the loop run its close path; abort only if it overruns.
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        let Some(mut task) = self.task.take() else {
            return;
        };
        let timeout = self.shutdown_timeout;
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if tokio::time::timeout(timeout, &mut task).await.is_err() {
                        warn!("session loop did not exit within timeout; aborting task");
                        task.abort();
                    }
                });
            }
            Err(_) => task.abort(),
        }
    }
}

// ── Session loop ────────────────────────────────────────────────────

/// The core plus everything needed to publish its changes.
struct Driver {
    core: ChatCore,
    feed: LogView,
    event_tx: mpsc::Sender<ChatEvent>,
    state: Arc<watch::Sender<ConnectionState>>,
}

impl Driver {
    /// Apply a session event and publish what changed.
    async fn apply(&mut self, event: SessionEvent) -> Option<ClientEvent> {
        let outgoing = self.core.handle_session_event(event);
        self.publish().await;
        outgoing
    }

    /// Apply a user command and publish what changed.
    async fn command(&mut self, cmd: Command) -> Option<ClientEvent> {
        let outgoing = match cmd {
            Command::SetDisplayName(name) => self.core.set_display_name(&name).unwrap_or_else(|e| {
                warn!("display name rejected: {e}");
                None
            }),
            Command::Send(body) => match self.core.append_local(&body) {
                Ok(event) => Some(event),
                Err(e) => {
                    warn!("message rejected: {e}");
                    None
                }
            },
        };
        self.publish().await;
        outgoing
    }

    async fn publish(&mut self) {
        let state = self.core.state();
        let changed = self.state.send_if_modified(|current| {
            if *current == state {
                return false;
            }
            *current = state;
            true
        });
        if changed {
            info!(?state, "connection state");
            let event = ChatEvent::StateChanged(state);
            if state.is_terminal() || state == ConnectionState::Disconnected {
                // Final states are always delivered.
                if self.event_tx.send(event).await.is_err() {
                    debug!("event channel closed, receiver dropped");
                }
            } else {
                emit_event(&self.event_tx, event);
            }
        }

        for entry in self.feed.next_batch() {
            emit_event(&self.event_tx, ChatEvent::EntryAppended(entry));
        }
    }
}

/// How a connected session ended.
enum SessionEnd {
    /// Shutdown was requested or the handle went away.
    Shutdown,
    /// The connection was lost.
    Dropped(String),
}

/// Outcome of one connection attempt.
enum Opened<T> {
    /// Connected and handshaken.
    Session(RelaySession<T>),
    /// The attempt failed or ran out of time.
    Failed(ChatError),
    /// Shutdown was requested mid-attempt; any transport is already closed.
    Shutdown,
}

/// Background loop owning the connection lifecycle.
///
/// Runs until shutdown or until the handle is dropped. Once reconnection is
/// exhausted, or a drop happens with reconnection disabled, the loop keeps
/// serving commands offline so local messages still reach the log.
async fn session_loop<C: Connector>(
    connector: C,
    mut driver: Driver,
    mut cmd_rx: mpsc::UnboundedReceiver<Command>,
    mut shutdown_rx: oneshot::Receiver<()>,
    policy: ReconnectPolicy,
    connect_timeout: Duration,
) {
    debug!("session loop started");
    driver.apply(SessionEvent::Connecting).await;

    // Reconnection attempts made during the current outage.
    let mut attempts: u32 = 0;

    loop {
        // ── Connect phase ───────────────────────────────────────────
        let opened = open_session(
            &connector,
            connect_timeout,
            &mut driver,
            &mut cmd_rx,
            &mut shutdown_rx,
        )
        .await;

        let mut session = match opened {
            Opened::Session(session) => session,
            Opened::Shutdown => {
                driver.apply(SessionEvent::Closed).await;
                debug!("session loop exited during connect");
                return;
            }
            Opened::Failed(e) => {
                warn!(attempt = attempts, "connection attempt failed: {e}");
                attempts = attempts.saturating_add(1);
                if !policy.allows(attempts) {
                    driver
                        .apply(SessionEvent::ReconnectExhausted {
                            attempts: attempts.saturating_sub(1),
                        })
                        .await;
                    break;
                }
                driver
                    .apply(SessionEvent::Disconnected { will_retry: true })
                    .await;
                if !backoff(policy.delay_for(attempts), &mut driver, &mut cmd_rx, &mut shutdown_rx).await {
                    return;
                }
                continue;
            }
        };

        // ── Connected phase ─────────────────────────────────────────
        attempts = 0;
        if let Some(handshake) = driver.apply(SessionEvent::Connected).await {
            if let Err(e) = session.emit(&handshake).await {
                warn!("identity announcement failed: {e}");
            }
        }

        let end = run_connected(&mut session, &mut driver, &mut cmd_rx, &mut shutdown_rx).await;
        if let Err(e) = session.close().await {
            debug!("transport close failed: {e}");
        }

        match end {
            SessionEnd::Shutdown => {
                driver.apply(SessionEvent::Closed).await;
                debug!("session loop exited");
                return;
            }
            SessionEnd::Dropped(reason) => {
                warn!(%reason, "relay connection lost");
                attempts = 1;
                let will_retry = policy.allows(attempts);
                driver.apply(SessionEvent::Disconnected { will_retry }).await;
                if !will_retry {
                    break;
                }
                if !backoff(policy.delay_for(attempts), &mut driver, &mut cmd_rx, &mut shutdown_rx).await {
                    return;
                }
            }
        }
    }

    serve_offline(&mut driver, &mut cmd_rx, &mut shutdown_rx).await;
    debug!("session loop exited");
}

/// Keep the core reachable once the loop has stopped connecting.
async fn serve_offline(
    driver: &mut Driver,
    cmd_rx: &mut mpsc::UnboundedReceiver<Command>,
    shutdown_rx: &mut oneshot::Receiver<()>,
) {
    debug!("serving commands offline");
    loop {
        tokio::select! {
            _ = &mut *shutdown_rx => break,
            cmd = cmd_rx.recv() => match cmd {
                Some(cmd) => offline_command(driver, cmd).await,
                None => break,
            },
        }
    }
    if !driver.core.state().is_terminal() {
        driver.apply(SessionEvent::Closed).await;
    }
}

/// Multiplex relay frames, user commands, heartbeats and shutdown.
async fn run_connected<T: Transport>(
    session: &mut RelaySession<T>,
    driver: &mut Driver,
    cmd_rx: &mut mpsc::UnboundedReceiver<Command>,
    shutdown_rx: &mut oneshot::Receiver<()>,
) -> SessionEnd {
    loop {
        let deadline = session.deadline();
        tokio::select! {
            _ = &mut *shutdown_rx => {
                debug!("shutdown signal received");
                return SessionEnd::Shutdown;
            }

            cmd = cmd_rx.recv() => {
                let Some(cmd) = cmd else {
                    debug!("command channel closed, shutting down session loop");
                    return SessionEnd::Shutdown;
                };
                if let Some(outgoing) = driver.command(cmd).await {
                    if let Err(e) = session.emit(&outgoing).await {
                        return SessionEnd::Dropped(format!("transport send error: {e}"));
                    }
                }
            }

            frame = session.recv_frame() => {
                match frame {
                    Some(Ok(text)) => match session.handle_frame(&text).await {
                        Ok(Inbound::Event(event)) => {
                            driver.apply(SessionEvent::Relay(event)).await;
                        }
                        Ok(Inbound::Ignored) => {}
                        Ok(Inbound::Closed) => {
                            return SessionEnd::Dropped("relay closed the session".into());
                        }
                        Err(e) => return SessionEnd::Dropped(format!("transport send error: {e}")),
                    },
                    Some(Err(e)) => {
                        return SessionEnd::Dropped(format!("transport receive error: {e}"));
                    }
                    None => return SessionEnd::Dropped("transport closed".into()),
                }
            }

            () = tokio::time::sleep_until(deadline) => {
                return SessionEnd::Dropped("heartbeat timeout".into());
            }
        }
    }
}

/// Wait out a reconnection delay while still serving user commands.
///
/// Returns `false` if the loop should exit instead of retrying.
async fn backoff(
    delay: Duration,
    driver: &mut Driver,
    cmd_rx: &mut mpsc::UnboundedReceiver<Command>,
    shutdown_rx: &mut oneshot::Receiver<()>,
) -> bool {
    debug!(?delay, "waiting before reconnecting");
    let sleep = tokio::time::sleep(delay);
    tokio::pin!(sleep);
    loop {
        tokio::select! {
            _ = &mut *shutdown_rx => {
                driver.apply(SessionEvent::Closed).await;
                return false;
            }
            cmd = cmd_rx.recv() => match cmd {
                Some(cmd) => offline_command(driver, cmd).await,
                None => {
                    driver.apply(SessionEvent::Closed).await;
                    return false;
                }
            },
            () = &mut sleep => return true,
        }
    }
}

/// Apply a command while no session exists. Outgoing events are dropped:
/// sends are fire-and-forget and the handshake is never due offline.
async fn offline_command(driver: &mut Driver, cmd: Command) {
    if let Some(outgoing) = driver.command(cmd).await {
        debug!(event = outgoing.name(), "not connected, outgoing event dropped");
    }
}

/// Connect and handshake under one deadline while serving commands.
///
/// The transport is owned here from the moment the connector returns it, so
/// a failed handshake or a shutdown closes it before returning.
async fn open_session<C: Connector>(
    connector: &C,
    timeout: Duration,
    driver: &mut Driver,
    cmd_rx: &mut mpsc::UnboundedReceiver<Command>,
    shutdown_rx: &mut oneshot::Receiver<()>,
) -> Opened<C::Transport> {
    let deadline = tokio::time::Instant::now() + timeout;

    let connected = {
        let connect = tokio::time::timeout_at(deadline, connector.connect());
        tokio::pin!(connect);
        loop {
            tokio::select! {
                _ = &mut *shutdown_rx => return Opened::Shutdown,
                cmd = cmd_rx.recv() => match cmd {
                    Some(cmd) => offline_command(driver, cmd).await,
                    None => return Opened::Shutdown,
                },
                result = &mut connect => break result,
            }
        }
    };
    let mut transport = match connected {
        Ok(Ok(transport)) => transport,
        Ok(Err(e)) => return Opened::Failed(e),
        Err(_) => return Opened::Failed(ChatError::Timeout),
    };

    let negotiated = {
        let negotiate = tokio::time::timeout_at(deadline, session::negotiate(&mut transport));
        tokio::pin!(negotiate);
        loop {
            tokio::select! {
                _ = &mut *shutdown_rx => break None,
                cmd = cmd_rx.recv() => match cmd {
                    Some(cmd) => offline_command(driver, cmd).await,
                    None => break None,
                },
                result = &mut negotiate => break Some(result),
            }
        }
    };

    match negotiated {
        Some(Ok(Ok((handshake, socket_id)))) => {
            Opened::Session(RelaySession::established(transport, handshake, socket_id))
        }
        Some(Ok(Err(e))) => {
            close_transport(transport).await;
            Opened::Failed(e)
        }
        Some(Err(_)) => {
            close_transport(transport).await;
            Opened::Failed(ChatError::Timeout)
        }
        None => {
            close_transport(transport).await;
            Opened::Shutdown
        }
    }
}

async fn close_transport<T: Transport>(mut transport: T) {
    if let Err(e) = transport.close().await {
        debug!("transport close failed: {e}");
    }
}

/// Emit an event to the event channel. If the channel is full, log a warning
/// and drop the event to avoid blocking the session loop.
fn emit_event(event_tx: &mpsc::Sender<ChatEvent>, event: ChatEvent) {
    match event_tx.try_send(event) {
        Ok(()) => {}
        Err(mpsc::error::TrySendError::Full(dropped)) => {
            warn!("event channel full, dropping event: {dropped:?}");
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {
            debug!("event channel closed, receiver dropped");
        }
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

    #[test]
    fn config_defaults() {
        let config = ChatConfig::new();
        assert!(config.display_name.is_none());
        assert!(config.reannounce_on_reconnect);
        assert_eq!(config.echo_policy, EchoPolicy::ExcludesSender);
        assert_eq!(config.reconnect.max_attempts, 5);
        assert_eq!(config.event_channel_capacity, 256);
        assert_eq!(config.connect_timeout, Duration::from_secs(20));
        assert_eq!(config.shutdown_timeout, Duration::from_secs(1));
    }

    #[test]
    fn event_channel_capacity_is_clamped_to_one() {
        let config = ChatConfig::new().with_event_channel_capacity(0);
        assert_eq!(config.event_channel_capacity, 1);
    }

    #[test]
    fn builder_methods() {
        let config = ChatConfig::new()
            .with_display_name("Ana")
            .with_reconnect(ReconnectPolicy::disabled())
            .with_reannounce_on_reconnect(false)
            .with_connect_timeout(Duration::from_secs(3));
        assert_eq!(config.display_name.as_deref(), Some("Ana"));
        assert!(!config.reconnect.enabled);
        assert!(!config.reannounce_on_reconnect);
        assert_eq!(config.connect_timeout, Duration::from_secs(3));
    }
}
