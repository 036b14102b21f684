//! Events flowing into and out of the chat core.
//!
//! [`SessionEvent`]s are produced by the session loop from transport activity
//! and consumed by [`ChatCore`](crate::chat::ChatCore). [`ChatEvent`]s are
//! emitted to the application on the channel returned by
//! [`ChatClient::start`](crate::client::ChatClient::start).

use crate::log::ChatEntry;
use crate::protocol::RelayEvent;
use crate::supervisor::ConnectionState;

/// Transport lifecycle and inbound traffic, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The first connection attempt started.
    Connecting,
    /// A relay session was established (initially or after a drop).
    Connected,
    /// The session was lost. `will_retry` is `true` when reconnection
    /// attempts remain.
    Disconnected {
        /// Whether the transport will reconnect on its own.
        will_retry: bool,
    },
    /// Every reconnection attempt failed.
    ReconnectExhausted {
        /// Attempts made during the final outage.
        attempts: u32,
    },
    /// The session was shut down locally.
    Closed,
    /// A named event from the relay.
    Relay(RelayEvent),
}

/// Observable changes for the rendering layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    /// The connection state changed.
    StateChanged(ConnectionState),
    /// An entry was appended to the log.
    EntryAppended(ChatEntry),
}
