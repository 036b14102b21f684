//! Error types for the relay chat client.

use thiserror::Error;

use crate::supervisor::ConnectionState;

/// Errors that can occur when using the relay chat client.
#[derive(Debug, Error)]
pub enum ChatError {
    /// Failed to send a frame through the transport.
    #[error("transport send error: {0}")]
    TransportSend(String),

    /// Failed to receive a frame from the transport.
    #[error("transport receive error: {0}")]
    TransportReceive(String),

    /// The transport connection was closed unexpectedly.
    #[error("transport connection closed")]
    TransportClosed,

    /// Failed to serialize or deserialize an event payload.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A frame did not follow the relay's packet framing.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The relay refused the namespace connection.
    #[error("relay rejected connection: {0}")]
    ConnectRejected(String),

    /// A connection state change that the lifecycle does not allow.
    #[error("invalid connection state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        /// State before the rejected transition.
        from: ConnectionState,
        /// Requested target state.
        to: ConnectionState,
    },

    /// Outgoing chat text was empty or whitespace-only.
    #[error("message body is empty")]
    EmptyMessage,

    /// The submitted display name was empty or whitespace-only.
    #[error("display name is empty")]
    EmptyDisplayName,

    /// A local message was submitted before any display name was set.
    #[error("no display name set")]
    NoDisplayName,

    /// A display name was already set for this session.
    #[error("display name already set to {0:?}")]
    IdentityAlreadySet(String),

    /// The client task has stopped; no further commands are accepted.
    #[error("client is closed")]
    ClientClosed,

    /// The desktop notification or sound capability reported a failure.
    #[error("notification error: {0}")]
    Notification(String),

    /// An operation timed out.
    #[error("operation timed out")]
    Timeout,

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized [`Result`] type for relay chat client operations.
pub type Result<T> = std::result::Result<T, ChatError>;
