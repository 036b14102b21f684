//! Transport abstraction for the relay connection.
//!
//! The [`Transport`] trait defines a bidirectional text frame channel between
//! the client and the relay. Every frame is one Engine.IO packet (see
//! [`framing`](crate::framing)); transports only shuttle the text.
//!
//! # Connection Setup
//!
//! Opening a transport is the job of a [`Connector`]. The client calls
//! [`Connector::connect`] once for the initial connection and once per
//! reconnection attempt, so a connector must be reusable.
//!
//! # Implementing a Custom Transport
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use relay_chat_client::error::ChatError;
//! use relay_chat_client::transport::Transport;
//!
//! struct MyTransport { /* ... */ }
//!
//! #[async_trait]
//! impl Transport for MyTransport {
//!     async fn send(&mut self, frame: String) -> Result<(), ChatError> {
//!         // Write the text frame to the connection
//!         # let _ = frame;
//!         Ok(())
//!     }
//!
//!     async fn recv(&mut self) -> Option<Result<String, ChatError>> {
//!         // Return the next text frame, or None once the relay hung up
//!         None
//!     }
//!
//!     async fn close(&mut self) -> Result<(), ChatError> {
//!         Ok(())
//!     }
//! }
//! ```

use async_trait::async_trait;

use crate::error::ChatError;

/// A bidirectional text frame transport to the relay.
///
/// # Cancel Safety
///
/// The [`recv`](Transport::recv) method **MUST** be cancel-safe because it is used
/// inside `tokio::select!`. If `recv` is cancelled before completion, calling it
/// again must not lose data.
#[async_trait]
pub trait Transport: Send + 'static {
    /// Send one text frame to the relay.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::TransportSend`] if the frame could not be written.
    async fn send(&mut self, frame: String) -> Result<(), ChatError>;

    /// Receive the next text frame from the relay.
    ///
    /// Returns:
    /// - `Some(Ok(text))`: a complete frame was received
    /// - `Some(Err(e))`: a transport error occurred
    /// - `None`: the relay closed the connection
    async fn recv(&mut self) -> Option<Result<String, ChatError>>;

    /// Close the transport connection gracefully.
    ///
    /// # Errors
    ///
    /// Returns an error if the close handshake fails. Implementations must
    /// still release their resources in that case.
    async fn close(&mut self) -> Result<(), ChatError>;
}

#[async_trait]
impl Transport for Box<dyn Transport> {
    async fn send(&mut self, frame: String) -> Result<(), ChatError> {
        (**self).send(frame).await
    }

    async fn recv(&mut self) -> Option<Result<String, ChatError>> {
        (**self).recv().await
    }

    async fn close(&mut self) -> Result<(), ChatError> {
        (**self).close().await
    }
}

/// Opens transports to a fixed relay endpoint.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// The transport produced by a successful connection.
    type Transport: Transport;

    /// Open a fresh transport. Called once per connection attempt.
    ///
    /// # Errors
    ///
    /// Any error fails the current attempt; the client decides whether to retry.
    async fn connect(&self) -> Result<Self::Transport, ChatError>;
}
