//! Transport implementations for the relay connection.
//!
//! | Feature                | Transport / connector                             |
//! |------------------------|---------------------------------------------------|
//! | `transport-websocket`  | [`WebSocketTransport`], [`WebSocketConnector`]    |
//!
//! # Example
//!
//! ```rust,ignore
//! use relay_chat_client::{Connector, Transport, WebSocketConnector};
//!
//! let connector = WebSocketConnector::new("https://relay.example.com");
//! let mut ws = connector.connect().await?;
//! if let Some(Ok(frame)) = ws.recv().await {
//!     println!("relay said: {frame}");
//! }
//! ws.close().await?;
//! ```

#[cfg(feature = "transport-websocket")]
pub mod websocket;

#[cfg(feature = "transport-websocket")]
pub use websocket::{WebSocketConnector, WebSocketTransport};
