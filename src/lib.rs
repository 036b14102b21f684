//! # Relay Chat Client
//!
//! Participant-side core of a relay-based realtime chat room.
//!
//! A [`ChatClient`] keeps one session to a Socket.IO chat relay, announces the
//! participant's display name once per connection, keeps an append-only
//! message log with optimistic local echo, turns presence broadcasts into
//! system lines and raises sounds and desktop notifications for remote
//! messages.
//!
//! ## Features
//!
//! - **Transport-agnostic**: implement [`Transport`] and [`Connector`] for any backend
//! - **WebSocket built-in**: the default `transport-websocket` feature provides [`WebSocketConnector`]
//! - **Sans-IO core**: [`ChatCore`](chat::ChatCore) can be driven without a runtime
//! - **Event-driven**: receive [`ChatEvent`]s via a channel, or read the log through a [`LogView`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use relay_chat_client::{ChatClient, ChatConfig, ChatEvent, NotificationDispatcher};
//!
//! # async fn run() -> Result<(), relay_chat_client::ChatError> {
//! let config = ChatConfig::new().with_display_name("Ana");
//! let (mut client, mut events) =
//!     ChatClient::connect("http://localhost:8000", config, NotificationDispatcher::default());
//!
//! client.send_message("hello")?;
//!
//! while let Some(event) = events.recv().await {
//!     if let ChatEvent::EntryAppended(entry) = event {
//!         println!("{}: {}", entry.author_label(), entry.body());
//!     }
//! }
//! client.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod chat;
pub mod client;
pub mod error;
pub mod event;
pub mod framing;
pub mod log;
pub mod notify;
pub mod presence;
pub mod protocol;
pub mod session;
pub mod supervisor;
pub mod transport;
pub mod transports;

// Re-export primary types for ergonomic imports.
pub use client::{ChatClient, ChatConfig};
pub use error::ChatError;
pub use event::{ChatEvent, SessionEvent};
pub use log::{ChatEntry, EchoPolicy, EntryKind, LogView};
pub use notify::{NotificationDispatcher, Permission};
pub use protocol::{ClientEvent, RelayEvent};
pub use session::ReconnectPolicy;
pub use supervisor::ConnectionState;
pub use transport::{Connector, Transport};

#[cfg(feature = "transport-websocket")]
pub use transports::{WebSocketConnector, WebSocketTransport};
