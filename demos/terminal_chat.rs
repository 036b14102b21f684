//! # Terminal Chat Demo
//!
//! A line-oriented chat participant:
//!
//! 1. Pick a display name (from `RELAY_CHAT_NAME` or the first input line)
//! 2. Connect to a Socket.IO chat relay over WebSocket
//! 3. Print every log entry as it is appended
//! 4. Send each further input line as a chat message
//! 5. Shut down gracefully on Ctrl+C, end of input, or connection failure
//!
//! ## Running
//!
//! ```sh
//! # Start a chat relay on localhost:8000, then:
//! cargo run --example terminal_chat
//!
//! # Override the relay URL and skip the name prompt:
//! RELAY_CHAT_URL=https://chat.example.com RELAY_CHAT_NAME=Ana cargo run --example terminal_chat
//! ```

use relay_chat_client::notify::{LogNotifier, TerminalBell};
use relay_chat_client::{
    ChatClient, ChatConfig, ChatEvent, ConnectionState, NotificationDispatcher,
};
use tokio::io::{AsyncBufReadExt, BufReader};

/// Default relay URL when `RELAY_CHAT_URL` is not set.
const DEFAULT_URL: &str = "http://localhost:8000";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // ── Logging ─────────────────────────────────────────────────────
    // Set `RUST_LOG=debug` for verbose output.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // ── Configuration ───────────────────────────────────────────────
    let url = std::env::var("RELAY_CHAT_URL").unwrap_or_else(|_| DEFAULT_URL.to_string());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    let mut config = ChatConfig::new();
    match std::env::var("RELAY_CHAT_NAME") {
        Ok(name) if !name.trim().is_empty() => config = config.with_display_name(name),
        _ => println!("Enter your name to join:"),
    }
    let mut named = config.display_name.is_some();

    // ── Connect ─────────────────────────────────────────────────────
    tracing::info!("Connecting to {url}");
    let dispatcher = NotificationDispatcher::new(LogNotifier, TerminalBell);
    let (mut client, mut event_rx) = ChatClient::connect(&url, config, dispatcher);

    // ── Event loop ──────────────────────────────────────────────────
    loop {
        tokio::select! {
            event = event_rx.recv() => {
                let Some(event) = event else {
                    tracing::info!("Event channel closed, exiting");
                    break;
                };

                match event {
                    ChatEvent::EntryAppended(entry) => {
                        println!("{}: {}", entry.author_label(), entry.body());
                    }
                    ChatEvent::StateChanged(ConnectionState::Failed) => {
                        eprintln!("Unable to reach the relay. Giving up.");
                        break;
                    }
                    ChatEvent::StateChanged(state) => {
                        tracing::info!(?state, "connection state");
                    }
                }
            }

            line = lines.next_line() => {
                let Some(line) = line? else {
                    tracing::info!("End of input, shutting down");
                    break;
                };

                let result = if named {
                    client.send_message(&line)
                } else {
                    client.set_display_name(&line).map(|()| named = true)
                };
                if let Err(e) = result {
                    eprintln!("{e}");
                }
            }

            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Ctrl+C received, shutting down");
                break;
            }
        }
    }

    client.shutdown().await;
    Ok(())
}
