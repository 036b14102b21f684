//! The append-only chat log and its read views.
//!
//! [`MessageLog`] merges three write paths into one arrival-ordered sequence:
//! optimistic local echoes, relay broadcasts and synthetic presence entries.
//! Entries never move or change once appended. Readers hold a [`LogView`],
//! which shares the storage and is woken on every append.

use std::collections::VecDeque;
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::watch;
use tracing::debug;

use crate::error::{ChatError, Result};
use crate::protocol::ClientEvent;

/// Author label of presence-derived entries.
pub const SYSTEM_AUTHOR: &str = "System";

/// Unconfirmed local echoes remembered under [`EchoPolicy::EchoesToSender`].
const MAX_PENDING_ECHOES: usize = 256;

/// Whether an entry was typed by a participant or synthesized from presence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// Authored by a participant (local or remote).
    User,
    /// Synthesized from a presence event.
    System,
}

/// One immutable line of the chat log.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChatEntry {
    author_label: String,
    body: String,
    kind: EntryKind,
}

impl ChatEntry {
    /// A participant-authored entry.
    pub fn user(author_label: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            author_label: author_label.into(),
            body: body.into(),
            kind: EntryKind::User,
        }
    }

    /// A presence entry labelled [`SYSTEM_AUTHOR`].
    pub fn system(body: impl Into<String>) -> Self {
        Self {
            author_label: SYSTEM_AUTHOR.to_owned(),
            body: body.into(),
            kind: EntryKind::System,
        }
    }

    /// Who wrote the entry.
    pub fn author_label(&self) -> &str {
        &self.author_label
    }

    /// The entry text.
    pub fn body(&self) -> &str {
        &self.body
    }

    /// User or system.
    pub fn kind(&self) -> EntryKind {
        self.kind
    }
}

/// How the relay treats the sender of a `send` event.
///
/// Local messages are always echoed into the log immediately. This policy
/// decides what happens when the relay's broadcast of that same message comes
/// back to this client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EchoPolicy {
    /// The relay broadcasts to everyone but the sender. Every received
    /// message is appended.
    #[default]
    ExcludesSender,
    /// The relay broadcasts to the sender too. A received message matching an
    /// unconfirmed local echo (same author and body) confirms it and is not
    /// appended again.
    EchoesToSender,
}

/// Reject empty or whitespace-only outgoing text.
///
/// # Errors
///
/// Returns [`ChatError::EmptyMessage`] for blank input.
pub fn validate_body(body: &str) -> Result<()> {
    if body.trim().is_empty() {
        return Err(ChatError::EmptyMessage);
    }
    Ok(())
}

type Entries = Arc<RwLock<Vec<ChatEntry>>>;

/// The ordered, append-only session log.
#[derive(Debug)]
pub struct MessageLog {
    entries: Entries,
    len_tx: watch::Sender<usize>,
    echo_policy: EchoPolicy,
    pending_echoes: VecDeque<ChatEntry>,
}

impl Default for MessageLog {
    fn default() -> Self {
        Self::new(EchoPolicy::default())
    }
}

impl MessageLog {
    /// Create an empty log.
    pub fn new(echo_policy: EchoPolicy) -> Self {
        let (len_tx, _) = watch::channel(0);
        Self {
            entries: Arc::new(RwLock::new(Vec::new())),
            len_tx,
            echo_policy,
            pending_echoes: VecDeque::new(),
        }
    }

    /// The configured echo policy.
    pub fn echo_policy(&self) -> EchoPolicy {
        self.echo_policy
    }

    /// Number of entries appended so far.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// `true` before the first append.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A copy of every entry in arrival order.
    pub fn entries(&self) -> Vec<ChatEntry> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// A new read view positioned at the start of the log.
    pub fn subscribe(&self) -> LogView {
        LogView {
            entries: Arc::clone(&self.entries),
            len_rx: self.len_tx.subscribe(),
            cursor: 0,
        }
    }

    /// Optimistically append the local user's message.
    ///
    /// Returns the `send` event the caller must hand to the transport. The
    /// entry is appended whether or not that send ever reaches the relay.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::EmptyMessage`] for blank text; nothing is appended
    /// and no event is produced.
    pub fn append_local(&mut self, display_name: &str, body: &str) -> Result<ClientEvent> {
        validate_body(body)?;
        let entry = ChatEntry::user(display_name, body);
        if self.echo_policy == EchoPolicy::EchoesToSender {
            if self.pending_echoes.len() >= MAX_PENDING_ECHOES {
                self.pending_echoes.pop_front();
            }
            self.pending_echoes.push_back(entry.clone());
        }
        self.push(entry);
        Ok(ClientEvent::Send {
            body: body.to_owned(),
        })
    }

    /// Append a message broadcast by the relay.
    ///
    /// Returns the appended entry so the caller can notify on it, or `None`
    /// when the message only confirmed a local echo.
    pub fn append_remote(&mut self, name: &str, body: &str) -> Option<ChatEntry> {
        let entry = ChatEntry::user(name, body);
        if self.echo_policy == EchoPolicy::EchoesToSender {
            if let Some(pos) = self.pending_echoes.iter().position(|p| *p == entry) {
                self.pending_echoes.remove(pos);
                debug!(author = %name, "relay confirmed local echo");
                return None;
            }
        }
        self.push(entry.clone());
        Some(entry)
    }

    /// Append a synthetic presence entry.
    pub fn append_system(&mut self, entry: ChatEntry) {
        self.push(entry);
    }

    fn push(&mut self, entry: ChatEntry) {
        let len = {
            let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
            entries.push(entry);
            entries.len()
        };
        self.len_tx.send_replace(len);
    }
}

/// A read-only, restartable cursor over a [`MessageLog`].
///
/// Cloning a view copies its cursor; each clone advances independently.
#[derive(Debug, Clone)]
pub struct LogView {
    entries: Entries,
    len_rx: watch::Receiver<usize>,
    cursor: usize,
}

impl LogView {
    /// Current log length.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// `true` while the log is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A snapshot of the whole log.
    pub fn entries(&self) -> Vec<ChatEntry> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// How many entries this view has consumed.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Rewind to the start so the next batch replays the whole log.
    pub fn restart(&mut self) {
        self.cursor = 0;
    }

    /// Entries appended since the last batch, advancing the cursor.
    pub fn next_batch(&mut self) -> Vec<ChatEntry> {
        let batch: Vec<ChatEntry> = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .skip(self.cursor)
            .cloned()
            .collect();
        self.cursor = self.cursor.saturating_add(batch.len());
        batch
    }

    /// Wait until unseen entries exist and return them.
    ///
    /// Returns `None` once the log is gone and every entry was consumed.
    pub async fn next_entries(&mut self) -> Option<Vec<ChatEntry>> {
        loop {
            let batch = self.next_batch();
            if !batch.is_empty() {
                return Some(batch);
            }
            if self.len_rx.changed().await.is_err() {
                let batch = self.next_batch();
                return (!batch.is_empty()).then_some(batch);
            }
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
    fn blank_local_text_is_rejected_without_mutation() {
        let mut log = MessageLog::default();
        for body in ["", "   ", "\n\t"] {
            assert!(matches!(
                log.append_local("Ana", body),
                Err(ChatError::EmptyMessage)
            ));
        }
        assert!(log.is_empty());
    }

    #[test]
    fn local_append_returns_send_event_and_keeps_text() {
        let mut log = MessageLog::default();
        let event = log.append_local("Ana", " hi ").unwrap();
        assert_eq!(event, ClientEvent::Send { body: " hi ".into() });
        assert_eq!(log.entries(), vec![ChatEntry::user("Ana", " hi ")]);
    }

    #[test]
    fn excludes_sender_policy_appends_every_broadcast() {
        let mut log = MessageLog::new(EchoPolicy::ExcludesSender);
        log.append_local("Ana", "hello").unwrap();
        let appended = log.append_remote("Ana", "hello");
        assert_eq!(appended, Some(ChatEntry::user("Ana", "hello")));
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn echoes_to_sender_policy_absorbs_own_broadcast_once() {
        let mut log = MessageLog::new(EchoPolicy::EchoesToSender);
        log.append_local("Ana", "hello").unwrap();
        log.append_local("Ana", "hello").unwrap();

        assert_eq!(log.append_remote("Ana", "hello"), None);
        assert_eq!(log.append_remote("Ana", "hello"), None);
        // No pending echo left: a third broadcast is a new message.
        assert!(log.append_remote("Ana", "hello").is_some());
        // Other authors are never absorbed.
        assert!(log.append_remote("Ben", "hello").is_some());
        assert_eq!(log.len(), 4);
    }

    #[test]
    fn system_entries_use_sentinel_author() {
        let mut log = MessageLog::default();
        log.append_system(ChatEntry::system("Ben has joined the chat!"));
        let entry = &log.entries()[0];
        assert_eq!(entry.author_label(), SYSTEM_AUTHOR);
        assert_eq!(entry.kind(), EntryKind::System);
    }

    #[test]
    fn view_batches_and_restarts() {
        let mut log = MessageLog::default();
        let mut view = log.subscribe();
        log.append_remote("Ben", "one");
        log.append_remote("Ben", "two");

        assert_eq!(view.next_batch().len(), 2);
        assert!(view.next_batch().is_empty());
        log.append_remote("Ben", "three");
        assert_eq!(view.next_batch(), vec![ChatEntry::user("Ben", "three")]);

        view.restart();
        assert_eq!(view.next_batch().len(), 3);
        assert_eq!(view.cursor(), 3);
    }

    #[tokio::test]
    async fn view_wakes_on_append_and_ends_after_drop() {
        let mut log = MessageLog::default();
        let mut view = log.subscribe();

        let reader = tokio::spawn(async move {
            let mut seen = Vec::new();
            while let Some(batch) = view.next_entries().await {
                seen.extend(batch);
            }
            seen
        });

        tokio::task::yield_now().await;
        log.append_remote("Ben", "hi");
        log.append_system(ChatEntry::system("Ben has left the chat."));
        drop(log);

        let seen = reader.await.unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].body(), "hi");
    }

    #[test]
    fn view_is_pending_until_append() {
        let mut log = MessageLog::default();
        let mut view = log.subscribe();
        let mut next = tokio_test::task::spawn(view.next_entries());

        tokio_test::assert_pending!(next.poll());
        log.append_remote("Ben", "hi");
        assert!(next.is_woken());
        let batch = tokio_test::assert_ready!(next.poll());
        assert_eq!(batch, Some(vec![ChatEntry::user("Ben", "hi")]));
    }
}
