//! Turns relay presence events into system log entries.
//!
//! The tracker keeps no roster and does no deduplication: every join or leave
//! produces exactly one entry.

use tracing::debug;

use crate::log::{ChatEntry, MessageLog};

/// Stateless translator from presence events to [`ChatEntry::system`] lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct PresenceTracker;

impl PresenceTracker {
    /// The entry recorded when `name` joins.
    pub fn joined_entry(name: &str) -> ChatEntry {
        ChatEntry::system(format!("{name} has joined the chat!"))
    }

    /// The entry recorded when `name` leaves.
    pub fn left_entry(name: &str) -> ChatEntry {
        ChatEntry::system(format!("{name} has left the chat."))
    }

    /// Record a join.
    pub fn on_joined(&self, log: &mut MessageLog, name: &str) {
        debug!(%name, "participant joined");
        log.append_system(Self::joined_entry(name));
    }

    /// Record a leave.
    pub fn on_left(&self, log: &mut MessageLog, name: &str) {
        debug!(%name, "participant left");
        log.append_system(Self::left_entry(name));
    }
}
