//! The synchronous chat core.
//!
//! [`ChatCore`] wires the [`ConnectionSupervisor`], [`PresenceTracker`],
//! [`MessageLog`] and [`NotificationDispatcher`] together. It performs no I/O:
//! callers feed it [`SessionEvent`]s and user actions one at a time and put
//! the returned [`ClientEvent`]s on the wire. Because every mutation goes
//! through `&mut self`, the single-consumer ordering of the session loop is
//! the only ordering there is.

use tracing::{debug, warn};

use crate::error::{ChatError, Result};
use crate::event::SessionEvent;
use crate::log::{validate_body, EchoPolicy, LogView, MessageLog};
use crate::notify::{NotificationDispatcher, Permission};
use crate::presence::PresenceTracker;
use crate::protocol::{ClientEvent, RelayEvent};
use crate::supervisor::{ConnectionState, ConnectionSupervisor};

/// All client-side chat state for one relay session.
#[derive(Debug)]
pub struct ChatCore {
    supervisor: ConnectionSupervisor,
    presence: PresenceTracker,
    log: MessageLog,
    dispatcher: NotificationDispatcher,
}

impl ChatCore {
    /// Assemble a core in the `Disconnected` state with an empty log.
    pub fn new(
        reannounce_on_reconnect: bool,
        echo_policy: EchoPolicy,
        dispatcher: NotificationDispatcher,
    ) -> Self {
        Self {
            supervisor: ConnectionSupervisor::new(reannounce_on_reconnect),
            presence: PresenceTracker,
            log: MessageLog::new(echo_policy),
            dispatcher,
        }
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.supervisor.state()
    }

    /// The connection supervisor.
    pub fn supervisor(&self) -> &ConnectionSupervisor {
        &self.supervisor
    }

    /// The message log.
    pub fn log(&self) -> &MessageLog {
        &self.log
    }

    /// A fresh read view over the log.
    pub fn subscribe(&self) -> LogView {
        self.log.subscribe()
    }

    /// The notification dispatcher.
    pub fn dispatcher(&self) -> &NotificationDispatcher {
        &self.dispatcher
    }

    /// Resolve notification permission. Call once at startup.
    pub fn request_notification_permission(&mut self) -> Permission {
        self.dispatcher.request_permission_once()
    }

    /// Apply one session event. Returns the handshake when a connect makes
    /// it due.
    ///
    /// Lifecycle notifications the state machine rejects are logged and
    /// dropped.
    pub fn handle_session_event(&mut self, event: SessionEvent) -> Option<ClientEvent> {
        let result = match event {
            SessionEvent::Connecting => self.supervisor.on_connecting().map(|()| None),
            SessionEvent::Connected => self.supervisor.on_connected(),
            SessionEvent::Disconnected { will_retry } => {
                self.supervisor.on_disconnected(will_retry).map(|()| None)
            }
            SessionEvent::ReconnectExhausted { attempts } => {
                warn!(attempts, "relay unreachable, giving up");
                self.supervisor.on_reconnect_exhausted().map(|()| None)
            }
            SessionEvent::Closed => self.supervisor.on_closed().map(|()| None),
            SessionEvent::Relay(event) => {
                self.handle_relay_event(event);
                Ok(None)
            }
        };

        result.unwrap_or_else(|e| {
            debug!("ignored session event: {e}");
            None
        })
    }

    /// Record the user's display name; returns the handshake if the session
    /// is already up.
    ///
    /// # Errors
    ///
    /// See [`ConnectionSupervisor::set_display_name`].
    pub fn set_display_name(&mut self, name: &str) -> Result<Option<ClientEvent>> {
        self.supervisor.set_display_name(name)
    }

    /// Optimistically append a local message and return the `send` event.
    ///
    /// The connection state is not consulted: the send is fire-and-forget.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::EmptyMessage`] for blank text and
    /// [`ChatError::NoDisplayName`] before onboarding completed. Neither
    /// appends nor produces an event.
    pub fn append_local(&mut self, body: &str) -> Result<ClientEvent> {
        validate_body(body)?;
        let name = self
            .supervisor
            .display_name()
            .ok_or(ChatError::NoDisplayName)?;
        self.log.append_local(name, body)
    }

    /// Append a relay broadcast and notify on it.
    pub fn append_remote(&mut self, name: &str, body: &str) {
        if let Some(entry) = self.log.append_remote(name, body) {
            self.dispatcher.on_remote_entry(&entry);
        }
    }

    fn handle_relay_event(&mut self, event: RelayEvent) {
        match event {
            RelayEvent::ParticipantJoined { name } => self.presence.on_joined(&mut self.log, &name),
            RelayEvent::ParticipantLeft { name } => self.presence.on_left(&mut self.log, &name),
            RelayEvent::MessageReceived(msg) => self.append_remote(&msg.name, &msg.message),
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
    use crate::log::ChatEntry;
    use crate::notify::{NotificationPlatform, SoundPlayer};
    use crate::protocol::ReceivedMessage;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingSound(Arc<AtomicUsize>);

    impl SoundPlayer for CountingSound {
        fn play(&mut self) -> Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct Granted;

    impl NotificationPlatform for Granted {
        fn permission(&self) -> Permission {
            Permission::Granted
        }
        fn request_permission(&mut self) -> Permission {
            Permission::Granted
        }
        fn show(&mut self, _title: &str, _body: &str) -> Result<()> {
            Ok(())
        }
    }

    fn core(echo_policy: EchoPolicy) -> (ChatCore, Arc<AtomicUsize>) {
        let plays = Arc::new(AtomicUsize::new(0));
        let dispatcher = NotificationDispatcher::new(Granted, CountingSound(Arc::clone(&plays)));
        let mut core = ChatCore::new(true, echo_policy, dispatcher);
        core.request_notification_permission();
        (core, plays)
    }

    fn received(name: &str, message: &str) -> SessionEvent {
        SessionEvent::Relay(RelayEvent::MessageReceived(ReceivedMessage {
            name: name.into(),
            message: message.into(),
        }))
    }

    #[test]
    fn ana_and_ben_scenario() {
        let (mut core, plays) = core(EchoPolicy::ExcludesSender);
        core.set_display_name("Ana").unwrap();
        assert_eq!(core.handle_session_event(SessionEvent::Connecting), None);
        assert_eq!(
            core.handle_session_event(SessionEvent::Connected),
            Some(ClientEvent::IdentityAnnounce {
                display_name: "Ana".into()
            })
        );

        assert_eq!(
            core.append_local("hello").unwrap(),
            ClientEvent::Send {
                body: "hello".into()
            }
        );
        assert_eq!(core.log().entries(), vec![ChatEntry::user("Ana", "hello")]);

        core.handle_session_event(SessionEvent::Relay(RelayEvent::ParticipantJoined {
            name: "Ben".into(),
        }));
        core.handle_session_event(received("Ben", "hi"));

        assert_eq!(
            core.log().entries(),
            vec![
                ChatEntry::user("Ana", "hello"),
                ChatEntry::system("Ben has joined the chat!"),
                ChatEntry::user("Ben", "hi"),
            ]
        );
        assert_eq!(plays.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn n_remote_messages_append_n_entries_in_order() {
        let (mut core, plays) = core(EchoPolicy::ExcludesSender);
        core.handle_session_event(SessionEvent::Connecting);
        core.handle_session_event(SessionEvent::Connected);

        for i in 0..25 {
            core.handle_session_event(received("Ben", &format!("msg {i}")));
        }

        let entries = core.log().entries();
        assert_eq!(entries.len(), 25);
        for (i, entry) in entries.iter().enumerate() {
            assert_eq!(entry.body(), format!("msg {i}"));
        }
        assert_eq!(plays.load(Ordering::SeqCst), 25);
    }

    #[test]
    fn local_send_needs_no_connection() {
        let (mut core, plays) = core(EchoPolicy::ExcludesSender);
        core.set_display_name("Ana").unwrap();
        assert_eq!(core.state(), ConnectionState::Disconnected);
        core.append_local("hi").unwrap();
        assert_eq!(core.log().len(), 1);
        assert_eq!(plays.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn blank_local_send_changes_nothing() {
        let (mut core, _plays) = core(EchoPolicy::ExcludesSender);
        core.set_display_name("Ana").unwrap();
        assert!(matches!(core.append_local(""), Err(ChatError::EmptyMessage)));
        assert!(matches!(
            core.append_local("   "),
            Err(ChatError::EmptyMessage)
        ));
        assert!(core.log().is_empty());
    }

    #[test]
    fn local_send_before_onboarding_is_rejected() {
        let (mut core, _plays) = core(EchoPolicy::ExcludesSender);
        assert!(matches!(
            core.append_local("hi"),
            Err(ChatError::NoDisplayName)
        ));
        assert!(core.log().is_empty());
    }

    #[test]
    fn relay_echo_excluded_policy_duplicates_own_message() {
        let (mut core, plays) = core(EchoPolicy::ExcludesSender);
        core.set_display_name("Ana").unwrap();
        core.append_local("hello").unwrap();
        core.handle_session_event(received("Ana", "hello"));
        assert_eq!(core.log().len(), 2);
        assert_eq!(plays.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn relay_echo_to_sender_policy_confirms_without_notifying() {
        let (mut core, plays) = core(EchoPolicy::EchoesToSender);
        core.set_display_name("Ana").unwrap();
        core.append_local("hello").unwrap();
        core.handle_session_event(received("Ana", "hello"));
        core.handle_session_event(received("Ben", "hello"));
        assert_eq!(
            core.log().entries(),
            vec![ChatEntry::user("Ana", "hello"), ChatEntry::user("Ben", "hello")]
        );
        assert_eq!(plays.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn events_after_failure_do_not_revive_the_session() {
        let (mut core, _plays) = core(EchoPolicy::ExcludesSender);
        core.set_display_name("Ana").unwrap();
        core.handle_session_event(SessionEvent::Connecting);
        core.handle_session_event(SessionEvent::Connected);
        core.handle_session_event(SessionEvent::Disconnected { will_retry: true });
        core.handle_session_event(SessionEvent::ReconnectExhausted { attempts: 5 });
        assert_eq!(core.state(), ConnectionState::Failed);

        assert_eq!(core.handle_session_event(SessionEvent::Connected), None);
        assert_eq!(core.handle_session_event(SessionEvent::Closed), None);
        assert_eq!(core.state(), ConnectionState::Failed);
    }
}
