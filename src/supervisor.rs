//! Connection lifecycle state and the one-time identity handshake.
//!
//! [`ConnectionSupervisor`] is a plain state machine: the session loop feeds
//! it transport lifecycle notifications and it answers with the state change
//! plus, when due, the [`ClientEvent::IdentityAnnounce`] to put on the wire.
//!
//! ```text
//! Disconnected ──► Connecting ──► Connected ◄──► Reconnecting ──► Failed
//!       ▲              │              │               │
//!       └──────────────┴──────────────┴───────────────┘   (teardown / no retry)
//! ```

use tracing::{debug, info, warn};

use crate::error::{ChatError, Result};
use crate::protocol::ClientEvent;

/// Lifecycle state of the single relay session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    /// No session and none being attempted.
    #[default]
    Disconnected,
    /// The first connection attempt is in flight.
    Connecting,
    /// The relay session is up.
    Connected,
    /// The session dropped and the transport is retrying.
    Reconnecting,
    /// Reconnection attempts are exhausted. Terminal.
    Failed,
}

impl ConnectionState {
    /// Whether `self -> next` is a lifecycle edge.
    pub fn can_transition_to(self, next: ConnectionState) -> bool {
        use ConnectionState::*;
        matches!(
            (self, next),
            (Disconnected, Connecting)
                | (Connecting, Connected | Reconnecting | Failed | Disconnected)
                | (Connected, Reconnecting | Disconnected)
                | (Reconnecting, Connected | Failed | Disconnected)
        )
    }

    /// `true` once no further transition can happen.
    pub fn is_terminal(self) -> bool {
        self == ConnectionState::Failed
    }

    /// Whether a send is likely to reach the relay. Renderers use this to
    /// disable their send control.
    pub fn accepts_sends(self) -> bool {
        self == ConnectionState::Connected
    }
}

/// The local participant as announced to the relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantIdentity {
    display_name: String,
    established: bool,
}

impl ParticipantIdentity {
    /// The trimmed display name chosen by the user.
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Whether the handshake was sent in the current connection epoch.
    pub fn is_established(&self) -> bool {
        self.established
    }
}

/// Owns the [`ConnectionState`] and [`ParticipantIdentity`].
#[derive(Debug)]
pub struct ConnectionSupervisor {
    state: ConnectionState,
    identity: Option<ParticipantIdentity>,
    reannounce_on_reconnect: bool,
    epoch: u64,
}

impl ConnectionSupervisor {
    /// Create a supervisor in the `Disconnected` state.
    ///
    /// With `reannounce_on_reconnect` every successful reconnect starts a new
    /// epoch that repeats the handshake; without it the participant is
    /// announced at most once per supervisor.
    pub fn new(reannounce_on_reconnect: bool) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            identity: None,
            reannounce_on_reconnect,
            epoch: 0,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// The local identity, once a display name was submitted.
    pub fn identity(&self) -> Option<&ParticipantIdentity> {
        self.identity.as_ref()
    }

    /// Shorthand for the identity's display name.
    pub fn display_name(&self) -> Option<&str> {
        self.identity.as_ref().map(ParticipantIdentity::display_name)
    }

    /// Number of successful connections so far.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Move to `to`, returning the previous state.
    ///
    /// A request for the current state is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::InvalidTransition`] when the edge is not part of the
    /// lifecycle; the state is left unchanged.
    pub fn transition(&mut self, to: ConnectionState) -> Result<ConnectionState> {
        let from = self.state;
        if from == to {
            return Ok(from);
        }
        if !from.can_transition_to(to) {
            warn!(?from, ?to, "rejected connection state transition");
            return Err(ChatError::InvalidTransition { from, to });
        }
        self.state = to;
        debug!(?from, ?to, "connection state changed");
        Ok(from)
    }

    /// The transport started its first connection attempt.
    ///
    /// # Errors
    ///
    /// See [`transition`](Self::transition).
    pub fn on_connecting(&mut self) -> Result<()> {
        self.transition(ConnectionState::Connecting).map(drop)
    }

    /// The transport (re)connected. Begins a new epoch and returns the
    /// handshake if it is due.
    ///
    /// # Errors
    ///
    /// See [`transition`](Self::transition).
    pub fn on_connected(&mut self) -> Result<Option<ClientEvent>> {
        let from = self.transition(ConnectionState::Connected)?;
        if from == ConnectionState::Connected {
            return Ok(None);
        }

        self.epoch = self.epoch.saturating_add(1);
        if self.reannounce_on_reconnect {
            if let Some(identity) = self.identity.as_mut() {
                identity.established = false;
            }
        }
        info!(epoch = self.epoch, "connected to relay");
        Ok(self.try_handshake())
    }

    /// The transport lost the session. `will_retry` reports whether it will
    /// reconnect on its own.
    ///
    /// # Errors
    ///
    /// See [`transition`](Self::transition).
    pub fn on_disconnected(&mut self, will_retry: bool) -> Result<()> {
        let to = if will_retry {
            ConnectionState::Reconnecting
        } else {
            ConnectionState::Disconnected
        };
        self.transition(to).map(drop)
    }

    /// The transport gave up reconnecting.
    ///
    /// # Errors
    ///
    /// See [`transition`](Self::transition).
    pub fn on_reconnect_exhausted(&mut self) -> Result<()> {
        self.transition(ConnectionState::Failed).map(drop)
    }

    /// The session was torn down locally.
    ///
    /// # Errors
    ///
    /// Fails only when the state is already terminal.
    pub fn on_closed(&mut self) -> Result<()> {
        self.transition(ConnectionState::Disconnected).map(drop)
    }

    /// Record the user's display name. Returns the handshake when the session
    /// is already up; otherwise it is deferred to the next connect.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::EmptyDisplayName`] for a blank name and
    /// [`ChatError::IdentityAlreadySet`] if a name was set before.
    pub fn set_display_name(&mut self, name: &str) -> Result<Option<ClientEvent>> {
        if let Some(identity) = &self.identity {
            return Err(ChatError::IdentityAlreadySet(identity.display_name.clone()));
        }
        let name = name.trim();
        if name.is_empty() {
            return Err(ChatError::EmptyDisplayName);
        }
        self.identity = Some(ParticipantIdentity {
            display_name: name.to_owned(),
            established: false,
        });
        Ok(self.try_handshake())
    }

    fn try_handshake(&mut self) -> Option<ClientEvent> {
        if self.state != ConnectionState::Connected {
            return None;
        }
        let identity = self.identity.as_mut()?;
        if identity.established {
            return None;
        }
        identity.established = true;
        debug!(epoch = self.epoch, name = %identity.display_name, "announcing identity");
        Some(ClientEvent::IdentityAnnounce {
            display_name: identity.display_name.clone(),
        })
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
    use ConnectionState::*;

    const ALL: [ConnectionState; 5] = [Disconnected, Connecting, Connected, Reconnecting, Failed];

    fn announce(name: &str) -> Option<ClientEvent> {
        Some(ClientEvent::IdentityAnnounce {
            display_name: name.into(),
        })
    }

    fn connected_supervisor(reannounce: bool) -> ConnectionSupervisor {
        let mut sup = ConnectionSupervisor::new(reannounce);
        sup.on_connecting().unwrap();
        sup
    }

    #[test]
    fn failed_is_terminal() {
        for to in ALL {
            if to != Failed {
                assert!(!Failed.can_transition_to(to));
            }
        }
        let mut sup = connected_supervisor(true);
        sup.on_connected().unwrap();
        sup.on_disconnected(true).unwrap();
        sup.on_reconnect_exhausted().unwrap();
        assert_eq!(sup.state(), Failed);

        assert!(sup.on_connected().is_err());
        assert!(sup.on_closed().is_err());
        assert!(matches!(
            sup.transition(Connecting),
            Err(ChatError::InvalidTransition { from: Failed, to: Connecting })
        ));
        assert_eq!(sup.state(), Failed);
    }

    #[test]
    fn rejected_transition_leaves_state_unchanged() {
        let mut sup = ConnectionSupervisor::new(true);
        assert!(sup.transition(Connected).is_err());
        assert!(sup.on_reconnect_exhausted().is_err());
        assert_eq!(sup.state(), Disconnected);
    }

    #[test]
    fn lifecycle_edges() {
        assert!(Disconnected.can_transition_to(Connecting));
        assert!(Connecting.can_transition_to(Connected));
        assert!(Connected.can_transition_to(Reconnecting));
        assert!(Reconnecting.can_transition_to(Connected));
        assert!(Reconnecting.can_transition_to(Failed));
        assert!(!Disconnected.can_transition_to(Connected));
        assert!(!Connected.can_transition_to(Failed));
        assert!(!Connected.can_transition_to(Connecting));
    }

    #[test]
    fn handshake_fires_on_connect_when_name_known() {
        let mut sup = connected_supervisor(true);
        assert_eq!(sup.set_display_name("  Ana ").unwrap(), None);
        assert_eq!(sup.on_connected().unwrap(), announce("Ana"));
        assert!(sup.identity().unwrap().is_established());
        assert_eq!(sup.epoch(), 1);
    }

    #[test]
    fn handshake_is_deferred_until_name_known() {
        let mut sup = connected_supervisor(true);
        assert_eq!(sup.on_connected().unwrap(), None);
        assert_eq!(sup.set_display_name("Ana").unwrap(), announce("Ana"));
    }

    #[test]
    fn handshake_fires_once_per_epoch_with_reannounce() {
        let mut sup = connected_supervisor(true);
        sup.set_display_name("Ana").unwrap();
        assert_eq!(sup.on_connected().unwrap(), announce("Ana"));
        // A duplicate connected notification is not a new epoch.
        assert_eq!(sup.on_connected().unwrap(), None);

        sup.on_disconnected(true).unwrap();
        assert_eq!(sup.state(), Reconnecting);
        assert_eq!(sup.on_connected().unwrap(), announce("Ana"));
        assert_eq!(sup.epoch(), 2);
    }

    #[test]
    fn reconnect_without_reannounce_stays_silent() {
        let mut sup = connected_supervisor(false);
        sup.set_display_name("Ana").unwrap();
        assert_eq!(sup.on_connected().unwrap(), announce("Ana"));
        sup.on_disconnected(true).unwrap();
        assert_eq!(sup.on_connected().unwrap(), None);
    }

    #[test]
    fn name_set_while_reconnecting_announces_on_reconnect() {
        let mut sup = connected_supervisor(true);
        sup.on_connected().unwrap();
        sup.on_disconnected(true).unwrap();
        assert_eq!(sup.set_display_name("Ana").unwrap(), None);
        assert_eq!(sup.on_connected().unwrap(), announce("Ana"));
    }

    #[test]
    fn display_name_validation() {
        let mut sup = ConnectionSupervisor::new(true);
        assert!(matches!(
            sup.set_display_name("   "),
            Err(ChatError::EmptyDisplayName)
        ));
        sup.set_display_name("Ana").unwrap();
        assert!(matches!(
            sup.set_display_name("Ben"),
            Err(ChatError::IdentityAlreadySet(name)) if name == "Ana"
        ));
        assert_eq!(sup.display_name(), Some("Ana"));
    }

    #[test]
    fn disconnect_without_retry_returns_to_disconnected() {
        let mut sup = connected_supervisor(true);
        sup.on_connected().unwrap();
        sup.on_disconnected(false).unwrap();
        assert_eq!(sup.state(), Disconnected);
    }

    #[test]
    fn only_connected_accepts_sends() {
        for state in ALL {
            assert_eq!(state.accepts_sends(), state == Connected);
        }
    }
}
