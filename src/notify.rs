//! User-attention side effects for remote chat activity.
//!
//! The [`NotificationDispatcher`] plays a sound and, when the user granted
//! permission, raises a desktop notification for every remotely authored
//! entry. Local echoes and presence entries never notify. Every capability
//! failure degrades to "no side effect" and is only logged.

use std::io::Write;
use std::sync::OnceLock;

use tracing::{debug, info};

use crate::error::{ChatError, Result};
use crate::log::{ChatEntry, EntryKind};

/// Outcome of the desktop notification permission prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Permission {
    /// The user has not been asked yet.
    #[default]
    Undetermined,
    /// Notifications may be shown.
    Granted,
    /// The user refused.
    Denied,
    /// The platform has no notification capability.
    Unsupported,
}

/// Desktop notification capability.
pub trait NotificationPlatform: Send + 'static {
    /// Current permission without prompting.
    fn permission(&self) -> Permission;

    /// Prompt the user. Only called while the permission is undetermined.
    fn request_permission(&mut self) -> Permission;

    /// Show one notification.
    ///
    /// # Errors
    ///
    /// Any error is logged by the dispatcher and otherwise ignored.
    fn show(&mut self, title: &str, body: &str) -> Result<()>;
}

/// Notification sound capability.
pub trait SoundPlayer: Send + 'static {
    /// Play the notification sound once.
    ///
    /// # Errors
    ///
    /// Any error is logged by the dispatcher and otherwise ignored.
    fn play(&mut self) -> Result<()>;
}

/// A platform without notifications or sound.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unsupported;

impl NotificationPlatform for Unsupported {
    fn permission(&self) -> Permission {
        Permission::Unsupported
    }

    fn request_permission(&mut self) -> Permission {
        Permission::Unsupported
    }

    fn show(&mut self, _title: &str, _body: &str) -> Result<()> {
        Err(ChatError::Notification("notifications unsupported".into()))
    }
}

impl SoundPlayer for Unsupported {
    fn play(&mut self) -> Result<()> {
        Err(ChatError::Notification("sound unsupported".into()))
    }
}

/// Rings the terminal bell on stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalBell;

impl SoundPlayer for TerminalBell {
    fn play(&mut self) -> Result<()> {
        let mut stderr = std::io::stderr().lock();
        stderr.write_all(b"\x07")?;
        stderr.flush()?;
        Ok(())
    }
}

/// Raises notifications as `tracing` events. Always granted.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl NotificationPlatform for LogNotifier {
    fn permission(&self) -> Permission {
        Permission::Granted
    }

    fn request_permission(&mut self) -> Permission {
        Permission::Granted
    }

    fn show(&mut self, title: &str, body: &str) -> Result<()> {
        info!(target: "relay_chat_client::notification", %title, %body, "new message");
        Ok(())
    }
}

/// Plays sounds and raises desktop notifications for remote entries.
pub struct NotificationDispatcher {
    platform: Box<dyn NotificationPlatform>,
    sound: Box<dyn SoundPlayer>,
    permission: OnceLock<Permission>,
}

impl std::fmt::Debug for NotificationDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationDispatcher")
            .field("permission", &self.permission.get())
            .finish_non_exhaustive()
    }
}

impl Default for NotificationDispatcher {
    fn default() -> Self {
        Self::new(Unsupported, Unsupported)
    }
}

impl NotificationDispatcher {
    /// Create a dispatcher over the given capabilities.
    pub fn new(platform: impl NotificationPlatform, sound: impl SoundPlayer) -> Self {
        Self {
            platform: Box::new(platform),
            sound: Box::new(sound),
            permission: OnceLock::new(),
        }
    }

    /// Resolve the notification permission, prompting at most once.
    ///
    /// The outcome is cached for the dispatcher's lifetime; later calls return
    /// it without touching the platform.
    pub fn request_permission_once(&mut self) -> Permission {
        if let Some(permission) = self.permission.get() {
            return *permission;
        }
        let permission = match self.platform.permission() {
            Permission::Undetermined => self.platform.request_permission(),
            known => known,
        };
        debug!(?permission, "notification permission resolved");
        *self.permission.get_or_init(|| permission)
    }

    /// The cached permission, if resolved.
    pub fn permission(&self) -> Option<Permission> {
        self.permission.get().copied()
    }

    /// React to a newly appended remote entry.
    ///
    /// System entries are ignored. Sound and notification failures are logged
    /// at `debug` and swallowed.
    pub fn on_remote_entry(&mut self, entry: &ChatEntry) {
        if entry.kind() != EntryKind::User {
            return;
        }

        if let Err(e) = self.sound.play() {
            debug!("notification sound failed: {e}");
        }

        if self.permission.get() == Some(&Permission::Granted) {
            if let Err(e) = self.platform.show(entry.author_label(), entry.body()) {
                debug!("desktop notification failed: {e}");
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
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Calls {
        requests: usize,
        shown: Vec<(String, String)>,
        plays: usize,
    }

    struct FakePlatform {
        current: Permission,
        answer: Permission,
        calls: Arc<Mutex<Calls>>,
    }

    impl NotificationPlatform for FakePlatform {
        fn permission(&self) -> Permission {
            self.current
        }

        fn request_permission(&mut self) -> Permission {
            self.calls.lock().unwrap().requests += 1;
            self.current = self.answer;
            self.answer
        }

        fn show(&mut self, title: &str, body: &str) -> Result<()> {
            self.calls
                .lock()
                .unwrap()
                .shown
                .push((title.into(), body.into()));
            Ok(())
        }
    }

    struct FakeSound {
        fail: bool,
        calls: Arc<Mutex<Calls>>,
    }

    impl SoundPlayer for FakeSound {
        fn play(&mut self) -> Result<()> {
            self.calls.lock().unwrap().plays += 1;
            if self.fail {
                return Err(ChatError::Notification("autoplay blocked".into()));
            }
            Ok(())
        }
    }

    fn dispatcher(
        current: Permission,
        answer: Permission,
        sound_fails: bool,
    ) -> (NotificationDispatcher, Arc<Mutex<Calls>>) {
        let calls = Arc::new(Mutex::new(Calls::default()));
        let platform = FakePlatform {
            current,
            answer,
            calls: Arc::clone(&calls),
        };
        let sound = FakeSound {
            fail: sound_fails,
            calls: Arc::clone(&calls),
        };
        (NotificationDispatcher::new(platform, sound), calls)
    }

    #[test]
    fn permission_is_requested_once_and_cached() {
        let (mut d, calls) = dispatcher(Permission::Undetermined, Permission::Granted, false);
        assert_eq!(d.request_permission_once(), Permission::Granted);
        assert_eq!(d.request_permission_once(), Permission::Granted);
        assert_eq!(calls.lock().unwrap().requests, 1);
    }

    #[test]
    fn decided_permission_is_not_requested_again() {
        let (mut d, calls) = dispatcher(Permission::Denied, Permission::Granted, false);
        assert_eq!(d.request_permission_once(), Permission::Denied);
        assert_eq!(calls.lock().unwrap().requests, 0);
    }

    #[test]
    fn granted_permission_shows_notification_titled_with_author() {
        let (mut d, calls) = dispatcher(Permission::Undetermined, Permission::Granted, false);
        d.request_permission_once();
        d.on_remote_entry(&ChatEntry::user("Ben", "hi"));

        let calls = calls.lock().unwrap();
        assert_eq!(calls.plays, 1);
        assert_eq!(calls.shown, vec![("Ben".to_string(), "hi".to_string())]);
    }

    #[test]
    fn denied_permission_still_plays_sound() {
        let (mut d, calls) = dispatcher(Permission::Undetermined, Permission::Denied, false);
        d.request_permission_once();
        d.on_remote_entry(&ChatEntry::user("Ben", "hi"));

        let calls = calls.lock().unwrap();
        assert_eq!(calls.plays, 1);
        assert!(calls.shown.is_empty());
    }

    #[test]
    fn sound_failure_does_not_block_notification() {
        let (mut d, calls) = dispatcher(Permission::Granted, Permission::Granted, true);
        d.request_permission_once();
        d.on_remote_entry(&ChatEntry::user("Ben", "hi"));
        assert_eq!(calls.lock().unwrap().shown.len(), 1);
    }

    #[test]
    fn system_entries_do_not_notify() {
        let (mut d, calls) = dispatcher(Permission::Granted, Permission::Granted, false);
        d.request_permission_once();
        d.on_remote_entry(&ChatEntry::system("Ben has joined the chat!"));
        let calls = calls.lock().unwrap();
        assert_eq!(calls.plays, 0);
        assert!(calls.shown.is_empty());
    }

    #[test]
    fn unsupported_platform_degrades_silently() {
        let mut d = NotificationDispatcher::default();
        assert_eq!(d.request_permission_once(), Permission::Unsupported);
        d.on_remote_entry(&ChatEntry::user("Ben", "hi"));
        assert_eq!(d.permission(), Some(Permission::Unsupported));
    }
}
