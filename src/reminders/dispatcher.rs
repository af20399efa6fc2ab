//! Fired-callback dispatcher.
//!
//! When a scheduled callback fires, the dispatcher turns the carried
//! payload into a user-visible notification and prunes the fired
//! reminder from its app's registry. The whole sequence runs under a
//! scoped suspend hold so a device dozing mid-dispatch cannot swallow
//! the notification.
//!
//! Delivery is at-least-once: the notification id is derived from
//! `(app_id, reminder_id)`, so a re-delivered fire overwrites the same
//! notification instead of stacking a duplicate, and pruning an
//! already-absent reminder is a no-op. Nothing here propagates errors;
//! every failure is logged and dispatch carries on.

use crate::app_id::AppId;
use crate::config::HostConfig;
use crate::notify::{Notification, NotificationChannel, Notifier};
use crate::platform::SuspendBlocker;
use crate::reminders::record::{notification_id, FirePayload};
use crate::reminders::registry::{load_reminders, save_reminders};
use crate::reminders::scheduler::FireHandler;
use crate::runtime::AppLocks;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Turns fired callbacks into notifications and registry updates.
pub struct ReminderDispatcher {
    apps_root: PathBuf,
    locks: AppLocks,
    notifier: Arc<dyn Notifier>,
    suspend: Arc<dyn SuspendBlocker>,
    channel: NotificationChannel,
    auto_dismiss: bool,
    wake_hold_max: Duration,
}

impl ReminderDispatcher {
    #[must_use]
    pub fn new(
        apps_root: PathBuf,
        locks: AppLocks,
        notifier: Arc<dyn Notifier>,
        suspend: Arc<dyn SuspendBlocker>,
        config: &HostConfig,
    ) -> Self {
        Self {
            apps_root,
            locks,
            notifier,
            suspend,
            channel: NotificationChannel {
                id: config.notifications.channel_id.clone(),
                name: config.notifications.channel_name.clone(),
            },
            auto_dismiss: config.notifications.auto_dismiss,
            wake_hold_max: Duration::from_secs(config.reminders.wake_hold_max_secs),
        }
    }

    /// Deliver one fired reminder end to end.
    ///
    /// Shows the notification first, then removes the reminder from the
    /// app's registry under the app lock. Safe to call again with the
    /// same payload.
    pub fn dispatch(&self, payload: &FirePayload) {
        let _hold = self.suspend.hold("reminder dispatch", self.wake_hold_max);

        if payload.id.is_empty() || payload.app_id.is_empty() {
            tracing::warn!(
                id = %payload.id,
                app_id = %payload.app_id,
                "fired payload missing id or app id; dropping"
            );
            return;
        }
        tracing::info!(app_id = %payload.app_id, id = %payload.id, "dispatching reminder");

        if let Err(e) = self.notifier.ensure_channel(&self.channel) {
            tracing::warn!(channel = %self.channel.id, error = %e, "failed to ensure notification channel");
        }

        let notification = Notification {
            id: notification_id(&payload.app_id, &payload.id),
            channel_id: self.channel.id.clone(),
            title: payload.title.clone(),
            body: payload.message.clone(),
            app_id: payload.app_id.clone(),
            reminder_id: payload.id.clone(),
            auto_dismiss: self.auto_dismiss,
        };
        if let Err(e) = self.notifier.show(&notification) {
            tracing::warn!(
                app_id = %payload.app_id,
                id = %payload.id,
                error = %e,
                "failed to show notification"
            );
        }

        self.prune(&payload.app_id, &payload.id);
    }

    /// Remove the fired reminder from its app's registry document.
    ///
    /// Matches on id alone. A replacement registered after this fire
    /// popped but before the lock is taken here is removed with it; the
    /// replacement's callback stays armed, still notifies at its own
    /// time, and its prune is then a no-op.
    fn prune(&self, app_id: &str, id: &str) {
        let storage_key = AppId::new(app_id).storage_key();
        let lock = self.locks.lock_for(&storage_key);
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());

        let path = crate::wisp_dirs::app_reminders_file(&self.apps_root, &storage_key);
        let mut reminders = load_reminders(&path, app_id);
        let before = reminders.len();
        reminders.retain(|r| r.id != id);
        if reminders.len() == before {
            tracing::debug!(app_id, id, "fired reminder already absent from registry");
            return;
        }
        if let Err(e) = save_reminders(&path, &reminders) {
            tracing::warn!(app_id, id, error = %e, "failed to prune fired reminder");
        }
    }
}

impl FireHandler for ReminderDispatcher {
    fn handle_fire(&self, payload: FirePayload) {
        self.dispatch(&payload);
    }
}
