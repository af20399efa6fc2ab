//! Notification seam between the engine and the embedding shell.
//!
//! The engine never draws system notifications itself. When a reminder
//! fires, the dispatcher hands a [`Notification`] to whatever [`Notifier`]
//! the runtime was built with. The production implementation,
//! [`EventNotifier`], publishes `notification.show` and `reminder.fired`
//! event envelopes on the host event channel and leaves the actual OS
//! rendering to the shell; [`RecordingNotifier`] captures everything for
//! tests.

use crate::error::{HostError, Result};
use crate::host::contract::EventEnvelope;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Mutex;
use tokio::sync::broadcast;

/// A notification channel/category, created once before any notification
/// is posted into it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationChannel {
    pub id: String,
    pub name: String,
}

/// One user-visible notification.
///
/// `id` is deterministic per `(app_id, reminder_id)`, so re-delivery of
/// the same fired callback overwrites the visible notification instead of
/// stacking a duplicate. `app_id` and `reminder_id` ride along so the
/// shell can deep-link a tap back into the mini-app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub channel_id: String,
    pub title: String,
    pub body: String,
    pub app_id: String,
    pub reminder_id: String,
    pub auto_dismiss: bool,
}

/// Raises user-visible notifications.
pub trait Notifier: Send + Sync {
    /// Create the channel if it does not exist yet. Idempotent.
    fn ensure_channel(&self, channel: &NotificationChannel) -> Result<()>;

    /// Show (or overwrite, for a repeated `id`) a notification.
    fn show(&self, notification: &Notification) -> Result<()>;
}

/// Notifier that forwards notifications to the shell as host events.
///
/// Emits `notification.channel` once per channel id and, per shown
/// notification, `notification.show` with the full notification followed
/// by `reminder.fired` with the `(app_id, id)` pair. If no shell is
/// subscribed the events are dropped, which is fine for a headless
/// engine.
pub struct EventNotifier {
    event_tx: broadcast::Sender<EventEnvelope>,
    ensured: Mutex<HashSet<String>>,
}

impl EventNotifier {
    #[must_use]
    pub fn new(event_tx: broadcast::Sender<EventEnvelope>) -> Self {
        Self {
            event_tx,
            ensured: Mutex::new(HashSet::new()),
        }
    }

    fn emit(&self, event: &str, payload: serde_json::Value) {
        let envelope =
            EventEnvelope::new(uuid::Uuid::new_v4().to_string(), event.to_owned(), payload);
        let _ = self.event_tx.send(envelope);
    }
}

impl Notifier for EventNotifier {
    fn ensure_channel(&self, channel: &NotificationChannel) -> Result<()> {
        let mut ensured = self.ensured.lock().unwrap_or_else(|e| e.into_inner());
        if !ensured.insert(channel.id.clone()) {
            return Ok(());
        }
        drop(ensured);

        let payload = serde_json::to_value(channel)
            .map_err(|e| HostError::Notification(format!("cannot serialize channel: {e}")))?;
        self.emit("notification.channel", payload);
        Ok(())
    }

    fn show(&self, notification: &Notification) -> Result<()> {
        let payload = serde_json::to_value(notification)
            .map_err(|e| HostError::Notification(format!("cannot serialize notification: {e}")))?;
        self.emit("notification.show", payload);
        self.emit(
            "reminder.fired",
            serde_json::json!({
                "app_id": notification.app_id,
                "id": notification.reminder_id,
            }),
        );
        tracing::debug!(
            id = %notification.id,
            app_id = %notification.app_id,
            "notification forwarded to shell"
        );
        Ok(())
    }
}

/// Test double that records every channel and notification it sees.
#[derive(Default)]
pub struct RecordingNotifier {
    channels: Mutex<Vec<NotificationChannel>>,
    shown: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Channels passed to `ensure_channel`, in call order.
    #[must_use]
    pub fn channels(&self) -> Vec<NotificationChannel> {
        self.channels
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Notifications passed to `show`, in call order.
    #[must_use]
    pub fn shown(&self) -> Vec<Notification> {
        self.shown
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl Notifier for RecordingNotifier {
    fn ensure_channel(&self, channel: &NotificationChannel) -> Result<()> {
        self.channels
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(channel.clone());
        Ok(())
    }

    fn show(&self, notification: &Notification) -> Result<()> {
        self.shown
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(notification.clone());
        Ok(())
    }
}
