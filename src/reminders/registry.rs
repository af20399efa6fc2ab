//! Per-app reminder registry.
//!
//! Each mini-app owns a JSON array of its pending reminders, stored next
//! to its data document. The registry and the callback scheduler move
//! together: registering a reminder persists it and schedules its
//! callback inside the same critical section, and cancelling removes
//! both. Setting a reminder with an id that is already registered
//! replaces it, on disk and in the scheduler alike.
//!
//! Missing and corrupt registry documents read as empty, the same
//! self-healing rule the data store follows.

use crate::app_id::AppId;
use crate::error::{HostError, Result};
use crate::reminders::record::{CallbackKey, FirePayload, Reminder};
use crate::reminders::scheduler::CallbackScheduler;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Pending reminders for one mini-app, kept in lock-step with the
/// callback scheduler.
pub struct ReminderRegistry {
    app_id: AppId,
    path: PathBuf,
    lock: Arc<Mutex<()>>,
    scheduler: Arc<dyn CallbackScheduler>,
}

impl ReminderRegistry {
    /// Create a registry for `app_id` rooted at `apps_root`.
    ///
    /// `lock` is the app's exclusive lock; pass the same handle to the
    /// app's [`AppDataStore`](crate::store::AppDataStore).
    #[must_use]
    pub fn new(
        app_id: AppId,
        apps_root: &Path,
        lock: Arc<Mutex<()>>,
        scheduler: Arc<dyn CallbackScheduler>,
    ) -> Self {
        let path = crate::wisp_dirs::app_reminders_file(apps_root, &app_id.storage_key());
        Self {
            app_id,
            path,
            lock,
            scheduler,
        }
    }

    /// Register `id`, replacing any existing reminder with the same id.
    ///
    /// Persists the updated registry and schedules the fire callback
    /// before releasing the app lock. Empty ids are logged and ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry cannot be written or the
    /// callback cannot be scheduled.
    pub fn set_reminder(
        &self,
        id: &str,
        fire_at: DateTime<Utc>,
        title: &str,
        message: &str,
    ) -> Result<()> {
        if id.is_empty() {
            tracing::warn!(app_id = %self.app_id, "set_reminder called with empty id; ignoring");
            return Ok(());
        }

        let reminder = Reminder {
            id: id.to_owned(),
            fire_at,
            title: title.to_owned(),
            message: message.to_owned(),
            app_id: self.app_id.as_str().to_owned(),
        };

        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut reminders = load_reminders(&self.path, self.app_id.as_str());
        reminders.retain(|r| r.id != id);
        reminders.push(reminder.clone());
        save_reminders(&self.path, &reminders)?;

        let key = CallbackKey::derive(self.app_id.as_str(), id);
        self.scheduler
            .schedule(&key, fire_at, FirePayload::from_reminder(&reminder))?;
        tracing::debug!(app_id = %self.app_id, id, fire_at = %fire_at, "reminder registered");
        Ok(())
    }

    /// Cancel `id` and its scheduled callback.
    ///
    /// Unknown, already-fired, and empty ids are all accepted without
    /// error, so cancellation is safe to retry.
    ///
    /// # Errors
    ///
    /// Returns an error if the updated registry cannot be written.
    pub fn cancel_reminder(&self, id: &str) -> Result<()> {
        if id.is_empty() {
            tracing::warn!(app_id = %self.app_id, "cancel_reminder called with empty id; ignoring");
            return Ok(());
        }

        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let key = CallbackKey::derive(self.app_id.as_str(), id);
        if let Err(e) = self.scheduler.cancel(&key) {
            tracing::warn!(app_id = %self.app_id, id, error = %e, "failed to cancel callback");
        }

        let mut reminders = load_reminders(&self.path, self.app_id.as_str());
        let before = reminders.len();
        reminders.retain(|r| r.id != id);
        if reminders.len() == before {
            return Ok(());
        }
        save_reminders(&self.path, &reminders)?;
        tracing::debug!(app_id = %self.app_id, id, "reminder cancelled");
        Ok(())
    }

    /// The app's pending reminders, in registration order. Empty if no
    /// registry document exists or it is unreadable.
    #[must_use]
    pub fn list(&self) -> Vec<Reminder> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        load_reminders(&self.path, self.app_id.as_str())
    }
}

/// Load a registry document, treating missing or corrupt content as empty.
///
/// Shared with the dispatcher, which prunes fired reminders from the same
/// files under the same app locks.
pub(crate) fn load_reminders(path: &Path, app_id: &str) -> Vec<Reminder> {
    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
        Err(e) => {
            tracing::warn!(
                app_id,
                path = %path.display(),
                error = %e,
                "failed to read reminder registry; treating as empty"
            );
            return Vec::new();
        }
    };

    match serde_json::from_slice(&bytes) {
        Ok(reminders) => reminders,
        Err(e) => {
            tracing::warn!(
                app_id,
                path = %path.display(),
                error = %e,
                "reminder registry is corrupt; treating as empty"
            );
            Vec::new()
        }
    }
}

/// Write a registry document atomically (temp file + rename).
pub(crate) fn save_reminders(path: &Path, reminders: &[Reminder]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            HostError::Registry(format!(
                "cannot create app directory {}: {e}",
                parent.display()
            ))
        })?;
    }

    let json = serde_json::to_string_pretty(reminders)
        .map_err(|e| HostError::Registry(format!("cannot serialize reminder registry: {e}")))?;

    let temp_path = path.with_extension("json.tmp");
    std::fs::write(&temp_path, json)
        .map_err(|e| HostError::Registry(format!("cannot write {}: {e}", temp_path.display())))?;
    std::fs::rename(&temp_path, path)
        .map_err(|e| HostError::Registry(format!("cannot rename into {}: {e}", path.display())))?;

    Ok(())
}
