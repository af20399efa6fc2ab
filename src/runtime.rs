//! Engine assembly and per-app wiring.
//!
//! [`HostRuntime`] owns the pieces every command path needs: the apps
//! root, the shared per-app lock table, the callback scheduler, and the
//! fire dispatcher. Shells ask it for an [`AppBridge`] per mini-app and
//! for a restore pass at startup that re-arms every persisted reminder.

use crate::app_id::AppId;
use crate::bridge::AppBridge;
use crate::config::HostConfig;
use crate::notify::Notifier;
use crate::platform::SuspendBlocker;
use crate::reminders::record::{CallbackKey, FirePayload};
use crate::reminders::registry::load_reminders;
use crate::reminders::scheduler::CallbackScheduler;
use crate::reminders::{ReminderDispatcher, ReminderRegistry};
use crate::store::AppDataStore;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Table of per-app exclusive locks, keyed by storage key.
///
/// The data store and reminder registry for one app share a single lock
/// from this table, so cross-document sequences (fire pruning while a
/// script writes data) serialize per app. Clones share the table.
#[derive(Clone, Default)]
pub struct AppLocks {
    locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl AppLocks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The exclusive lock for one app's documents, created on first use.
    ///
    /// Entries nothing else holds are swept on the way in, so the table
    /// stays bounded by the apps currently open instead of every app
    /// ever touched.
    #[must_use]
    pub fn lock_for(&self, storage_key: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        // strong_count == 1 means only the table holds the entry; no
        // bridge or in-flight dispatch can be waiting on it.
        locks.retain(|key, lock| key.as_str() == storage_key || Arc::strong_count(lock) > 1);
        Arc::clone(locks.entry(storage_key.to_owned()).or_default())
    }
}

/// The assembled engine behind the host bridge.
pub struct HostRuntime {
    config: HostConfig,
    apps_root: PathBuf,
    scheduler: Arc<dyn CallbackScheduler>,
    dispatcher: Arc<ReminderDispatcher>,
    locks: AppLocks,
}

impl HostRuntime {
    /// Assemble the runtime from its seams.
    ///
    /// The caller still has to wire `runtime.dispatcher()` into the
    /// scheduler as its fire handler; the scheduler is handed over here
    /// before the dispatcher exists.
    #[must_use]
    pub fn new(
        config: HostConfig,
        scheduler: Arc<dyn CallbackScheduler>,
        notifier: Arc<dyn Notifier>,
        suspend: Arc<dyn SuspendBlocker>,
    ) -> Self {
        let apps_root = config.apps_root();
        let locks = AppLocks::new();
        let dispatcher = Arc::new(ReminderDispatcher::new(
            apps_root.clone(),
            locks.clone(),
            notifier,
            suspend,
            &config,
        ));
        Self {
            config,
            apps_root,
            scheduler,
            dispatcher,
            locks,
        }
    }

    /// The fire handler to wire into the scheduler.
    #[must_use]
    pub fn dispatcher(&self) -> Arc<ReminderDispatcher> {
        Arc::clone(&self.dispatcher)
    }

    #[must_use]
    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    #[must_use]
    pub fn apps_root(&self) -> &Path {
        &self.apps_root
    }

    /// Build the capability bridge for one mini-app.
    ///
    /// The app's identity is fixed here; every store and registry call
    /// made through the returned bridge is scoped to it. Store and
    /// registry share the app's lock from the shared table.
    #[must_use]
    pub fn open_bridge(&self, app_id: AppId) -> AppBridge {
        let lock = self.locks.lock_for(&app_id.storage_key());
        let store = AppDataStore::new(app_id.clone(), &self.apps_root, Arc::clone(&lock));
        let registry = ReminderRegistry::new(
            app_id.clone(),
            &self.apps_root,
            lock,
            Arc::clone(&self.scheduler),
        );
        AppBridge::new(app_id, store, registry)
    }

    /// Re-arm every persisted reminder after a restart.
    ///
    /// Walks the apps root and schedules a callback for each record
    /// found, using the fire time it was registered with; past-due
    /// reminders fire as soon as possible. Unreadable apps are skipped
    /// with a warning. Returns the number of callbacks armed.
    pub fn restore_reminders(&self) -> usize {
        if !self.config.reminders.restore_on_start {
            tracing::debug!("reminder restore disabled by config");
            return 0;
        }

        let entries = match std::fs::read_dir(&self.apps_root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(root = %self.apps_root.display(), "no apps directory yet; nothing to restore");
                return 0;
            }
            Err(e) => {
                tracing::warn!(root = %self.apps_root.display(), error = %e, "cannot scan apps directory");
                return 0;
            }
        };

        let mut armed = 0usize;
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(error = %e, "skipping unreadable apps entry");
                    continue;
                }
            };
            let app_dir = entry.path();
            if !app_dir.is_dir() {
                continue;
            }
            let storage_key = entry.file_name().to_string_lossy().into_owned();
            let path = app_dir.join("reminders.json");
            if !path.exists() {
                continue;
            }

            for reminder in load_reminders(&path, &storage_key) {
                if reminder.id.is_empty() || reminder.app_id.is_empty() {
                    tracing::warn!(
                        path = %path.display(),
                        "skipping persisted reminder missing id or app id"
                    );
                    continue;
                }
                let key = CallbackKey::derive(&reminder.app_id, &reminder.id);
                let payload = FirePayload::from_reminder(&reminder);
                match self.scheduler.schedule(&key, reminder.fire_at, payload) {
                    Ok(()) => armed += 1,
                    Err(e) => tracing::warn!(
                        app_id = %reminder.app_id,
                        id = %reminder.id,
                        error = %e,
                        "failed to re-arm persisted reminder"
                    ),
                }
            }
        }

        if armed > 0 {
            tracing::info!(count = armed, "re-armed persisted reminders");
        }
        armed
    }
}
