//! Capability bridge handed to one mini-app.
//!
//! An [`AppBridge`] is constructed by the host with the app's identity
//! baked in; scripts never pass or choose an app id, so one app cannot
//! reach another's documents no matter what arguments it sends.
//!
//! This surface never raises into the script runtime. Fallible
//! operations log their failures and return; readers fall back to the
//! empty string, `"{}"`, or `"[]"`.

use crate::app_id::AppId;
use crate::reminders::ReminderRegistry;
use crate::store::AppDataStore;
use chrono::{DateTime, Utc};

/// Script-facing façade over one app's store and reminder registry.
pub struct AppBridge {
    app_id: AppId,
    store: AppDataStore,
    registry: ReminderRegistry,
}

impl AppBridge {
    #[must_use]
    pub fn new(app_id: AppId, store: AppDataStore, registry: ReminderRegistry) -> Self {
        Self {
            app_id,
            store,
            registry,
        }
    }

    /// The identity this bridge is scoped to.
    #[must_use]
    pub fn app_id(&self) -> &AppId {
        &self.app_id
    }

    /// Mint a fresh app id for a newly installed mini-app.
    #[must_use]
    pub fn generate_app_id() -> AppId {
        AppId::generate()
    }

    /// Store `value` under `key`.
    pub fn save_data(&self, key: &str, value: &str) {
        if let Err(e) = self.store.set(key, value) {
            tracing::error!(app_id = %self.app_id, key, error = %e, "save_data failed");
        }
    }

    /// The value stored under `key`, or the empty string.
    #[must_use]
    pub fn load_data(&self, key: &str) -> String {
        self.store.get(key)
    }

    /// Every stored pair, as a JSON object string.
    #[must_use]
    pub fn get_all_data(&self) -> String {
        let all = self.store.get_all();
        match serde_json::to_string(&all) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(app_id = %self.app_id, error = %e, "get_all_data failed to serialize");
                "{}".to_owned()
            }
        }
    }

    /// Remove `key` if present.
    pub fn delete_data(&self, key: &str) {
        if let Err(e) = self.store.remove(key) {
            tracing::error!(app_id = %self.app_id, key, error = %e, "delete_data failed");
        }
    }

    /// Register (or replace) the reminder `id`.
    pub fn set_reminder(&self, id: &str, fire_at: DateTime<Utc>, title: &str, message: &str) {
        if let Err(e) = self.registry.set_reminder(id, fire_at, title, message) {
            tracing::error!(app_id = %self.app_id, id, error = %e, "set_reminder failed");
        }
    }

    /// Cancel the reminder `id` if it is pending.
    pub fn cancel_reminder(&self, id: &str) {
        if let Err(e) = self.registry.cancel_reminder(id) {
            tracing::error!(app_id = %self.app_id, id, error = %e, "cancel_reminder failed");
        }
    }

    /// The app's pending reminders, as a JSON array string.
    #[must_use]
    pub fn get_reminders(&self) -> String {
        let reminders = self.registry.list();
        match serde_json::to_string(&reminders) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(app_id = %self.app_id, error = %e, "get_reminders failed to serialize");
                "[]".to_owned()
            }
        }
    }
}
