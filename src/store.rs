//! Per-app key/value document storage.
//!
//! Each mini-app owns a single JSON document mapping string keys to string
//! values. Every mutation is a full read-modify-write of that document, so
//! per-call cost is proportional to the app's total stored size; volumes
//! here are small (a mini-app's own settings and state).
//!
//! Missing and corrupt documents read as an empty mapping. A later write
//! replaces the corrupt content with a fresh valid document, so storage
//! self-heals instead of wedging the app.

use crate::app_id::AppId;
use crate::error::{HostError, Result};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Durable key/value store scoped to one mini-app.
///
/// All operations serialize through the app's lock, shared with the
/// reminder registry for the same app, so a read after a write on the
/// same app always observes the write.
pub struct AppDataStore {
    app_id: AppId,
    path: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl AppDataStore {
    /// Create a store for `app_id` rooted at `apps_root`.
    ///
    /// `lock` is the app's exclusive lock; pass the same handle to the
    /// app's [`ReminderRegistry`](crate::reminders::ReminderRegistry).
    #[must_use]
    pub fn new(app_id: AppId, apps_root: &std::path::Path, lock: Arc<Mutex<()>>) -> Self {
        let path = crate::wisp_dirs::app_data_file(apps_root, &app_id.storage_key());
        Self { app_id, path, lock }
    }

    /// Insert or overwrite `key`.
    ///
    /// Empty keys are logged and ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be written.
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        if key.is_empty() {
            tracing::warn!(app_id = %self.app_id, "set called with empty key; ignoring");
            return Ok(());
        }
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut document = self.load_document();
        document.insert(key.to_owned(), value.to_owned());
        self.save_document(&document)
    }

    /// Look up `key`.
    ///
    /// Returns the empty string if the key is absent, the app has no
    /// document yet, or the document is unreadable. Never fails.
    #[must_use]
    pub fn get(&self, key: &str) -> String {
        if key.is_empty() {
            tracing::warn!(app_id = %self.app_id, "get called with empty key");
            return String::new();
        }
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        self.load_document().get(key).cloned().unwrap_or_default()
    }

    /// The app's entire mapping. Empty if no document exists or it is
    /// unreadable.
    #[must_use]
    pub fn get_all(&self) -> BTreeMap<String, String> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        self.load_document()
    }

    /// Remove `key` if present.
    ///
    /// A no-op for absent or empty keys.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be written.
    pub fn remove(&self, key: &str) -> Result<()> {
        if key.is_empty() {
            tracing::warn!(app_id = %self.app_id, "remove called with empty key; ignoring");
            return Ok(());
        }
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut document = self.load_document();
        if document.remove(key).is_none() {
            return Ok(());
        }
        self.save_document(&document)
    }

    /// Load the document, treating missing or corrupt content as empty.
    fn load_document(&self) -> BTreeMap<String, String> {
        let bytes = match std::fs::read(&self.path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return BTreeMap::new(),
            Err(e) => {
                tracing::warn!(
                    app_id = %self.app_id,
                    path = %self.path.display(),
                    error = %e,
                    "failed to read data document; treating as empty"
                );
                return BTreeMap::new();
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(document) => document,
            Err(e) => {
                tracing::warn!(
                    app_id = %self.app_id,
                    path = %self.path.display(),
                    error = %e,
                    "data document is corrupt; treating as empty"
                );
                BTreeMap::new()
            }
        }
    }

    /// Write the full document atomically (temp file + rename).
    fn save_document(&self, document: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                HostError::Storage(format!(
                    "cannot create app directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        let json = serde_json::to_string_pretty(document)
            .map_err(|e| HostError::Storage(format!("cannot serialize data document: {e}")))?;

        let temp_path = self.path.with_extension("json.tmp");
        std::fs::write(&temp_path, json).map_err(|e| {
            HostError::Storage(format!("cannot write {}: {e}", temp_path.display()))
        })?;
        std::fs::rename(&temp_path, &self.path).map_err(|e| {
            HostError::Storage(format!("cannot rename into {}: {e}", self.path.display()))
        })?;

        Ok(())
    }
}
