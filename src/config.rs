//! Configuration types for the wisp host engine.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration for the mini-app host.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Per-app document storage settings.
    pub storage: StorageConfig,
    /// Reminder scheduling settings.
    pub reminders: ReminderConfig,
    /// Notification presentation settings.
    pub notifications: NotificationConfig,
}

/// Per-app document storage configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root directory for per-app documents (None = platform data dir).
    pub data_dir: Option<PathBuf>,
}

/// Reminder scheduling configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReminderConfig {
    /// Hard upper bound in seconds on the device-suspend hold taken while
    /// a fired reminder is being dispatched.
    pub wake_hold_max_secs: u64,
    /// Re-arm persisted reminders when the host starts.
    ///
    /// Past-due reminders fire as soon as possible rather than being
    /// dropped.
    pub restore_on_start: bool,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            wake_hold_max_secs: 30,
            restore_on_start: true,
        }
    }
}

/// Notification presentation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Notification channel/category identifier for reminder notifications.
    pub channel_id: String,
    /// Human-readable channel name shown in system settings.
    pub channel_name: String,
    /// Whether reminder notifications dismiss themselves when tapped.
    pub auto_dismiss: bool,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            channel_id: "wisp.reminders".to_owned(),
            channel_name: "App reminders".to_owned(),
            auto_dismiss: true,
        }
    }
}

impl HostConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| crate::error::HostError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &std::path::Path) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::HostError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path (`config_dir()/config.toml`).
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        crate::wisp_dirs::config_file()
    }

    /// Root directory for per-app documents.
    ///
    /// The `[storage] data_dir` override wins; otherwise the platform
    /// data directory's `apps/` subdirectory is used.
    #[must_use]
    pub fn apps_root(&self) -> PathBuf {
        match &self.storage.data_dir {
            Some(dir) => dir.join("apps"),
            None => crate::wisp_dirs::apps_dir(),
        }
    }
}
