//! Centralized application directory paths for the wisp host.
//!
//! Provides a single source of truth for all filesystem paths used by the
//! engine. Uses the [`dirs`] crate for platform-appropriate directory
//! resolution, which is sandbox-transparent on macOS (returns
//! container-relative paths under App Sandbox automatically).
//!
//! # Directory Layout
//!
//! | Purpose | macOS (sandbox) | Linux |
//! |---------|----------------|-------|
//! | App data | `~/Library/Application Support/wisp/` | `~/.local/share/wisp/` |
//! | Config | `~/Library/Application Support/wisp/` | `~/.config/wisp/` |
//!
//! Each mini-app owns one subdirectory under `data_dir()/apps/`, named by
//! its storage key, holding the two documents the engine persists for it:
//! `data.json` (key/value mapping) and `reminders.json` (pending reminders).
//!
//! # Environment Overrides
//!
//! All paths can be overridden for testing or custom deployments:
//! - `WISP_DATA_DIR` overrides [`data_dir`]
//! - `WISP_CONFIG_DIR` overrides [`config_dir`]

use std::path::{Path, PathBuf};

/// Application data root directory.
///
/// Used for persistent engine state: every mini-app's key/value and
/// reminder documents live under `apps/` inside this root.
///
/// Resolves to `dirs::data_dir()/wisp/` by default. Override with
/// the `WISP_DATA_DIR` environment variable.
#[must_use]
pub fn data_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("WISP_DATA_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::data_dir()
        .map(|d| d.join("wisp"))
        .unwrap_or_else(|| PathBuf::from("/tmp/wisp-data"))
}

/// Application config directory.
///
/// Used for `config.toml`.
///
/// Resolves to `dirs::config_dir()/wisp/` by default. Override with
/// the `WISP_CONFIG_DIR` environment variable.
#[must_use]
pub fn config_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("WISP_CONFIG_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::config_dir()
        .map(|d| d.join("wisp"))
        .unwrap_or_else(|| PathBuf::from("/tmp/wisp-config"))
}

/// Main config file path (`config_dir()/config.toml`).
#[must_use]
pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}

/// Default per-app document root (`data_dir()/apps/`).
#[must_use]
pub fn apps_dir() -> PathBuf {
    data_dir().join("apps")
}

/// One mini-app's directory under an apps root.
#[must_use]
pub fn app_dir(apps_root: &Path, storage_key: &str) -> PathBuf {
    apps_root.join(storage_key)
}

/// One mini-app's key/value document path.
#[must_use]
pub fn app_data_file(apps_root: &Path, storage_key: &str) -> PathBuf {
    app_dir(apps_root, storage_key).join("data.json")
}

/// One mini-app's reminder document path.
#[must_use]
pub fn app_reminders_file(apps_root: &Path, storage_key: &str) -> PathBuf {
    app_dir(apps_root, storage_key).join("reminders.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_dir_is_nonempty() {
        let dir = data_dir();
        assert!(!dir.as_os_str().is_empty());
    }

    #[test]
    fn data_dir_contains_wisp() {
        let dir = data_dir();
        let s = dir.to_string_lossy();
        assert!(s.contains("wisp"), "data_dir should contain 'wisp': {s}");
    }

    #[test]
    fn config_dir_is_nonempty() {
        let dir = config_dir();
        assert!(!dir.as_os_str().is_empty());
    }

    #[test]
    fn config_file_ends_with_config_toml() {
        let path = config_file();
        let s = path.to_string_lossy();
        assert!(s.ends_with("config.toml"), "config_file: {s}");
    }

    #[test]
    fn apps_dir_is_subpath_of_data_dir() {
        let apps = apps_dir();
        let data = data_dir();
        assert!(
            apps.starts_with(&data),
            "apps_dir ({}) should start with data_dir ({})",
            apps.display(),
            data.display()
        );
    }

    #[test]
    fn app_documents_live_under_the_app_dir() {
        let root = PathBuf::from("/srv/wisp/apps");
        let dir = app_dir(&root, "app_1");
        assert_eq!(app_data_file(&root, "app_1"), dir.join("data.json"));
        assert_eq!(
            app_reminders_file(&root, "app_1"),
            dir.join("reminders.json")
        );
    }

    #[test]
    fn data_dir_override_via_env() {
        let key = "WISP_DATA_DIR";
        let original = std::env::var_os(key);

        // SAFETY: Tests run single-threaded per module.
        unsafe { std::env::set_var(key, "/custom/data") };
        let result = data_dir();
        assert_eq!(result, PathBuf::from("/custom/data"));

        // Restore.
        match original {
            Some(val) => unsafe { std::env::set_var(key, val) },
            None => unsafe { std::env::remove_var(key) },
        }
    }

    #[test]
    fn config_dir_override_via_env() {
        let key = "WISP_CONFIG_DIR";
        let original = std::env::var_os(key);

        unsafe { std::env::set_var(key, "/custom/config") };
        let result = config_dir();
        assert_eq!(result, PathBuf::from("/custom/config"));

        match original {
            Some(val) => unsafe { std::env::set_var(key, val) },
            None => unsafe { std::env::remove_var(key) },
        }
    }
}
