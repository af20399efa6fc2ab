//! Reminder records, fired-callback payloads, and key derivation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// One pending reminder, as persisted in an app's reminder document.
///
/// `app_id` is denormalized into the record because the dispatcher runs
/// outside any app context and must find its way back to the owning app
/// from the payload alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: String,
    pub fire_at: DateTime<Utc>,
    pub title: String,
    pub message: String,
    pub app_id: String,
}

/// Payload delivered to the dispatcher when a scheduled callback fires.
///
/// `title` and `message` are optional on the wire; a missing title falls
/// back to a generic one. `id` and `app_id` are required; the dispatcher
/// aborts on payloads without them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirePayload {
    pub id: String,
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default)]
    pub message: String,
    pub app_id: String,
}

impl FirePayload {
    /// Build the payload that will come back when `reminder` fires.
    ///
    /// An empty stored title is replaced by the generic one here, so the
    /// eventual notification always has something to say.
    #[must_use]
    pub fn from_reminder(reminder: &Reminder) -> Self {
        let title = if reminder.title.is_empty() {
            default_title()
        } else {
            reminder.title.clone()
        };
        Self {
            id: reminder.id.clone(),
            title,
            message: reminder.message.clone(),
            app_id: reminder.app_id.clone(),
        }
    }
}

fn default_title() -> String {
    "Reminder".to_owned()
}

/// Key addressing one scheduled callback.
///
/// Derived deterministically from `(app identity, reminder id)`, so the
/// same pair always re-derives the key that schedules, replaces, and
/// cancels its callback.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallbackKey(String);

impl CallbackKey {
    /// Derive the key for `(app_id, reminder_id)`.
    #[must_use]
    pub fn derive(app_id: &str, reminder_id: &str) -> Self {
        Self(format!("rem-{}", pair_digest(app_id, reminder_id)))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CallbackKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Deterministic notification id for `(app_id, reminder_id)`.
///
/// Re-delivery of the same fired callback reuses this id, so the visible
/// notification is overwritten instead of duplicated.
#[must_use]
pub fn notification_id(app_id: &str, reminder_id: &str) -> String {
    format!("note-{}", pair_digest(app_id, reminder_id))
}

/// SHA-256 hex over the identity pair, separator-delimited so
/// `("ab", "c")` and `("a", "bc")` cannot collide.
fn pair_digest(app_id: &str, reminder_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(app_id.as_bytes());
    hasher.update(b"\n");
    hasher.update(reminder_id.as_bytes());
    format!("{:x}", hasher.finalize())
}
