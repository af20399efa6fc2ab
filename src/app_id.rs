//! Opaque mini-app identity.
//!
//! Every sandboxed mini-app is addressed by an [`AppId`]: an opaque string
//! the shell fixes when it constructs the app's bridge. Script never
//! supplies an identity; it only ever reads its own back. The identity
//! doubles as the root of the app's on-disk layout via [`AppId::storage_key`].

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Opaque, immutable identity of one mini-app.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppId(String);

impl AppId {
    /// Wrap an existing identity string.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Allocate a fresh, collision-resistant identity.
    #[must_use]
    pub fn generate() -> Self {
        Self(format!("app_{}", uuid::Uuid::new_v4().simple()))
    }

    /// The raw identity string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Filesystem-safe directory name for this identity.
    ///
    /// Identities that are already plain (`[A-Za-z0-9._-]`, no leading dot,
    /// non-empty) are used verbatim so generated ids stay readable on disk.
    /// Anything else is sanitized and suffixed with a short SHA-256 digest
    /// of the raw identity, so two distinct identities can never share a
    /// directory no matter what characters they contain.
    #[must_use]
    pub fn storage_key(&self) -> String {
        if is_plain(&self.0) {
            return self.0.clone();
        }
        let sanitized: String = self
            .0
            .chars()
            .take(32)
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        let mut hasher = Sha256::new();
        hasher.update(self.0.as_bytes());
        let digest = format!("{:x}", hasher.finalize());
        format!("{sanitized}-{}", &digest[..8])
    }
}

impl std::fmt::Display for AppId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AppId {
    fn from(raw: &str) -> Self {
        Self(raw.to_owned())
    }
}

impl From<String> for AppId {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

/// True when the raw identity is safe to use directly as a directory name.
fn is_plain(raw: &str) -> bool {
    !raw.is_empty()
        && !raw.starts_with('.')
        && raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-')
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn generated_ids_are_unique_and_prefixed() {
        let mut seen = HashSet::new();
        for _ in 0..64 {
            let id = AppId::generate();
            assert!(id.as_str().starts_with("app_"), "id: {id}");
            assert!(seen.insert(id.as_str().to_owned()), "duplicate id: {id}");
        }
    }

    #[test]
    fn plain_identity_keeps_its_storage_key() {
        let id = AppId::new("app_1");
        assert_eq!(id.storage_key(), "app_1");
    }

    #[test]
    fn unsafe_identity_is_sanitized_with_digest_suffix() {
        let id = AppId::new("notes/../escape");
        let key = id.storage_key();
        assert!(!key.contains('/'), "key: {key}");
        assert!(!key.contains(".."), "key: {key}");
        assert!(key.starts_with("notes"), "key: {key}");
    }

    #[test]
    fn distinct_unsafe_identities_get_distinct_keys() {
        let a = AppId::new("app/one");
        let b = AppId::new("app_one");
        assert_ne!(a.storage_key(), b.storage_key());
    }

    #[test]
    fn leading_dot_is_not_plain() {
        let id = AppId::new(".hidden");
        let key = id.storage_key();
        assert!(!key.starts_with('.'), "key: {key}");
    }

    #[test]
    fn storage_key_is_stable() {
        let id = AppId::new("weird id!");
        assert_eq!(id.storage_key(), AppId::new("weird id!").storage_key());
    }

    #[test]
    fn serde_is_transparent() {
        let id = AppId::new("app_42");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"app_42\"");
        let back: AppId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
