//! Bookkeeping suspend blocker for platforms without a power facility.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::{SuspendBlocker, SuspendHold};

/// Suspend blocker that only counts holds.
///
/// Used wherever no OS power-management facility is wired in (Linux
/// servers, tests). Acquire and release are tracked so callers can assert
/// that every hold is balanced.
pub struct StubSuspendBlocker {
    active: Arc<AtomicUsize>,
}

impl StubSuspendBlocker {
    #[must_use]
    pub fn new() -> Self {
        Self {
            active: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of currently unreleased holds.
    #[must_use]
    pub fn active_holds(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

impl Default for StubSuspendBlocker {
    fn default() -> Self {
        Self::new()
    }
}

impl SuspendBlocker for StubSuspendBlocker {
    fn hold(&self, reason: &str, max: Duration) -> SuspendHold {
        self.active.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(reason, max_secs = max.as_secs(), "suspend hold acquired");
        let active = Arc::clone(&self.active);
        SuspendHold::new(reason, max, move || {
            active.fetch_sub(1, Ordering::SeqCst);
        })
    }
}
