//! Platform-specific abstractions for device suspend control.
//!
//! Provides a cross-platform [`SuspendBlocker`] trait for the short hold
//! taken while a fired reminder is dispatched, so the device cannot sleep
//! between the callback arriving and the notification being raised.
//! Embedding shells with a real power-management facility implement the
//! trait over it; everywhere else a bookkeeping stub is used.

use std::time::{Duration, Instant};

pub mod stub;

/// Blocks device suspend for short, bounded spans.
///
/// Implementations must pass `max` through to the underlying OS facility
/// where one exists, so the hold expires even if the holding code wedges
/// and never drops the guard. The guard itself releases on drop on every
/// exit path.
pub trait SuspendBlocker: Send + Sync {
    /// Begin a scoped hold.
    ///
    /// `reason` is a short diagnostic label. `max` is the hard upper
    /// bound on the hold's lifetime. Acquisition failures are logged by
    /// the implementation, which then returns an inert guard; callers
    /// never observe an error.
    fn hold(&self, reason: &str, max: Duration) -> SuspendHold;
}

/// RAII guard for a suspend hold. Releases on drop.
pub struct SuspendHold {
    release: Option<Box<dyn FnOnce() + Send>>,
    acquired_at: Instant,
    max: Duration,
    reason: String,
}

impl SuspendHold {
    /// Build a guard that runs `release` exactly once when dropped.
    #[must_use]
    pub fn new(reason: &str, max: Duration, release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
            acquired_at: Instant::now(),
            max,
            reason: reason.to_owned(),
        }
    }

    /// Build a guard that releases nothing (acquisition failed upstream).
    #[must_use]
    pub fn inert(reason: &str, max: Duration) -> Self {
        Self {
            release: None,
            acquired_at: Instant::now(),
            max,
            reason: reason.to_owned(),
        }
    }
}

impl Drop for SuspendHold {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
        let held = self.acquired_at.elapsed();
        if held > self.max {
            tracing::warn!(
                reason = %self.reason,
                held_ms = held.as_millis() as u64,
                max_ms = self.max.as_millis() as u64,
                "suspend hold exceeded its hard cap before release"
            );
        }
    }
}

/// Create the platform-appropriate suspend blocker.
///
/// The engine ships no OS power-management integration of its own; the
/// embedding shell passes a real implementation into the runtime where
/// one exists. This factory returns the bookkeeping stub.
#[must_use]
pub fn create_suspend_blocker() -> Box<dyn SuspendBlocker> {
    Box::new(stub::StubSuspendBlocker::new())
}
