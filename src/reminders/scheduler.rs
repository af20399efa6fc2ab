//! Deferred-callback scheduler seam.
//!
//! The registry talks to the host's at-time callback facility through
//! [`CallbackScheduler`]: schedule or cancel one callback per derived key,
//! with replace semantics on schedule. [`TokioScheduler`] is the
//! in-process implementation (one cancellable timer task per key);
//! [`ManualScheduler`] is the substitutable fake for tests, fired by hand
//! instead of by a clock.
//!
//! Whatever fires (a timer or a test) delivers the payload to the
//! [`FireHandler`] wired in at startup, which in production is the
//! reminder dispatcher.

use crate::error::Result;
use crate::reminders::record::{CallbackKey, FirePayload};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;

/// Schedules and cancels deferred callbacks by key.
///
/// `schedule` replaces any pending callback under the same key; two
/// schedules never produce two firings. `cancel` of an unknown or
/// already-fired key succeeds. Times in the past fire as soon as
/// possible.
pub trait CallbackScheduler: Send + Sync {
    fn schedule(&self, key: &CallbackKey, at: DateTime<Utc>, payload: FirePayload) -> Result<()>;
    fn cancel(&self, key: &CallbackKey) -> Result<()>;
}

/// Receives fired callbacks from a scheduler implementation.
pub trait FireHandler: Send + Sync {
    fn handle_fire(&self, payload: FirePayload);
}

struct TimerEntry {
    generation: u64,
    cancel: oneshot::Sender<()>,
}

type HandlerSlot = Arc<Mutex<Option<Arc<dyn FireHandler>>>>;

/// In-process scheduler backed by tokio timers.
///
/// One spawned task per pending key sleeps until the deadline or until
/// its cancel channel closes. Replacing a key drops the old entry's
/// sender, which wakes and retires the old task; a generation counter
/// keeps a retiring task from clearing its replacement out of the map.
pub struct TokioScheduler {
    handle: tokio::runtime::Handle,
    timers: Arc<Mutex<HashMap<String, TimerEntry>>>,
    handler: HandlerSlot,
    generation: AtomicU64,
}

impl TokioScheduler {
    /// Create a scheduler that spawns its timer tasks on `handle`.
    #[must_use]
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self {
            handle,
            timers: Arc::new(Mutex::new(HashMap::new())),
            handler: Arc::new(Mutex::new(None)),
            generation: AtomicU64::new(0),
        }
    }

    /// Wire in the handler fired callbacks are delivered to.
    ///
    /// Callbacks that fire before a handler is set are logged and dropped.
    pub fn set_handler(&self, handler: Arc<dyn FireHandler>) {
        *self.handler.lock().unwrap_or_else(|e| e.into_inner()) = Some(handler);
    }

    /// Whether a callback is currently pending under `key`.
    #[must_use]
    pub fn is_scheduled(&self, key: &CallbackKey) -> bool {
        self.timers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(key.as_str())
    }
}

impl CallbackScheduler for TokioScheduler {
    fn schedule(&self, key: &CallbackKey, at: DateTime<Utc>, payload: FirePayload) -> Result<()> {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let (cancel_tx, cancel_rx) = oneshot::channel();

        // Inserting drops any previous entry's sender, which retires the
        // old timer task. Past deadlines collapse to a zero delay.
        let delay = (at - Utc::now()).to_std().unwrap_or(Duration::ZERO);
        {
            let mut timers = self.timers.lock().unwrap_or_else(|e| e.into_inner());
            timers.insert(
                key.as_str().to_owned(),
                TimerEntry {
                    generation,
                    cancel: cancel_tx,
                },
            );
        }

        tracing::debug!(
            key = %key,
            fire_at = %at,
            delay_ms = delay.as_millis() as u64,
            "callback scheduled"
        );

        let key = key.clone();
        let timers = Arc::clone(&self.timers);
        let handler = Arc::clone(&self.handler);
        let deadline = tokio::time::Instant::now() + delay;

        self.handle.spawn(async move {
            tokio::select! {
                () = tokio::time::sleep_until(deadline) => {
                    // Only the entry this task armed may be cleared; a
                    // concurrent replace owns the key now.
                    let current = {
                        let mut timers = timers.lock().unwrap_or_else(|e| e.into_inner());
                        match timers.get(key.as_str()) {
                            Some(entry) if entry.generation == generation => {
                                timers.remove(key.as_str());
                                true
                            }
                            _ => false,
                        }
                    };
                    if !current {
                        tracing::debug!(key = %key, "timer superseded before firing");
                        return;
                    }

                    let handler = handler.lock().unwrap_or_else(|e| e.into_inner()).clone();
                    match handler {
                        Some(handler) => handler.handle_fire(payload),
                        None => tracing::warn!(key = %key, "callback fired with no handler wired; dropping"),
                    }
                }
                _ = cancel_rx => {
                    tracing::debug!(key = %key, "timer cancelled");
                }
            }
        });

        Ok(())
    }

    fn cancel(&self, key: &CallbackKey) -> Result<()> {
        let entry = {
            let mut timers = self.timers.lock().unwrap_or_else(|e| e.into_inner());
            timers.remove(key.as_str())
        };
        if let Some(entry) = entry {
            let _ = entry.cancel.send(());
            tracing::debug!(key = %key, "callback cancelled");
        }
        Ok(())
    }
}

/// In-memory scheduler fake, fired by hand.
///
/// Records schedule and cancel calls without any clock; tests drive
/// firing explicitly through [`ManualScheduler::fire`].
#[derive(Default)]
pub struct ManualScheduler {
    pending: Mutex<HashMap<String, (DateTime<Utc>, FirePayload)>>,
    handler: Mutex<Option<Arc<dyn FireHandler>>>,
}

impl ManualScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wire in the handler [`fire`](Self::fire) delivers payloads to.
    pub fn set_handler(&self, handler: Arc<dyn FireHandler>) {
        *self.handler.lock().unwrap_or_else(|e| e.into_inner()) = Some(handler);
    }

    /// Number of pending callbacks.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// The deadline pending under `key`, if any.
    #[must_use]
    pub fn scheduled_at(&self, key: &CallbackKey) -> Option<DateTime<Utc>> {
        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key.as_str())
            .map(|(at, _)| *at)
    }

    /// Fire the callback pending under `key`, as the host clock would.
    ///
    /// Removes the pending entry and hands its payload to the wired
    /// handler. Returns `false` if nothing was pending under `key`.
    pub fn fire(&self, key: &CallbackKey) -> bool {
        let entry = self
            .pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key.as_str());
        let Some((_, payload)) = entry else {
            return false;
        };
        let handler = self
            .handler
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        if let Some(handler) = handler {
            handler.handle_fire(payload);
        }
        true
    }
}

impl CallbackScheduler for ManualScheduler {
    fn schedule(&self, key: &CallbackKey, at: DateTime<Utc>, payload: FirePayload) -> Result<()> {
        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.as_str().to_owned(), (at, payload));
        Ok(())
    }

    fn cancel(&self, key: &CallbackKey) -> Result<()> {
        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key.as_str());
        Ok(())
    }
}
