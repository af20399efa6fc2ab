//! Reminder registry, callback scheduling, and fire dispatch.

pub mod dispatcher;
pub mod record;
pub mod registry;
pub mod scheduler;

pub use dispatcher::ReminderDispatcher;
pub use record::{notification_id, CallbackKey, FirePayload, Reminder};
pub use registry::ReminderRegistry;
pub use scheduler::{CallbackScheduler, FireHandler, ManualScheduler, TokioScheduler};
