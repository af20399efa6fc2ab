//! Wisp: backing engine for a sandboxed mini-app host.
//!
//! This crate provides the durable state and timing machinery behind a
//! shell that runs small scripted apps:
//! - **Storage**: one JSON key/value document per app, self-healing on
//!   corruption
//! - **Reminders**: a per-app registry kept in lock-step with a
//!   deferred-callback scheduler, surviving restarts
//! - **Dispatch**: fired callbacks become notifications and registry
//!   updates under a scoped suspend hold
//! - **Bridge**: a capability façade per app, identity baked in at
//!   construction, that never raises into scripts
//!
//! Shells integrate over the host command channel (`host` module) or by
//! embedding [`HostRuntime`] directly.

pub mod app_id;
pub mod bridge;
pub mod config;
pub mod error;
pub mod host;
pub mod notify;
pub mod platform;
pub mod reminders;
pub mod runtime;
pub mod store;
pub mod wisp_dirs;

pub use app_id::AppId;
pub use bridge::AppBridge;
pub use config::HostConfig;
pub use error::{HostError, Result};
pub use runtime::HostRuntime;
pub use store::AppDataStore;
