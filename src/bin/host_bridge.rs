//! Headless host bridge binary for stdin/stdout JSON communication.
//!
//! This binary reads `CommandEnvelope` messages as newline-delimited JSON
//! from stdin, dispatches them through the host command channel, and writes
//! `ResponseEnvelope` and `EventEnvelope` messages to stdout.
//!
//! All tracing/diagnostic output goes to stderr so that stdout remains a
//! clean JSON protocol channel.

use std::sync::Arc;
use tokio::sync::broadcast;
use wisp::host::stdio::{run_stdio_bridge, EVENT_CAPACITY};
use wisp::notify::EventNotifier;
use wisp::platform::create_suspend_blocker;
use wisp::reminders::TokioScheduler;
use wisp::{HostConfig, HostRuntime};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise tracing to stderr only (stdout is reserved for the JSON
    // protocol).
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("wisp-host starting");

    let config_path = HostConfig::default_config_path();
    let config = if config_path.exists() {
        HostConfig::from_file(&config_path).map_err(|e| {
            tracing::error!(path = %config_path.display(), error = %e, "failed to load config");
            anyhow::anyhow!("failed to load config {}: {e}", config_path.display())
        })?
    } else {
        tracing::info!(path = %config_path.display(), "no config file; using defaults");
        HostConfig::default()
    };

    // One broadcast channel carries command events and notification events
    // to the shell alike.
    let (event_tx, _event_rx) = broadcast::channel(EVENT_CAPACITY);

    let scheduler = Arc::new(TokioScheduler::new(tokio::runtime::Handle::current()));
    let runtime = Arc::new(HostRuntime::new(
        config,
        Arc::clone(&scheduler) as _,
        Arc::new(EventNotifier::new(event_tx.clone())),
        Arc::from(create_suspend_blocker()),
    ));
    scheduler.set_handler(runtime.dispatcher());

    let restored = runtime.restore_reminders();
    tracing::info!(apps_root = %runtime.apps_root().display(), restored, "engine ready");

    run_stdio_bridge(runtime, event_tx).await.map_err(|e| {
        tracing::error!(error = %e, "wisp-host exited with error");
        anyhow::anyhow!("wisp-host failed: {e}")
    })?;

    tracing::info!("wisp-host shut down cleanly");
    Ok(())
}
