//! Host command channel and router for native shell integrations.

use crate::app_id::AppId;
use crate::bridge::AppBridge;
use crate::error::{HostError, Result};
use crate::host::contract::{CommandEnvelope, CommandName, EventEnvelope, ResponseEnvelope};
use crate::runtime::HostRuntime;
use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};

struct HostCommandRequest {
    envelope: CommandEnvelope,
    response_tx: oneshot::Sender<Result<ResponseEnvelope>>,
}

#[derive(Clone)]
pub struct HostCommandClient {
    request_tx: mpsc::Sender<HostCommandRequest>,
    event_tx: broadcast::Sender<EventEnvelope>,
}

impl HostCommandClient {
    pub async fn send(&self, envelope: CommandEnvelope) -> Result<ResponseEnvelope> {
        envelope.validate().map_err(|e| {
            HostError::Contract(format!(
                "invalid host command envelope {}: {}",
                envelope.request_id, e
            ))
        })?;

        let (response_tx, response_rx) = oneshot::channel();
        self.request_tx
            .send(HostCommandRequest {
                envelope,
                response_tx,
            })
            .await
            .map_err(|e| HostError::Channel(format!("failed to send host command request: {e}")))?;

        response_rx
            .await
            .map_err(|e| HostError::Channel(format!("host command response dropped: {e}")))?
    }

    #[must_use]
    pub fn subscribe_events(&self) -> broadcast::Receiver<EventEnvelope> {
        self.event_tx.subscribe()
    }
}

pub struct HostCommandServer {
    request_rx: mpsc::Receiver<HostCommandRequest>,
    event_tx: broadcast::Sender<EventEnvelope>,
    runtime: Arc<HostRuntime>,
}

#[must_use]
pub fn command_channel(
    request_capacity: usize,
    event_capacity: usize,
    runtime: Arc<HostRuntime>,
) -> (HostCommandClient, HostCommandServer) {
    let (event_tx, _event_rx) = broadcast::channel(event_capacity.max(1));
    command_channel_with_events(request_capacity, event_tx, runtime)
}

/// Create a command channel using an existing event broadcast sender.
///
/// This allows the runtime's notifier and the command server to share the
/// same broadcast channel, so notification events raised by a firing
/// reminder reach the shell through the same path as command events.
#[must_use]
pub fn command_channel_with_events(
    request_capacity: usize,
    event_tx: broadcast::Sender<EventEnvelope>,
    runtime: Arc<HostRuntime>,
) -> (HostCommandClient, HostCommandServer) {
    let (request_tx, request_rx) = mpsc::channel(request_capacity.max(1));

    (
        HostCommandClient {
            request_tx,
            event_tx: event_tx.clone(),
        },
        HostCommandServer {
            request_rx,
            event_tx,
            runtime,
        },
    )
}

impl HostCommandServer {
    pub async fn run(mut self) {
        while let Some(request) = self.request_rx.recv().await {
            let response = self.route(&request.envelope);
            let _ = request.response_tx.send(response);
        }
    }

    /// Route a command envelope to the appropriate handler.
    pub fn route(&self, envelope: &CommandEnvelope) -> Result<ResponseEnvelope> {
        match envelope.command {
            CommandName::HostPing => Ok(ResponseEnvelope::ok(
                envelope.request_id.clone(),
                serde_json::json!({"pong": true}),
            )),
            CommandName::HostVersion => Ok(ResponseEnvelope::ok(
                envelope.request_id.clone(),
                serde_json::json!({
                    "contract_version": crate::host::contract::EVENT_VERSION,
                    "engine": env!("CARGO_PKG_NAME"),
                    "version": env!("CARGO_PKG_VERSION")
                }),
            )),
            CommandName::HostStop => Ok(ResponseEnvelope::ok(
                envelope.request_id.clone(),
                serde_json::json!({"stopping": true}),
            )),
            CommandName::AppCreate => self.handle_app_create(envelope),
            CommandName::DataSave => self.handle_data_save(envelope),
            CommandName::DataLoad => self.handle_data_load(envelope),
            CommandName::DataGetAll => self.handle_data_get_all(envelope),
            CommandName::DataDelete => self.handle_data_delete(envelope),
            CommandName::ReminderSet => self.handle_reminder_set(envelope),
            CommandName::ReminderCancel => self.handle_reminder_cancel(envelope),
            CommandName::ReminderList => self.handle_reminder_list(envelope),
        }
    }

    fn handle_app_create(&self, envelope: &CommandEnvelope) -> Result<ResponseEnvelope> {
        let app_id = AppBridge::generate_app_id();

        self.emit_event(
            "app.created",
            serde_json::json!({
                "request_id": envelope.request_id,
                "app_id": app_id.as_str()
            }),
        );

        Ok(ResponseEnvelope::ok(
            envelope.request_id.clone(),
            serde_json::json!({"app_id": app_id.as_str()}),
        ))
    }

    fn handle_data_save(&self, envelope: &CommandEnvelope) -> Result<ResponseEnvelope> {
        let bridge = self.open_bridge(&envelope.payload, "data.save")?;
        let key = parse_string_field(&envelope.payload, "key", "data.save")?;
        let value = parse_string_field(&envelope.payload, "value", "data.save")?;
        bridge.save_data(&key, &value);

        Ok(ResponseEnvelope::ok(
            envelope.request_id.clone(),
            serde_json::json!({"accepted": true, "key": key}),
        ))
    }

    fn handle_data_load(&self, envelope: &CommandEnvelope) -> Result<ResponseEnvelope> {
        let bridge = self.open_bridge(&envelope.payload, "data.load")?;
        let key = parse_string_field(&envelope.payload, "key", "data.load")?;
        let value = bridge.load_data(&key);

        Ok(ResponseEnvelope::ok(
            envelope.request_id.clone(),
            serde_json::json!({"key": key, "value": value}),
        ))
    }

    fn handle_data_get_all(&self, envelope: &CommandEnvelope) -> Result<ResponseEnvelope> {
        let bridge = self.open_bridge(&envelope.payload, "data.get_all")?;

        Ok(ResponseEnvelope::ok(
            envelope.request_id.clone(),
            serde_json::json!({"data": bridge.get_all_data()}),
        ))
    }

    fn handle_data_delete(&self, envelope: &CommandEnvelope) -> Result<ResponseEnvelope> {
        let bridge = self.open_bridge(&envelope.payload, "data.delete")?;
        let key = parse_string_field(&envelope.payload, "key", "data.delete")?;
        bridge.delete_data(&key);

        Ok(ResponseEnvelope::ok(
            envelope.request_id.clone(),
            serde_json::json!({"accepted": true, "key": key}),
        ))
    }

    fn handle_reminder_set(&self, envelope: &CommandEnvelope) -> Result<ResponseEnvelope> {
        let bridge = self.open_bridge(&envelope.payload, "reminder.set")?;
        let id = parse_string_field(&envelope.payload, "id", "reminder.set")?;
        let fire_at = parse_fire_at(&envelope.payload, "reminder.set")?;
        let title = parse_optional_string(&envelope.payload, "title");
        let message = parse_optional_string(&envelope.payload, "message");
        bridge.set_reminder(&id, fire_at, &title, &message);

        self.emit_event(
            "reminder.scheduled",
            serde_json::json!({
                "request_id": envelope.request_id,
                "app_id": bridge.app_id().as_str(),
                "id": id,
                "fire_at": fire_at.to_rfc3339()
            }),
        );

        Ok(ResponseEnvelope::ok(
            envelope.request_id.clone(),
            serde_json::json!({"accepted": true, "id": id}),
        ))
    }

    fn handle_reminder_cancel(&self, envelope: &CommandEnvelope) -> Result<ResponseEnvelope> {
        let bridge = self.open_bridge(&envelope.payload, "reminder.cancel")?;
        let id = parse_string_field(&envelope.payload, "id", "reminder.cancel")?;
        bridge.cancel_reminder(&id);

        self.emit_event(
            "reminder.cancelled",
            serde_json::json!({
                "request_id": envelope.request_id,
                "app_id": bridge.app_id().as_str(),
                "id": id
            }),
        );

        Ok(ResponseEnvelope::ok(
            envelope.request_id.clone(),
            serde_json::json!({"accepted": true, "id": id}),
        ))
    }

    fn handle_reminder_list(&self, envelope: &CommandEnvelope) -> Result<ResponseEnvelope> {
        let bridge = self.open_bridge(&envelope.payload, "reminder.list")?;

        Ok(ResponseEnvelope::ok(
            envelope.request_id.clone(),
            serde_json::json!({"reminders": bridge.get_reminders()}),
        ))
    }

    /// Resolve the per-app bridge for a command payload.
    ///
    /// A missing or empty `app_id` is a shell bug, not script input, so it
    /// fails the envelope instead of degrading to a fallback value.
    fn open_bridge(&self, payload: &serde_json::Value, command: &str) -> Result<AppBridge> {
        let app_id = parse_app_id(payload, command)?;
        Ok(self.runtime.open_bridge(AppId::new(app_id)))
    }

    fn emit_event(&self, event: &str, payload: serde_json::Value) {
        let envelope =
            EventEnvelope::new(uuid::Uuid::new_v4().to_string(), event.to_owned(), payload);
        let _ = self.event_tx.send(envelope);
    }
}

fn parse_app_id(payload: &serde_json::Value, command: &str) -> Result<String> {
    let Some(raw) = payload.get("app_id").and_then(serde_json::Value::as_str) else {
        return Err(HostError::Contract(format!(
            "{command} requires payload.app_id"
        )));
    };
    let app_id = raw.trim();
    if app_id.is_empty() {
        return Err(HostError::Contract(format!(
            "{command} requires a non-empty payload.app_id"
        )));
    }
    Ok(app_id.to_owned())
}

/// Require `field` to be present as a string. Empty strings pass through:
/// the bridge treats them as no-ops rather than the wire rejecting them.
fn parse_string_field(payload: &serde_json::Value, field: &str, command: &str) -> Result<String> {
    let Some(raw) = payload.get(field).and_then(serde_json::Value::as_str) else {
        return Err(HostError::Contract(format!(
            "{command} requires payload.{field} (string)"
        )));
    };
    Ok(raw.to_owned())
}

fn parse_optional_string(payload: &serde_json::Value, field: &str) -> String {
    payload
        .get(field)
        .and_then(serde_json::Value::as_str)
        .unwrap_or_default()
        .to_owned()
}

fn parse_fire_at(payload: &serde_json::Value, command: &str) -> Result<DateTime<Utc>> {
    let Some(raw) = payload.get("fire_at") else {
        return Err(HostError::Contract(format!(
            "{command} requires payload.fire_at"
        )));
    };

    match raw {
        serde_json::Value::String(text) => DateTime::parse_from_rfc3339(text)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| {
                HostError::Contract(format!("{command} payload.fire_at is not RFC 3339: {e}"))
            }),
        serde_json::Value::Number(number) => {
            let Some(millis) = number.as_i64() else {
                return Err(HostError::Contract(format!(
                    "{command} payload.fire_at must be whole epoch milliseconds"
                )));
            };
            Utc.timestamp_millis_opt(millis).single().ok_or_else(|| {
                HostError::Contract(format!(
                    "{command} payload.fire_at is out of range: {millis}"
                ))
            })
        }
        _ => Err(HostError::Contract(format!(
            "{command} payload.fire_at must be an RFC 3339 string or epoch milliseconds"
        ))),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::config::{HostConfig, StorageConfig};
    use crate::notify::RecordingNotifier;
    use crate::platform::stub::StubSuspendBlocker;
    use crate::reminders::ManualScheduler;
    use std::path::Path;

    fn make_runtime(dir: &Path, scheduler: Arc<ManualScheduler>) -> Arc<HostRuntime> {
        let config = HostConfig {
            storage: StorageConfig {
                data_dir: Some(dir.to_path_buf()),
            },
            ..HostConfig::default()
        };
        Arc::new(HostRuntime::new(
            config,
            scheduler,
            Arc::new(RecordingNotifier::new()),
            Arc::new(StubSuspendBlocker::new()),
        ))
    }

    fn make_server(dir: &Path, scheduler: Arc<ManualScheduler>) -> HostCommandServer {
        let (_client, server) = command_channel(8, 8, make_runtime(dir, scheduler));
        server
    }

    fn make_envelope(command: CommandName, payload: serde_json::Value) -> CommandEnvelope {
        CommandEnvelope::new("test-req-1", command, payload)
    }

    #[test]
    fn ping_pongs() {
        let dir = tempfile::tempdir().unwrap();
        let server = make_server(dir.path(), Arc::new(ManualScheduler::new()));
        let resp = server
            .route(&make_envelope(CommandName::HostPing, serde_json::json!({})))
            .unwrap();
        assert!(resp.ok);
        assert_eq!(resp.payload["pong"], true);
    }

    #[test]
    fn version_reports_contract_and_engine() {
        let dir = tempfile::tempdir().unwrap();
        let server = make_server(dir.path(), Arc::new(ManualScheduler::new()));
        let resp = server
            .route(&make_envelope(
                CommandName::HostVersion,
                serde_json::json!({}),
            ))
            .unwrap();
        assert!(resp.ok);
        assert_eq!(
            resp.payload["contract_version"],
            crate::host::contract::EVENT_VERSION
        );
        assert!(resp.payload["version"].is_string());
    }

    #[test]
    fn app_create_returns_fresh_id_and_emits_event() {
        let dir = tempfile::tempdir().unwrap();
        let (client, server) =
            command_channel(8, 8, make_runtime(dir.path(), Arc::new(ManualScheduler::new())));
        let mut events = client.subscribe_events();

        let resp = server
            .route(&make_envelope(CommandName::AppCreate, serde_json::json!({})))
            .unwrap();
        assert!(resp.ok);
        let app_id = resp.payload["app_id"].as_str().unwrap();
        assert!(app_id.starts_with("app_"));

        let event = events.try_recv().unwrap();
        assert_eq!(event.event, "app.created");
        assert_eq!(event.payload["app_id"], app_id);
    }

    #[test]
    fn data_save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let server = make_server(dir.path(), Arc::new(ManualScheduler::new()));

        let save = make_envelope(
            CommandName::DataSave,
            serde_json::json!({"app_id": "app_1", "key": "tasks", "value": "[\"buy milk\"]"}),
        );
        assert!(server.route(&save).unwrap().ok);

        let load = make_envelope(
            CommandName::DataLoad,
            serde_json::json!({"app_id": "app_1", "key": "tasks"}),
        );
        let resp = server.route(&load).unwrap();
        assert_eq!(resp.payload["value"], "[\"buy milk\"]");
    }

    #[test]
    fn data_load_for_other_app_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let server = make_server(dir.path(), Arc::new(ManualScheduler::new()));

        let save = make_envelope(
            CommandName::DataSave,
            serde_json::json!({"app_id": "app_1", "key": "secret", "value": "mine"}),
        );
        server.route(&save).unwrap();

        let load = make_envelope(
            CommandName::DataLoad,
            serde_json::json!({"app_id": "app_2", "key": "secret"}),
        );
        assert_eq!(server.route(&load).unwrap().payload["value"], "");
    }

    #[test]
    fn data_get_all_passes_the_document_through() {
        let dir = tempfile::tempdir().unwrap();
        let server = make_server(dir.path(), Arc::new(ManualScheduler::new()));

        for (k, v) in [("a", "1"), ("b", "2")] {
            let save = make_envelope(
                CommandName::DataSave,
                serde_json::json!({"app_id": "app_1", "key": k, "value": v}),
            );
            server.route(&save).unwrap();
        }

        let get_all = make_envelope(
            CommandName::DataGetAll,
            serde_json::json!({"app_id": "app_1"}),
        );
        let resp = server.route(&get_all).unwrap();
        let raw = resp.payload["data"].as_str().unwrap();
        let parsed: std::collections::BTreeMap<String, String> =
            serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.len(), 2);
    }

    #[test]
    fn data_delete_removes_the_key() {
        let dir = tempfile::tempdir().unwrap();
        let server = make_server(dir.path(), Arc::new(ManualScheduler::new()));

        let save = make_envelope(
            CommandName::DataSave,
            serde_json::json!({"app_id": "app_1", "key": "k", "value": "v"}),
        );
        server.route(&save).unwrap();
        let delete = make_envelope(
            CommandName::DataDelete,
            serde_json::json!({"app_id": "app_1", "key": "k"}),
        );
        assert!(server.route(&delete).unwrap().ok);

        let load = make_envelope(
            CommandName::DataLoad,
            serde_json::json!({"app_id": "app_1", "key": "k"}),
        );
        assert_eq!(server.route(&load).unwrap().payload["value"], "");
    }

    #[test]
    fn missing_app_id_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let server = make_server(dir.path(), Arc::new(ManualScheduler::new()));

        let envelope = make_envelope(
            CommandName::DataLoad,
            serde_json::json!({"key": "tasks"}),
        );
        assert!(server.route(&envelope).is_err());

        let blank = make_envelope(
            CommandName::DataLoad,
            serde_json::json!({"app_id": "  ", "key": "tasks"}),
        );
        assert!(server.route(&blank).is_err());
    }

    #[test]
    fn missing_key_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let server = make_server(dir.path(), Arc::new(ManualScheduler::new()));

        let envelope = make_envelope(
            CommandName::DataSave,
            serde_json::json!({"app_id": "app_1", "value": "v"}),
        );
        assert!(server.route(&envelope).is_err());
    }

    #[test]
    fn reminder_set_accepts_rfc3339_and_schedules() {
        let dir = tempfile::tempdir().unwrap();
        let scheduler = Arc::new(ManualScheduler::new());
        let server = make_server(dir.path(), Arc::clone(&scheduler));

        let envelope = make_envelope(
            CommandName::ReminderSet,
            serde_json::json!({
                "app_id": "app_1",
                "id": "r1",
                "fire_at": "2026-09-01T09:00:00Z",
                "title": "Stand up",
                "message": "stretch"
            }),
        );
        let resp = server.route(&envelope).unwrap();
        assert!(resp.ok);
        assert_eq!(resp.payload["id"], "r1");
        assert_eq!(scheduler.pending_count(), 1);
    }

    #[test]
    fn reminder_set_accepts_epoch_milliseconds() {
        let dir = tempfile::tempdir().unwrap();
        let scheduler = Arc::new(ManualScheduler::new());
        let server = make_server(dir.path(), Arc::clone(&scheduler));

        let at = Utc::now() + chrono::Duration::minutes(10);
        let envelope = make_envelope(
            CommandName::ReminderSet,
            serde_json::json!({
                "app_id": "app_1",
                "id": "r1",
                "fire_at": at.timestamp_millis()
            }),
        );
        assert!(server.route(&envelope).unwrap().ok);

        let key = crate::reminders::CallbackKey::derive("app_1", "r1");
        let scheduled = scheduler.scheduled_at(&key).unwrap();
        assert_eq!(scheduled.timestamp_millis(), at.timestamp_millis());
    }

    #[test]
    fn reminder_set_rejects_malformed_fire_at() {
        let dir = tempfile::tempdir().unwrap();
        let server = make_server(dir.path(), Arc::new(ManualScheduler::new()));

        for fire_at in [
            serde_json::json!("next tuesday"),
            serde_json::json!(1.5),
            serde_json::json!(["2026-09-01T09:00:00Z"]),
        ] {
            let envelope = make_envelope(
                CommandName::ReminderSet,
                serde_json::json!({"app_id": "app_1", "id": "r1", "fire_at": fire_at}),
            );
            assert!(server.route(&envelope).is_err(), "{fire_at} should fail");
        }
    }

    #[test]
    fn reminder_cancel_unknown_id_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let server = make_server(dir.path(), Arc::new(ManualScheduler::new()));

        let envelope = make_envelope(
            CommandName::ReminderCancel,
            serde_json::json!({"app_id": "app_1", "id": "never-set"}),
        );
        assert!(server.route(&envelope).unwrap().ok);
    }

    #[test]
    fn reminder_list_passes_the_registry_through() {
        let dir = tempfile::tempdir().unwrap();
        let scheduler = Arc::new(ManualScheduler::new());
        let server = make_server(dir.path(), Arc::clone(&scheduler));

        let set = make_envelope(
            CommandName::ReminderSet,
            serde_json::json!({
                "app_id": "app_1",
                "id": "r1",
                "fire_at": "2026-09-01T09:00:00Z",
                "title": "t"
            }),
        );
        server.route(&set).unwrap();

        let list = make_envelope(
            CommandName::ReminderList,
            serde_json::json!({"app_id": "app_1"}),
        );
        let resp = server.route(&list).unwrap();
        let raw = resp.payload["reminders"].as_str().unwrap();
        let parsed: Vec<serde_json::Value> = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0]["id"], "r1");
    }

    #[test]
    fn reminder_set_then_cancel_emits_both_events() {
        let dir = tempfile::tempdir().unwrap();
        let (client, server) =
            command_channel(8, 8, make_runtime(dir.path(), Arc::new(ManualScheduler::new())));
        let mut events = client.subscribe_events();

        let set = make_envelope(
            CommandName::ReminderSet,
            serde_json::json!({
                "app_id": "app_1",
                "id": "r1",
                "fire_at": "2026-09-01T09:00:00Z"
            }),
        );
        server.route(&set).unwrap();
        let cancel = make_envelope(
            CommandName::ReminderCancel,
            serde_json::json!({"app_id": "app_1", "id": "r1"}),
        );
        server.route(&cancel).unwrap();

        assert_eq!(events.try_recv().unwrap().event, "reminder.scheduled");
        assert_eq!(events.try_recv().unwrap().event, "reminder.cancelled");
    }
}
