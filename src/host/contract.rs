//! Versioned host command/event envelopes for native shell integration.

use serde::{Deserialize, Serialize};

/// Contract version for host command/event envelopes.
pub const EVENT_VERSION: u32 = 1;

/// V1 command set for host integrations.
///
/// App-addressed commands carry the target `app_id` in their payload.
/// This is the trusted shell-to-engine layer; sandboxed script never
/// speaks it and only ever reaches its own bridge object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandName {
    #[serde(rename = "host.ping")]
    HostPing,
    #[serde(rename = "host.version")]
    HostVersion,
    #[serde(rename = "host.stop")]
    HostStop,
    #[serde(rename = "app.create")]
    AppCreate,
    #[serde(rename = "data.save")]
    DataSave,
    #[serde(rename = "data.load")]
    DataLoad,
    #[serde(rename = "data.get_all")]
    DataGetAll,
    #[serde(rename = "data.delete")]
    DataDelete,
    #[serde(rename = "reminder.set")]
    ReminderSet,
    #[serde(rename = "reminder.cancel")]
    ReminderCancel,
    #[serde(rename = "reminder.list")]
    ReminderList,
}

impl CommandName {
    /// Render command name to wire format.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::HostPing => "host.ping",
            Self::HostVersion => "host.version",
            Self::HostStop => "host.stop",
            Self::AppCreate => "app.create",
            Self::DataSave => "data.save",
            Self::DataLoad => "data.load",
            Self::DataGetAll => "data.get_all",
            Self::DataDelete => "data.delete",
            Self::ReminderSet => "reminder.set",
            Self::ReminderCancel => "reminder.cancel",
            Self::ReminderList => "reminder.list",
        }
    }

    /// Parse a command name from wire format.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "host.ping" => Some(Self::HostPing),
            "host.version" => Some(Self::HostVersion),
            "host.stop" => Some(Self::HostStop),
            "app.create" => Some(Self::AppCreate),
            "data.save" => Some(Self::DataSave),
            "data.load" => Some(Self::DataLoad),
            "data.get_all" => Some(Self::DataGetAll),
            "data.delete" => Some(Self::DataDelete),
            "reminder.set" => Some(Self::ReminderSet),
            "reminder.cancel" => Some(Self::ReminderCancel),
            "reminder.list" => Some(Self::ReminderList),
            _ => None,
        }
    }
}

/// A versioned response envelope from backend host -> shell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub v: u32,
    pub request_id: String,
    pub ok: bool,
    pub payload: serde_json::Value,
    pub error: Option<String>,
}

impl ResponseEnvelope {
    /// Build a successful response envelope.
    #[must_use]
    pub fn ok(request_id: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            v: EVENT_VERSION,
            request_id: request_id.into(),
            ok: true,
            payload,
            error: None,
        }
    }

    /// Build an error response envelope.
    #[must_use]
    pub fn error(request_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            v: EVENT_VERSION,
            request_id: request_id.into(),
            ok: false,
            payload: serde_json::Value::Null,
            error: Some(message.into()),
        }
    }
}

/// A versioned command envelope from shell -> backend host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandEnvelope {
    pub v: u32,
    pub request_id: String,
    pub command: CommandName,
    pub payload: serde_json::Value,
}

impl CommandEnvelope {
    /// Build a v1 command envelope.
    #[must_use]
    pub fn new(
        request_id: impl Into<String>,
        command: CommandName,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            v: EVENT_VERSION,
            request_id: request_id.into(),
            command,
            payload,
        }
    }

    /// Validate envelope version and required identifiers.
    pub fn validate(&self) -> Result<(), ContractError> {
        if self.v != EVENT_VERSION {
            return Err(ContractError::new(
                ContractErrorKind::UnsupportedVersion,
                format!(
                    "unsupported contract version {}; expected {}",
                    self.v, EVENT_VERSION
                ),
            ));
        }
        if self.request_id.trim().is_empty() {
            return Err(ContractError::new(
                ContractErrorKind::InvalidEnvelope,
                "request_id cannot be empty".to_owned(),
            ));
        }
        Ok(())
    }
}

/// A versioned event envelope from backend host -> shell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub v: u32,
    pub event_id: String,
    pub event: String,
    pub payload: serde_json::Value,
}

impl EventEnvelope {
    /// Build a v1 event envelope.
    #[must_use]
    pub fn new(
        event_id: impl Into<String>,
        event: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            v: EVENT_VERSION,
            event_id: event_id.into(),
            event: event.into(),
            payload,
        }
    }
}

/// Contract validation error categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractErrorKind {
    UnsupportedVersion,
    InvalidEnvelope,
}

/// Contract validation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractError {
    pub kind: ContractErrorKind,
    pub message: String,
}

impl ContractError {
    #[must_use]
    pub fn new(kind: ContractErrorKind, message: String) -> Self {
        Self { kind, message }
    }
}

impl std::fmt::Display for ContractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for ContractError {}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn command_names_round_trip_through_wire_format() {
        let all = [
            CommandName::HostPing,
            CommandName::HostVersion,
            CommandName::HostStop,
            CommandName::AppCreate,
            CommandName::DataSave,
            CommandName::DataLoad,
            CommandName::DataGetAll,
            CommandName::DataDelete,
            CommandName::ReminderSet,
            CommandName::ReminderCancel,
            CommandName::ReminderList,
        ];
        for name in all {
            assert_eq!(CommandName::parse(name.as_str()), Some(name));
            let json = serde_json::to_string(&name).unwrap();
            assert_eq!(json, format!("\"{}\"", name.as_str()));
        }
    }

    #[test]
    fn unknown_command_name_does_not_parse() {
        assert_eq!(CommandName::parse("data.drop_table"), None);
    }

    #[test]
    fn validate_rejects_wrong_version() {
        let mut envelope =
            CommandEnvelope::new("req-1", CommandName::HostPing, serde_json::json!({}));
        envelope.v = 99;
        let err = envelope.validate().expect_err("must reject v99");
        assert_eq!(err.kind, ContractErrorKind::UnsupportedVersion);
    }

    #[test]
    fn validate_rejects_blank_request_id() {
        let envelope = CommandEnvelope::new("  ", CommandName::HostPing, serde_json::json!({}));
        let err = envelope.validate().expect_err("must reject blank id");
        assert_eq!(err.kind, ContractErrorKind::InvalidEnvelope);
    }

    #[test]
    fn response_envelope_ok_and_error_shapes() {
        let ok = ResponseEnvelope::ok("req-1", serde_json::json!({"value": "x"}));
        assert!(ok.ok);
        assert!(ok.error.is_none());

        let err = ResponseEnvelope::error("req-1", "bad payload");
        assert!(!err.ok);
        assert_eq!(err.payload, serde_json::Value::Null);
        assert_eq!(err.error.as_deref(), Some("bad payload"));
    }

    #[test]
    fn event_envelope_round_trips() {
        let event = EventEnvelope::new("ev-1", "notification.show", serde_json::json!({"id": "n"}));
        let json = serde_json::to_string(&event).unwrap();
        let parsed: EventEnvelope = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, event);
    }
}
