//! Built log entries and the records handed to transports.

use super::call::LogCall;
use crate::level::LogLevel;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

/// Payload key holding the timestamp.
pub const TIME_KEY: &str = "time";
/// Payload key holding the severity.
pub const LEVEL_KEY: &str = "level";
/// Payload key holding the logger name.
pub const NAME_KEY: &str = "name";
/// Payload key holding the rendered message.
pub const MESSAGE_KEY: &str = "msg";

/// Returns true for keys the pipeline writes itself.
#[must_use]
pub fn is_reserved_key(key: &str) -> bool {
    matches!(key, TIME_KEY | LEVEL_KEY | NAME_KEY | MESSAGE_KEY)
}

/// An immutable log entry before serialization and masking.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    timestamp: DateTime<Utc>,
    level: LogLevel,
    name: String,
    message: String,
    context: Map<String, Value>,
    bindings: Map<String, Value>,
    fields: Map<String, Value>,
}

impl LogEntry {
    /// Builds an entry from its sources.
    #[must_use]
    pub fn build(
        level: LogLevel,
        name: impl Into<String>,
        context: Map<String, Value>,
        bindings: Map<String, Value>,
        call: &LogCall,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            name: name.into(),
            message: call.format_message(),
            context,
            bindings,
            fields: call.metadata.clone(),
        }
    }

    /// Returns the creation time.
    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Returns the severity.
    #[must_use]
    pub fn level(&self) -> LogLevel {
        self.level
    }

    /// Returns the logger or service name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the rendered message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Flattens the entry into one map.
    ///
    /// Later sources override earlier ones: context, then bindings, then
    /// call metadata. The reserved keys are written last.
    #[must_use]
    pub fn to_payload(&self) -> Map<String, Value> {
        let mut payload = self.context.clone();
        payload.extend(self.bindings.clone());
        payload.extend(self.fields.clone());

        payload.insert(
            TIME_KEY.to_string(),
            Value::String(self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
        payload.insert(LEVEL_KEY.to_string(), Value::String(self.level.as_str().to_string()));
        payload.insert(NAME_KEY.to_string(), Value::String(self.name.clone()));
        payload.insert(MESSAGE_KEY.to_string(), Value::String(self.message.clone()));
        payload
    }
}

/// A finished, masked record as delivered to transports.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogRecord {
    /// Severity.
    pub level: LogLevel,
    /// Creation time.
    pub timestamp: DateTime<Utc>,
    /// Logger or service name.
    pub name: String,
    /// Rendered message.
    pub message: String,
    /// Serialized and masked fields, including the reserved keys.
    pub payload: Map<String, Value>,
}

impl LogRecord {
    /// Returns a payload field.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }

    /// Returns the payload as a JSON object.
    #[must_use]
    pub fn to_json(&self) -> Value {
        Value::Object(self.payload.clone())
    }
}
