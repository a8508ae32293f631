//! Type-specific field transforms run before masking.
//!
//! Each field is offered to the registered serializers in order; the first
//! one that accepts it transforms the value under a timeout. A transform
//! that fails or times out leaves that field as it was.

use super::entry::is_reserved_key;
use crate::errors::{BoxError, SerializationFailure};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::error::Error as StdError;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Default per-field serializer budget.
pub const DEFAULT_SERIALIZER_TIMEOUT: Duration = Duration::from_millis(100);

/// A transform for fields of a particular shape.
#[async_trait]
pub trait FieldSerializer: Send + Sync {
    /// Returns the serializer name used in diagnostics.
    fn name(&self) -> &str;

    /// Returns true if this serializer handles the field.
    fn accepts(&self, key: &str, value: &Value) -> bool;

    /// Transforms the value.
    async fn serialize(&self, value: &Value) -> Result<Value, BoxError>;
}

/// Normalizes error-like values under `err` / `error` into
/// `{type, message, stack?}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorSerializer;

#[async_trait]
impl FieldSerializer for ErrorSerializer {
    fn name(&self) -> &str {
        "error"
    }

    fn accepts(&self, key: &str, _value: &Value) -> bool {
        matches!(key, "err" | "error")
    }

    async fn serialize(&self, value: &Value) -> Result<Value, BoxError> {
        match value {
            Value::String(message) => Ok(json!({"type": "Error", "message": message})),
            Value::Object(fields) => {
                let kind = fields
                    .get("type")
                    .or_else(|| fields.get("name"))
                    .and_then(Value::as_str)
                    .unwrap_or("Error");
                let message = fields
                    .get("message")
                    .and_then(Value::as_str)
                    .ok_or("error object has no message")?;

                let mut shaped = Map::new();
                shaped.insert("type".to_string(), json!(kind));
                shaped.insert("message".to_string(), json!(message));
                if let Some(stack) = fields.get("stack").filter(|s| !s.is_null()) {
                    shaped.insert("stack".to_string(), stack.clone());
                }
                Ok(Value::Object(shaped))
            }
            other => Err(format!("cannot serialize {other} as an error").into()),
        }
    }
}

/// Renders a Rust error as a value the [`ErrorSerializer`] understands.
///
/// The source chain becomes the `stack`.
#[must_use]
pub fn error_value(error: &(dyn StdError + 'static)) -> Value {
    let mut causes = Vec::new();
    let mut source = error.source();
    while let Some(cause) = source {
        causes.push(format!("caused by: {cause}"));
        source = cause.source();
    }

    let mut fields = Map::new();
    fields.insert("message".to_string(), json!(error.to_string()));
    if !causes.is_empty() {
        fields.insert("stack".to_string(), json!(causes.join("\n")));
    }
    Value::Object(fields)
}

/// Ordered serializers sharing one per-field timeout.
#[derive(Clone)]
pub struct SerializerRegistry {
    serializers: Vec<Arc<dyn FieldSerializer>>,
    timeout: Duration,
}

impl std::fmt::Debug for SerializerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerializerRegistry")
            .field(
                "serializers",
                &self.serializers.iter().map(|s| s.name()).collect::<Vec<_>>(),
            )
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Default for SerializerRegistry {
    fn default() -> Self {
        Self::with_defaults(DEFAULT_SERIALIZER_TIMEOUT)
    }
}

impl SerializerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            serializers: Vec::new(),
            timeout,
        }
    }

    /// Creates a registry holding the built-in error serializer.
    #[must_use]
    pub fn with_defaults(timeout: Duration) -> Self {
        Self::new(timeout).with_serializer(Arc::new(ErrorSerializer))
    }

    /// Registers a serializer after the existing ones.
    #[must_use]
    pub fn with_serializer(mut self, serializer: Arc<dyn FieldSerializer>) -> Self {
        self.serializers.push(serializer);
        self
    }

    /// Returns the per-field timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the number of registered serializers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.serializers.len()
    }

    /// Returns true if no serializer is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.serializers.is_empty()
    }

    /// Runs the serializers over every non-reserved field.
    pub async fn apply(&self, payload: Map<String, Value>) -> Map<String, Value> {
        if self.serializers.is_empty() {
            return payload;
        }

        let mut out = Map::with_capacity(payload.len());
        for (key, value) in payload {
            let value = if is_reserved_key(&key) {
                value
            } else {
                self.serialize_field(&key, value).await
            };
            out.insert(key, value);
        }
        out
    }

    async fn serialize_field(&self, key: &str, value: Value) -> Value {
        let Some(serializer) = self.serializers.iter().find(|s| s.accepts(key, &value)) else {
            return value;
        };

        match self.run(serializer.as_ref(), key, &value).await {
            Ok(serialized) => serialized,
            Err(failure) => {
                warn!(
                    serializer = serializer.name(),
                    field = failure.field(),
                    error = %failure,
                    "Field serializer skipped"
                );
                value
            }
        }
    }

    async fn run(
        &self,
        serializer: &dyn FieldSerializer,
        key: &str,
        value: &Value,
    ) -> Result<Value, SerializationFailure> {
        match tokio::time::timeout(self.timeout, serializer.serialize(value)).await {
            Ok(Ok(serialized)) => Ok(serialized),
            Ok(Err(e)) => Err(SerializationFailure::Transform {
                field: key.to_string(),
                reason: e.to_string(),
            }),
            Err(_) => Err(SerializationFailure::Timeout {
                field: key.to_string(),
                timeout_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
            }),
        }
    }
}
