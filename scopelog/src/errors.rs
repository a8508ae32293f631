//! Error types for scopelog.
//!
//! Only configuration errors and adapter (call) errors ever reach application
//! code. Masking, serialization and transport failures are recovered locally
//! by the logging pipeline and exist as types so they can be logged and
//! reported uniformly.

use crate::instrument::{GenericRequest, GenericResponse};
use std::collections::HashMap;
use thiserror::Error;

/// Boxed error returned by adapters, transports and custom transforms.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The main error type for scopelog operations.
#[derive(Debug, Error)]
pub enum ScopelogError {
    /// Invalid settings detected at construction time.
    #[error("{0}")]
    Configuration(#[from] ConfigurationError),

    /// A normalized outbound-call failure.
    #[error("{0}")]
    Adapter(#[from] AdapterError),

    /// A custom masking strategy failed for one field.
    #[error("{0}")]
    MaskingField(#[from] MaskingFieldFailure),

    /// A field serializer failed or timed out.
    #[error("{0}")]
    Serialization(#[from] SerializationFailure),

    /// A transport rejected a record or a flush.
    #[error("{0}")]
    Transport(#[from] TransportFailure),

    /// JSON encoding or decoding error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Error raised when settings are invalid.
#[derive(Debug, Clone, Error)]
#[error(
    "Invalid configuration{}: {message}",
    .field.as_ref().map(|f| format!(" for '{f}'")).unwrap_or_default()
)]
pub struct ConfigurationError {
    /// The error message.
    pub message: String,
    /// The offending setting, if known.
    pub field: Option<String>,
}

impl ConfigurationError {
    /// Creates a new configuration error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            field: None,
        }
    }

    /// Creates a configuration error tied to a setting.
    #[must_use]
    pub fn for_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("type".to_string(), serde_json::json!("ConfigurationError"));
        map.insert("message".to_string(), serde_json::json!(self.message));
        if let Some(ref field) = self.field {
            map.insert("field".to_string(), serde_json::json!(field));
        }
        map
    }
}

/// A normalized failure of an instrumented outbound operation.
///
/// Adapters signal a recognized failure by returning an `AdapterError`
/// (boxed). Any other error is wrapped by [`AdapterError::generic`], keeping
/// the original as the source. The `is_adapter_error` flag discriminates the
/// two shapes.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct AdapterError {
    /// The error message.
    pub message: String,
    /// The request that failed.
    pub request: Option<GenericRequest>,
    /// The response received before failing, if any.
    pub response: Option<GenericResponse>,
    /// True when the adapter raised this error itself.
    pub is_adapter_error: bool,
    /// The underlying error.
    #[source]
    pub source: Option<BoxError>,
}

impl AdapterError {
    /// Creates an adapter-raised error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            request: None,
            response: None,
            is_adapter_error: true,
            source: None,
        }
    }

    /// Wraps an unrecognized failure.
    #[must_use]
    pub fn generic(source: BoxError) -> Self {
        Self {
            message: source.to_string(),
            request: None,
            response: None,
            is_adapter_error: false,
            source: Some(source),
        }
    }

    /// Normalizes whatever an adapter returned into an `AdapterError`.
    ///
    /// A recognized error is returned as raised; the request is only filled
    /// in when the adapter did not attach one.
    #[must_use]
    pub fn normalize(error: BoxError, request: &GenericRequest) -> Self {
        let mut normalized = Self::from_boxed(error);
        if normalized.request.is_none() {
            normalized.request = Some(request.clone());
        }
        normalized
    }

    /// Unboxes a recognized error, or wraps anything else as generic.
    #[must_use]
    pub fn from_boxed(error: BoxError) -> Self {
        match error.downcast::<Self>() {
            Ok(recognized) => *recognized,
            Err(other) => Self::generic(other),
        }
    }

    /// Sets the request.
    #[must_use]
    pub fn with_request(mut self, request: GenericRequest) -> Self {
        self.request = Some(request);
        self
    }

    /// Sets the response.
    #[must_use]
    pub fn with_response(mut self, response: GenericResponse) -> Self {
        self.response = Some(response);
        self
    }

    /// Sets the underlying error.
    #[must_use]
    pub fn with_source(mut self, source: BoxError) -> Self {
        self.source = Some(source);
        self
    }

    /// Returns the response status, if a response was attached.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        self.response.as_ref().map(|r| r.status)
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("type".to_string(), serde_json::json!("AdapterError"));
        map.insert("message".to_string(), serde_json::json!(self.message));
        map.insert(
            "is_adapter_error".to_string(),
            serde_json::json!(self.is_adapter_error),
        );
        if let Some(ref response) = self.response {
            map.insert("status".to_string(), serde_json::json!(response.status));
            if let Some(ref body) = response.body {
                map.insert("response_body".to_string(), body.clone());
            }
        }
        if let Some(ref source) = self.source {
            map.insert("cause".to_string(), serde_json::json!(source.to_string()));
        }
        map
    }
}

/// A custom masking strategy failed; the field keeps its original value.
#[derive(Debug, Clone, Error)]
#[error("Masking failed for field '{key}': {reason}")]
pub struct MaskingFieldFailure {
    /// The field being masked.
    pub key: String,
    /// Why the strategy failed.
    pub reason: String,
}

impl MaskingFieldFailure {
    /// Creates a new masking failure.
    #[must_use]
    pub fn new(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("type".to_string(), serde_json::json!("MaskingFieldFailure"));
        map.insert("key".to_string(), serde_json::json!(self.key));
        map.insert("reason".to_string(), serde_json::json!(self.reason));
        map
    }
}

/// A field serializer was skipped.
#[derive(Debug, Clone, Error)]
pub enum SerializationFailure {
    /// The transform exceeded its time budget.
    #[error("Serializer for field '{field}' timed out after {timeout_ms}ms")]
    Timeout {
        /// The field name.
        field: String,
        /// The budget in milliseconds.
        timeout_ms: u64,
    },

    /// The transform returned an error.
    #[error("Serializer for field '{field}' failed: {reason}")]
    Transform {
        /// The field name.
        field: String,
        /// The failure reason.
        reason: String,
    },
}

impl SerializationFailure {
    /// Returns the field the failure belongs to.
    #[must_use]
    pub fn field(&self) -> &str {
        match self {
            Self::Timeout { field, .. } | Self::Transform { field, .. } => field,
        }
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("type".to_string(), serde_json::json!("SerializationFailure"));
        map.insert("field".to_string(), serde_json::json!(self.field()));
        match self {
            Self::Timeout { timeout_ms, .. } => {
                map.insert("timeout_ms".to_string(), serde_json::json!(timeout_ms));
            }
            Self::Transform { reason, .. } => {
                map.insert("reason".to_string(), serde_json::json!(reason));
            }
        }
        map
    }
}

/// A transport rejected a `log` or `flush` call.
#[derive(Debug, Clone, Error)]
#[error("Transport '{transport}' failed during {operation}: {reason}")]
pub struct TransportFailure {
    /// The transport name.
    pub transport: String,
    /// The operation (`log` or `flush`).
    pub operation: String,
    /// The failure reason.
    pub reason: String,
}

impl TransportFailure {
    /// Creates a new transport failure.
    #[must_use]
    pub fn new(
        transport: impl Into<String>,
        operation: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            transport: transport.into(),
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("type".to_string(), serde_json::json!("TransportFailure"));
        map.insert("transport".to_string(), serde_json::json!(self.transport));
        map.insert("operation".to_string(), serde_json::json!(self.operation));
        map.insert("reason".to_string(), serde_json::json!(self.reason));
        map
    }
}
