//! Values stored in a context scope.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

/// A value held in a context scope.
///
/// Only text and byte values are eligible for outbound header injection;
/// arbitrary JSON values are carried for logging only.
#[derive(Debug, Clone, PartialEq)]
pub enum ContextValue {
    /// A string value.
    Text(String),
    /// A raw byte sequence.
    Bytes(Vec<u8>),
    /// Any JSON-like value.
    Json(serde_json::Value),
}

impl ContextValue {
    /// Returns the value as a string slice if it is textual.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Json(serde_json::Value::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Renders the value for a wire header.
    ///
    /// Returns `None` for values that have no header representation.
    #[must_use]
    pub fn to_header_value(&self) -> Option<String> {
        match self {
            Self::Text(s) | Self::Json(serde_json::Value::String(s)) => Some(s.clone()),
            Self::Bytes(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
            Self::Json(_) => None,
        }
    }

    /// Renders the value for a log entry.
    ///
    /// Bytes become UTF-8 text when valid, otherwise base64.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Text(s) => serde_json::Value::String(s.clone()),
            Self::Bytes(bytes) => match std::str::from_utf8(bytes) {
                Ok(text) => serde_json::Value::String(text.to_string()),
                Err(_) => serde_json::Value::String(BASE64.encode(bytes)),
            },
            Self::Json(value) => value.clone(),
        }
    }
}

impl From<&str> for ContextValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ContextValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<u8>> for ContextValue {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

impl From<&[u8]> for ContextValue {
    fn from(value: &[u8]) -> Self {
        Self::Bytes(value.to_vec())
    }
}

impl From<serde_json::Value> for ContextValue {
    fn from(value: serde_json::Value) -> Self {
        Self::Json(value)
    }
}
