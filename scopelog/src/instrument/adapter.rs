//! Adapter contracts wrapped by the instrumentation layer.
//!
//! Adapters are the external clients (HTTP-like request/response or pub/sub
//! brokers) whose calls get identity injection and timed logging.

use crate::context::ContextValue;
use crate::errors::BoxError;
use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

/// A transport-neutral outbound request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenericRequest {
    /// The operation, e.g. an HTTP method.
    pub method: String,
    /// The target, e.g. a URL or path.
    pub target: String,
    /// Headers to send.
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Optional body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
}

impl GenericRequest {
    /// Creates a request with no headers or body.
    #[must_use]
    pub fn new(method: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            target: target.into(),
            headers: HashMap::new(),
            body: None,
        }
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// A transport-neutral response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenericResponse {
    /// Status code.
    pub status: u16,
    /// Response headers.
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Optional body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
}

impl GenericResponse {
    /// Creates a response with a status only.
    #[must_use]
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: None,
        }
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Returns true for 2xx statuses.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// A message header value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderValue {
    /// Text header.
    Text(String),
    /// Binary header.
    Bytes(Vec<u8>),
}

impl HeaderValue {
    /// Renders the header as text, replacing invalid UTF-8.
    #[must_use]
    pub fn to_text(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Bytes(b) => String::from_utf8_lossy(b).into_owned(),
        }
    }
}

impl From<&str> for HeaderValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for HeaderValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<u8>> for HeaderValue {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

impl From<HeaderValue> for ContextValue {
    fn from(value: HeaderValue) -> Self {
        match value {
            HeaderValue::Text(s) => Self::Text(s),
            HeaderValue::Bytes(b) => Self::Bytes(b),
        }
    }
}

/// A pub/sub message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    /// Raw payload.
    pub payload: Vec<u8>,
    /// Carried headers.
    pub headers: HashMap<String, HeaderValue>,
}

impl Message {
    /// Creates a message with no headers.
    #[must_use]
    pub fn new(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            payload: payload.into(),
            headers: HashMap::new(),
        }
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<HeaderValue>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Returns a header rendered as text.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<String> {
        self.headers.get(name).map(HeaderValue::to_text)
    }
}

/// Completion controls handed to a message handler.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Delivery: Send + Sync {
    /// Acknowledges the message.
    async fn ack(&self) -> Result<(), BoxError>;

    /// Rejects the message, optionally asking for redelivery.
    async fn nack(&self, requeue: bool) -> Result<(), BoxError>;
}

/// Future returned by a [`MessageHandler`].
pub type HandlerFuture = BoxFuture<'static, Result<(), BoxError>>;

/// Callback invoked for each received message.
pub type MessageHandler = Arc<dyn Fn(Message, Arc<dyn Delivery>) -> HandlerFuture + Send + Sync>;

/// Boxes an async closure as a [`MessageHandler`].
pub fn handler<F, Fut>(f: F) -> MessageHandler
where
    F: Fn(Message, Arc<dyn Delivery>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
{
    Arc::new(
        move |message: Message, delivery: Arc<dyn Delivery>| -> HandlerFuture {
            Box::pin(f(message, delivery))
        },
    )
}

/// Connection lifecycle shared by every adapter.
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Returns the adapter name used in log records.
    fn name(&self) -> &str;

    /// Opens the underlying connection.
    async fn connect(&self) -> Result<(), BoxError> {
        Ok(())
    }

    /// Closes the underlying connection.
    async fn disconnect(&self) -> Result<(), BoxError> {
        Ok(())
    }
}

/// Request/response adapter.
#[async_trait]
pub trait RequestAdapter: Adapter {
    /// Sends a request and returns its response.
    ///
    /// A recognized failure is signalled by returning a boxed
    /// [`AdapterError`](crate::errors::AdapterError).
    async fn execute(&self, request: GenericRequest) -> Result<GenericResponse, BoxError>;
}

/// Pub/sub adapter.
#[async_trait]
pub trait PubSubAdapter: Adapter {
    /// Publishes a message to a topic.
    async fn publish(&self, topic: &str, message: Message) -> Result<(), BoxError>;

    /// Registers a handler for a topic.
    async fn subscribe(&self, topic: &str, handler: MessageHandler) -> Result<(), BoxError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let request = GenericRequest::new("GET", "/users")
            .with_header("accept", "application/json")
            .with_body(serde_json::json!({"q": 1}));

        assert_eq!(request.method, "GET");
        assert_eq!(request.headers.get("accept").map(String::as_str), Some("application/json"));
        assert!(request.body.is_some());
    }

    #[test]
    fn test_response_success() {
        assert!(GenericResponse::new(204).is_success());
        assert!(!GenericResponse::new(404).is_success());
    }

    #[test]
    fn test_header_values() {
        let message = Message::new("hi")
            .with_header("x-correlation-id", "c-1")
            .with_header("bin", vec![0x68, 0x69]);

        assert_eq!(message.header("x-correlation-id").as_deref(), Some("c-1"));
        assert_eq!(message.header("bin").as_deref(), Some("hi"));
        assert_eq!(
            ContextValue::from(HeaderValue::Bytes(vec![1, 2])),
            ContextValue::Bytes(vec![1, 2])
        );
    }

    #[tokio::test]
    async fn test_handler_boxes_closure() {
        let h = handler(|message: Message, _delivery| async move {
            assert_eq!(message.payload, b"x".to_vec());
            Ok(())
        });
        let delivery: Arc<dyn Delivery> = Arc::new(MockDelivery::new());
        assert!(h(Message::new("x"), delivery).await.is_ok());
    }
}
