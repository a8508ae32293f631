//! Instrumented pub/sub client.
//!
//! Outbound messages get propagated headers and timed logging. Inbound
//! messages run their handler inside a fresh scope seeded from the message
//! headers, so concurrent handlers never share identity.

use super::adapter::{
    Delivery, GenericRequest, HandlerFuture, HeaderValue, Message, MessageHandler, PubSubAdapter,
};
use super::client::{event_call, failure_fields, log_lifecycle};
use super::policy::PropagationPolicy;
use crate::config::InstrumentationConfig;
use crate::context::{self, ContextValue};
use crate::errors::{AdapterError, BoxError};
use crate::level::LogLevel;
use crate::logging::{LogCall, Logger};
use crate::observability::OperationTimer;
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Wraps a [`PubSubAdapter`] with propagation and logging.
pub struct InstrumentedPubSub<A> {
    adapter: A,
    logger: Arc<Logger>,
    config: InstrumentationConfig,
    policy: PropagationPolicy,
}

impl<A: PubSubAdapter> InstrumentedPubSub<A> {
    /// Wraps `adapter`, logging through `logger`.
    #[must_use]
    pub fn new(adapter: A, logger: Arc<Logger>, config: InstrumentationConfig) -> Self {
        let policy = config.policy();
        Self {
            adapter,
            logger,
            config,
            policy,
        }
    }

    /// Returns the wrapped adapter.
    #[must_use]
    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    /// Connects the adapter.
    pub async fn connect(&self) -> Result<(), AdapterError> {
        log_lifecycle(
            &self.logger,
            &self.config,
            self.adapter.name(),
            "connect",
            self.adapter.connect(),
        )
        .await
    }

    /// Disconnects the adapter.
    pub async fn disconnect(&self) -> Result<(), AdapterError> {
        log_lifecycle(
            &self.logger,
            &self.config,
            self.adapter.name(),
            "disconnect",
            self.adapter.disconnect(),
        )
        .await
    }

    /// Publishes `message` with propagated headers injected.
    ///
    /// Headers already on the message are kept.
    pub async fn publish(&self, topic: &str, mut message: Message) -> Result<(), AdapterError> {
        for (name, value) in self.policy.outbound_headers() {
            message
                .headers
                .entry(name)
                .or_insert(HeaderValue::Text(value));
        }
        let levels = self.config.log_levels;

        let start = self.message_call(
            "message.publish.start",
            format!("Publishing to {topic}"),
            topic,
            &message,
        );
        self.logger.log(levels.start, start).await;

        let timer = OperationTimer::start(topic);
        let outcome = self.adapter.publish(topic, message).await;
        let duration_ms = timer.finish();

        match outcome {
            Ok(()) => {
                let call = event_call(
                    "message.publish.success",
                    self.adapter.name(),
                    format!("Published to {topic}"),
                )
                .with_field("topic", topic)
                .with_field("duration_ms", duration_ms);
                self.logger.log(levels.success, call).await;
                Ok(())
            }
            Err(error) => {
                let request = GenericRequest::new("PUBLISH", topic);
                let error = AdapterError::normalize(error, &request);
                let call = event_call(
                    "message.publish.error",
                    self.adapter.name(),
                    format!("Publishing to {topic} failed: {}", error.message),
                )
                .with_field("topic", topic)
                .with_field("duration_ms", duration_ms)
                .with_metadata(failure_fields(&error, self.config.log_body));
                self.logger.log(levels.error, call).await;
                Err(error)
            }
        }
    }

    /// Registers `handler` for `topic`.
    ///
    /// Each message runs the handler inside a new scope seeded from every
    /// message header, after a "received" record. The delivery controls
    /// passed to the handler log after a successful ack or nack.
    pub async fn subscribe(
        &self,
        topic: &str,
        handler: MessageHandler,
    ) -> Result<(), AdapterError> {
        let wrapped = self.wrap_handler(topic, handler);
        match self.adapter.subscribe(topic, wrapped).await {
            Ok(()) => {
                let call = event_call(
                    "message.subscribe",
                    self.adapter.name(),
                    format!("Subscribed to {topic}"),
                )
                .with_field("topic", topic);
                self.logger.log(self.config.log_levels.completion, call).await;
                Ok(())
            }
            Err(error) => {
                let request = GenericRequest::new("SUBSCRIBE", topic);
                let error = AdapterError::normalize(error, &request);
                let call = event_call(
                    "message.subscribe.error",
                    self.adapter.name(),
                    format!("Subscribing to {topic} failed: {}", error.message),
                )
                .with_field("topic", topic)
                .with_metadata(failure_fields(&error, self.config.log_body));
                self.logger.log(self.config.log_levels.error, call).await;
                Err(error)
            }
        }
    }

    fn message_call(&self, event: &str, text: String, topic: &str, message: &Message) -> LogCall {
        let mut call = event_call(event, self.adapter.name(), text)
            .with_field("topic", topic)
            .with_field("payload_bytes", message.payload.len());
        if self.config.log_headers {
            call = call.with_field("headers", header_fields(message));
        }
        if self.config.log_body {
            let payload = String::from_utf8_lossy(&message.payload).into_owned();
            call = call.with_field("payload", payload);
        }
        call
    }

    fn wrap_handler(&self, topic: &str, handler: MessageHandler) -> MessageHandler {
        let inbound = Arc::new(Inbound {
            logger: Arc::clone(&self.logger),
            config: self.config.clone(),
            adapter: self.adapter.name().to_string(),
            topic: topic.to_string(),
        });

        Arc::new(
            move |message: Message, delivery: Arc<dyn Delivery>| -> HandlerFuture {
                let seed: HashMap<String, ContextValue> = message
                    .headers
                    .iter()
                    .map(|(name, value)| (name.clone(), ContextValue::from(value.clone())))
                    .collect();
                let inbound = Arc::clone(&inbound);
                let handler = Arc::clone(&handler);

                Box::pin(context::run_with(seed, async move {
                    inbound.handle(message, delivery, handler).await
                }))
            },
        )
    }
}

fn header_fields(message: &Message) -> Value {
    let headers: Map<String, Value> = message
        .headers
        .iter()
        .map(|(name, value)| (name.clone(), json!(value.to_text())))
        .collect();
    Value::Object(headers)
}

/// Shared state of one subscription's wrapped handler.
struct Inbound {
    logger: Arc<Logger>,
    config: InstrumentationConfig,
    adapter: String,
    topic: String,
}

impl Inbound {
    async fn handle(
        &self,
        message: Message,
        delivery: Arc<dyn Delivery>,
        handler: MessageHandler,
    ) -> Result<(), BoxError> {
        let mut received = event_call(
            "message.received",
            &self.adapter,
            format!("Message received on {}", self.topic),
        )
        .with_field("topic", self.topic.as_str())
        .with_field("payload_bytes", message.payload.len());
        if self.config.log_headers {
            received = received.with_field("headers", header_fields(&message));
        }
        if self.config.log_body {
            received = received.with_field(
                "payload",
                String::from_utf8_lossy(&message.payload).into_owned(),
            );
        }
        self.logger.log(self.config.log_levels.received, received).await;

        let delivery: Arc<dyn Delivery> = Arc::new(LoggedDelivery {
            inner: delivery,
            logger: Arc::clone(&self.logger),
            level: self.config.log_levels.completion,
            adapter: self.adapter.clone(),
            topic: self.topic.clone(),
        });

        let timer = OperationTimer::start(self.topic.as_str());
        let outcome = handler(message, delivery).await;
        if let Err(error) = &outcome {
            let call = event_call(
                "message.handler.error",
                &self.adapter,
                format!("Handler for {} failed: {error}", self.topic),
            )
            .with_field("topic", self.topic.as_str())
            .with_field("duration_ms", timer.finish())
            .with_field(
                "error",
                json!({"type": "HandlerError", "message": error.to_string()}),
            );
            self.logger.log(self.config.log_levels.error, call).await;
        }
        outcome
    }
}

/// Delivery controls that log after the underlying control succeeds.
struct LoggedDelivery {
    inner: Arc<dyn Delivery>,
    logger: Arc<Logger>,
    level: LogLevel,
    adapter: String,
    topic: String,
}

impl LoggedDelivery {
    async fn record(&self, event: &str, text: String, requeue: Option<bool>) {
        let mut call =
            event_call(event, &self.adapter, text).with_field("topic", self.topic.as_str());
        if let Some(requeue) = requeue {
            call = call.with_field("requeue", requeue);
        }
        self.logger.log(self.level, call).await;
    }
}

#[async_trait]
impl Delivery for LoggedDelivery {
    async fn ack(&self) -> Result<(), BoxError> {
        self.inner.ack().await?;
        self.record("message.ack", format!("Message on {} acked", self.topic), None)
            .await;
        Ok(())
    }

    async fn nack(&self, requeue: bool) -> Result<(), BoxError> {
        self.inner.nack(requeue).await?;
        self.record(
            "message.nack",
            format!("Message on {} nacked", self.topic),
            Some(requeue),
        )
        .await;
        Ok(())
    }
}
