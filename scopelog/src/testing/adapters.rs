//! Scripted adapters for tests.

use async_trait::async_trait;
use futures::future::join_all;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::errors::{AdapterError, BoxError};
use crate::instrument::{
    Adapter, Delivery, GenericRequest, GenericResponse, Message, MessageHandler, PubSubAdapter,
    RequestAdapter,
};

/// A request adapter that replays queued outcomes in order.
///
/// Each `execute` pops the next outcome; an exhausted script fails with a
/// generic error.
#[derive(Debug)]
pub struct ScriptedAdapter {
    name: String,
    outcomes: Mutex<VecDeque<Result<GenericResponse, BoxError>>>,
    requests: Mutex<Vec<GenericRequest>>,
    connect_error: Option<String>,
}

impl ScriptedAdapter {
    /// Creates an adapter with an empty script.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            outcomes: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            connect_error: None,
        }
    }

    /// Queues a response.
    #[must_use]
    pub fn respond(self, response: GenericResponse) -> Self {
        self.outcomes.lock().push_back(Ok(response));
        self
    }

    /// Queues a failure.
    #[must_use]
    pub fn fail_with(self, error: impl Into<BoxError>) -> Self {
        self.outcomes.lock().push_back(Err(error.into()));
        self
    }

    /// Makes `connect` fail with an adapter error.
    #[must_use]
    pub fn fail_connect(mut self, message: impl Into<String>) -> Self {
        self.connect_error = Some(message.into());
        self
    }

    /// Returns the requests received, including injected headers.
    #[must_use]
    pub fn requests(&self) -> Vec<GenericRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl Adapter for ScriptedAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn connect(&self) -> Result<(), BoxError> {
        match &self.connect_error {
            Some(message) => Err(Box::new(AdapterError::new(message.clone()))),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RequestAdapter for ScriptedAdapter {
    async fn execute(&self, request: GenericRequest) -> Result<GenericResponse, BoxError> {
        self.requests.lock().push(request);
        self.outcomes
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err("no scripted outcome left".into()))
    }
}

/// Delivery controls that count acks and nacks.
#[derive(Debug, Default)]
pub struct RecordingDelivery {
    acks: AtomicUsize,
    nacks: Mutex<Vec<bool>>,
}

impl RecordingDelivery {
    /// Returns the number of acks.
    #[must_use]
    pub fn ack_count(&self) -> usize {
        self.acks.load(Ordering::SeqCst)
    }

    /// Returns the `requeue` flag of every nack.
    #[must_use]
    pub fn nacks(&self) -> Vec<bool> {
        self.nacks.lock().clone()
    }
}

#[async_trait]
impl Delivery for RecordingDelivery {
    async fn ack(&self) -> Result<(), BoxError> {
        self.acks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn nack(&self, requeue: bool) -> Result<(), BoxError> {
        self.nacks.lock().push(requeue);
        Ok(())
    }
}

/// An in-process broker that hands published messages to local handlers.
#[derive(Default)]
pub struct LoopbackBroker {
    handlers: Mutex<HashMap<String, Vec<MessageHandler>>>,
    published: Mutex<Vec<(String, Message)>>,
    deliveries: Mutex<Vec<Arc<RecordingDelivery>>>,
    publish_error: Option<String>,
}

impl fmt::Debug for LoopbackBroker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoopbackBroker")
            .field("topics", &self.handlers.lock().keys().cloned().collect::<Vec<_>>())
            .field("published", &self.published.lock().len())
            .finish_non_exhaustive()
    }
}

impl LoopbackBroker {
    /// Creates an empty broker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every `publish` fail with an adapter error.
    #[must_use]
    pub fn fail_publish(mut self, message: impl Into<String>) -> Self {
        self.publish_error = Some(message.into());
        self
    }

    /// Returns every published message with its topic.
    #[must_use]
    pub fn published(&self) -> Vec<(String, Message)> {
        self.published.lock().clone()
    }

    /// Returns the delivery controls created for delivered messages.
    #[must_use]
    pub fn deliveries(&self) -> Vec<Arc<RecordingDelivery>> {
        self.deliveries.lock().clone()
    }

    /// Returns the number of handlers on `topic`.
    #[must_use]
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.handlers.lock().get(topic).map_or(0, Vec::len)
    }

    /// Delivers `message` to every handler on `topic` concurrently, each
    /// with its own recording delivery.
    pub async fn deliver(&self, topic: &str, message: Message) -> Vec<Result<(), BoxError>> {
        let handlers = self.handlers_for(topic);
        let calls = handlers.into_iter().map(|handler| {
            let recording = Arc::new(RecordingDelivery::default());
            self.deliveries.lock().push(Arc::clone(&recording));
            let delivery: Arc<dyn Delivery> = recording;
            handler(message.clone(), delivery)
        });
        join_all(calls).await
    }

    /// Delivers `message` to every handler on `topic` with the given
    /// delivery controls.
    pub async fn deliver_with(
        &self,
        topic: &str,
        message: Message,
        delivery: Arc<dyn Delivery>,
    ) -> Vec<Result<(), BoxError>> {
        let handlers = self.handlers_for(topic);
        let calls = handlers
            .into_iter()
            .map(|handler| handler(message.clone(), Arc::clone(&delivery)));
        join_all(calls).await
    }

    fn handlers_for(&self, topic: &str) -> Vec<MessageHandler> {
        self.handlers.lock().get(topic).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl Adapter for LoopbackBroker {
    fn name(&self) -> &str {
        "loopback"
    }
}

#[async_trait]
impl PubSubAdapter for LoopbackBroker {
    async fn publish(&self, topic: &str, message: Message) -> Result<(), BoxError> {
        if let Some(error) = &self.publish_error {
            return Err(Box::new(AdapterError::new(error.clone())));
        }
        self.published.lock().push((topic.to_string(), message.clone()));
        // Handler failures stay with the subscriber.
        let _ = self.deliver(topic, message).await;
        Ok(())
    }

    async fn subscribe(&self, topic: &str, handler: MessageHandler) -> Result<(), BoxError> {
        self.handlers
            .lock()
            .entry(topic.to_string())
            .or_default()
            .push(handler);
        Ok(())
    }
}
