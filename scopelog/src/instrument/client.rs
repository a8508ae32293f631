//! Instrumented request/response client.

use super::adapter::{GenericRequest, GenericResponse, RequestAdapter};
use super::policy::PropagationPolicy;
use crate::config::InstrumentationConfig;
use crate::errors::{AdapterError, BoxError};
use crate::logging::{error_value, LogCall, Logger};
use crate::observability::OperationTimer;
use serde_json::{json, Map, Value};
use std::future::Future;
use std::sync::Arc;

/// Wraps a [`RequestAdapter`] with identity injection and timed logging.
///
/// Every `execute` logs a start record, then either a success record or an
/// error record, both carrying `duration_ms`. Call failures are always
/// returned to the caller.
pub struct InstrumentedClient<A> {
    adapter: A,
    logger: Arc<Logger>,
    config: InstrumentationConfig,
    policy: PropagationPolicy,
}

impl<A: RequestAdapter> InstrumentedClient<A> {
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

    /// Returns the resolved propagation policy.
    #[must_use]
    pub fn policy(&self) -> &PropagationPolicy {
        &self.policy
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

    /// Sends `request` with propagated headers injected.
    ///
    /// Headers already present on the request are kept.
    pub async fn execute(
        &self,
        mut request: GenericRequest,
    ) -> Result<GenericResponse, AdapterError> {
        self.policy.inject(&mut request.headers);
        let levels = self.config.log_levels;
        let operation = format!("{} {}", request.method, request.target);

        self.logger
            .log(
                levels.start,
                self.request_call("request.start", format!("{operation} started"), &request),
            )
            .await;

        let timer = OperationTimer::start(operation);
        let outcome = self.adapter.execute(request.clone()).await;
        let duration_ms = timer.elapsed_ms();

        match outcome {
            Ok(response) => {
                let mut call = self
                    .request_call(
                        "request.success",
                        format!("{} completed with {}", timer.operation(), response.status),
                        &request,
                    )
                    .with_field("status", response.status)
                    .with_field("duration_ms", duration_ms);
                if self.config.log_headers {
                    call = call.with_field("response_headers", json!(response.headers));
                }
                if self.config.log_body {
                    if let Some(body) = &response.body {
                        call = call.with_field("response_body", body.clone());
                    }
                }
                self.logger.log(levels.success, call).await;
                Ok(response)
            }
            Err(error) => {
                let error = AdapterError::normalize(error, &request);
                let call = self
                    .request_call(
                        "request.error",
                        format!("{} failed: {}", timer.operation(), error.message),
                        &request,
                    )
                    .with_field("duration_ms", duration_ms)
                    .with_metadata(failure_fields(&error, self.config.log_body));
                self.logger.log(levels.error, call).await;
                Err(error)
            }
        }
    }

    fn request_call(&self, event: &str, message: String, request: &GenericRequest) -> LogCall {
        let mut call = event_call(event, self.adapter.name(), message)
            .with_field("method", request.method.as_str())
            .with_field("target", request.target.as_str());
        if self.config.log_headers {
            call = call.with_field("headers", json!(request.headers));
        }
        if self.config.log_body {
            if let Some(body) = &request.body {
                call = call.with_field("body", body.clone());
            }
        }
        call
    }
}

/// Starts a record for one instrumentation event.
pub(crate) fn event_call(event: &str, adapter: &str, message: String) -> LogCall {
    LogCall::new(message)
        .with_field("event", event)
        .with_field("adapter", adapter)
}

/// Fields describing a failed call.
pub(crate) fn failure_fields(error: &AdapterError, log_body: bool) -> Map<String, Value> {
    let mut fields = Map::new();

    let mut shaped = error_value(error);
    if let Value::Object(map) = &mut shaped {
        map.insert("type".to_string(), json!("AdapterError"));
    }
    fields.insert("error".to_string(), shaped);
    fields.insert("is_adapter_error".to_string(), json!(error.is_adapter_error));

    if let Some(status) = error.status() {
        fields.insert("status".to_string(), json!(status));
    }
    if log_body {
        if let Some(body) = error.response.as_ref().and_then(|r| r.body.clone()) {
            fields.insert("response_body".to_string(), body);
        }
    }
    fields
}

/// Runs a connect/disconnect step, logging its outcome.
pub(crate) async fn log_lifecycle<F>(
    logger: &Logger,
    config: &InstrumentationConfig,
    adapter: &str,
    operation: &str,
    step: F,
) -> Result<(), AdapterError>
where
    F: Future<Output = Result<(), BoxError>>,
{
    let timer = OperationTimer::start(operation);
    let event = format!("adapter.{operation}");

    match step.await {
        Ok(()) => {
            let call = event_call(&event, adapter, format!("{adapter} {operation} succeeded"))
                .with_field("duration_ms", timer.finish());
            logger.log(config.log_levels.completion, call).await;
            Ok(())
        }
        Err(error) => {
            let error = AdapterError::from_boxed(error);
            let call = event_call(
                &event,
                adapter,
                format!("{adapter} {operation} failed: {}", error.message),
            )
            .with_field("duration_ms", timer.finish())
            .with_metadata(failure_fields(&error, config.log_body));
            logger.log(config.log_levels.error, call).await;
            Err(error)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context;
    use crate::level::LogLevel;
    use crate::logging::LogPipeline;
    use crate::testing::{MemoryTransport, ScriptedAdapter};

    fn client(
        adapter: ScriptedAdapter,
        config: InstrumentationConfig,
    ) -> (InstrumentedClient<ScriptedAdapter>, Arc<MemoryTransport>) {
        let transport = Arc::new(MemoryTransport::new());
        let pipeline = Arc::new(LogPipeline::new().with_transport(transport.clone()));
        let logger = Arc::new(Logger::new("http", LogLevel::Trace, pipeline));
        (InstrumentedClient::new(adapter, logger, config), transport)
    }

    #[tokio::test]
    async fn test_success_logs_start_and_success() {
        let adapter = ScriptedAdapter::new("users-api").respond(GenericResponse::new(200));
        let (client, transport) = client(adapter, InstrumentationConfig::new());

        let response = client.execute(GenericRequest::new("GET", "/users")).await.unwrap();
        assert_eq!(response.status, 200);

        let events = transport.field_values("event");
        assert_eq!(events, vec![json!("request.start"), json!("request.success")]);

        let success = &transport.records()[1];
        assert_eq!(success.level, LogLevel::Info);
        assert_eq!(success.field("status"), Some(&json!(200)));
        assert!(success.field("duration_ms").is_some_and(Value::is_f64));
    }

    #[tokio::test]
    async fn test_identity_injected_without_overwriting() {
        let adapter = ScriptedAdapter::new("api").respond(GenericResponse::new(204));
        let (client, _transport) = client(adapter, InstrumentationConfig::new());

        context::run(async {
            context::set_correlation_id("corr-1");
            context::set("tenant", "acme");
            client
                .execute(GenericRequest::new("POST", "/a").with_header("x-trace-id", "explicit"))
                .await
                .unwrap();
        })
        .await;

        let sent = client.adapter().requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].headers.get("x-correlation-id").map(String::as_str), Some("corr-1"));
        assert_eq!(sent[0].headers.get("x-trace-id").map(String::as_str), Some("explicit"));
        assert!(!sent[0].headers.contains_key("tenant"));
    }

    #[tokio::test]
    async fn test_headers_and_body_logged_when_enabled() {
        let adapter = ScriptedAdapter::new("api").respond(
            GenericResponse::new(200).with_body(json!({"token": "abcdefghijkl"})),
        );
        let config = InstrumentationConfig::new()
            .with_log_headers(true)
            .with_log_body(true);
        let (client, transport) = client(adapter, config);

        client
            .execute(GenericRequest::new("GET", "/me").with_header("accept", "json"))
            .await
            .unwrap();

        let start = &transport.records()[0];
        assert_eq!(start.field("headers"), Some(&json!({"accept": "json"})));
        let success = &transport.records()[1];
        assert_eq!(
            success.field("response_body"),
            Some(&json!({"token": "abcdefghijkl"}))
        );
    }

    #[tokio::test]
    async fn test_connect_failure_is_logged_and_returned() {
        let adapter = ScriptedAdapter::new("db").fail_connect("refused");
        let (client, transport) = client(adapter, InstrumentationConfig::new());

        let err = client.connect().await.unwrap_err();
        assert_eq!(err.message, "refused");
        assert!(err.is_adapter_error);

        assert!(client.disconnect().await.is_ok());
        assert_eq!(
            transport.field_values("event"),
            vec![json!("adapter.connect"), json!("adapter.disconnect")]
        );
        assert_eq!(transport.records()[0].level, LogLevel::Error);
    }
}
