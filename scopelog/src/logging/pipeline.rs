//! The build, serialize, mask and dispatch stages of a log call.

use super::call::LogCall;
use super::entry::{LogEntry, LogRecord, MESSAGE_KEY};
use super::serializer::SerializerRegistry;
use super::transport::Transport;
use crate::config::ScopelogConfig;
use crate::context::{filtered_context, LoggingMatrix};
use crate::errors::{ConfigurationError, TransportFailure};
use crate::level::LogLevel;
use crate::masking::MaskingEngine;
use futures::future::join_all;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Default budget for draining transports at shutdown.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Shared processing stages behind every logger.
///
/// Stateless with respect to call data: any number of loggers and scopes
/// may drive one pipeline concurrently.
#[derive(Clone)]
pub struct LogPipeline {
    matrix: Option<LoggingMatrix>,
    serializers: SerializerRegistry,
    masking: MaskingEngine,
    transports: Vec<Arc<dyn Transport>>,
    shutdown_timeout: Duration,
}

impl std::fmt::Debug for LogPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogPipeline")
            .field("matrix", &self.matrix)
            .field("serializers", &self.serializers)
            .field("masking", &self.masking)
            .field(
                "transports",
                &self.transports.iter().map(|t| t.name()).collect::<Vec<_>>(),
            )
            .field("shutdown_timeout", &self.shutdown_timeout)
            .finish()
    }
}

impl Default for LogPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl LogPipeline {
    /// Creates a pipeline with the default serializers, no masking rules
    /// and no transports.
    #[must_use]
    pub fn new() -> Self {
        Self {
            matrix: None,
            serializers: SerializerRegistry::default(),
            masking: MaskingEngine::default(),
            transports: Vec::new(),
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }

    /// Builds a pipeline from validated configuration.
    pub fn from_config(
        config: &ScopelogConfig,
        transports: Vec<Arc<dyn Transport>>,
    ) -> Result<Self, ConfigurationError> {
        config.validate()?;

        Ok(Self {
            matrix: config.logging_matrix.clone(),
            serializers: SerializerRegistry::with_defaults(config.serializer_timeout()),
            masking: config.masking.build_engine()?,
            transports,
            shutdown_timeout: config.shutdown_timeout(),
        })
    }

    /// Sets the logging matrix.
    #[must_use]
    pub fn with_matrix(mut self, matrix: LoggingMatrix) -> Self {
        self.matrix = Some(matrix);
        self
    }

    /// Replaces the serializer registry.
    #[must_use]
    pub fn with_serializers(mut self, serializers: SerializerRegistry) -> Self {
        self.serializers = serializers;
        self
    }

    /// Replaces the masking engine.
    #[must_use]
    pub fn with_masking(mut self, masking: MaskingEngine) -> Self {
        self.masking = masking;
        self
    }

    /// Adds a transport.
    #[must_use]
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transports.push(transport);
        self
    }

    /// Sets the shutdown drain budget.
    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Returns the logging matrix.
    #[must_use]
    pub fn matrix(&self) -> Option<&LoggingMatrix> {
        self.matrix.as_ref()
    }

    /// Returns the masking engine.
    #[must_use]
    pub fn masking(&self) -> &MaskingEngine {
        &self.masking
    }

    /// Returns the registered transports.
    #[must_use]
    pub fn transports(&self) -> &[Arc<dyn Transport>] {
        &self.transports
    }

    /// Builds, serializes and masks one entry.
    ///
    /// The context snapshot is taken before the first suspension point, so
    /// it always reflects the caller's scope.
    pub async fn process(
        &self,
        level: LogLevel,
        name: &str,
        bindings: &Map<String, Value>,
        call: &LogCall,
    ) -> LogRecord {
        let context = filtered_context(level, self.matrix.as_ref());
        let entry = LogEntry::build(level, name, context, bindings.clone(), call);

        let serialized = self.serializers.apply(entry.to_payload()).await;
        let payload = self.masking.process_map(&serialized);
        // Transports print the message verbatim, so it comes from the
        // masked payload.
        let message = match payload.get(MESSAGE_KEY) {
            Some(Value::String(masked)) => masked.clone(),
            _ => entry.message().to_string(),
        };

        LogRecord {
            level,
            timestamp: entry.timestamp(),
            name: entry.name().to_string(),
            message,
            payload,
        }
    }

    /// Sends a record to every transport accepting its level, concurrently.
    ///
    /// Returns how many transports accepted the record. Failures are
    /// reported and never propagated.
    pub async fn dispatch(&self, record: &LogRecord) -> usize {
        let deliveries = self
            .transports
            .iter()
            .filter(|transport| transport.is_level_enabled(record.level))
            .map(|transport| async move { (transport, transport.log(record).await) });

        let mut delivered = 0;
        for (transport, result) in join_all(deliveries).await {
            match result {
                Ok(()) => delivered += 1,
                Err(e) => report(&TransportFailure::new(transport.name(), "log", e.to_string())),
            }
        }
        delivered
    }

    /// Flushes every transport concurrently and returns the failures.
    pub async fn flush(&self) -> Vec<TransportFailure> {
        let flushes = self
            .transports
            .iter()
            .map(|transport| async move { (transport, transport.flush().await) });

        join_all(flushes)
            .await
            .into_iter()
            .filter_map(|(transport, result)| {
                result.err().map(|e| {
                    let failure = TransportFailure::new(transport.name(), "flush", e.to_string());
                    report(&failure);
                    failure
                })
            })
            .collect()
    }

    /// Drains every transport, giving up after the shutdown timeout.
    ///
    /// Returns false if the timeout fired first.
    pub async fn shutdown(&self) -> bool {
        if tokio::time::timeout(self.shutdown_timeout, self.flush())
            .await
            .is_ok()
        {
            true
        } else {
            warn!(
                timeout_ms = u64::try_from(self.shutdown_timeout.as_millis()).unwrap_or(u64::MAX),
                transports = self.transports.len(),
                "Transport drain timed out, continuing shutdown"
            );
            false
        }
    }
}

fn report(failure: &TransportFailure) {
    warn!(
        transport = %failure.transport,
        operation = %failure.operation,
        reason = %failure.reason,
        "Transport failed"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{run_sync, set, set_correlation_id};
    use crate::masking::{MaskStrategy, MaskingRule};
    use crate::testing::MemoryTransport;
    use serde_json::json;

    #[tokio::test]
    async fn test_process_masks_after_serializing() {
        let pipeline = LogPipeline::new().with_masking(MaskingEngine::new(vec![
            MaskingRule::exact("password", MaskStrategy::Full),
        ]));
        let call = LogCall::new("login").with_field("password", "hunter2");

        let record = pipeline.process(LogLevel::Info, "auth", &Map::new(), &call).await;

        assert_eq!(record.field("password"), Some(&json!("******")));
        assert_eq!(record.field("msg"), Some(&json!("login")));
    }

    #[tokio::test]
    async fn test_record_message_is_masked() {
        let pipeline = LogPipeline::new().with_masking(MaskingEngine::new(vec![
            MaskingRule::exact("token", MaskStrategy::Full),
        ]));
        let call = LogCall::new("fetching %s").arg(json!("https://h.io/a?token=t0p&x=1"));

        let record = pipeline.process(LogLevel::Info, "http", &Map::new(), &call).await;

        assert_eq!(record.message, "fetching https://h.io/a?token=******&x=1");
        assert_eq!(record.field("msg"), Some(&json!(record.message)));
    }

    #[tokio::test]
    async fn test_process_uses_matrix() {
        let pipeline = LogPipeline::new()
            .with_matrix(LoggingMatrix::new().with_default(["correlationId"]));

        let record = crate::context::run(async {
            set_correlation_id("c-7");
            set("userId", "u-1");
            pipeline
                .process(LogLevel::Info, "api", &Map::new(), &LogCall::new("hi"))
                .await
        })
        .await;

        assert_eq!(record.field("correlationId"), Some(&json!("c-7")));
        assert_eq!(record.field("userId"), None);
    }

    #[tokio::test]
    async fn test_dispatch_respects_transport_levels() {
        let all = Arc::new(MemoryTransport::new());
        let errors_only = Arc::new(MemoryTransport::with_min_level(LogLevel::Error));
        let pipeline = LogPipeline::new()
            .with_transport(all.clone())
            .with_transport(errors_only.clone());

        let record = pipeline
            .process(LogLevel::Info, "api", &Map::new(), &LogCall::new("hello"))
            .await;
        assert_eq!(pipeline.dispatch(&record).await, 1);

        assert_eq!(all.len(), 1);
        assert!(errors_only.is_empty());
    }

    #[test]
    fn test_snapshot_taken_synchronously() {
        let pipeline = LogPipeline::new();
        let record = run_sync(|| {
            set("k", "v");
            tokio_test::block_on(pipeline.process(
                LogLevel::Debug,
                "sync",
                &Map::new(),
                &LogCall::new("x"),
            ))
        });
        assert_eq!(record.field("k"), Some(&json!("v")));
    }
}
