//! Named logger handles.

use super::call::LogCall;
use super::entry::LogRecord;
use super::pipeline::LogPipeline;
use crate::level::LogLevel;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::sync::Arc;

/// A named handle with persistent bindings and a severity threshold.
///
/// Calls below the threshold are no-ops. Everything else flows through the
/// shared [`LogPipeline`].
#[derive(Debug)]
pub struct Logger {
    name: String,
    bindings: Map<String, Value>,
    level: RwLock<LogLevel>,
    pipeline: Arc<LogPipeline>,
}

impl Logger {
    /// Creates a logger.
    #[must_use]
    pub fn new(name: impl Into<String>, level: LogLevel, pipeline: Arc<LogPipeline>) -> Self {
        Self {
            name: name.into(),
            bindings: Map::new(),
            level: RwLock::new(level),
            pipeline,
        }
    }

    /// Adds persistent bindings.
    #[must_use]
    pub fn with_bindings(mut self, bindings: Map<String, Value>) -> Self {
        self.bindings.extend(bindings);
        self
    }

    /// Returns the logger name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the persistent bindings.
    #[must_use]
    pub fn bindings(&self) -> &Map<String, Value> {
        &self.bindings
    }

    /// Returns the current threshold.
    #[must_use]
    pub fn level(&self) -> LogLevel {
        *self.level.read()
    }

    /// Changes the threshold.
    pub fn set_level(&self, level: LogLevel) {
        *self.level.write() = level;
    }

    /// Returns true if calls at `level` are processed.
    #[must_use]
    pub fn is_level_enabled(&self, level: LogLevel) -> bool {
        level.passes(self.level())
    }

    /// Returns the shared pipeline.
    #[must_use]
    pub fn pipeline(&self) -> &Arc<LogPipeline> {
        &self.pipeline
    }

    /// Creates a child sharing the pipeline and threshold, with extra
    /// bindings layered over this logger's.
    #[must_use]
    pub fn child(&self, bindings: Map<String, Value>) -> Self {
        let mut merged = self.bindings.clone();
        merged.extend(bindings);
        Self {
            name: self.name.clone(),
            bindings: merged,
            level: RwLock::new(self.level()),
            pipeline: Arc::clone(&self.pipeline),
        }
    }

    /// Logs at `level`.
    ///
    /// Returns the dispatched record, or `None` when filtered out.
    pub async fn log(&self, level: LogLevel, call: impl Into<LogCall>) -> Option<LogRecord> {
        if !self.is_level_enabled(level) {
            return None;
        }
        let call = call.into();
        let record = self
            .pipeline
            .process(level, &self.name, &self.bindings, &call)
            .await;
        self.pipeline.dispatch(&record).await;
        Some(record)
    }

    /// Logs at trace level.
    pub async fn trace(&self, call: impl Into<LogCall>) -> Option<LogRecord> {
        self.log(LogLevel::Trace, call).await
    }

    /// Logs at debug level.
    pub async fn debug(&self, call: impl Into<LogCall>) -> Option<LogRecord> {
        self.log(LogLevel::Debug, call).await
    }

    /// Logs at info level.
    pub async fn info(&self, call: impl Into<LogCall>) -> Option<LogRecord> {
        self.log(LogLevel::Info, call).await
    }

    /// Logs at warn level.
    pub async fn warn(&self, call: impl Into<LogCall>) -> Option<LogRecord> {
        self.log(LogLevel::Warn, call).await
    }

    /// Logs at error level.
    pub async fn error(&self, call: impl Into<LogCall>) -> Option<LogRecord> {
        self.log(LogLevel::Error, call).await
    }

    /// Logs at fatal level.
    pub async fn fatal(&self, call: impl Into<LogCall>) -> Option<LogRecord> {
        self.log(LogLevel::Fatal, call).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryTransport;
    use serde_json::json;

    fn logger(level: LogLevel) -> (Logger, Arc<MemoryTransport>) {
        let transport = Arc::new(MemoryTransport::new());
        let pipeline = Arc::new(LogPipeline::new().with_transport(transport.clone()));
        (Logger::new("api", level, pipeline), transport)
    }

    #[tokio::test]
    async fn test_below_threshold_is_noop() {
        let (logger, transport) = logger(LogLevel::Warn);

        assert!(logger.info("ignored").await.is_none());
        assert!(logger.error("kept").await.is_some());
        assert_eq!(transport.messages(), vec!["kept".to_string()]);
    }

    #[tokio::test]
    async fn test_set_level() {
        let (logger, transport) = logger(LogLevel::Info);
        logger.set_level(LogLevel::Trace);

        assert!(logger.is_level_enabled(LogLevel::Trace));
        logger.trace("fine").await;
        assert_eq!(transport.len(), 1);
    }

    #[tokio::test]
    async fn test_child_bindings_override_parent() {
        let (logger, transport) = logger(LogLevel::Info);
        let logger = logger.with_bindings(
            [("service".to_string(), json!("api")), ("zone".to_string(), json!("a"))]
                .into_iter()
                .collect(),
        );
        let child = logger.child([("zone".to_string(), json!("b"))].into_iter().collect());

        let record = child.info(LogCall::new("from child")).await.unwrap();
        assert_eq!(record.field("service"), Some(&json!("api")));
        assert_eq!(record.field("zone"), Some(&json!("b")));
        assert_eq!(logger.bindings().get("zone"), Some(&json!("a")));
        assert_eq!(transport.len(), 1);
    }

    #[tokio::test]
    async fn test_metadata_overrides_bindings() {
        let (logger, _transport) = logger(LogLevel::Info);
        let logger =
            logger.with_bindings([("k".to_string(), json!("binding"))].into_iter().collect());

        let record = logger
            .info(LogCall::new("m").with_field("k", "call"))
            .await
            .unwrap();
        assert_eq!(record.field("k"), Some(&json!("call")));
    }
}
