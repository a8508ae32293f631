//! Transport trait and the default `tracing`-backed transport.

use super::entry::LogRecord;
use crate::errors::BoxError;
use crate::level::LogLevel;
use async_trait::async_trait;
use tracing::{debug, error, info, trace, warn};

/// A destination for finished log records.
///
/// Implementations must not assume they are the only transport; a failure
/// here is reported and never reaches the caller that logged.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Returns the transport name used in diagnostics.
    fn name(&self) -> &str;

    /// Returns true if the transport accepts records at `level`.
    fn is_level_enabled(&self, level: LogLevel) -> bool;

    /// Writes one record.
    async fn log(&self, record: &LogRecord) -> Result<(), BoxError>;

    /// Flushes buffered records.
    async fn flush(&self) -> Result<(), BoxError> {
        Ok(())
    }
}

/// Forwards records to the `tracing` subscriber.
///
/// The masked payload travels as a JSON string field, so any subscriber
/// (plain or JSON formatted) prints it intact.
#[derive(Debug, Clone)]
pub struct TracingTransport {
    min_level: LogLevel,
}

impl Default for TracingTransport {
    fn default() -> Self {
        Self::new(LogLevel::Trace)
    }
}

impl TracingTransport {
    /// Creates a transport accepting `min_level` and above.
    #[must_use]
    pub fn new(min_level: LogLevel) -> Self {
        Self { min_level }
    }
}

#[async_trait]
impl Transport for TracingTransport {
    fn name(&self) -> &str {
        "tracing"
    }

    fn is_level_enabled(&self, level: LogLevel) -> bool {
        level.passes(self.min_level)
    }

    async fn log(&self, record: &LogRecord) -> Result<(), BoxError> {
        let payload = serde_json::to_string(&record.payload)?;
        let logger = record.name.as_str();
        let message = record.message.as_str();

        match record.level {
            LogLevel::Trace => trace!(target: "scopelog", logger, payload = %payload, "{message}"),
            LogLevel::Debug => debug!(target: "scopelog", logger, payload = %payload, "{message}"),
            LogLevel::Info => info!(target: "scopelog", logger, payload = %payload, "{message}"),
            LogLevel::Warn => warn!(target: "scopelog", logger, payload = %payload, "{message}"),
            LogLevel::Error | LogLevel::Fatal => {
                let fatal = record.level == LogLevel::Fatal;
                error!(target: "scopelog", logger, payload = %payload, fatal, "{message}");
            }
        }
        Ok(())
    }
}
