//! In-memory transports for tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::errors::BoxError;
use crate::level::LogLevel;
use crate::logging::{LogRecord, Transport};

/// A transport that keeps every record it receives.
#[derive(Debug)]
pub struct MemoryTransport {
    name: String,
    min_level: LogLevel,
    records: Mutex<Vec<LogRecord>>,
    flushes: AtomicUsize,
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTransport {
    /// Creates a transport accepting every level.
    #[must_use]
    pub fn new() -> Self {
        Self::with_min_level(LogLevel::Trace)
    }

    /// Creates a transport accepting `min_level` and above.
    #[must_use]
    pub fn with_min_level(min_level: LogLevel) -> Self {
        Self {
            name: "memory".to_string(),
            min_level,
            records: Mutex::new(Vec::new()),
            flushes: AtomicUsize::new(0),
        }
    }

    /// Renames the transport.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Returns the received records, oldest first.
    #[must_use]
    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().clone()
    }

    /// Returns the rendered messages.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.records.lock().iter().map(|r| r.message.clone()).collect()
    }

    /// Returns the value of `key` in every record that has it.
    #[must_use]
    pub fn field_values(&self, key: &str) -> Vec<Value> {
        self.records
            .lock()
            .iter()
            .filter_map(|r| r.field(key).cloned())
            .collect()
    }

    /// Returns the number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Returns true if nothing was received.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Returns how many times `flush` ran.
    #[must_use]
    pub fn flush_count(&self) -> usize {
        self.flushes.load(Ordering::SeqCst)
    }

    /// Drops every stored record.
    pub fn clear(&self) {
        self.records.lock().clear();
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_level_enabled(&self, level: LogLevel) -> bool {
        level.passes(self.min_level)
    }

    async fn log(&self, record: &LogRecord) -> Result<(), BoxError> {
        self.records.lock().push(record.clone());
        Ok(())
    }

    async fn flush(&self) -> Result<(), BoxError> {
        self.flushes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// A transport whose writes always fail.
#[derive(Debug)]
pub struct FailingTransport {
    name: String,
    error: String,
    attempts: AtomicUsize,
}

impl FailingTransport {
    /// Creates a transport failing with `error`.
    #[must_use]
    pub fn new(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            error: error.into(),
            attempts: AtomicUsize::new(0),
        }
    }

    /// Returns how many writes were attempted.
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for FailingTransport {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_level_enabled(&self, _level: LogLevel) -> bool {
        true
    }

    async fn log(&self, _record: &LogRecord) -> Result<(), BoxError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(self.error.clone().into())
    }

    async fn flush(&self) -> Result<(), BoxError> {
        Err(self.error.clone().into())
    }
}

/// A transport whose flush takes a fixed time.
#[derive(Debug)]
pub struct SlowFlushTransport {
    delay: Duration,
}

impl SlowFlushTransport {
    /// Creates a transport that sleeps for `delay` on flush.
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl Transport for SlowFlushTransport {
    fn name(&self) -> &str {
        "slow-flush"
    }

    fn is_level_enabled(&self, _level: LogLevel) -> bool {
        true
    }

    async fn log(&self, _record: &LogRecord) -> Result<(), BoxError> {
        Ok(())
    }

    async fn flush(&self) -> Result<(), BoxError> {
        tokio::time::sleep(self.delay).await;
        Ok(())
    }
}
