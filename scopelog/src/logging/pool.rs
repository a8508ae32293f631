//! Process-wide cache of loggers keyed by name.

use super::logger::Logger;
use super::pipeline::LogPipeline;
use crate::level::LogLevel;
use dashmap::DashMap;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Binding key carrying the service name on pooled loggers.
pub const SERVICE_KEY: &str = "service";

/// Lazily creates one logger per name.
///
/// Creation goes through the map's entry API, so concurrent first access
/// to the same name yields a single logger.
#[derive(Debug)]
pub struct LoggerPool {
    loggers: DashMap<String, Arc<Logger>>,
    pipeline: Arc<LogPipeline>,
    level: LogLevel,
    service: Option<String>,
}

impl LoggerPool {
    /// Creates an empty pool whose loggers share `pipeline`.
    #[must_use]
    pub fn new(pipeline: Arc<LogPipeline>, level: LogLevel) -> Self {
        Self {
            loggers: DashMap::new(),
            pipeline,
            level,
            service: None,
        }
    }

    /// Binds `service` on every logger the pool creates.
    #[must_use]
    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }

    /// Returns the service name, if set.
    #[must_use]
    pub fn service(&self) -> Option<&str> {
        self.service.as_deref()
    }

    /// Returns the logger named after the service.
    ///
    /// Falls back to `"app"` on a pool without a service.
    pub fn default_logger(&self) -> Arc<Logger> {
        self.get(self.service.as_deref().unwrap_or("app"))
    }

    /// Returns the logger for `name`, creating it on first use.
    pub fn get(&self, name: &str) -> Arc<Logger> {
        if let Some(existing) = self.loggers.get(name) {
            return Arc::clone(existing.value());
        }
        self.loggers
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(self.create(name)))
            .value()
            .clone()
    }

    fn create(&self, name: &str) -> Logger {
        let logger = Logger::new(name, self.level, Arc::clone(&self.pipeline));
        match &self.service {
            Some(service) => {
                let mut bindings = Map::new();
                bindings.insert(SERVICE_KEY.to_string(), Value::String(service.clone()));
                logger.with_bindings(bindings)
            }
            None => logger,
        }
    }

    /// Returns true if a logger named `name` exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.loggers.contains_key(name)
    }

    /// Returns the number of loggers created.
    #[must_use]
    pub fn len(&self) -> usize {
        self.loggers.len()
    }

    /// Returns true if no logger was created yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.loggers.is_empty()
    }

    /// Returns the shared pipeline.
    #[must_use]
    pub fn pipeline(&self) -> &Arc<LogPipeline> {
        &self.pipeline
    }

    /// Drains the shared pipeline's transports.
    pub async fn shutdown(&self) -> bool {
        self.pipeline.shutdown().await
    }
}

static GLOBAL_POOL: RwLock<Option<Arc<LoggerPool>>> = RwLock::new(None);

/// Installs the process-wide pool, returning the previous one.
pub fn install_global_pool(pool: Arc<LoggerPool>) -> Option<Arc<LoggerPool>> {
    GLOBAL_POOL.write().replace(pool)
}

/// Returns the process-wide pool, if installed.
#[must_use]
pub fn global_pool() -> Option<Arc<LoggerPool>> {
    GLOBAL_POOL.read().clone()
}

/// Returns a logger from the process-wide pool.
#[must_use]
pub fn global_logger(name: &str) -> Option<Arc<Logger>> {
    global_pool().map(|pool| pool.get(name))
}
