//! Log entry pipeline and logger handles.
//!
//! A log call moves through these states:
//!
//! - **Filtered**: below the logger's threshold, nothing happens
//! - **Built**: context snapshot, bindings, metadata and message merged
//! - **Serialized**: type-specific field transforms applied
//! - **Masked**: the whole payload redacted by the masking engine
//! - **Dispatched**: delivered concurrently to every accepting transport

mod call;
mod entry;
#[cfg(test)]
mod integration_tests;
mod logger;
mod pipeline;
mod pool;
mod serializer;
mod transport;

pub use call::LogCall;
pub use entry::{
    is_reserved_key, LogEntry, LogRecord, LEVEL_KEY, MESSAGE_KEY, NAME_KEY, TIME_KEY,
};
pub use logger::Logger;
pub use pipeline::{LogPipeline, DEFAULT_SHUTDOWN_TIMEOUT};
pub use pool::{global_logger, global_pool, install_global_pool, LoggerPool, SERVICE_KEY};
pub use serializer::{
    error_value, ErrorSerializer, FieldSerializer, SerializerRegistry, DEFAULT_SERIALIZER_TIMEOUT,
};
pub use transport::{TracingTransport, Transport};

use crate::config::ScopelogConfig;
use crate::context::configure_identity_headers;
use crate::errors::ConfigurationError;
use std::sync::Arc;

/// Validates `config`, applies its identity headers and installs a global
/// logger pool backed by `transports`. Pooled loggers carry the service
/// name under [`SERVICE_KEY`].
///
/// With no transports, a [`TracingTransport`] at the configured level is
/// used.
pub fn init(
    config: &ScopelogConfig,
    transports: Vec<Arc<dyn Transport>>,
) -> Result<Arc<LoggerPool>, ConfigurationError> {
    let transports = if transports.is_empty() {
        vec![Arc::new(TracingTransport::new(config.level)) as Arc<dyn Transport>]
    } else {
        transports
    };

    let pipeline = LogPipeline::from_config(config, transports)?;
    configure_identity_headers(config.identity.clone())?;

    let pool = Arc::new(
        LoggerPool::new(Arc::new(pipeline), config.level).with_service(&config.service_name),
    );
    install_global_pool(Arc::clone(&pool));
    Ok(pool)
}
