//! # Scopelog
//!
//! Context-propagating, masking logging middleware for async Rust services.
//!
//! Scopelog provides:
//!
//! - **Context scopes**: per-request key/value stores that follow a task
//!   across `.await` points and never leak between concurrent requests
//! - **Masking**: rule-based redaction of sensitive fields before any record
//!   leaves the process
//! - **Instrumentation**: adapter wrappers that inject identity headers into
//!   outbound calls and log every call with its duration
//! - **Log pipeline**: context filtering, field serializers and concurrent,
//!   failure-isolated transports
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use scopelog::prelude::*;
//!
//! let pool = scopelog::logging::init(&ScopelogConfig::new(), Vec::new())?;
//! let logger = pool.get("checkout");
//!
//! context::run(async move {
//!     context::ensure_correlation_id();
//!     context::set("userId", "u-42");
//!     logger
//!         .info(LogCall::new("charged %s").arg("card").with_field("password", "hunter2"))
//!         .await;
//! })
//! .await;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod config;
pub mod context;
pub mod errors;
pub mod instrument;
pub mod level;
pub mod logging;
pub mod masking;
pub mod observability;
pub mod testing;

pub use level::LogLevel;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{
        EventLogLevels, InstrumentationConfig, MaskingConfig, MaskingRuleConfig, ScopelogConfig,
    };
    pub use crate::context::{self, ContextValue, IdentityHeaders, LoggingMatrix};
    pub use crate::errors::{AdapterError, BoxError, ConfigurationError, ScopelogError};
    pub use crate::instrument::{
        Adapter, Delivery, GenericRequest, GenericResponse, InstrumentedClient,
        InstrumentedPubSub, Message, MessageHandler, PropagationPolicy, PubSubAdapter,
        RequestAdapter,
    };
    pub use crate::level::LogLevel;
    pub use crate::logging::{
        LogCall, LogPipeline, LogRecord, Logger, LoggerPool, TracingTransport, Transport,
    };
    pub use crate::masking::{MaskStrategy, MaskingEngine, MaskingRule, StrategyParams};
}
