//! Asynchronous context scopes.
//!
//! This module provides:
//! - Isolated, inheriting key/value scopes that follow the async call chain
//! - Correlation and transaction identity accessors
//! - The logging matrix that selects which context fields reach log entries

#[cfg(test)]
mod context_tests;
mod identity;
mod manager;
mod matrix;
mod scope;
mod storage;
mod value;

pub use identity::{
    configure_identity_headers, correlation_id, ensure_correlation_id, generate_correlation_id,
    identity_headers, reset_identity_headers, set_correlation_id, set_transaction_id,
    trace_context_headers, transaction_id, IdentityHeaders, CORRELATION_ID_FIELD,
    DEFAULT_CORRELATION_HEADER, DEFAULT_TRANSACTION_HEADER, TRANSACTION_ID_FIELD,
};
pub use manager::{get, get_all, get_str, is_active, run, run_sync, run_with, set};
pub use matrix::{filtered_context, LoggingMatrix, ALL_FIELDS, DEFAULT_RULE};
pub use scope::Scope;
pub use storage::{current_binding, Binding};
pub use value::ContextValue;
