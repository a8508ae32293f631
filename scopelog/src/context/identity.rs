//! Correlation and transaction identity carried in the active scope.
//!
//! Identity values are stored under their wire-header names, so the same
//! key is used in the scope, in outbound headers and in inbound messages.
//! The header names are process-wide configuration.

use super::{manager, ContextValue};
use crate::errors::ConfigurationError;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Default header carrying the correlation id.
pub const DEFAULT_CORRELATION_HEADER: &str = "x-correlation-id";

/// Default header carrying the transaction id.
pub const DEFAULT_TRANSACTION_HEADER: &str = "x-trace-id";

/// Logical name of the correlation id in log entries.
pub const CORRELATION_ID_FIELD: &str = "correlationId";

/// Logical name of the transaction id in log entries.
pub const TRANSACTION_ID_FIELD: &str = "transactionId";

/// Wire-header names backing the two identity fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityHeaders {
    /// Header name for the correlation id.
    #[serde(default = "default_correlation_header")]
    pub correlation_header: String,
    /// Header name for the transaction id.
    #[serde(default = "default_transaction_header")]
    pub transaction_header: String,
}

fn default_correlation_header() -> String {
    DEFAULT_CORRELATION_HEADER.to_string()
}

fn default_transaction_header() -> String {
    DEFAULT_TRANSACTION_HEADER.to_string()
}

impl Default for IdentityHeaders {
    fn default() -> Self {
        Self {
            correlation_header: default_correlation_header(),
            transaction_header: default_transaction_header(),
        }
    }
}

impl IdentityHeaders {
    /// Creates identity headers with custom names.
    #[must_use]
    pub fn new(
        correlation_header: impl Into<String>,
        transaction_header: impl Into<String>,
    ) -> Self {
        Self {
            correlation_header: correlation_header.into(),
            transaction_header: transaction_header.into(),
        }
    }

    /// Checks that both names are usable and distinct.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.correlation_header.trim().is_empty() {
            return Err(ConfigurationError::for_field(
                "identity.correlation_header",
                "header name must not be empty",
            ));
        }
        if self.transaction_header.trim().is_empty() {
            return Err(ConfigurationError::for_field(
                "identity.transaction_header",
                "header name must not be empty",
            ));
        }
        if self.correlation_header == self.transaction_header {
            return Err(ConfigurationError::for_field(
                "identity",
                "correlation and transaction headers must differ",
            ));
        }
        Ok(())
    }

    /// Maps a stored key to its logical field name, if it is an identity key.
    #[must_use]
    pub fn logical_name(&self, key: &str) -> Option<&'static str> {
        if key == self.correlation_header {
            Some(CORRELATION_ID_FIELD)
        } else if key == self.transaction_header {
            Some(TRANSACTION_ID_FIELD)
        } else {
            None
        }
    }
}

static IDENTITY_HEADERS: RwLock<Option<IdentityHeaders>> = RwLock::new(None);

/// Sets the process-wide identity header names.
pub fn configure_identity_headers(headers: IdentityHeaders) -> Result<(), ConfigurationError> {
    headers.validate()?;
    *IDENTITY_HEADERS.write() = Some(headers);
    Ok(())
}

/// Restores the default identity header names.
pub fn reset_identity_headers() {
    *IDENTITY_HEADERS.write() = None;
}

/// Returns the configured identity header names.
#[must_use]
pub fn identity_headers() -> IdentityHeaders {
    IDENTITY_HEADERS.read().clone().unwrap_or_default()
}

/// Generates a new correlation id.
#[must_use]
pub fn generate_correlation_id() -> String {
    Uuid::new_v4().to_string()
}

/// Returns the correlation id of the active scope. Never generates one.
#[must_use]
pub fn correlation_id() -> Option<String> {
    manager::get_str(&identity_headers().correlation_header)
}

/// Returns the transaction id of the active scope. Never generates one.
#[must_use]
pub fn transaction_id() -> Option<String> {
    manager::get_str(&identity_headers().transaction_header)
}

/// Stores the correlation id in the active scope.
pub fn set_correlation_id(id: impl Into<String>) {
    manager::set(identity_headers().correlation_header, id.into());
}

/// Stores the transaction id in the active scope.
pub fn set_transaction_id(id: impl Into<String>) {
    manager::set(identity_headers().transaction_header, id.into());
}

/// Returns the correlation id, generating and storing one if absent.
///
/// This is the explicit generation step meant for scope entry. Returns
/// `None` outside a scope.
pub fn ensure_correlation_id() -> Option<String> {
    let header = identity_headers().correlation_header;
    manager::get_or_insert_with(&header, || ContextValue::from(generate_correlation_id()))
        .and_then(|value| value.to_header_value())
}

/// Returns the identity fields formatted for outbound header injection.
///
/// Empty when no scope is active or no identity is set.
#[must_use]
pub fn trace_context_headers() -> HashMap<String, String> {
    let names = identity_headers();
    let mut headers = HashMap::new();

    for name in [names.correlation_header, names.transaction_header] {
        if let Some(value) = manager::get_str(&name) {
            headers.insert(name, value);
        }
    }

    headers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::run_sync;

    #[test]
    fn test_default_headers() {
        let headers = IdentityHeaders::default();
        assert_eq!(headers.correlation_header, "x-correlation-id");
        assert_eq!(headers.transaction_header, "x-trace-id");
        assert!(headers.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_duplicates() {
        let headers = IdentityHeaders::new("x-id", "x-id");
        assert!(headers.validate().is_err());

        let headers = IdentityHeaders::new(" ", "x-trace-id");
        assert!(headers.validate().is_err());
    }

    #[test]
    fn test_logical_name() {
        let headers = IdentityHeaders::default();
        assert_eq!(headers.logical_name("x-correlation-id"), Some("correlationId"));
        assert_eq!(headers.logical_name("x-trace-id"), Some("transactionId"));
        assert_eq!(headers.logical_name("userId"), None);
    }

    #[test]
    fn test_getters_are_read_only() {
        run_sync(|| {
            assert_eq!(correlation_id(), None);
            assert_eq!(correlation_id(), None);
            assert!(trace_context_headers().is_empty());
        });
    }

    #[test]
    fn test_ensure_correlation_id_is_stable() {
        run_sync(|| {
            let first = ensure_correlation_id();
            assert!(first.is_some());
            assert_eq!(ensure_correlation_id(), first);
            assert_eq!(correlation_id(), first);
        });
        assert_eq!(ensure_correlation_id(), None);
    }

    #[test]
    fn test_trace_context_headers() {
        assert!(trace_context_headers().is_empty());

        run_sync(|| {
            set_correlation_id("corr-1");
            set_transaction_id("txn-1");

            let headers = trace_context_headers();
            assert_eq!(headers.len(), 2);
            assert_eq!(headers.get("x-correlation-id").map(String::as_str), Some("corr-1"));
            assert_eq!(headers.get("x-trace-id").map(String::as_str), Some("txn-1"));
        });
    }
}
