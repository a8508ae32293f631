//! Installation of the process-wide `tracing` subscriber.

use crate::errors::ConfigurationError;
use serde::{Deserialize, Serialize};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Output format of the installed subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Plain,
    /// One JSON object per line.
    Json,
}

/// Installs a `fmt` subscriber filtered by `filter` (an `EnvFilter`
/// directive such as `"scopelog=debug,info"`).
///
/// Returns `Ok(false)` when a global subscriber is already installed, so
/// repeated calls are harmless.
pub fn init_tracing(format: LogFormat, filter: &str) -> Result<bool, ConfigurationError> {
    let filter = EnvFilter::try_new(filter)
        .map_err(|e| ConfigurationError::for_field("tracing.filter", e.to_string()))?;

    let installed = match format {
        LogFormat::Plain => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .finish()
            .try_init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .finish()
            .try_init(),
    };
    Ok(installed.is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_repeatable() {
        assert!(init_tracing(LogFormat::Plain, "scopelog=debug").is_ok());
        assert_eq!(init_tracing(LogFormat::Json, "info").ok(), Some(false));
    }

    #[test]
    fn test_invalid_filter() {
        let err = init_tracing(LogFormat::Plain, "scopelog=verbose").unwrap_err();
        assert_eq!(err.field.as_deref(), Some("tracing.filter"));
    }
}
