//! Per-level allowlists of context fields surfaced in log entries.

use super::{identity, manager};
use crate::level::LogLevel;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Rule key used when no level-specific rule exists.
pub const DEFAULT_RULE: &str = "default";

/// Field name matching every context field.
pub const ALL_FIELDS: &str = "*";

/// Maps a severity (or `default`) to the context fields to surface.
///
/// ```json
/// { "default": ["correlationId"], "error": ["*"] }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LoggingMatrix {
    rules: HashMap<String, Vec<String>>,
}

impl LoggingMatrix {
    /// Creates an empty matrix.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the fields for one level.
    #[must_use]
    pub fn with_level<I, S>(mut self, level: LogLevel, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rules.insert(
            level.as_str().to_string(),
            fields.into_iter().map(Into::into).collect(),
        );
        self
    }

    /// Sets the fallback fields.
    #[must_use]
    pub fn with_default<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rules.insert(
            DEFAULT_RULE.to_string(),
            fields.into_iter().map(Into::into).collect(),
        );
        self
    }

    /// Returns the allowlist for a level, falling back to `default`.
    ///
    /// `None` means no restriction applies.
    #[must_use]
    pub fn fields_for(&self, level: LogLevel) -> Option<&[String]> {
        self.rules
            .get(level.as_str())
            .or_else(|| self.rules.get(DEFAULT_RULE))
            .map(Vec::as_slice)
    }

    /// Returns the rule keys that are neither a level nor `default`.
    #[must_use]
    pub fn unknown_rules(&self) -> Vec<String> {
        let mut unknown: Vec<String> = self
            .rules
            .keys()
            .filter(|key| key.as_str() != DEFAULT_RULE && key.parse::<LogLevel>().is_err())
            .cloned()
            .collect();
        unknown.sort();
        unknown
    }

    /// Applies the allowlist for `level` to a set of fields.
    #[must_use]
    pub fn filter(
        &self,
        level: LogLevel,
        fields: serde_json::Map<String, serde_json::Value>,
    ) -> serde_json::Map<String, serde_json::Value> {
        match self.fields_for(level) {
            None => fields,
            Some(allowed) if allowed.iter().any(|f| f == ALL_FIELDS) => fields,
            Some(allowed) => fields
                .into_iter()
                .filter(|(key, _)| allowed.iter().any(|f| f == key))
                .collect(),
        }
    }
}

/// Returns the active scope's fields filtered for `level`.
///
/// Identity keys stored under their header names are renamed to
/// `correlationId` / `transactionId` before filtering. Without a matrix,
/// every field is included.
#[must_use]
pub fn filtered_context(
    level: LogLevel,
    matrix: Option<&LoggingMatrix>,
) -> serde_json::Map<String, serde_json::Value> {
    let names = identity::identity_headers();
    let fields: serde_json::Map<String, serde_json::Value> = manager::get_all()
        .into_iter()
        .map(|(key, value)| {
            let key = names
                .logical_name(&key)
                .map_or(key, std::string::ToString::to_string);
            (key, value.to_json())
        })
        .collect();

    match matrix {
        Some(matrix) => matrix.filter(level, fields),
        None => fields,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{run_sync, set, set_correlation_id};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_fields_for_fallback() {
        let matrix = LoggingMatrix::new()
            .with_default(["correlationId"])
            .with_level(LogLevel::Error, ["*"]);

        assert_eq!(
            matrix.fields_for(LogLevel::Info),
            Some(&["correlationId".to_string()][..])
        );
        assert_eq!(matrix.fields_for(LogLevel::Error), Some(&["*".to_string()][..]));
        assert_eq!(LoggingMatrix::new().fields_for(LogLevel::Info), None);
    }

    #[test]
    fn test_filtered_context_without_matrix_includes_all() {
        run_sync(|| {
            set("userId", "u-1");
            set("tenant", "acme");
            let fields = filtered_context(LogLevel::Debug, None);
            assert_eq!(fields.len(), 2);
        });
    }

    #[test]
    fn test_filtered_context_renames_identity() {
        run_sync(|| {
            set_correlation_id("corr-9");
            set("userId", "u-1");

            let matrix = LoggingMatrix::new().with_default(["correlationId"]);
            let fields = filtered_context(LogLevel::Info, Some(&matrix));

            let expected: serde_json::Map<String, serde_json::Value> =
                [("correlationId".to_string(), serde_json::json!("corr-9"))]
                    .into_iter()
                    .collect();
            assert_eq!(fields, expected);
        });
    }

    #[test]
    fn test_deserialize_matrix() {
        let matrix: LoggingMatrix =
            serde_json::from_str(r#"{"default": ["a"], "warn": ["a", "b"], "loud": []}"#).unwrap();
        assert_eq!(matrix.fields_for(LogLevel::Warn).map(<[String]>::len), Some(2));
        assert_eq!(matrix.unknown_rules(), vec!["loud".to_string()]);
    }

    #[test]
    fn test_filtered_context_outside_scope() {
        let matrix = LoggingMatrix::new().with_default(["*"]);
        assert!(filtered_context(LogLevel::Info, Some(&matrix)).is_empty());
    }
}
