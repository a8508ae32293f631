//! Masking rules: a key pattern paired with a strategy.

use super::strategy::{MaskStrategy, StrategyParams};
use crate::errors::ConfigurationError;
use regex::Regex;

/// How a rule selects object keys.
#[derive(Debug, Clone)]
pub enum KeyPattern {
    /// Exact, case-sensitive key equality.
    Exact(String),
    /// Regex tested against the key.
    Regex(Regex),
}

impl KeyPattern {
    /// Compiles a key regex, optionally case-insensitive.
    pub fn regex(pattern: &str, case_insensitive: bool) -> Result<Self, ConfigurationError> {
        let source = if case_insensitive {
            format!("(?i){pattern}")
        } else {
            pattern.to_string()
        };
        Regex::new(&source).map(Self::Regex).map_err(|e| {
            ConfigurationError::for_field(
                "masking.rules",
                format!("invalid key regex '{pattern}': {e}"),
            )
        })
    }

    /// Returns true if `key` is selected.
    #[must_use]
    pub fn matches(&self, key: &str) -> bool {
        match self {
            Self::Exact(name) => name == key,
            Self::Regex(re) => re.is_match(key),
        }
    }
}

impl PartialEq for KeyPattern {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Exact(a), Self::Exact(b)) => a == b,
            (Self::Regex(a), Self::Regex(b)) => a.as_str() == b.as_str(),
            _ => false,
        }
    }
}

/// A key pattern, the strategy for matched values, and its parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct MaskingRule {
    /// Which keys the rule applies to.
    pub pattern: KeyPattern,
    /// How matched values are redacted.
    pub strategy: MaskStrategy,
    /// Strategy parameters.
    pub params: StrategyParams,
}

impl MaskingRule {
    /// Creates a rule matching one exact key.
    #[must_use]
    pub fn exact(key: impl Into<String>, strategy: MaskStrategy) -> Self {
        Self {
            pattern: KeyPattern::Exact(key.into()),
            strategy,
            params: StrategyParams::default(),
        }
    }

    /// Creates a rule matching keys against a regex.
    pub fn regex(
        pattern: &str,
        case_insensitive: bool,
        strategy: MaskStrategy,
    ) -> Result<Self, ConfigurationError> {
        Ok(Self {
            pattern: KeyPattern::regex(pattern, case_insensitive)?,
            strategy,
            params: StrategyParams::default(),
        })
    }

    /// Sets the strategy parameters.
    #[must_use]
    pub fn with_params(mut self, params: StrategyParams) -> Self {
        self.params = params;
        self
    }

    /// Returns true if the rule applies to `key`.
    #[must_use]
    pub fn matches(&self, key: &str) -> bool {
        self.pattern.matches(key)
    }
}
