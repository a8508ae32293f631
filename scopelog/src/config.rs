//! Configuration for loggers, masking and instrumentation.
//!
//! Everything is consumed at construction time. [`ScopelogConfig::validate`]
//! rejects unusable settings with a [`ConfigurationError`] before any
//! logger or wrapper is built.

use crate::context::{IdentityHeaders, LoggingMatrix};
use crate::errors::{ConfigurationError, ScopelogError};
use crate::instrument::PropagationPolicy;
use crate::level::LogLevel;
use crate::masking::{
    MaskStrategy, MaskingEngine, MaskingRule, StrategyParams, DEFAULT_MASK_CHAR, DEFAULT_MAX_DEPTH,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopelogConfig {
    /// Threshold for pooled loggers.
    #[serde(default)]
    pub level: LogLevel,
    /// Service name used as the default logger name.
    #[serde(default = "default_service_name")]
    pub service_name: String,
    /// Context fields surfaced per level.
    #[serde(default)]
    pub logging_matrix: Option<LoggingMatrix>,
    /// Identity header names.
    #[serde(default)]
    pub identity: IdentityHeaders,
    /// Masking settings.
    #[serde(default)]
    pub masking: MaskingConfig,
    /// Per-field serializer budget in milliseconds.
    #[serde(default = "default_serializer_timeout_ms")]
    pub serializer_timeout_ms: u64,
    /// Transport drain budget at shutdown in milliseconds.
    #[serde(default = "default_shutdown_timeout_ms")]
    pub shutdown_timeout_ms: u64,
    /// Defaults for instrumented adapters.
    #[serde(default)]
    pub instrumentation: InstrumentationConfig,
}

fn default_service_name() -> String {
    "app".to_string()
}

fn default_serializer_timeout_ms() -> u64 {
    100
}

fn default_shutdown_timeout_ms() -> u64 {
    5_000
}

impl Default for ScopelogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            service_name: default_service_name(),
            logging_matrix: None,
            identity: IdentityHeaders::default(),
            masking: MaskingConfig::default(),
            serializer_timeout_ms: default_serializer_timeout_ms(),
            shutdown_timeout_ms: default_shutdown_timeout_ms(),
            instrumentation: InstrumentationConfig::default(),
        }
    }
}

impl ScopelogConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses and validates JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self, ScopelogError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Sets the logger threshold.
    #[must_use]
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    /// Sets the service name.
    #[must_use]
    pub fn with_service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = name.into();
        self
    }

    /// Sets the logging matrix.
    #[must_use]
    pub fn with_logging_matrix(mut self, matrix: LoggingMatrix) -> Self {
        self.logging_matrix = Some(matrix);
        self
    }

    /// Sets the identity header names.
    #[must_use]
    pub fn with_identity(mut self, identity: IdentityHeaders) -> Self {
        self.identity = identity;
        self
    }

    /// Sets the masking settings.
    #[must_use]
    pub fn with_masking(mut self, masking: MaskingConfig) -> Self {
        self.masking = masking;
        self
    }

    /// Sets the instrumentation defaults.
    #[must_use]
    pub fn with_instrumentation(mut self, instrumentation: InstrumentationConfig) -> Self {
        self.instrumentation = instrumentation;
        self
    }

    /// Gets the serializer timeout as a Duration.
    #[must_use]
    pub fn serializer_timeout(&self) -> Duration {
        Duration::from_millis(self.serializer_timeout_ms)
    }

    /// Gets the shutdown timeout as a Duration.
    #[must_use]
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }

    /// Checks every section.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.service_name.trim().is_empty() {
            return Err(ConfigurationError::for_field("service_name", "must not be empty"));
        }
        if self.serializer_timeout_ms == 0 {
            return Err(ConfigurationError::for_field("serializer_timeout_ms", "must be positive"));
        }
        if self.shutdown_timeout_ms == 0 {
            return Err(ConfigurationError::for_field("shutdown_timeout_ms", "must be positive"));
        }
        if let Some(matrix) = &self.logging_matrix {
            let unknown = matrix.unknown_rules();
            if !unknown.is_empty() {
                return Err(ConfigurationError::for_field(
                    "logging_matrix",
                    format!("unknown levels: {}", unknown.join(", ")),
                ));
            }
        }
        self.identity.validate()?;
        self.masking.build_engine()?;
        Ok(())
    }
}

/// Masking settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskingConfig {
    /// Whether masking runs at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Global mask character.
    #[serde(default = "default_mask_char")]
    pub mask_char: char,
    /// Maximum nesting depth processed.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    /// Whether the built-in rules are appended after `rules`.
    #[serde(default = "default_true")]
    pub use_default_rules: bool,
    /// User rules, evaluated in order.
    #[serde(default)]
    pub rules: Vec<MaskingRuleConfig>,
}

fn default_true() -> bool {
    true
}

fn default_mask_char() -> char {
    DEFAULT_MASK_CHAR
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

impl Default for MaskingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            mask_char: default_mask_char(),
            max_depth: default_max_depth(),
            use_default_rules: true,
            rules: Vec::new(),
        }
    }
}

impl MaskingConfig {
    /// Adds a rule.
    #[must_use]
    pub fn with_rule(mut self, rule: MaskingRuleConfig) -> Self {
        self.rules.push(rule);
        self
    }

    /// Toggles the built-in rules.
    #[must_use]
    pub fn with_default_rules(mut self, enabled: bool) -> Self {
        self.use_default_rules = enabled;
        self
    }

    /// Builds the engine described by these settings.
    pub fn build_engine(&self) -> Result<MaskingEngine, ConfigurationError> {
        if !self.enabled {
            return Ok(MaskingEngine::disabled());
        }
        if self.max_depth == 0 {
            return Err(ConfigurationError::for_field("masking.max_depth", "must be positive"));
        }
        if self.mask_char.is_control() {
            return Err(ConfigurationError::for_field(
                "masking.mask_char",
                "must be a printable character",
            ));
        }

        let rules = self
            .rules
            .iter()
            .map(MaskingRuleConfig::build)
            .collect::<Result<Vec<_>, _>>()?;
        let engine = MaskingEngine::new(rules)
            .with_mask_char(self.mask_char)
            .with_max_depth(self.max_depth);

        if self.use_default_rules {
            engine.with_default_rules()
        } else {
            Ok(engine)
        }
    }
}

/// One configured masking rule.
///
/// Exactly one of `pattern` (exact key) or `regex` must be set. Custom
/// strategies cannot be expressed in configuration; build those with
/// [`MaskingRule`] directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskingRuleConfig {
    /// Exact key to match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Key regex to match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,
    /// Whether `regex` ignores case.
    #[serde(default)]
    pub case_insensitive: bool,
    /// Strategy name, e.g. `full` or `credit_card`.
    #[serde(default = "default_strategy")]
    pub strategy: String,
    /// Strategy parameters.
    #[serde(default)]
    pub params: StrategyParams,
}

fn default_strategy() -> String {
    "full".to_string()
}

impl MaskingRuleConfig {
    /// Creates an exact-key rule.
    #[must_use]
    pub fn exact(key: impl Into<String>, strategy: impl Into<String>) -> Self {
        Self {
            pattern: Some(key.into()),
            regex: None,
            case_insensitive: false,
            strategy: strategy.into(),
            params: StrategyParams::default(),
        }
    }

    /// Creates a key-regex rule.
    #[must_use]
    pub fn regex(
        pattern: impl Into<String>,
        case_insensitive: bool,
        strategy: impl Into<String>,
    ) -> Self {
        Self {
            pattern: None,
            regex: Some(pattern.into()),
            case_insensitive,
            strategy: strategy.into(),
            params: StrategyParams::default(),
        }
    }

    /// Sets the strategy parameters.
    #[must_use]
    pub fn with_params(mut self, params: StrategyParams) -> Self {
        self.params = params;
        self
    }

    /// Compiles the rule.
    pub fn build(&self) -> Result<MaskingRule, ConfigurationError> {
        let strategy: MaskStrategy = self
            .strategy
            .parse()
            .map_err(|e: String| ConfigurationError::for_field("masking.rules.strategy", e))?;

        let rule = match (&self.pattern, &self.regex) {
            (Some(key), None) => MaskingRule::exact(key.clone(), strategy),
            (None, Some(regex)) => MaskingRule::regex(regex, self.case_insensitive, strategy)?,
            _ => {
                return Err(ConfigurationError::for_field(
                    "masking.rules",
                    "exactly one of 'pattern' or 'regex' is required",
                ))
            }
        };
        Ok(rule.with_params(self.params.clone()))
    }
}

/// Log levels for each instrumentation event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLogLevels {
    /// Before an outbound call.
    #[serde(default = "default_debug")]
    pub start: LogLevel,
    /// After a successful call.
    #[serde(default = "default_info")]
    pub success: LogLevel,
    /// After a failed call.
    #[serde(default = "default_error")]
    pub error: LogLevel,
    /// When a message is received.
    #[serde(default = "default_info")]
    pub received: LogLevel,
    /// When a message is acked or nacked, and on connect/disconnect.
    #[serde(default = "default_debug")]
    pub completion: LogLevel,
}

fn default_debug() -> LogLevel {
    LogLevel::Debug
}

fn default_info() -> LogLevel {
    LogLevel::Info
}

fn default_error() -> LogLevel {
    LogLevel::Error
}

impl Default for EventLogLevels {
    fn default() -> Self {
        Self {
            start: default_debug(),
            success: default_info(),
            error: default_error(),
            received: default_info(),
            completion: default_debug(),
        }
    }
}

/// Settings for one instrumented adapter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentationConfig {
    /// Context keys to propagate. Takes precedence over the flags below.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub propagate_keys: Option<Vec<String>>,
    /// Propagate every header-eligible context key.
    #[serde(default)]
    pub propagate_all_keys: bool,
    /// Legacy spelling of `propagate_all_keys`.
    #[serde(default)]
    pub propagate_full_context: bool,
    /// Per-event log levels.
    #[serde(default)]
    pub log_levels: EventLogLevels,
    /// Include headers in call records.
    #[serde(default)]
    pub log_headers: bool,
    /// Include bodies and payloads in call records.
    #[serde(default)]
    pub log_body: bool,
}

impl InstrumentationConfig {
    /// Creates settings with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Propagates the listed keys.
    #[must_use]
    pub fn with_propagate_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.propagate_keys = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    /// Propagates every context key.
    #[must_use]
    pub fn with_propagate_all_keys(mut self, enabled: bool) -> Self {
        self.propagate_all_keys = enabled;
        self
    }

    /// Sets the per-event log levels.
    #[must_use]
    pub fn with_log_levels(mut self, levels: EventLogLevels) -> Self {
        self.log_levels = levels;
        self
    }

    /// Includes headers in call records.
    #[must_use]
    pub fn with_log_headers(mut self, enabled: bool) -> Self {
        self.log_headers = enabled;
        self
    }

    /// Includes bodies in call records.
    #[must_use]
    pub fn with_log_body(mut self, enabled: bool) -> Self {
        self.log_body = enabled;
        self
    }

    /// Resolves the propagation policy.
    #[must_use]
    pub fn policy(&self) -> PropagationPolicy {
        PropagationPolicy::resolve(
            self.propagate_keys.as_deref(),
            self.propagate_all_keys,
            self.propagate_full_context,
        )
    }
}
