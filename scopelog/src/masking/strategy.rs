//! Redaction strategies applied to the value of a matched key.

use crate::errors::BoxError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Number of mask characters in the default full-mask token.
pub const FULL_MASK_WIDTH: usize = 6;

/// Number of mask characters a password is replaced with.
pub const PASSWORD_MASK_WIDTH: usize = 8;

/// Characters left visible at the end of card, SSN and phone values.
const VISIBLE_TAIL: usize = 4;

/// Upper bound on each visible end of a `token` value without explicit
/// params. Shorter values show one character per end for every five.
const MAX_TOKEN_VISIBLE: usize = 4;
const TOKEN_VISIBLE_RATIO: usize = 5;

/// Caller-supplied transform for [`MaskStrategy::Custom`].
pub type CustomMask = Arc<dyn Fn(&Value) -> Result<Value, BoxError> + Send + Sync>;

/// Per-rule strategy parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyParams {
    /// Replacement token for `full`, or the mask character source for
    /// length-preserving strategies (its first character is used).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mask_char: Option<String>,
    /// Visible leading characters for `token`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visible_prefix: Option<usize>,
    /// Visible trailing characters for `token`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visible_suffix: Option<usize>,
}

impl StrategyParams {
    /// Sets the mask token.
    #[must_use]
    pub fn with_mask_char(mut self, mask: impl Into<String>) -> Self {
        self.mask_char = Some(mask.into());
        self
    }

    /// Sets the visible prefix and suffix for `token`.
    #[must_use]
    pub fn with_visible(mut self, prefix: usize, suffix: usize) -> Self {
        self.visible_prefix = Some(prefix);
        self.visible_suffix = Some(suffix);
        self
    }

    fn mask_char_or(&self, fallback: char) -> char {
        self.mask_char
            .as_deref()
            .and_then(|m| m.chars().next())
            .unwrap_or(fallback)
    }
}

/// How a matched value is redacted.
#[derive(Clone)]
pub enum MaskStrategy {
    /// Replace with a fixed token.
    Full,
    /// Replace every character, keeping the length.
    PreserveLength,
    /// Keep the last four characters and separators.
    CreditCard,
    /// Keep the last four characters and separators.
    Ssn,
    /// Keep the first character of the local part and the domain.
    Email,
    /// Keep the last four characters and separators.
    Phone,
    /// Keep a short prefix and suffix.
    Token,
    /// Replace with a fixed-width token.
    Password,
    /// Caller-supplied transform.
    Custom(CustomMask),
}

impl MaskStrategy {
    /// Wraps a closure as a custom strategy.
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&Value) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(f))
    }

    /// Returns the configuration name of the strategy.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::PreserveLength => "preserve_length",
            Self::CreditCard => "credit_card",
            Self::Ssn => "ssn",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Token => "token",
            Self::Password => "password",
            Self::Custom(_) => "custom",
        }
    }

    /// Applies the strategy to a value.
    ///
    /// Only [`MaskStrategy::Custom`] can fail. Non-string inputs, `null`
    /// included, are stringified first.
    pub fn apply(
        &self,
        value: &Value,
        params: &StrategyParams,
        mask_char: char,
    ) -> Result<Value, BoxError> {
        match self {
            Self::Custom(f) => f(value),
            builtin => Ok(Value::String(builtin.mask_text(
                &stringify(value),
                params,
                mask_char,
            ))),
        }
    }

    fn mask_text(&self, text: &str, params: &StrategyParams, mask_char: char) -> String {
        let mask = params.mask_char_or(mask_char);
        match self {
            Self::Full => params
                .mask_char
                .clone()
                .unwrap_or_else(|| repeat(mask_char, FULL_MASK_WIDTH)),
            Self::PreserveLength => repeat(mask, text.chars().count()),
            Self::CreditCard | Self::Ssn | Self::Phone => mask_keep_tail(text, mask, VISIBLE_TAIL),
            Self::Email => mask_email(text, mask),
            Self::Token => {
                let visible = default_token_visible(text);
                mask_token(
                    text,
                    mask,
                    params.visible_prefix.unwrap_or(visible),
                    params.visible_suffix.unwrap_or(visible),
                )
            }
            Self::Password => repeat(mask, PASSWORD_MASK_WIDTH),
            Self::Custom(_) => text.to_string(),
        }
    }
}

impl fmt::Debug for MaskStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl PartialEq for MaskStrategy {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Custom(a), Self::Custom(b)) => Arc::ptr_eq(a, b),
            _ => self.name() == other.name(),
        }
    }
}

impl FromStr for MaskStrategy {
    type Err = String;

    /// Parses a built-in strategy name. `custom` has no textual form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "full" => Ok(Self::Full),
            "preserve_length" => Ok(Self::PreserveLength),
            "credit_card" => Ok(Self::CreditCard),
            "ssn" => Ok(Self::Ssn),
            "email" => Ok(Self::Email),
            "phone" => Ok(Self::Phone),
            "token" => Ok(Self::Token),
            "password" => Ok(Self::Password),
            other => Err(format!("unknown masking strategy '{other}'")),
        }
    }
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn repeat(mask: char, count: usize) -> String {
    std::iter::repeat(mask).take(count).collect()
}

/// Masks alphanumerics except the last `visible` ones; separators survive.
fn mask_keep_tail(text: &str, mask: char, visible: usize) -> String {
    let total = text.chars().filter(|c| c.is_alphanumeric()).count();
    let hidden = total.saturating_sub(visible);
    let mut seen = 0;

    text.chars()
        .map(|c| {
            if !c.is_alphanumeric() {
                return c;
            }
            seen += 1;
            if seen <= hidden {
                mask
            } else {
                c
            }
        })
        .collect()
}

fn mask_email(text: &str, mask: char) -> String {
    let Some((local, domain)) = text.split_once('@') else {
        return repeat(mask, text.chars().count());
    };

    let mut chars = local.chars();
    let mut out = String::with_capacity(text.len());
    if let Some(first) = chars.next() {
        out.push(first);
    }
    out.extend(chars.map(|_| mask));
    out.push('@');
    out.push_str(domain);
    out
}

fn default_token_visible(text: &str) -> usize {
    (text.chars().count() / TOKEN_VISIBLE_RATIO).min(MAX_TOKEN_VISIBLE)
}

fn mask_token(text: &str, mask: char, prefix: usize, suffix: usize) -> String {
    let len = text.chars().count();
    if len <= prefix + suffix {
        return repeat(mask, len);
    }

    text.chars()
        .enumerate()
        .map(|(i, c)| if i < prefix || i >= len - suffix { c } else { mask })
        .collect()
}
