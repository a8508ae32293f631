//! Recursive, depth-bounded redaction of JSON value trees.

use super::defaults::default_rules;
use super::rule::MaskingRule;
use crate::errors::{ConfigurationError, MaskingFieldFailure};
use serde_json::{Map, Value};
use tracing::warn;
use url::form_urlencoded;
use url::Url;

/// Default nesting depth processed before values are truncated.
pub const DEFAULT_MAX_DEPTH: usize = 10;

/// Default mask character.
pub const DEFAULT_MASK_CHAR: char = '*';

/// Replacement for containers nested deeper than the depth bound.
pub const TRUNCATED: &str = "[Truncated]";

/// Applies an ordered rule list to value trees.
///
/// The engine holds no per-call state; one instance can be shared across
/// any number of concurrent callers.
#[derive(Debug, Clone)]
pub struct MaskingEngine {
    rules: Vec<MaskingRule>,
    mask_char: char,
    max_depth: usize,
    enabled: bool,
}

impl Default for MaskingEngine {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl MaskingEngine {
    /// Creates an engine with the given rules, evaluated in order.
    #[must_use]
    pub fn new(rules: Vec<MaskingRule>) -> Self {
        Self {
            rules,
            mask_char: DEFAULT_MASK_CHAR,
            max_depth: DEFAULT_MAX_DEPTH,
            enabled: true,
        }
    }

    /// Creates an engine that returns every input unchanged.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Appends the built-in rules after the current ones.
    pub fn with_default_rules(mut self) -> Result<Self, ConfigurationError> {
        self.rules.extend(default_rules()?);
        Ok(self)
    }

    /// Sets the global mask character.
    #[must_use]
    pub fn with_mask_char(mut self, mask_char: char) -> Self {
        self.mask_char = mask_char;
        self
    }

    /// Sets the maximum nesting depth.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Returns true if masking is enabled.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Returns the rules in evaluation order.
    #[must_use]
    pub fn rules(&self) -> &[MaskingRule] {
        &self.rules
    }

    /// Returns the first rule matching `key`.
    #[must_use]
    pub fn rule_for(&self, key: &str) -> Option<&MaskingRule> {
        self.rules.iter().find(|rule| rule.matches(key))
    }

    /// Returns a redacted copy of `value`. The input is never modified.
    #[must_use]
    pub fn process(&self, value: &Value) -> Value {
        if !self.enabled {
            return value.clone();
        }
        self.walk(value, 0)
    }

    /// Redacts every field of an object map.
    #[must_use]
    pub fn process_map(&self, fields: &Map<String, Value>) -> Map<String, Value> {
        if !self.enabled {
            return fields.clone();
        }
        self.walk_object(fields, 0)
    }

    fn walk(&self, value: &Value, depth: usize) -> Value {
        match value {
            Value::Object(_) | Value::Array(_) if depth > self.max_depth => {
                Value::String(TRUNCATED.to_string())
            }
            Value::Object(map) => Value::Object(self.walk_object(map, depth)),
            Value::Array(items) => {
                Value::Array(items.iter().map(|item| self.walk(item, depth + 1)).collect())
            }
            Value::String(s) => self
                .mask_embedded_urls(s)
                .map_or_else(|| value.clone(), Value::String),
            scalar => scalar.clone(),
        }
    }

    fn walk_object(&self, map: &Map<String, Value>, depth: usize) -> Map<String, Value> {
        map.iter()
            .map(|(key, child)| {
                let masked = match self.rule_for(key) {
                    Some(rule) => self.mask_field(key, rule, child),
                    None => self.walk(child, depth + 1),
                };
                (key.clone(), masked)
            })
            .collect()
    }

    /// Applies a rule to one field, keeping the original on failure.
    fn mask_field(&self, key: &str, rule: &MaskingRule, value: &Value) -> Value {
        match self.try_mask(key, rule, value) {
            Ok(masked) => masked,
            Err(failure) => {
                warn!(
                    key = %failure.key,
                    strategy = rule.strategy.name(),
                    reason = %failure.reason,
                    "Masking strategy failed, keeping original value"
                );
                value.clone()
            }
        }
    }

    fn try_mask(
        &self,
        key: &str,
        rule: &MaskingRule,
        value: &Value,
    ) -> Result<Value, MaskingFieldFailure> {
        rule.strategy
            .apply(value, &rule.params, self.mask_char)
            .map_err(|e| MaskingFieldFailure::new(key, e.to_string()))
    }

    /// Masks query parameters of every URL in a whitespace-separated text,
    /// such as `"GET https://host/path?token=x started"`.
    ///
    /// Returns `None` when nothing was masked.
    fn mask_embedded_urls(&self, text: &str) -> Option<String> {
        if !text.contains("://") || !text.contains('?') {
            return None;
        }

        let mut changed = false;
        let masked: String = text
            .split_inclusive(char::is_whitespace)
            .map(|piece| {
                let word = piece.trim_end_matches(char::is_whitespace);
                match self.mask_url(word) {
                    Some(url) => {
                        changed = true;
                        format!("{url}{}", &piece[word.len()..])
                    }
                    None => piece.to_string(),
                }
            })
            .collect();

        changed.then_some(masked)
    }

    /// Masks matching query parameters of an absolute URL.
    ///
    /// Returns `None` when the string is not a URL with a query or when no
    /// parameter matched. Everything outside the query is kept verbatim.
    fn mask_url(&self, raw: &str) -> Option<String> {
        if !raw.contains("://") || !raw.contains('?') {
            return None;
        }
        Url::parse(raw).ok()?.query()?;

        let start = raw.find('?')? + 1;
        let end = raw[start..].find('#').map_or(raw.len(), |i| start + i);

        let mut changed = false;
        let pairs: Vec<String> = raw[start..end]
            .split('&')
            .map(|pair| match self.mask_query_pair(pair) {
                Some(masked) => {
                    changed = true;
                    masked
                }
                None => pair.to_string(),
            })
            .collect();

        changed.then(|| format!("{}{}{}", &raw[..start], pairs.join("&"), &raw[end..]))
    }

    fn mask_query_pair(&self, pair: &str) -> Option<String> {
        let (raw_name, _) = pair.split_once('=')?;
        let (name, value) = form_urlencoded::parse(pair.as_bytes()).next()?;
        let rule = self.rule_for(&name)?;

        let masked = self.mask_field(&name, rule, &Value::String(value.into_owned()));
        let text = match masked {
            Value::String(s) => s,
            other => other.to_string(),
        };
        let encoded: String = form_urlencoded::byte_serialize(text.as_bytes()).collect();
        Some(format!("{raw_name}={encoded}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::masking::{MaskStrategy, StrategyParams};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn engine() -> MaskingEngine {
        MaskingEngine::new(vec![
            MaskingRule::exact("password", MaskStrategy::Full),
            MaskingRule::regex("token", true, MaskStrategy::Full).unwrap(),
        ])
    }

    #[test]
    fn test_exact_rule_with_custom_token() {
        let engine = MaskingEngine::new(vec![MaskingRule::exact("password", MaskStrategy::Full)
            .with_params(StrategyParams::default().with_mask_char("***"))]);

        let masked = engine.process(&json!({"user": "al", "password": "hunter2"}));
        assert_eq!(masked, json!({"user": "al", "password": "***"}));
    }

    #[test]
    fn test_regex_rule_masks_all_matches() {
        let masked = engine().process(&json!({
            "accessToken": "abc",
            "refreshToken": "def",
            "id": 1
        }));
        assert_eq!(
            masked,
            json!({"accessToken": "******", "refreshToken": "******", "id": 1})
        );
    }

    #[test]
    fn test_first_matching_rule_wins() {
        let engine = MaskingEngine::new(vec![
            MaskingRule::exact("apiToken", MaskStrategy::PreserveLength),
            MaskingRule::regex("token", true, MaskStrategy::Full).unwrap(),
        ]);
        let masked = engine.process(&json!({"apiToken": "abcd", "token": "abcd"}));
        assert_eq!(masked, json!({"apiToken": "****", "token": "******"}));
    }

    #[test]
    fn test_nested_objects_and_arrays() {
        let masked = engine().process(&json!({
            "users": [{"name": "a", "password": "p1"}, {"name": "b", "password": "p2"}],
            "meta": {"session": {"token": "t"}}
        }));
        assert_eq!(
            masked,
            json!({
                "users": [{"name": "a", "password": "******"}, {"name": "b", "password": "******"}],
                "meta": {"session": {"token": "******"}}
            })
        );
    }

    #[test]
    fn test_matched_container_is_masked_whole() {
        let masked = engine().process(&json!({"password": {"old": "a", "new": "b"}}));
        assert_eq!(masked, json!({"password": "******"}));
    }

    #[test]
    fn test_input_is_not_mutated() {
        let input = json!({"password": "hunter2", "nested": {"token": "t"}});
        let before = input.clone();
        let _ = engine().process(&input);
        assert_eq!(input, before);
    }

    #[test]
    fn test_deterministic() {
        let input = json!({"password": "x", "list": [1, "two", {"token": "y"}]});
        assert_eq!(engine().process(&input), engine().process(&input));
    }

    #[test]
    fn test_deep_nesting_terminates() {
        let mut value = json!({"password": "bottom"});
        for _ in 0..1_000 {
            value = json!({ "next": value });
        }

        let masked = engine().with_max_depth(3).process(&value);
        assert_eq!(
            masked,
            json!({"next": {"next": {"next": {"next": "[Truncated]"}}}})
        );
    }

    #[test]
    fn test_custom_failure_keeps_original_for_that_field() {
        let engine = MaskingEngine::new(vec![
            MaskingRule::exact(
                "fragile",
                MaskStrategy::custom(|_| Err("transform exploded".into())),
            ),
            MaskingRule::exact("password", MaskStrategy::Full),
        ]);

        let masked = engine.process(&json!({"fragile": "keep-me", "password": "p"}));
        assert_eq!(masked, json!({"fragile": "keep-me", "password": "******"}));
    }

    #[test]
    fn test_url_query_masking() {
        let masked = engine().process(&json!({
            "url": "https://api.example.com/v1/items?token=abc123&page=2#section"
        }));
        assert_eq!(
            masked,
            json!({"url": "https://api.example.com/v1/items?token=******&page=2#section"})
        );
    }

    #[test]
    fn test_urls_inside_free_text_are_masked() {
        let text = "GET https://api.example.com/v1?token=secret123 failed:\tsee https://a.io/?p=1";
        let masked = engine().process(&json!({ "msg": text }));
        let expected = "GET https://api.example.com/v1?token=****** failed:\tsee https://a.io/?p=1";
        assert_eq!(masked, json!({ "msg": expected }));
    }

    #[test]
    fn test_url_without_matching_params_is_untouched() {
        let input = json!(["https://example.com/a?page=1&q=rust%20lang", "not a url ?token=x"]);
        assert_eq!(engine().process(&input), input);
    }

    #[test]
    fn test_disabled_engine_passthrough() {
        let input = json!({"password": "hunter2"});
        assert_eq!(MaskingEngine::disabled().process(&input), input);
    }

    #[test]
    fn test_user_rules_win_over_defaults() {
        let engine = MaskingEngine::new(vec![MaskingRule::exact(
            "password",
            MaskStrategy::PreserveLength,
        )])
        .with_default_rules()
        .unwrap();

        let masked = engine.process(&json!({"password": "abc", "apiKey": "abcdefghijkl"}));
        assert_eq!(masked, json!({"password": "***", "apiKey": "ab********kl"}));
    }

    #[test]
    fn test_matched_null_is_masked() {
        let engine =
            MaskingEngine::new(vec![MaskingRule::exact("p", MaskStrategy::PreserveLength)]);
        assert_eq!(
            engine.process(&json!({"p": null, "q": null})),
            json!({"p": "****", "q": null})
        );
    }
}
