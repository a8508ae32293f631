//! Which context keys travel with outbound calls.

use crate::context;
use std::collections::HashMap;

/// Selects the context keys injected as outbound headers.
///
/// Identity headers are injected whenever they are set, whatever the policy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PropagationPolicy {
    /// Only identity headers.
    #[default]
    None,
    /// Identity plus the listed keys.
    Select(Vec<String>),
    /// Every header-eligible key in the scope.
    Wildcard,
}

impl PropagationPolicy {
    /// Resolves a policy from configuration inputs.
    ///
    /// Precedence: a non-empty explicit key list, then the wildcard flag,
    /// then the legacy full-context flag, else identity only.
    #[must_use]
    pub fn resolve(
        keys: Option<&[String]>,
        propagate_all_keys: bool,
        legacy_full_context: bool,
    ) -> Self {
        match keys {
            Some(keys) if !keys.is_empty() => Self::Select(keys.to_vec()),
            _ if propagate_all_keys || legacy_full_context => Self::Wildcard,
            _ => Self::None,
        }
    }

    /// Builds the headers to inject from the active scope.
    ///
    /// Values without a header representation are skipped. Outside a scope
    /// the result is empty.
    #[must_use]
    pub fn outbound_headers(&self) -> HashMap<String, String> {
        let mut headers = match self {
            Self::None => HashMap::new(),
            Self::Select(keys) => keys
                .iter()
                .filter_map(|key| context::get_str(key).map(|value| (key.clone(), value)))
                .collect(),
            Self::Wildcard => context::get_all()
                .into_iter()
                .filter_map(|(key, value)| value.to_header_value().map(|v| (key, v)))
                .collect(),
        };
        headers.extend(context::trace_context_headers());
        headers
    }

    /// Adds the outbound headers to `headers`, keeping any already set.
    pub fn inject(&self, headers: &mut HashMap<String, String>) {
        for (name, value) in self.outbound_headers() {
            headers.entry(name).or_insert(value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{run_sync, set, set_correlation_id};
    use pretty_assertions::assert_eq;

    fn owned(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_resolve_precedence() {
        let keys = vec!["tenant".to_string()];
        assert_eq!(
            PropagationPolicy::resolve(Some(&keys), true, true),
            PropagationPolicy::Select(keys.clone())
        );
        assert_eq!(PropagationPolicy::resolve(Some(&[]), true, false), PropagationPolicy::Wildcard);
        assert_eq!(PropagationPolicy::resolve(None, false, true), PropagationPolicy::Wildcard);
        assert_eq!(PropagationPolicy::resolve(None, false, false), PropagationPolicy::None);
    }

    #[test]
    fn test_wildcard_includes_identity_once() {
        run_sync(|| {
            set("a", "1");
            set("b", "2");
            set_correlation_id("corr-x");
            set("blob", serde_json::json!({"not": "a header"}));

            let headers = PropagationPolicy::Wildcard.outbound_headers();
            assert_eq!(
                headers,
                owned(&[("a", "1"), ("b", "2"), ("x-correlation-id", "corr-x")])
            );
        });
    }

    #[test]
    fn test_select_and_none() {
        run_sync(|| {
            set("tenant", "acme");
            set("secret", "s");
            set_correlation_id("c-1");

            let select = PropagationPolicy::Select(vec!["tenant".into(), "missing".into()]);
            assert_eq!(
                select.outbound_headers(),
                owned(&[("tenant", "acme"), ("x-correlation-id", "c-1")])
            );
            assert_eq!(
                PropagationPolicy::None.outbound_headers(),
                owned(&[("x-correlation-id", "c-1")])
            );
        });
    }

    #[test]
    fn test_inject_keeps_explicit_headers() {
        run_sync(|| {
            set("tenant", "from-context");
            set_correlation_id("c-2");

            let mut headers = owned(&[("tenant", "explicit")]);
            PropagationPolicy::Wildcard.inject(&mut headers);
            assert_eq!(
                headers,
                owned(&[("tenant", "explicit"), ("x-correlation-id", "c-2")])
            );
        });
    }

    #[test]
    fn test_outside_scope_is_empty() {
        assert!(PropagationPolicy::Wildcard.outbound_headers().is_empty());
    }
}
