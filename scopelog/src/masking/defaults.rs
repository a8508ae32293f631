//! Built-in rules for commonly sensitive keys.

use super::rule::MaskingRule;
use super::strategy::MaskStrategy;
use crate::errors::ConfigurationError;

const DEFAULT_RULE_COUNT: usize = 9;

fn default_patterns() -> [(&'static str, MaskStrategy); DEFAULT_RULE_COUNT] {
    [
        ("passw(or)?d|^pass$", MaskStrategy::Password),
        ("secret", MaskStrategy::Full),
        ("authorization|^auth$|cookie", MaskStrategy::Full),
        ("api[_-]?key|access[_-]?key", MaskStrategy::Token),
        ("token", MaskStrategy::Token),
        ("credit[_-]?card|card[_-]?number|^pan$", MaskStrategy::CreditCard),
        ("^ssn$|social[_-]?security", MaskStrategy::Ssn),
        ("e[_-]?mail", MaskStrategy::Email),
        ("phone|mobile", MaskStrategy::Phone),
    ]
}

/// Returns the built-in rules, all case-insensitive key regexes.
///
/// They are appended after user rules, so user rules win.
pub fn default_rules() -> Result<Vec<MaskingRule>, ConfigurationError> {
    default_patterns()
        .into_iter()
        .map(|(pattern, strategy)| MaskingRule::regex(pattern, true, strategy))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strategy_for(key: &str) -> Option<MaskStrategy> {
        default_rules()
            .unwrap()
            .into_iter()
            .find(|rule| rule.matches(key))
            .map(|rule| rule.strategy)
    }

    #[test]
    fn test_default_rules_compile() {
        assert_eq!(default_rules().unwrap().len(), DEFAULT_RULE_COUNT);
    }

    #[test]
    fn test_common_keys() {
        assert_eq!(strategy_for("password"), Some(MaskStrategy::Password));
        assert_eq!(strategy_for("clientSecret"), Some(MaskStrategy::Full));
        assert_eq!(strategy_for("Authorization"), Some(MaskStrategy::Full));
        assert_eq!(strategy_for("x-api-key"), Some(MaskStrategy::Token));
        assert_eq!(strategy_for("refreshToken"), Some(MaskStrategy::Token));
        assert_eq!(strategy_for("creditCard"), Some(MaskStrategy::CreditCard));
        assert_eq!(strategy_for("ssn"), Some(MaskStrategy::Ssn));
        assert_eq!(strategy_for("userEmail"), Some(MaskStrategy::Email));
        assert_eq!(strategy_for("phoneNumber"), Some(MaskStrategy::Phone));
        assert_eq!(strategy_for("userId"), None);
    }
}
