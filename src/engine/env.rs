//! Environment variable policy checks
//!
//! Same first-match rules as files, except masking hands the agent a
//! shortened, mostly-asterisk form of the real value instead of blocking.

use crate::engine::blocked;
use crate::engine::evaluate::evaluate;
use crate::output::{Allowed, Outcome};
use crate::rules::{Action, RuleList};

/// Default reason for hidden variables
pub const ENV_DENIED: &str = "env_denied_by_policy";

/// Masked form of short values
pub const SHORT_MASK: &str = "****";

/// Longest run of asterisks in a masked value
pub const MAX_MASK_STARS: usize = 8;

/// Mask `value`, or use `replacement` verbatim when given.
///
/// Values up to four characters become `****`. Longer values keep their
/// first and last character with at most eight asterisks between.
pub fn mask_value(value: &str, replacement: Option<&str>) -> String {
    if let Some(replacement) = replacement {
        return replacement.to_string();
    }

    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 4 {
        return SHORT_MASK.to_string();
    }

    let stars = (chars.len() - 2).min(MAX_MASK_STARS);
    let mut masked = String::with_capacity(stars + 8);
    masked.push(chars[0]);
    masked.push_str(&"*".repeat(stars));
    masked.push(chars[chars.len() - 1]);
    masked
}

/// Policy over environment variables
#[derive(Debug, Clone)]
pub struct EnvPolicy {
    rules: RuleList,
}

impl EnvPolicy {
    pub fn new(rules: RuleList) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &RuleList {
        &self.rules
    }

    /// Check `key` and compute the value the agent sees for `value`
    pub fn check_env(&self, key: &str, value: &str) -> Outcome<String> {
        let Some(hit) = evaluate(key, &self.rules) else {
            return Outcome::Allowed(Allowed::by_default(value.to_string()));
        };

        let rule = hit.rule;
        let reason = rule.reason.as_deref().unwrap_or(ENV_DENIED);

        match rule.action {
            Action::Allow => Outcome::Allowed(Allowed {
                value: value.to_string(),
                context: rule.reason.clone(),
                action: Action::Allow,
                policy: Some(hit.policy_ref),
            }),
            Action::Deny => Outcome::Blocked(blocked(key, &hit.policy_ref, rule, reason, None, &[])),
            Action::Mask => Outcome::Allowed(Allowed {
                value: mask_value(value, rule.replacement.as_deref()),
                context: rule.reason.clone(),
                action: Action::Mask,
                policy: Some(hit.policy_ref),
            }),
            Action::Rewrite => match rule.replacement.as_deref() {
                Some(replacement) => Outcome::Allowed(Allowed {
                    value: replacement.to_string(),
                    context: None,
                    action: Action::Rewrite,
                    policy: Some(hit.policy_ref),
                }),
                None => Outcome::Blocked(blocked(key, &hit.policy_ref, rule, reason, None, &[])),
            },
        }
    }

    /// Check whether the agent may see `key` in any form
    pub fn is_visible(&self, key: &str) -> bool {
        self.check_env(key, "").is_allowed()
    }

    /// Keep only the keys the agent may see
    pub fn filter<'a, S: AsRef<str>>(&self, keys: &'a [S]) -> Vec<&'a str> {
        keys.iter()
            .map(|k| k.as_ref())
            .filter(|k| self.is_visible(k))
            .collect()
    }

    /// Apply the policy to a set of variables: hidden ones are dropped,
    /// masked and rewritten ones carry the transformed value.
    pub fn sanitize<I, K, V>(&self, vars: I) -> Vec<(String, String)>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        vars.into_iter()
            .filter_map(|(key, value)| {
                let key = key.as_ref();
                self.check_env(key, value.as_ref())
                    .into_value()
                    .map(|visible| (key.to_string(), visible))
            })
            .collect()
    }
}
