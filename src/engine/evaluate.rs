//! First-match rule evaluation
//!
//! Scans a rule list in order and stops at the first rule whose pattern
//! matches the target. No match means the target is allowed.

use crate::rules::{Action, AsRule, RuleList};

/// The rule that decided a target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation<'a, R> {
    /// The matched rule
    pub rule: &'a R,

    /// Position of the rule in its list
    pub index: usize,

    /// Stable reference such as `cliRules[2]`
    pub policy_ref: String,
}

impl<'a, R: AsRule> Evaluation<'a, R> {
    pub fn action(&self) -> Action {
        self.rule.as_rule().action
    }
}

/// Find the first rule in `rules` matching `target`
pub fn evaluate<'a, R: AsRule>(target: &str, rules: &'a RuleList<R>) -> Option<Evaluation<'a, R>> {
    rules
        .iter()
        .enumerate()
        .find(|(_, rule)| rule.as_rule().pattern.matches(target))
        .map(|(index, rule)| Evaluation {
            rule,
            index,
            policy_ref: rules.policy_ref(index),
        })
}
