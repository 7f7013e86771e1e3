//! Policy rules for agent-policy
//!
//! Defines rule patterns, actions, ordered rule lists, modal rule
//! definitions and the rule registry.

pub mod builtin;
pub mod modal;
pub mod pattern;
pub mod registry;

pub use pattern::Pattern;

use serde::{Deserialize, Serialize};
use std::fmt;

/// What happens to a target matched by a rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Visible unchanged
    Allow,

    /// Hidden from the agent
    Deny,

    /// Visible with the value masked
    Mask,

    /// Replaced by the rule's replacement text
    Rewrite,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Allow => "allow",
            Action::Deny => "deny",
            Action::Mask => "mask",
            Action::Rewrite => "rewrite",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The kind of target a rule list applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleKind {
    File,
    Env,
    Cli,
}

impl RuleKind {
    /// Name used in policy references, e.g. `fileRules[0]`
    pub fn list_name(&self) -> &'static str {
        match self {
            RuleKind::File => "fileRules",
            RuleKind::Env => "envRules",
            RuleKind::Cli => "cliRules",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RuleKind::File => "file",
            RuleKind::Env => "env",
            RuleKind::Cli => "cli",
        }
    }
}

/// A file or env rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    /// Pattern the target must match
    pub pattern: Pattern,

    /// Action applied on match
    pub action: Action,

    /// Replacement text for mask/rewrite
    pub replacement: Option<String>,

    /// Human-readable reason (advisory context for allow rules)
    pub reason: Option<String>,
}

impl Rule {
    /// Create a rule with no replacement or reason
    pub fn new(pattern: Pattern, action: Action) -> Self {
        Self {
            pattern,
            action,
            replacement: None,
            reason: None,
        }
    }

    pub fn allow(pattern: Pattern) -> Self {
        Self::new(pattern, Action::Allow)
    }

    pub fn deny(pattern: Pattern) -> Self {
        Self::new(pattern, Action::Deny)
    }

    pub fn mask(pattern: Pattern) -> Self {
        Self::new(pattern, Action::Mask)
    }

    pub fn rewrite(pattern: Pattern, replacement: impl Into<String>) -> Self {
        Self::new(pattern, Action::Rewrite).with_replacement(replacement)
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_replacement(mut self, replacement: impl Into<String>) -> Self {
        self.replacement = Some(replacement.into());
        self
    }

    /// Turn this rule into a command rule
    pub fn into_cli(self) -> CliRule {
        CliRule::new(self)
    }
}

/// A command rule: a [`Rule`] plus safer commands to suggest when blocked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliRule {
    pub rule: Rule,
    pub safe_alternatives: Vec<String>,
}

impl CliRule {
    pub fn new(rule: Rule) -> Self {
        Self {
            rule,
            safe_alternatives: Vec::new(),
        }
    }

    pub fn with_alternatives<I, S>(mut self, alternatives: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.safe_alternatives = alternatives.into_iter().map(Into::into).collect();
        self
    }
}

/// Access to the base rule of a list entry
pub trait AsRule {
    fn as_rule(&self) -> &Rule;
}

impl AsRule for Rule {
    fn as_rule(&self) -> &Rule {
        self
    }
}

impl AsRule for CliRule {
    fn as_rule(&self) -> &Rule {
        &self.rule
    }
}

/// An ordered rule list for one target kind.
///
/// Earlier entries win: evaluation stops at the first rule whose pattern
/// matches, whatever its action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleList<R = Rule> {
    kind: RuleKind,
    rules: Vec<R>,
}

impl RuleList<Rule> {
    pub fn file(rules: Vec<Rule>) -> Self {
        Self {
            kind: RuleKind::File,
            rules,
        }
    }

    pub fn env(rules: Vec<Rule>) -> Self {
        Self {
            kind: RuleKind::Env,
            rules,
        }
    }
}

impl RuleList<CliRule> {
    pub fn cli(rules: Vec<CliRule>) -> Self {
        Self {
            kind: RuleKind::Cli,
            rules,
        }
    }
}

impl<R> RuleList<R> {
    pub fn kind(&self) -> RuleKind {
        self.kind
    }

    pub fn rules(&self) -> &[R] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, R> {
        self.rules.iter()
    }

    /// Stable reference for the rule at `index`
    pub fn policy_ref(&self, index: usize) -> String {
        format!("{}[{}]", self.kind.list_name(), index)
    }
}

/// Where a group of rules came from. Lower sorts first and so wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RuleSource {
    /// Rules written directly in the configuration
    Explicit,

    /// Rules generated from modal definitions
    Modal,

    /// Static rules pulled from the registry
    Registry,
}

/// Assembles a [`RuleList`] from several sources with explicit precedence.
///
/// Groups are ordered by [`RuleSource`]; within a source, rules keep the
/// order in which they were added.
#[derive(Debug, Clone)]
pub struct RuleListBuilder<R> {
    kind: RuleKind,
    groups: Vec<(RuleSource, Vec<R>)>,
}

impl<R> RuleListBuilder<R> {
    pub fn new(kind: RuleKind) -> Self {
        Self {
            kind,
            groups: Vec::new(),
        }
    }

    /// Add rules from `source`
    pub fn add<I>(&mut self, source: RuleSource, rules: I) -> &mut Self
    where
        I: IntoIterator<Item = R>,
    {
        self.groups.push((source, rules.into_iter().collect()));
        self
    }

    pub fn build(mut self) -> RuleList<R> {
        self.groups.sort_by_key(|(source, _)| *source);
        RuleList {
            kind: self.kind,
            rules: self.groups.into_iter().flat_map(|(_, rules)| rules).collect(),
        }
    }
}
