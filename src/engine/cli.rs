//! Shell command policy checks
//!
//! Each command is expanded into its normalized variants (unwrapped
//! subshells, `eval`, absolute paths, package runners) and every variant is
//! checked against the command rules. The first match on any variant
//! decides, so a deny found on an unwrapped form still blocks the raw
//! command.

use crate::engine::blocked;
use crate::engine::evaluate::{evaluate, Evaluation};
use crate::output::{Allowed, Outcome};
use crate::parser::normalize::{describe_with, normalize, NormalizeOptions};
use crate::rules::{Action, CliRule, RuleList};

/// Default reason for blocked commands
pub const COMMAND_DENIED: &str = "command_denied_by_policy";

/// The rule that decided a command, and the variant it matched
#[derive(Debug, Clone)]
pub struct CommandMatch<'a> {
    pub evaluation: Evaluation<'a, CliRule>,

    /// The command form the rule matched
    pub variant: String,

    /// How `variant` was derived from the raw command, if it differs
    pub note: Option<String>,
}

/// Policy over shell commands
#[derive(Debug, Clone)]
pub struct CliPolicy {
    rules: RuleList<CliRule>,
    normalize: Option<NormalizeOptions>,
}

impl CliPolicy {
    /// Create a policy. `None` disables normalization: only the trimmed
    /// command is checked.
    pub fn new(rules: RuleList<CliRule>, normalize: Option<NormalizeOptions>) -> Self {
        Self { rules, normalize }
    }

    pub fn rules(&self) -> &RuleList<CliRule> {
        &self.rules
    }

    /// The command forms checked for `raw`
    pub fn variants(&self, raw: &str) -> Vec<String> {
        match &self.normalize {
            Some(options) => normalize(raw, options),
            None => vec![raw.trim().to_string()],
        }
    }

    /// Find the first rule matching any variant of `raw`
    pub fn find(&self, raw: &str) -> Option<CommandMatch<'_>> {
        self.variants(raw).into_iter().find_map(|variant| {
            let evaluation = evaluate(&variant, &self.rules)?;
            let note = self
                .normalize
                .as_ref()
                .and_then(|options| describe_with(raw, &variant, options));
            Some(CommandMatch {
                evaluation,
                variant,
                note,
            })
        })
    }

    /// Check a command
    pub fn check_command(&self, raw: &str) -> Outcome<String> {
        let Some(found) = self.find(raw) else {
            return Outcome::Allowed(Allowed::by_default(raw.to_string()));
        };

        let cli_rule = found.evaluation.rule;
        let rule = &cli_rule.rule;
        let policy = found.evaluation.policy_ref.as_str();
        let annotate = |text: &str| match &found.note {
            Some(note) => format!("{} (matched after {})", text, note),
            None => text.to_string(),
        };

        match rule.action {
            Action::Allow => Outcome::Allowed(Allowed {
                value: raw.to_string(),
                context: rule.reason.as_deref().map(annotate),
                action: Action::Allow,
                policy: Some(policy.to_string()),
            }),
            Action::Rewrite => match rule.replacement.as_deref() {
                Some(replacement) => Outcome::Allowed(Allowed {
                    value: replacement.to_string(),
                    context: rule.reason.as_deref().map(annotate),
                    action: Action::Rewrite,
                    policy: Some(policy.to_string()),
                }),
                None => self.deny(raw, &found, &annotate),
            },
            // A partially hidden command is meaningless, so mask blocks like deny
            Action::Deny | Action::Mask => self.deny(raw, &found, &annotate),
        }
    }

    fn deny(
        &self,
        raw: &str,
        found: &CommandMatch<'_>,
        annotate: &dyn Fn(&str) -> String,
    ) -> Outcome<String> {
        let cli_rule = found.evaluation.rule;
        let reason = annotate(cli_rule.rule.reason.as_deref().unwrap_or(COMMAND_DENIED));
        Outcome::Blocked(blocked(
            raw,
            &found.evaluation.policy_ref,
            &cli_rule.rule,
            &reason,
            None,
            &cli_rule.safe_alternatives,
        ))
    }

    /// Check whether `raw` may run
    pub fn is_allowed(&self, raw: &str) -> bool {
        self.check_command(raw).is_allowed()
    }

    /// The command that actually runs, or `None` if blocked
    pub fn transform(&self, raw: &str) -> Option<String> {
        self.check_command(raw).into_value()
    }
}
