//! Policy engine for agent-policy
//!
//! Routes file, directory, env and command checks to the kind-specific
//! policies, and explains which rule decided a target.

pub mod cli;
pub mod env;
pub mod evaluate;
pub mod file;

use serde::Serialize;

use crate::input::CheckRequest;
use crate::output::{AuditRecord, BlockDetails, Blocked, DirectoryView, FileView, Outcome, Response};
use crate::parser::{is_wrapped, NormalizeOptions};
use crate::rules::{Action, CliRule, Rule, RuleKind, RuleList};

use cli::CliPolicy;
use env::EnvPolicy;
use evaluate::evaluate;
use file::FilePolicy;

/// Build a blocked result for the rule that matched `target`
pub(crate) fn blocked(
    target: &str,
    policy: &str,
    rule: &Rule,
    reason: &str,
    replacement: Option<&str>,
    alternatives: &[String],
) -> Blocked {
    Blocked {
        reason: reason.to_string(),
        details: BlockDetails {
            target: target.to_string(),
            policy: policy.to_string(),
            action: rule.action,
            replacement: replacement.map(str::to_string),
            safe_alternatives: alternatives.to_vec(),
        },
    }
}

/// The assembled rule lists an engine runs on
#[derive(Debug, Clone)]
pub struct PolicySet {
    pub file_rules: RuleList,
    pub env_rules: RuleList,
    pub cli_rules: RuleList<CliRule>,

    /// Command normalization; `None` checks commands as written
    pub normalize: Option<NormalizeOptions>,
}

impl Default for PolicySet {
    fn default() -> Self {
        Self {
            file_rules: RuleList::file(Vec::new()),
            env_rules: RuleList::env(Vec::new()),
            cli_rules: RuleList::cli(Vec::new()),
            normalize: Some(NormalizeOptions::default()),
        }
    }
}

/// Which rule decided a target, and how
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Explanation {
    pub kind: RuleKind,
    pub target: String,

    /// Command form the rule matched, when it differs from the target
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy: Option<String>,

    pub action: Action,

    /// Normalization steps that produced `variant`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Explanation {
    /// Whether any rule matched
    pub fn matched(&self) -> bool {
        self.policy.is_some()
    }
}

/// The main policy engine
#[derive(Debug, Clone)]
pub struct PolicyEngine {
    file: FilePolicy,
    env: EnvPolicy,
    cli: CliPolicy,
}

impl Default for PolicyEngine {
    fn default() -> Self {
        Self::new(PolicySet::default())
    }
}

impl PolicyEngine {
    /// Create an engine over an assembled policy set
    pub fn new(set: PolicySet) -> Self {
        Self {
            file: FilePolicy::new(set.file_rules),
            env: EnvPolicy::new(set.env_rules),
            cli: CliPolicy::new(set.cli_rules, set.normalize),
        }
    }

    pub fn files(&self) -> &FilePolicy {
        &self.file
    }

    pub fn env(&self) -> &EnvPolicy {
        &self.env
    }

    pub fn commands(&self) -> &CliPolicy {
        &self.cli
    }

    pub fn check_file(&self, path: &str) -> Outcome<FileView> {
        self.file.check_file(path)
    }

    pub fn check_directory(&self, path: &str, injected: Option<&[String]>) -> Outcome<DirectoryView> {
        self.file.check_directory(path, injected)
    }

    pub fn check_env(&self, key: &str, value: &str) -> Outcome<String> {
        self.env.check_env(key, value)
    }

    pub fn check_command(&self, raw: &str) -> Outcome<String> {
        self.cli.check_command(raw)
    }

    /// Report which rule decides `target` without producing a result
    pub fn explain(&self, kind: RuleKind, target: &str) -> Explanation {
        let mut explanation = Explanation {
            kind,
            target: target.to_string(),
            variant: None,
            policy: None,
            action: Action::Allow,
            note: None,
            reason: None,
        };

        let rule = match kind {
            RuleKind::File => evaluate(target, self.file.rules()).map(|hit| (hit.rule, hit.policy_ref)),
            RuleKind::Env => evaluate(target, self.env.rules()).map(|hit| (hit.rule, hit.policy_ref)),
            RuleKind::Cli => self.cli.find(target).map(|found| {
                if found.variant != target.trim() {
                    explanation.variant = Some(found.variant);
                    explanation.note = found.note;
                }
                (&found.evaluation.rule.rule, found.evaluation.policy_ref)
            }),
        };

        if let Some((rule, policy)) = rule {
            explanation.policy = Some(policy);
            explanation.action = rule.action;
            explanation.reason = rule.reason.clone();
        }
        explanation
    }

    /// Run a parsed request, returning the audit record and the response
    pub fn check(&self, request: &CheckRequest) -> (AuditRecord, Response) {
        let kind = request.rule_kind();
        let target = request.target();

        match request {
            CheckRequest::File { target } => {
                let outcome = self.check_file(target);
                (outcome.audit_record(kind, target), Response::from_file(outcome))
            }
            CheckRequest::Directory { target, listing } => {
                let outcome = self.check_directory(target, listing.as_deref());
                (outcome.audit_record(kind, target), Response::from_directory(outcome))
            }
            CheckRequest::Env { target, value } => {
                let outcome = self.check_env(target, value.as_deref().unwrap_or(""));
                (outcome.audit_record(kind, target), Response::from_env(outcome))
            }
            CheckRequest::Cli { .. } => {
                let outcome = self.check_command(target);
                let mut record = outcome.audit_record(kind, target);
                record.wrapped = is_wrapped(target);
                (record, Response::from_command(outcome))
            }
        }
    }
}
