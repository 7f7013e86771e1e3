//! File and directory policy checks
//!
//! Decides whether the agent may see a path, and what it sees instead when a
//! rule masks or rewrites it.

use crate::engine::blocked;
use crate::engine::evaluate::evaluate;
use crate::output::{Allowed, DirectoryView, FileView, Outcome};
use crate::rules::{Action, RuleList};

/// Default reason for hidden files
pub const FILE_DENIED: &str = "file_hidden_by_policy";

/// Placeholder offered for masked files without a rule replacement
pub const MASK_PLACEHOLDER: &str = "[masked by policy]";

/// Policy over file paths
#[derive(Debug, Clone)]
pub struct FilePolicy {
    rules: RuleList,
}

impl FilePolicy {
    pub fn new(rules: RuleList) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &RuleList {
        &self.rules
    }

    /// Check a file path
    pub fn check_file(&self, path: &str) -> Outcome<FileView> {
        self.decide(path, FileView::Unchanged, |replacement| {
            FileView::Replaced(replacement.to_string())
        })
    }

    /// Check a directory path.
    ///
    /// A listing injected by the caller is returned as-is without consulting
    /// any rule.
    pub fn check_directory(&self, path: &str, injected: Option<&[String]>) -> Outcome<DirectoryView> {
        if let Some(listing) = injected {
            return Outcome::Allowed(Allowed::by_default(DirectoryView::Listing(listing.to_vec())));
        }

        self.decide(path, DirectoryView::Unchanged, |_| DirectoryView::Listing(Vec::new()))
    }

    /// Check whether the agent may see `path` at all
    pub fn is_visible(&self, path: &str) -> bool {
        self.check_file(path).is_allowed()
    }

    /// Keep only the paths the agent may see
    pub fn filter<'a, S: AsRef<str>>(&self, paths: &'a [S]) -> Vec<&'a str> {
        paths
            .iter()
            .map(|p| p.as_ref())
            .filter(|p| self.is_visible(p))
            .collect()
    }

    fn decide<T>(&self, path: &str, unchanged: T, rewritten: impl FnOnce(&str) -> T) -> Outcome<T> {
        let Some(hit) = evaluate(path, &self.rules) else {
            return Outcome::Allowed(Allowed::by_default(unchanged));
        };

        let rule = hit.rule;
        let reason = rule.reason.as_deref().unwrap_or(FILE_DENIED);

        match rule.action {
            Action::Allow => Outcome::Allowed(Allowed {
                value: unchanged,
                context: rule.reason.clone(),
                action: Action::Allow,
                policy: Some(hit.policy_ref),
            }),
            Action::Deny => Outcome::Blocked(blocked(path, &hit.policy_ref, rule, reason, None, &[])),
            Action::Mask => {
                let placeholder = rule.replacement.as_deref().unwrap_or(MASK_PLACEHOLDER);
                Outcome::Blocked(blocked(path, &hit.policy_ref, rule, reason, Some(placeholder), &[]))
            }
            Action::Rewrite => match rule.replacement.as_deref() {
                Some(replacement) => Outcome::Allowed(Allowed {
                    value: rewritten(replacement),
                    context: None,
                    action: Action::Rewrite,
                    policy: Some(hit.policy_ref),
                }),
                // Nothing to rewrite to: fail closed
                None => Outcome::Blocked(blocked(path, &hit.policy_ref, rule, reason, None, &[])),
            },
        }
    }
}
