//! Check results for agent-policy
//!
//! Every check returns an [`Outcome`]: either the value the agent may see,
//! or a [`Blocked`] result with structured details for audit and explain
//! tooling.

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use crate::rules::{Action, RuleKind};

/// Structured details of a blocked check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockDetails {
    /// The path, env key or command that was checked
    pub target: String,

    /// Policy reference of the deciding rule, e.g. `fileRules[0]`
    pub policy: String,

    /// Action of the deciding rule
    pub action: Action,

    /// Placeholder a caller may show instead of the real content
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replacement: Option<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub safe_alternatives: Vec<String>,
}

/// A check that was refused
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blocked {
    pub reason: String,
    pub details: BlockDetails,
}

impl Serialize for Blocked {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Blocked", 4)?;
        state.serialize_field("ok", &false)?;
        state.serialize_field("blocked", &true)?;
        state.serialize_field("reason", &self.reason)?;
        state.serialize_field("details", &self.details)?;
        state.end()
    }
}

/// A check that succeeded, with the value the agent sees
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allowed<T> {
    pub value: T,

    /// Non-blocking advisory text from the matched rule
    pub context: Option<String>,

    /// Action that produced this result (`Allow` when no rule matched)
    pub action: Action,

    /// Policy reference of the deciding rule, if any
    pub policy: Option<String>,
}

impl<T> Allowed<T> {
    /// Allowed because no rule matched
    pub fn by_default(value: T) -> Self {
        Self {
            value,
            context: None,
            action: Action::Allow,
            policy: None,
        }
    }
}

/// Result of a single check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    Allowed(Allowed<T>),
    Blocked(Blocked),
}

impl<T> Outcome<T> {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Outcome::Allowed(_))
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, Outcome::Blocked(_))
    }

    pub fn allowed(&self) -> Option<&Allowed<T>> {
        match self {
            Outcome::Allowed(allowed) => Some(allowed),
            Outcome::Blocked(_) => None,
        }
    }

    pub fn blocked(&self) -> Option<&Blocked> {
        match self {
            Outcome::Allowed(_) => None,
            Outcome::Blocked(blocked) => Some(blocked),
        }
    }

    /// The visible value, or `None` when blocked
    pub fn into_value(self) -> Option<T> {
        match self {
            Outcome::Allowed(allowed) => Some(allowed.value),
            Outcome::Blocked(_) => None,
        }
    }

    /// Advisory context of an allowed result
    pub fn context(&self) -> Option<&str> {
        self.allowed().and_then(|a| a.context.as_deref())
    }

    /// Reason of a blocked result
    pub fn reason(&self) -> Option<&str> {
        self.blocked().map(|b| b.reason.as_str())
    }

    pub fn action(&self) -> Action {
        match self {
            Outcome::Allowed(allowed) => allowed.action,
            Outcome::Blocked(blocked) => blocked.details.action,
        }
    }

    pub fn policy(&self) -> Option<&str> {
        match self {
            Outcome::Allowed(allowed) => allowed.policy.as_deref(),
            Outcome::Blocked(blocked) => Some(&blocked.details.policy),
        }
    }

    /// The `(kind, target, action, policy)` tuple recorded by audit trails
    pub fn audit_record(&self, kind: RuleKind, target: &str) -> AuditRecord {
        AuditRecord {
            kind,
            target: target.to_string(),
            action: self.action(),
            policy: self.policy().map(str::to_string),
            blocked: self.is_blocked(),
            wrapped: false,
        }
    }
}

/// What an audit collaborator records after each check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditRecord {
    pub kind: RuleKind,
    pub target: String,
    pub action: Action,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy: Option<String>,
    pub blocked: bool,

    /// The command arrived behind a recognized wrapper
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub wrapped: bool,
}

/// What a file check lets the agent see
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileView {
    /// The real file content
    Unchanged,

    /// Rewritten content replacing the real file
    Replaced(String),
}

/// What a directory check lets the agent see
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryView {
    /// The real directory listing
    Unchanged,

    /// A substituted listing
    Listing(Vec<String>),
}

/// JSON response written by the binary
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Response {
    Blocked(Blocked),
    Allowed {
        ok: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        command: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        value: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        content: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        entries: Option<Vec<String>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        context: Option<String>,
    },
}

impl Response {
    fn allowed(context: Option<String>) -> Self {
        Response::Allowed {
            ok: true,
            command: None,
            value: None,
            content: None,
            entries: None,
            context,
        }
    }

    /// Response for a command check
    pub fn from_command(outcome: Outcome<String>) -> Self {
        match outcome {
            Outcome::Blocked(blocked) => Response::Blocked(blocked),
            Outcome::Allowed(allowed) => Response::Allowed {
                ok: true,
                command: Some(allowed.value),
                value: None,
                content: None,
                entries: None,
                context: allowed.context,
            },
        }
    }

    /// Response for an env check
    pub fn from_env(outcome: Outcome<String>) -> Self {
        match outcome {
            Outcome::Blocked(blocked) => Response::Blocked(blocked),
            Outcome::Allowed(allowed) => Response::Allowed {
                ok: true,
                command: None,
                value: Some(allowed.value),
                content: None,
                entries: None,
                context: allowed.context,
            },
        }
    }

    /// Response for a file check
    pub fn from_file(outcome: Outcome<FileView>) -> Self {
        match outcome {
            Outcome::Blocked(blocked) => Response::Blocked(blocked),
            Outcome::Allowed(allowed) => match allowed.value {
                FileView::Unchanged => Self::allowed(allowed.context),
                FileView::Replaced(content) => Response::Allowed {
                    ok: true,
                    command: None,
                    value: None,
                    content: Some(content),
                    entries: None,
                    context: allowed.context,
                },
            },
        }
    }

    /// Response for a directory check
    pub fn from_directory(outcome: Outcome<DirectoryView>) -> Self {
        match outcome {
            Outcome::Blocked(blocked) => Response::Blocked(blocked),
            Outcome::Allowed(allowed) => match allowed.value {
                DirectoryView::Unchanged => Self::allowed(allowed.context),
                DirectoryView::Listing(entries) => Response::Allowed {
                    ok: true,
                    command: None,
                    value: None,
                    content: None,
                    entries: Some(entries),
                    context: allowed.context,
                },
            },
        }
    }

    fn refused(reason: String, policy: &str) -> Self {
        Response::Blocked(Blocked {
            reason,
            details: BlockDetails {
                target: String::new(),
                policy: policy.to_string(),
                action: Action::Deny,
                replacement: None,
                safe_alternatives: Vec::new(),
            },
        })
    }

    /// Response for input that could not be parsed. Fails closed.
    pub fn invalid_input(message: &str) -> Self {
        Self::refused(format!("invalid_request: {}", message), "request")
    }

    /// Response when no policy could be loaded. Fails closed.
    pub fn policy_unavailable(message: &str) -> Self {
        Self::refused(format!("policy_unavailable: {}", message), "config")
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}
