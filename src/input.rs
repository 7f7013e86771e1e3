//! Request parsing for the agent-policy binary
//!
//! Parses the JSON check request read from stdin.

use serde::Deserialize;

use crate::rules::RuleKind;

/// Longest target shown in summaries
const SUMMARY_LIMIT: usize = 100;

/// A single check request
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CheckRequest {
    /// Reading a file
    File { target: String },

    /// Listing a directory, optionally with a listing supplied by the caller
    Directory {
        target: String,
        #[serde(default)]
        listing: Option<Vec<String>>,
    },

    /// Reading an environment variable
    Env {
        target: String,
        #[serde(default)]
        value: Option<String>,
    },

    /// Running a shell command
    Cli { target: String },
}

impl CheckRequest {
    /// Parse a request from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// The path, env key or command being checked
    pub fn target(&self) -> &str {
        match self {
            CheckRequest::File { target }
            | CheckRequest::Directory { target, .. }
            | CheckRequest::Env { target, .. }
            | CheckRequest::Cli { target } => target,
        }
    }

    /// Rule list that governs this request
    pub fn rule_kind(&self) -> RuleKind {
        match self {
            CheckRequest::File { .. } | CheckRequest::Directory { .. } => RuleKind::File,
            CheckRequest::Env { .. } => RuleKind::Env,
            CheckRequest::Cli { .. } => RuleKind::Cli,
        }
    }

    /// Get a summary of the request for logging
    pub fn summary(&self) -> String {
        let target = self.target();
        let truncated = match target.char_indices().nth(SUMMARY_LIMIT) {
            Some((end, _)) => format!("{}...", &target[..end]),
            None => target.to_string(),
        };

        let label = match self {
            CheckRequest::File { .. } => "file",
            CheckRequest::Directory { .. } => "directory",
            CheckRequest::Env { .. } => "env",
            CheckRequest::Cli { .. } => "cli",
        };
        format!("{}: {}", label, truncated)
    }
}
