//! Modal rule definitions
//!
//! A modal rule describes a tool (a deploy CLI, a package publisher, ...)
//! and expands into concrete file, env and command rules depending on the
//! enforcement mode: `strict` blocks the tool, `passive` lets it run but
//! attaches guidance the agent sees alongside the result.

use serde::Deserialize;
use std::str::FromStr;

use crate::rules::{CliRule, Pattern, Rule};

/// Enforcement mode for a modal rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Block the tool and its config files
    #[default]
    Strict,

    /// Allow the tool with advisory context
    Passive,
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "strict" => Ok(Mode::Strict),
            "passive" => Ok(Mode::Passive),
            _ => Err(format!("unknown mode: {}", s)),
        }
    }
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Strict => "strict",
            Mode::Passive => "passive",
        }
    }
}

/// Per-configuration text overrides
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ModalOptions {
    /// Replaces the built-in strict message
    pub message: Option<String>,

    /// Replaces the built-in passive context
    pub context: Option<String>,
}

/// Concrete rules produced by resolving a modal definition
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratedRules {
    pub file_rules: Vec<Rule>,
    pub env_rules: Vec<Rule>,
    pub cli_rules: Vec<CliRule>,
}

impl GeneratedRules {
    pub fn is_empty(&self) -> bool {
        self.file_rules.is_empty() && self.env_rules.is_empty() && self.cli_rules.is_empty()
    }
}

/// A tool-centric rule that expands differently per [`Mode`]
#[derive(Debug, Clone)]
pub struct ModalRuleDefinition {
    pub id: String,
    pub description: String,

    /// When false the default mode is always used
    pub supports_mode: bool,
    pub default_mode: Mode,

    /// Command patterns that invoke the tool
    pub invocations: Vec<Pattern>,

    /// Paths of the tool's configuration files
    pub config_files: Vec<Pattern>,

    /// Env keys holding the tool's credentials (hidden in strict mode)
    pub credential_env: Vec<Pattern>,

    /// Commands suggested when the tool is blocked
    pub safe_alternatives: Vec<String>,

    pub strict_message: String,
    pub passive_context: String,
}

impl ModalRuleDefinition {
    /// Create a definition with no patterns
    pub fn new(
        id: impl Into<String>,
        default_mode: Mode,
        strict_message: impl Into<String>,
        passive_context: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            description: String::new(),
            supports_mode: true,
            default_mode,
            invocations: Vec::new(),
            config_files: Vec::new(),
            credential_env: Vec::new(),
            safe_alternatives: Vec::new(),
            strict_message: strict_message.into(),
            passive_context: passive_context.into(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_invocations(mut self, patterns: Vec<Pattern>) -> Self {
        self.invocations = patterns;
        self
    }

    pub fn with_config_files(mut self, patterns: Vec<Pattern>) -> Self {
        self.config_files = patterns;
        self
    }

    pub fn with_credential_env(mut self, patterns: Vec<Pattern>) -> Self {
        self.credential_env = patterns;
        self
    }

    pub fn with_safe_alternatives<I, S>(mut self, alternatives: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.safe_alternatives = alternatives.into_iter().map(Into::into).collect();
        self
    }

    /// Pin the definition to its default mode
    pub fn fixed_mode(mut self) -> Self {
        self.supports_mode = false;
        self
    }

    /// The mode that applies when `requested` is asked for
    pub fn effective_mode(&self, requested: Option<Mode>) -> Mode {
        if self.supports_mode {
            requested.unwrap_or(self.default_mode)
        } else {
            self.default_mode
        }
    }

    /// Expand into concrete rules for `mode`
    pub fn generate(&self, mode: Mode, options: &ModalOptions) -> GeneratedRules {
        match mode {
            Mode::Strict => {
                let reason = options
                    .message
                    .clone()
                    .unwrap_or_else(|| self.strict_message.clone());

                GeneratedRules {
                    file_rules: self
                        .config_files
                        .iter()
                        .map(|p| Rule::deny(p.clone()).with_reason(reason.clone()))
                        .collect(),
                    env_rules: self
                        .credential_env
                        .iter()
                        .map(|p| Rule::deny(p.clone()).with_reason(reason.clone()))
                        .collect(),
                    cli_rules: self
                        .invocations
                        .iter()
                        .map(|p| {
                            Rule::deny(p.clone())
                                .with_reason(reason.clone())
                                .into_cli()
                                .with_alternatives(self.safe_alternatives.clone())
                        })
                        .collect(),
                }
            }
            Mode::Passive => {
                let context = options
                    .context
                    .clone()
                    .unwrap_or_else(|| self.passive_context.clone());

                GeneratedRules {
                    file_rules: self
                        .config_files
                        .iter()
                        .map(|p| Rule::allow(p.clone()).with_reason(context.clone()))
                        .collect(),
                    env_rules: Vec::new(),
                    cli_rules: self
                        .invocations
                        .iter()
                        .map(|p| Rule::allow(p.clone()).with_reason(context.clone()).into_cli())
                        .collect(),
                }
            }
        }
    }
}

/// Resolve a definition into rules. An explicit `mode` overrides the default.
pub fn resolve(
    definition: &ModalRuleDefinition,
    mode: Option<Mode>,
    options: &ModalOptions,
) -> GeneratedRules {
    definition.generate(definition.effective_mode(mode), options)
}
