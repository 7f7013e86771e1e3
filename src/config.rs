//! Configuration loading for agent-policy
//!
//! A TOML file lists explicit rules per target kind and references registry
//! rules by id. [`Config::build_policy`] assembles them into the ordered
//! rule lists the engine runs on: explicit rules first, then rules generated
//! from modal definitions, then static registry rules.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::engine::{PolicyEngine, PolicySet};
use crate::parser::NormalizeOptions;
use crate::rules::modal::{resolve, ModalOptions, Mode};
use crate::rules::registry::{Definition, Platform, Registry};
use crate::rules::{Action, CliRule, Pattern, Rule, RuleKind, RuleListBuilder, RuleSource};

/// Errors raised while loading or assembling a configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid regex in {list}[{index}]: {source}")]
    InvalidPattern {
        list: &'static str,
        index: usize,
        #[source]
        source: regex::Error,
    },

    #[error("{list}[{index}] has no pattern; set one of match, exact or regex")]
    MissingPattern { list: &'static str, index: usize },

    #[error("{list}[{index}] sets more than one of match, exact and regex")]
    AmbiguousPattern { list: &'static str, index: usize },
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// General configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Enable audit logging
    pub audit_log: bool,

    /// Path to audit log file
    pub audit_path: Option<String>,

    /// Check normalized command variants as well as the raw command
    pub normalize_commands: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            audit_log: true,
            audit_path: Some("~/.config/agent-policy/audit.jsonl".to_string()),
            normalize_commands: true,
        }
    }
}

/// A reference to a registry rule
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RuleRef {
    pub id: String,

    /// Mode for modal rules; ignored by static rules
    #[serde(default)]
    pub mode: Option<Mode>,

    /// Replaces the built-in strict message
    #[serde(default)]
    pub message: Option<String>,

    /// Replaces the built-in passive context
    #[serde(default)]
    pub context: Option<String>,
}

impl RuleRef {
    fn options(&self) -> ModalOptions {
        ModalOptions {
            message: self.message.clone(),
            context: self.context.clone(),
        }
    }
}

/// An explicit file or env rule
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RuleSpec {
    /// Substring pattern
    #[serde(rename = "match", default)]
    pub contains: Option<String>,

    #[serde(default)]
    pub exact: Option<String>,

    #[serde(default)]
    pub regex: Option<String>,

    pub action: Action,

    #[serde(default)]
    pub replacement: Option<String>,

    #[serde(default)]
    pub reason: Option<String>,
}

impl RuleSpec {
    /// Build the pattern. `list` and `index` locate the rule in errors.
    pub fn pattern(&self, list: &'static str, index: usize) -> Result<Pattern> {
        match (&self.contains, &self.exact, &self.regex) {
            (Some(text), None, None) => Ok(Pattern::literal(text.as_str())),
            (None, Some(text), None) => Ok(Pattern::exact(text.as_str())),
            (None, None, Some(source)) => Pattern::regex(source).map_err(|source| {
                ConfigError::InvalidPattern {
                    list,
                    index,
                    source,
                }
            }),
            (None, None, None) => Err(ConfigError::MissingPattern { list, index }),
            _ => Err(ConfigError::AmbiguousPattern { list, index }),
        }
    }

    pub fn to_rule(&self, list: &'static str, index: usize) -> Result<Rule> {
        Ok(Rule {
            pattern: self.pattern(list, index)?,
            action: self.action,
            replacement: self.replacement.clone(),
            reason: self.reason.clone(),
        })
    }
}

/// An explicit command rule
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CliRuleSpec {
    #[serde(flatten)]
    pub rule: RuleSpec,

    #[serde(default)]
    pub safe_alternatives: Vec<String>,
}

impl CliRuleSpec {
    pub fn to_rule(&self, index: usize) -> Result<CliRule> {
        Ok(self
            .rule
            .to_rule(RuleKind::Cli.list_name(), index)?
            .into_cli()
            .with_alternatives(self.safe_alternatives.iter().cloned()))
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    pub normalize: NormalizeOptions,
    pub rules: Vec<RuleRef>,
    pub file_rules: Vec<RuleSpec>,
    pub env_rules: Vec<RuleSpec>,
    pub cli_rules: Vec<CliRuleSpec>,
}

impl Config {
    /// Standard config locations, most specific first
    pub fn search_paths() -> Vec<PathBuf> {
        [
            // User-specific config
            dirs::home_dir().map(|p| p.join(".config/agent-policy/config.toml")),
            // System-wide config
            Some(PathBuf::from("/etc/agent-policy/config.toml")),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    /// Load configuration from the standard locations or use defaults
    pub fn load() -> Result<Self> {
        Self::load_first(&Self::search_paths())
    }

    /// Load the first of `paths` that exists, or defaults when none does.
    ///
    /// A file that exists but cannot be read or parsed is an error.
    pub fn load_first(paths: &[PathBuf]) -> Result<Self> {
        match paths.iter().find(|path| path.exists()) {
            Some(path) => {
                let config = Self::load_from(path)?;
                debug!(path = %path.display(), "loaded config");
                Ok(config)
            }
            None => Ok(Config::default()),
        }
    }

    /// Load from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse from a TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Expand ~ in path strings
    pub fn expand_path(path: &str) -> PathBuf {
        if let Some(rest) = path.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(rest);
            }
        }
        PathBuf::from(path)
    }

    /// Get the audit log path (expanded)
    pub fn audit_path(&self) -> Option<PathBuf> {
        self.general.audit_path.as_ref().map(|p| Self::expand_path(p))
    }

    /// Normalization settings, or `None` when disabled
    pub fn normalize_options(&self) -> Option<NormalizeOptions> {
        self.general.normalize_commands.then_some(self.normalize)
    }

    /// Assemble the rule lists for the host platform
    pub fn build_policy(&self, registry: &Registry) -> Result<PolicySet> {
        self.build_policy_for(registry, Platform::current())
    }

    /// Assemble the rule lists as they apply on `platform`
    pub fn build_policy_for(&self, registry: &Registry, platform: Platform) -> Result<PolicySet> {
        let mut files = RuleListBuilder::new(RuleKind::File);
        let mut env = RuleListBuilder::new(RuleKind::Env);
        let mut cli = RuleListBuilder::new(RuleKind::Cli);

        files.add(
            RuleSource::Explicit,
            explicit_rules(&self.file_rules, RuleKind::File)?,
        );
        env.add(
            RuleSource::Explicit,
            explicit_rules(&self.env_rules, RuleKind::Env)?,
        );
        cli.add(
            RuleSource::Explicit,
            self.cli_rules
                .iter()
                .enumerate()
                .map(|(index, spec)| spec.to_rule(index))
                .collect::<Result<Vec<_>>>()?,
        );

        for reference in &self.rules {
            let Some(entry) = registry.get(&reference.id) else {
                warn!(id = %reference.id, "unknown rule id, skipping");
                continue;
            };

            match &entry.definition {
                Definition::Modal(definition) => {
                    let mode = definition.effective_mode(reference.mode);
                    debug!(id = %reference.id, mode = mode.as_str(), "resolving modal rule");
                    let generated = resolve(definition, reference.mode, &reference.options());
                    files.add(RuleSource::Modal, generated.file_rules);
                    env.add(RuleSource::Modal, generated.env_rules);
                    cli.add(RuleSource::Modal, generated.cli_rules);
                }
                Definition::Static(rule) => {
                    if !rule.platform.applies_to(platform) {
                        debug!(id = %rule.id, platform = ?rule.platform, "rule does not apply on this platform");
                        continue;
                    }
                    files.add(RuleSource::Registry, rule.file_rules.iter().cloned());
                    env.add(RuleSource::Registry, rule.env_rules.iter().cloned());
                    cli.add(RuleSource::Registry, rule.cli_rules.iter().cloned());
                }
            }
        }

        Ok(PolicySet {
            file_rules: files.build(),
            env_rules: env.build(),
            cli_rules: cli.build(),
            normalize: self.normalize_options(),
        })
    }

    /// Assemble the policy and wrap it in an engine
    pub fn build_engine(&self, registry: &Registry) -> Result<PolicyEngine> {
        Ok(PolicyEngine::new(self.build_policy(registry)?))
    }
}

fn explicit_rules(specs: &[RuleSpec], kind: RuleKind) -> Result<Vec<Rule>> {
    specs
        .iter()
        .enumerate()
        .map(|(index, spec)| spec.to_rule(kind.list_name(), index))
        .collect()
}

/// Embedded example configuration
pub const DEFAULT_CONFIG_TOML: &str = r#"
[general]
audit_log = true
audit_path = "~/.config/agent-policy/audit.jsonl"
normalize_commands = true

[normalize]
subshells = true
eval = true
absolute_paths = true
package_runners = true

[[rules]]
id = "dotenv-files"

[[rules]]
id = "ssh-keys"

[[rules]]
id = "cloud-credentials"

[[rules]]
id = "destructive-rm"

[[rules]]
id = "wrangler-deploy"
mode = "passive"

[[rules]]
id = "npm-publish"
mode = "strict"

[[file_rules]]
match = "node_modules"
action = "deny"
reason = "Dependencies are not part of the project"

[[env_rules]]
regex = "^DATABASE_URL$"
action = "mask"

[[cli_rules]]
regex = "^rm -rf"
action = "deny"
safe_alternatives = ["rm -ri"]
"#;
