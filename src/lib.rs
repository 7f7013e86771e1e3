//! agent-policy - Access policy for LLM agents
//!
//! Decides whether an automated agent may see a file, read an environment
//! variable or run a shell command, and what it actually gets when a rule
//! masks or rewrites the target.
//!
//! # Features
//!
//! - **First-match rules**: ordered allow/deny/mask/rewrite rules per target kind
//! - **Bypass protection**: commands are also checked after unwrapping
//!   `bash -c`, `eval`, absolute binary paths and package runners
//! - **Modal rules**: deploy and publish tools blocked (`strict`) or allowed
//!   with guidance (`passive`)
//! - **Registry**: built-in rule sets referenced by id from TOML config
//! - **Audit logging**: JSONL record of every decision
//!
//! # Example
//!
//! ```
//! use agent_policy::{Pattern, PolicyEngine, PolicySet, Rule, RuleList};
//!
//! let engine = PolicyEngine::new(PolicySet {
//!     cli_rules: RuleList::cli(vec![Rule::deny(Pattern::regex("^rm -rf").unwrap())
//!         .into_cli()
//!         .with_alternatives(["rm -i"])]),
//!     ..PolicySet::default()
//! });
//!
//! let outcome = engine.check_command(r#"bash -c "rm -rf /""#);
//! assert!(outcome.is_blocked());
//! assert!(engine.check_command("ls -la").is_allowed());
//! ```

pub mod audit;
pub mod config;
pub mod engine;
pub mod input;
pub mod output;
pub mod parser;
pub mod rules;

// Re-exports for convenience
pub use config::{Config, ConfigError};
pub use engine::{Explanation, PolicyEngine, PolicySet};
pub use input::CheckRequest;
pub use output::{Blocked, Outcome, Response};
pub use rules::registry::Registry;
pub use rules::{Action, CliRule, Pattern, Rule, RuleKind, RuleList};
