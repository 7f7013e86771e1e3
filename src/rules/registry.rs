//! Rule registry
//!
//! Named rule definitions, either static rule sets or modal definitions,
//! keyed by id. Registration is idempotent: the first definition stored
//! under an id wins.

use once_cell::sync::Lazy;
use serde::Deserialize;
use std::collections::HashMap;

use crate::rules::modal::ModalRuleDefinition;
use crate::rules::{CliRule, Rule};

/// Operating system a static rule applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Any,
    Linux,
    MacOs,
    Windows,
}

impl Platform {
    /// Platform of the running host
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            Platform::MacOs
        } else if cfg!(target_os = "windows") {
            Platform::Windows
        } else {
            Platform::Linux
        }
    }

    /// Check whether a rule for `self` applies on `host`
    pub fn applies_to(&self, host: Platform) -> bool {
        *self == Platform::Any || *self == host
    }
}

/// Grouping used to browse the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Secrets,
    Credentials,
    Destructive,
    Deployment,
    Publishing,
}

/// A fixed set of rules
#[derive(Debug, Clone)]
pub struct StaticRule {
    pub id: String,
    pub description: String,
    pub platform: Platform,
    pub file_rules: Vec<Rule>,
    pub env_rules: Vec<Rule>,
    pub cli_rules: Vec<CliRule>,
}

impl StaticRule {
    pub fn new(id: impl Into<String>, platform: Platform) -> Self {
        Self {
            id: id.into(),
            description: String::new(),
            platform,
            file_rules: Vec::new(),
            env_rules: Vec::new(),
            cli_rules: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_file_rules(mut self, rules: Vec<Rule>) -> Self {
        self.file_rules = rules;
        self
    }

    pub fn with_env_rules(mut self, rules: Vec<Rule>) -> Self {
        self.env_rules = rules;
        self
    }

    pub fn with_cli_rules(mut self, rules: Vec<CliRule>) -> Self {
        self.cli_rules = rules;
        self
    }
}

/// What a registry id resolves to
#[derive(Debug, Clone)]
pub enum Definition {
    Static(StaticRule),
    Modal(ModalRuleDefinition),
}

/// A registered definition with its category
#[derive(Debug, Clone)]
pub struct Entry {
    pub category: Category,
    pub definition: Definition,
}

impl Entry {
    pub fn id(&self) -> &str {
        match &self.definition {
            Definition::Static(rule) => &rule.id,
            Definition::Modal(modal) => &modal.id,
        }
    }

    /// Platform of a static rule; modal rules apply everywhere
    pub fn platform(&self) -> Platform {
        match &self.definition {
            Definition::Static(rule) => rule.platform,
            Definition::Modal(_) => Platform::Any,
        }
    }

    pub fn as_modal(&self) -> Option<&ModalRuleDefinition> {
        match &self.definition {
            Definition::Modal(modal) => Some(modal),
            Definition::Static(_) => None,
        }
    }

    pub fn as_static(&self) -> Option<&StaticRule> {
        match &self.definition {
            Definition::Static(rule) => Some(rule),
            Definition::Modal(_) => None,
        }
    }
}

/// Collection of rule definitions keyed by id, in registration order
#[derive(Debug, Clone, Default)]
pub struct Registry {
    entries: Vec<Entry>,
    index: HashMap<String, usize>,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the built-in definitions
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        crate::rules::builtin::register_builtins(&mut registry);
        registry
    }

    /// Register a definition. Returns false if the id was already taken,
    /// in which case the stored definition is left untouched.
    pub fn register(&mut self, category: Category, definition: Definition) -> bool {
        let entry = Entry {
            category,
            definition,
        };
        if self.index.contains_key(entry.id()) {
            return false;
        }

        self.index.insert(entry.id().to_string(), self.entries.len());
        self.entries.push(entry);
        true
    }

    /// Register several definitions, returning how many were new
    pub fn register_all<I>(&mut self, definitions: I) -> usize
    where
        I: IntoIterator<Item = (Category, Definition)>,
    {
        let mut added = 0;
        for (category, definition) in definitions {
            if self.register(category, definition) {
                added += 1;
            }
        }
        added
    }

    /// Look up a definition by id
    pub fn get(&self, id: &str) -> Option<&Entry> {
        self.index.get(id).map(|&i| &self.entries[i])
    }

    /// Look up a modal definition by id
    pub fn modal(&self, id: &str) -> Option<&ModalRuleDefinition> {
        self.get(id).and_then(Entry::as_modal)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn by_category(&self, category: Category) -> impl Iterator<Item = &Entry> {
        self.entries.iter().filter(move |e| e.category == category)
    }

    /// Entries that apply on `platform`, including cross-platform ones
    pub fn for_platform(&self, platform: Platform) -> impl Iterator<Item = &Entry> {
        self.entries
            .iter()
            .filter(move |e| e.platform().applies_to(platform))
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(Entry::id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove every definition
    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }
}

static BUILTIN: Lazy<Registry> = Lazy::new(Registry::with_builtins);

/// Shared read-only registry with the built-in definitions
pub fn builtin() -> &'static Registry {
    &BUILTIN
}
