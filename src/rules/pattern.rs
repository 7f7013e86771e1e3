//! Pattern matching for policy rules
//!
//! A pattern is either plain text or a compiled regular expression. Plain
//! text is matched loosely (equality or substring) so short keywords such as
//! `node_modules` hit anywhere in a path.

use regex::Regex;
use std::fmt;

/// A rule pattern. Immutable once constructed.
#[derive(Debug, Clone)]
pub enum Pattern {
    /// Matches only when the target equals the text
    Exact(String),

    /// Matches when the target equals or contains the text
    Contains(String),

    /// Matches when the regex finds a match anywhere in the target
    Regex(Regex),
}

impl Pattern {
    /// Plain-text pattern with substring semantics
    pub fn literal(text: impl Into<String>) -> Self {
        Pattern::Contains(text.into())
    }

    /// Pattern that only matches the exact target
    pub fn exact(text: impl Into<String>) -> Self {
        Pattern::Exact(text.into())
    }

    /// Compile a regex pattern
    pub fn regex(source: &str) -> Result<Self, regex::Error> {
        Regex::new(source).map(Pattern::Regex)
    }

    /// Check whether `target` matches this pattern
    pub fn matches(&self, target: &str) -> bool {
        match self {
            Pattern::Exact(text) => target == text,
            Pattern::Contains(text) => target == text || target.contains(text.as_str()),
            Pattern::Regex(re) => re.is_match(target),
        }
    }

    /// Source text of the pattern
    pub fn as_str(&self) -> &str {
        match self {
            Pattern::Exact(text) | Pattern::Contains(text) => text,
            Pattern::Regex(re) => re.as_str(),
        }
    }

    pub fn is_regex(&self) -> bool {
        matches!(self, Pattern::Regex(_))
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Pattern::Exact(a), Pattern::Exact(b)) => a == b,
            (Pattern::Contains(a), Pattern::Contains(b)) => a == b,
            (Pattern::Regex(a), Pattern::Regex(b)) => a.as_str() == b.as_str(),
            _ => false,
        }
    }
}

impl Eq for Pattern {}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Exact(text) => write!(f, "={}", text),
            Pattern::Contains(text) => write!(f, "{}", text),
            Pattern::Regex(re) => write!(f, "/{}/", re.as_str()),
        }
    }
}

/// Check whether `target` matches `pattern`
pub fn matches(target: &str, pattern: &Pattern) -> bool {
    pattern.matches(target)
}
