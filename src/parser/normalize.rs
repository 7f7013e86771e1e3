//! Command normalization for bypass protection
//!
//! Derives alternate forms of a shell command so rules written against the
//! plain command also catch disguised invocations:
//!
//! - `bash -c "rm -rf /"` -> `rm -rf /`
//! - `eval "rm -rf /"` -> `rm -rf /`
//! - `/usr/bin/git push` -> `git push`
//! - `npx wrangler deploy` -> `wrangler deploy`
//!
//! Transformations run in that order, each on the output of the previous
//! one, and every transformation that fires adds a variant.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

/// Maximum number of nested shell wrappers unwrapped
pub const MAX_UNWRAP_DEPTH: usize = 5;

/// Shells recognized as `-c` wrappers
pub const SHELLS: &[&str] = &["bash", "sh", "zsh", "dash", "ksh", "fish"];

/// Package runners whose prefix is stripped
pub const PACKAGE_RUNNERS: &[&str] = &["npx", "pnpx", "yarn dlx", "bunx"];

static SHELL_WRAPPER: Lazy<Regex> = Lazy::new(|| {
    let shells = SHELLS.join("|");
    Regex::new(&format!(
        r"(?s)^(?:\S*/)?(?:{})\s+(?:(?:[-+]o\s+\S+|--?[\w-]+(?:=\S+)?|\+[a-zA-Z]+)\s+)*-[a-zA-Z]*c[a-zA-Z]*\s+(.+)$",
        shells
    ))
    .unwrap()
});

static EVAL_WRAPPER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)^eval\s+(.+)$").unwrap());

static ABSOLUTE_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^/(?:\S*/)?([^\s/].*)$").unwrap());

static PACKAGE_RUNNER: Lazy<Regex> = Lazy::new(|| {
    let runners: Vec<String> = PACKAGE_RUNNERS
        .iter()
        .map(|r| r.replace(' ', r"\s+"))
        .collect();
    Regex::new(&format!(
        r"(?s)^(?:{})\s+(?:-{{1,2}}[a-zA-Z][\w-]*\s+)*(.+)$",
        runners.join("|")
    ))
    .unwrap()
});

/// Which transformations to apply. All are enabled by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NormalizeOptions {
    /// Unwrap `bash -c "..."` and friends
    pub subshells: bool,

    /// Unwrap `eval "..."`
    pub eval: bool,

    /// Strip a leading absolute binary path
    pub absolute_paths: bool,

    /// Strip `npx`, `pnpx`, `yarn dlx` and `bunx`
    pub package_runners: bool,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            subshells: true,
            eval: true,
            absolute_paths: true,
            package_runners: true,
        }
    }
}

/// A single normalization step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    Subshell,
    Eval,
    AbsolutePath,
    PackageRunner,
}

impl Transform {
    pub fn description(&self) -> &'static str {
        match self {
            Transform::Subshell => "subshell wrapper stripped",
            Transform::Eval => "eval wrapper stripped",
            Transform::AbsolutePath => "absolute binary path stripped",
            Transform::PackageRunner => "package runner prefix stripped",
        }
    }

    fn apply(&self, command: &str) -> Option<String> {
        let stripped = match self {
            Transform::Subshell => unquote(SHELL_WRAPPER.captures(command)?.get(1)?.as_str()),
            Transform::Eval => unquote(EVAL_WRAPPER.captures(command)?.get(1)?.as_str()),
            Transform::AbsolutePath => ABSOLUTE_PATH.captures(command)?.get(1)?.as_str().to_string(),
            Transform::PackageRunner => {
                PACKAGE_RUNNER.captures(command)?.get(1)?.as_str().to_string()
            }
        };

        let stripped = stripped.trim();
        if stripped.is_empty() || stripped == command {
            None
        } else {
            Some(stripped.to_string())
        }
    }

    fn pattern(&self) -> &'static Regex {
        match self {
            Transform::Subshell => &*SHELL_WRAPPER,
            Transform::Eval => &*EVAL_WRAPPER,
            Transform::AbsolutePath => &*ABSOLUTE_PATH,
            Transform::PackageRunner => &*PACKAGE_RUNNER,
        }
    }
}

/// One step of the unwrap chain: the text and the transform that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
struct Step {
    text: String,
    via: Option<Transform>,
}

/// Strip the quotes around a wrapped command.
///
/// Quoted text is split the way a shell would and the first word kept, so
/// escaped quotes inside come out right. Unquoted text is taken as-is.
fn unquote(text: &str) -> String {
    let text = text.trim();
    let quoted = text.starts_with('"') || text.starts_with('\'');
    if !quoted {
        return text.to_string();
    }

    match shlex::split(text) {
        Some(words) if !words.is_empty() => words[0].clone(),
        _ => text
            .trim_matches(|c| c == '"' || c == '\'')
            .to_string(),
    }
}

/// Walk the unwrap chain for `raw`
fn unwrap_chain(raw: &str, options: &NormalizeOptions) -> Vec<Step> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    let mut steps = vec![Step {
        text: trimmed.to_string(),
        via: None,
    }];
    let mut current = trimmed.to_string();

    if options.subshells {
        for _ in 0..MAX_UNWRAP_DEPTH {
            match Transform::Subshell.apply(&current) {
                Some(inner) => {
                    steps.push(Step {
                        text: inner.clone(),
                        via: Some(Transform::Subshell),
                    });
                    current = inner;
                }
                None => break,
            }
        }
    }

    let single_pass = [
        (options.eval, Transform::Eval),
        (options.absolute_paths, Transform::AbsolutePath),
        (options.package_runners, Transform::PackageRunner),
    ];
    for (enabled, transform) in single_pass {
        if !enabled {
            continue;
        }
        if let Some(next) = transform.apply(&current) {
            steps.push(Step {
                text: next.clone(),
                via: Some(transform),
            });
            current = next;
        }
    }

    steps
}

/// Derive the command variants of `raw`, original first, without duplicates
pub fn normalize(raw: &str, options: &NormalizeOptions) -> Vec<String> {
    let mut variants: Vec<String> = Vec::new();
    for step in unwrap_chain(raw, options) {
        if !variants.contains(&step.text) {
            variants.push(step.text);
        }
    }
    variants
}

/// Check whether the raw command looks wrapped in any recognized way
pub fn is_wrapped(raw: &str) -> bool {
    let trimmed = raw.trim();
    [
        Transform::Subshell,
        Transform::Eval,
        Transform::AbsolutePath,
        Transform::PackageRunner,
    ]
    .iter()
    .any(|t| t.pattern().is_match(trimmed))
}

/// Explain which transformations turn `raw` into `normalized`.
///
/// Returns `None` when the two are the same command.
pub fn describe(raw: &str, normalized: &str) -> Option<String> {
    describe_with(raw, normalized, &NormalizeOptions::default())
}

/// Like [`describe`], for variants produced with `options`
pub fn describe_with(raw: &str, normalized: &str, options: &NormalizeOptions) -> Option<String> {
    let raw = raw.trim();
    let normalized = normalized.trim();
    if raw == normalized {
        return None;
    }

    let steps = unwrap_chain(raw, options);
    let Some(end) = steps.iter().position(|s| s.text == normalized) else {
        return Some("command normalized".to_string());
    };

    let mut applied: Vec<&'static str> = Vec::new();
    for transform in steps[..=end].iter().filter_map(|s| s.via) {
        let description = transform.description();
        if !applied.contains(&description) {
            applied.push(description);
        }
    }
    Some(applied.join(", "))
}
