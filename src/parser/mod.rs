//! Command parsing utilities for agent-policy
//!
//! Derives the alternate forms of a shell command that rules are checked against.

pub mod normalize;

pub use normalize::{describe, describe_with, is_wrapped, normalize, NormalizeOptions};
