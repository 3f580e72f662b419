//! The `.pitignore` matcher.
//!
//! One glob pattern per line, `#` for comments, unconditionally augmented
//! with `.pit`, `.pit/*`, `*.pyc`, `__pycache__`. A path is ignored if
//! any pattern matches either the whole path or any of its `/`-separated
//! components — `*.pyc` must match `a/b/c.pyc` via the per-component
//! rule even though it plainly doesn't match the whole path.

use std::{fs, path::Path};

use glob::Pattern;

use crate::{errors::PitError, utils::to_slash_path};

const BUILTIN_PATTERNS: &[&str] = &[".pit", ".pit/*", "*.pyc", "__pycache__"];

/// A compiled set of glob patterns ready to test paths against.
pub struct IgnoreMatcher {
    patterns: Vec<Pattern>,
}

impl IgnoreMatcher {
    /// Builds a matcher from `.pitignore` lines plus the built-in patterns.
    pub fn new(pitignore_lines: &[String]) -> Self {
        let mut patterns = Vec::new();
        for line in pitignore_lines {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            if let Ok(pattern) = Pattern::new(trimmed) {
                patterns.push(pattern);
            }
        }
        for builtin in BUILTIN_PATTERNS {
            if let Ok(pattern) = Pattern::new(builtin) {
                patterns.push(pattern);
            }
        }
        IgnoreMatcher { patterns }
    }

    /// Loads `<repo>/.pitignore`, tolerating its absence.
    pub fn load(repo_root: &Path) -> Result<Self, PitError> {
        let path = repo_root.join(".pitignore");
        let lines = if path.exists() {
            fs::read_to_string(path)?
                .lines()
                .map(|l| l.to_string())
                .collect()
        } else {
            Vec::new()
        };
        Ok(IgnoreMatcher::new(&lines))
    }

    /// True if `slash_path` (repo-root-relative, `/`-separated) matches any
    /// pattern either as a whole or via one of its path components.
    pub fn is_ignored(&self, slash_path: &str) -> bool {
        if self.patterns.iter().any(|p| p.matches(slash_path)) {
            return true;
        }
        slash_path
            .split('/')
            .filter(|c| !c.is_empty())
            .any(|component| self.patterns.iter().any(|p| p.matches(component)))
    }

    /// Convenience wrapper accepting a host `Path` relative to the repo root.
    pub fn is_path_ignored(&self, relative: &Path) -> bool {
        self.is_ignored(&to_slash_path(relative))
    }
}
