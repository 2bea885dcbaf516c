use anyhow::{Context, Result};
use glob::Pattern;
use std::collections::HashSet;
use thiserror::Error;

/// Why a file was left out of the catalog. The `Display` text is the
/// reason reported for explicitly named files.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("file does not exist")]
    Missing,
    #[error("not a regular file")]
    NotRegularFile,
    #[error("file is not readable: {0}")]
    Unreadable(String),
    #[error("file too large ({size} bytes, max {max})")]
    TooLarge { size: u64, max: u64 },
    #[error("extension '{0}' not allowed")]
    ExtensionNotAllowed(String),
    #[error("extension '{0}' is blocked")]
    ExtensionBlocked(String),
    #[error("file matches exclude pattern: {0}")]
    Excluded(String),
    #[error("file does not match any include pattern")]
    NotIncluded,
}

/// Size, extension and glob rules, compiled once from config.
#[derive(Debug, Clone, Default)]
pub struct FilterRules {
    max_size: u64,
    allowed: HashSet<String>,
    blocked: HashSet<String>,
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
}

fn normalize_ext(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_lowercase()
}

fn compile(patterns: &[String]) -> Result<Vec<Pattern>> {
    patterns
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .map(|p| Pattern::new(p).with_context(|| format!("invalid glob pattern '{}'", p)))
        .collect()
}

impl FilterRules {
    pub fn new(
        max_size: u64,
        allowed_extensions: &[String],
        blocked_extensions: &[String],
        include_patterns: &[String],
        exclude_patterns: &[String],
    ) -> Result<Self> {
        let exts = |list: &[String]| -> HashSet<String> {
            list.iter()
                .map(|e| normalize_ext(e))
                .filter(|e| !e.is_empty())
                .collect()
        };
        Ok(Self {
            max_size,
            allowed: exts(allowed_extensions),
            blocked: exts(blocked_extensions),
            include: compile(include_patterns)?,
            exclude: compile(exclude_patterns)?,
        })
    }

    /// Rules that only enforce a size ceiling.
    pub fn with_max_size(max_size: u64) -> Self {
        Self {
            max_size,
            ..Self::default()
        }
    }

    /// Apply the filters in fixed order: size ceiling, extension allow-list,
    /// extension block-list, exclude patterns, include patterns.
    ///
    /// `ext` is lowercase without the dot; `match_path` is the string the
    /// glob patterns are tested against.
    pub fn check(&self, size: u64, ext: &str, match_path: &str) -> Result<(), Rejection> {
        if size > self.max_size {
            return Err(Rejection::TooLarge {
                size,
                max: self.max_size,
            });
        }
        if !self.allowed.is_empty() && !self.allowed.contains(ext) {
            return Err(Rejection::ExtensionNotAllowed(ext.to_string()));
        }
        if self.blocked.contains(ext) {
            return Err(Rejection::ExtensionBlocked(ext.to_string()));
        }
        if let Some(p) = self.exclude.iter().find(|p| p.matches(match_path)) {
            return Err(Rejection::Excluded(p.as_str().to_string()));
        }
        if !self.include.is_empty() && !self.include.iter().any(|p| p.matches(match_path)) {
            return Err(Rejection::NotIncluded);
        }
        Ok(())
    }
}
