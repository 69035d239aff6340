//! Glob matching over in-memory path sets.
//!
//! Matching follows the multimatch convention used by file pipelines: patterns
//! are applied in order, a plain pattern adds the paths it matches and a
//! `!`-prefixed pattern removes them again. The result keeps the order of the
//! input paths, never the order patterns matched in.
//!
//! `*` stays within one path segment; `**` spans segments, so `**/*.twig`
//! matches both `index.twig` and `pages/about.twig`.

use glob::{MatchOptions, Pattern};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

#[derive(Error, Debug)]
#[error("invalid glob pattern `{pattern}`: {source}")]
pub struct PatternError {
    pub pattern: String,
    #[source]
    pub source: glob::PatternError,
}

/// One or more glob patterns, as accepted in configuration.
///
/// ```toml
/// pages = "**/*.twig"
/// layouts = ["layouts/*.twig", "!layouts/_draft*.twig"]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Patterns {
    One(String),
    Many(Vec<String>),
}

impl Patterns {
    pub fn as_slice(&self) -> &[String] {
        match self {
            Patterns::One(p) => std::slice::from_ref(p),
            Patterns::Many(ps) => ps,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.as_slice().iter().all(|p| p.trim().is_empty())
    }
}

impl From<&str> for Patterns {
    fn from(p: &str) -> Self {
        Patterns::One(p.to_string())
    }
}

impl From<Vec<&str>> for Patterns {
    fn from(ps: Vec<&str>) -> Self {
        Patterns::Many(ps.into_iter().map(String::from).collect())
    }
}

/// A compiled pattern list.
#[derive(Debug, Clone)]
pub struct Matcher {
    rules: Vec<(bool, Pattern)>,
}

const OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

impl Matcher {
    /// Compile every pattern up front so a bad pattern fails before any
    /// file is looked at.
    pub fn new(patterns: &Patterns) -> Result<Self, PatternError> {
        let rules = patterns
            .as_slice()
            .iter()
            .map(|raw| {
                let (negated, body) = match raw.strip_prefix('!') {
                    Some(rest) => (true, rest),
                    None => (false, raw.as_str()),
                };
                Pattern::new(body)
                    .map(|p| (negated, p))
                    .map_err(|source| PatternError {
                        pattern: raw.clone(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    /// Whether a single path survives the pattern list.
    pub fn is_match(&self, path: &str) -> bool {
        let mut matched = false;
        for (negated, pattern) in &self.rules {
            if pattern.matches_with(path, OPTIONS) {
                matched = !negated;
            }
        }
        matched
    }

    /// Matching subset of `paths`, in input order.
    pub fn filter<'a, I>(&self, paths: I) -> Vec<&'a str>
    where
        I: IntoIterator<Item = &'a str>,
    {
        paths.into_iter().filter(|p| self.is_match(p)).collect()
    }
}

/// Convenience wrapper: compile `patterns` and filter `paths`.
pub fn multimatch<'a, I>(paths: I, patterns: &Patterns) -> Result<Vec<&'a str>, PatternError>
where
    I: IntoIterator<Item = &'a str>,
{
    Ok(Matcher::new(patterns)?.filter(paths))
}

/// `matched` minus everything in `blacklist`, keeping `matched` order.
pub fn difference<'a>(matched: &[&'a str], blacklist: &[&str]) -> Vec<&'a str> {
    let excluded: BTreeSet<&str> = blacklist.iter().copied().collect();
    matched
        .iter()
        .copied()
        .filter(|p| !excluded.contains(p))
        .collect()
}
