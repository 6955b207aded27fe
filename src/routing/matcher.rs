//! Route matching logic.
//!
//! # Responsibilities
//! - Match a path against one layer of headless routing rules
//! - Tag every matcher with the layer it belongs to
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - Prefixes are sorted longest-first so the most specific rule is reported
//! - Structural patterns are compiled once at startup

use std::collections::HashSet;
use std::fmt;

use regex::Regex;
use serde::Serialize;

/// The layer of routing rules that produced a match, cheapest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchLayer {
    Exact,
    Prefix,
    Structural,
}

impl MatchLayer {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchLayer::Exact => "exact",
            MatchLayer::Prefix => "prefix",
            MatchLayer::Structural => "structural",
        }
    }
}

impl fmt::Display for MatchLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One layer of path rules.
#[derive(Debug, Clone)]
pub enum RouteMatcher {
    /// Literal paths.
    Exact(HashSet<String>),
    /// Path prefixes, longest first.
    Prefix(Vec<String>),
    /// Regular expressions over the path.
    Structural(Vec<Regex>),
}

impl RouteMatcher {
    pub fn exact<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        RouteMatcher::Exact(paths.into_iter().map(Into::into).collect())
    }

    pub fn prefix<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut prefixes: Vec<String> = prefixes.into_iter().map(Into::into).collect();
        prefixes.sort_by(|a, b| b.len().cmp(&a.len()));
        RouteMatcher::Prefix(prefixes)
    }

    pub fn structural<I, S>(patterns: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let compiled = patterns
            .into_iter()
            .map(|p| Regex::new(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(RouteMatcher::Structural(compiled))
    }

    pub fn layer(&self) -> MatchLayer {
        match self {
            RouteMatcher::Exact(_) => MatchLayer::Exact,
            RouteMatcher::Prefix(_) => MatchLayer::Prefix,
            RouteMatcher::Structural(_) => MatchLayer::Structural,
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        match self {
            RouteMatcher::Exact(paths) => paths.contains(path),
            RouteMatcher::Prefix(prefixes) => prefixes.iter().any(|p| path.starts_with(p.as_str())),
            RouteMatcher::Structural(patterns) => patterns.iter().any(|re| re.is_match(path)),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            RouteMatcher::Exact(paths) => paths.is_empty(),
            RouteMatcher::Prefix(prefixes) => prefixes.is_empty(),
            RouteMatcher::Structural(patterns) => patterns.is_empty(),
        }
    }
}
