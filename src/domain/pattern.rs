//! Case-insensitive regex patterns used for every id-or-name match
//!
//! Filters and lookups match against stringified fields (`"<id> <name>"`), so
//! one pattern syntax covers both ids and names. An empty pattern matches
//! everything.

use regex::{Regex, RegexBuilder};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("Invalid pattern '{pattern}'")]
pub struct PatternError {
    pub pattern: String,
    #[source]
    source: regex::Error,
}

/// Compiles `pattern` as a case-insensitive regex
pub fn case_insensitive(pattern: &str) -> Result<Regex, PatternError> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|source| PatternError {
            pattern: pattern.to_string(),
            source,
        })
}

/// Compiles a comma-separated list as an alternation (`a,b` matches `a|b`)
pub fn any_of(list: &str) -> Result<Regex, PatternError> {
    let alternation = list
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("|");
    case_insensitive(&alternation)
}

/// Compiles an optional pattern, treating absence as match-all
pub fn optional(pattern: Option<&str>) -> Result<Regex, PatternError> {
    case_insensitive(pattern.unwrap_or(""))
}
