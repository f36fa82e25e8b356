//! Hierarchical model paths.
//!
//! A `ModelPath` is the immutable dot-separated identifier of a node in the
//! graph (`jvm.app.sources`). The last segment doubles as the display name
//! handed to instance factories.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use itertools::Itertools;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::error::DomainError;

fn segment_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_-]*$").unwrap())
}

/// Immutable hierarchical identifier for a model node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModelPath {
    segments: Vec<String>,
}

impl ModelPath {
    /// Parse a dot-separated path, validating every segment.
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        if raw.is_empty() {
            return Err(DomainError::InvalidPath {
                path: raw.to_string(),
                reason: "empty path".to_string(),
            });
        }
        let segments: Vec<String> = raw.split('.').map(str::to_string).collect();
        for segment in &segments {
            if !segment_regex().is_match(segment) {
                return Err(DomainError::InvalidPath {
                    path: raw.to_string(),
                    reason: format!("invalid segment {:?}", segment),
                });
            }
        }
        Ok(Self { segments })
    }

    /// Last segment; used as the display name passed to factories.
    pub fn name(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or("")
    }

    /// Parent path, None for root-level paths.
    pub fn parent(&self) -> Option<Self> {
        if self.segments.len() <= 1 {
            None
        } else {
            Some(Self {
                segments: self.segments[..self.segments.len() - 1].to_vec(),
            })
        }
    }

    /// Extend the path by one validated segment.
    pub fn child(&self, segment: &str) -> Result<Self, DomainError> {
        if !segment_regex().is_match(segment) {
            return Err(DomainError::InvalidPath {
                path: format!("{}.{}", self, segment),
                reason: format!("invalid segment {:?}", segment),
            });
        }
        let mut segments = self.segments.clone();
        segments.push(segment.to_string());
        Ok(Self { segments })
    }

    /// All prefixes from the root down to (and including) this path.
    pub fn prefixes(&self) -> Vec<Self> {
        (1..=self.segments.len())
            .map(|len| Self {
                segments: self.segments[..len].to_vec(),
            })
            .collect()
    }

    /// True if `self` is a strict ancestor of `other`.
    pub fn is_ancestor_of(&self, other: &Self) -> bool {
        other.segments.len() > self.segments.len()
            && other.segments[..self.segments.len()] == self.segments[..]
    }

    pub fn depth(&self) -> usize {
        self.segments.len()
    }
}

impl fmt::Display for ModelPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.iter().join("."))
    }
}

impl FromStr for ModelPath {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("a")]
    #[case("jvm.app")]
    #[case("a.b-c.d_e")]
    #[case("_private.x1")]
    fn given_valid_path_when_parsing_then_roundtrips(#[case] raw: &str) {
        let path = ModelPath::parse(raw).unwrap();
        assert_eq!(path.to_string(), raw);
    }

    #[rstest]
    #[case("")]
    #[case(".")]
    #[case("a..b")]
    #[case("a.1b")]
    #[case("a b")]
    #[case("a.")]
    fn given_invalid_path_when_parsing_then_errors(#[case] raw: &str) {
        assert!(matches!(
            ModelPath::parse(raw),
            Err(DomainError::InvalidPath { .. })
        ));
    }

    #[test]
    fn given_nested_path_when_asking_name_and_parent_then_splits_last_segment() {
        let path = ModelPath::parse("jvm.app.jar").unwrap();
        assert_eq!(path.name(), "jar");
        assert_eq!(path.parent().unwrap().to_string(), "jvm.app");
        assert_eq!(ModelPath::parse("jvm").unwrap().parent(), None);
    }

    #[test]
    fn given_path_when_listing_prefixes_then_roots_come_first() {
        let path = ModelPath::parse("a.b.c").unwrap();
        let prefixes: Vec<String> = path.prefixes().iter().map(ToString::to_string).collect();
        assert_eq!(prefixes, vec!["a", "a.b", "a.b.c"]);
    }

    #[test]
    fn given_ancestor_when_comparing_then_strict_ancestry_holds() {
        let root = ModelPath::parse("jvm").unwrap();
        let leaf = ModelPath::parse("jvm.app").unwrap();
        assert!(root.is_ancestor_of(&leaf));
        assert!(!leaf.is_ancestor_of(&root));
        assert!(!root.is_ancestor_of(&root));
    }
}
