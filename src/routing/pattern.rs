//! Route pattern compilation.
//!
//! # Responsibilities
//! - Parse a route string (`/users/@id`) into typed segments once, at registration
//! - Enforce pattern invariants (leading slash, unique names, trailing variables)
//! - Expose the lookup key (literal prefix) and arity used by the route table
//!
//! # Design Decisions
//! - A segment starting with `@` is a variable, everything else is literal
//! - Static patterns keep their raw string as the key (trailing slashes are significant)
//! - Variables must form a contiguous suffix so binding is purely positional

use std::collections::HashSet;
use std::str::FromStr;

use crate::routing::types::RouteError;

/// Prefix marking a variable segment.
pub const VARIABLE_MARKER: char = '@';

/// One compiled path segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Must equal the request segment exactly.
    Literal(String),
    /// Binds the request segment under this name.
    Variable(String),
}

/// A compiled route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePattern {
    raw: String,
    segments: Vec<Segment>,
    /// Number of leading literal segments.
    literal_len: usize,
}

impl RoutePattern {
    /// Compile a route string.
    pub fn parse(raw: &str) -> Result<Self, RouteError> {
        if raw.is_empty() {
            return Err(RouteError::EmptyPattern);
        }
        if !raw.starts_with('/') {
            return Err(RouteError::MissingLeadingSlash(raw.to_string()));
        }

        let parts: Vec<&str> = split_path(raw).collect();
        let is_dynamic = parts.iter().any(|p| p.starts_with(VARIABLE_MARKER));

        if !is_dynamic {
            let segments = parts
                .iter()
                .map(|p| Segment::Literal((*p).to_string()))
                .collect::<Vec<_>>();
            let literal_len = segments.len();
            return Ok(Self {
                raw: raw.to_string(),
                segments,
                literal_len,
            });
        }

        let mut segments = Vec::with_capacity(parts.len());
        let mut seen = HashSet::new();
        let mut literal_len = 0;

        for part in parts {
            if let Some(name) = part.strip_prefix(VARIABLE_MARKER) {
                if name.is_empty() {
                    return Err(RouteError::EmptyVariable(raw.to_string()));
                }
                if !seen.insert(name) {
                    return Err(RouteError::DuplicateVariable {
                        pattern: raw.to_string(),
                        name: name.to_string(),
                    });
                }
                segments.push(Segment::Variable(name.to_string()));
            } else {
                if !seen.is_empty() {
                    return Err(RouteError::LiteralAfterVariable {
                        pattern: raw.to_string(),
                        segment: part.to_string(),
                    });
                }
                if part.is_empty() {
                    return Err(RouteError::EmptySegment(raw.to_string()));
                }
                segments.push(Segment::Literal(part.to_string()));
                literal_len += 1;
            }
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
            literal_len,
        })
    }

    /// The route string as registered.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Compiled segments in path order.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// True when the pattern has no variables.
    pub fn is_static(&self) -> bool {
        self.arity() == 0
    }

    /// Number of variable segments.
    pub fn arity(&self) -> usize {
        self.segments.len() - self.literal_len
    }

    /// Variable names in declaration order.
    pub fn variable_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Variable(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Lookup key in the route table.
    ///
    /// Static patterns use the raw string; dynamic patterns use their literal
    /// prefix, joined the same way [`prefix_key`] joins request segments.
    pub fn key(&self) -> String {
        if self.is_static() {
            return self.raw.clone();
        }
        let literals: Vec<&str> = self.segments[..self.literal_len]
            .iter()
            .filter_map(|s| match s {
                Segment::Literal(l) => Some(l.as_str()),
                Segment::Variable(_) => None,
            })
            .collect();
        prefix_key(&literals)
    }
}

impl FromStr for RoutePattern {
    type Err = RouteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl std::fmt::Display for RoutePattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Split a path into its segments, dropping the leading slash.
pub fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.strip_prefix('/').unwrap_or(path).split('/')
}

/// Join literal segments into a dynamic-route key.
pub fn prefix_key(segments: &[&str]) -> String {
    format!("/{}", segments.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_pattern() {
        let pattern = RoutePattern::parse("/health").unwrap();
        assert!(pattern.is_static());
        assert_eq!(pattern.arity(), 0);
        assert_eq!(pattern.key(), "/health");
        assert_eq!(pattern.variable_names().count(), 0);

        let root = RoutePattern::parse("/").unwrap();
        assert!(root.is_static());
        assert_eq!(root.key(), "/");
    }

    #[test]
    fn test_dynamic_pattern() {
        let pattern = RoutePattern::parse("/users/@id/@field").unwrap();
        assert!(!pattern.is_static());
        assert_eq!(pattern.arity(), 2);
        assert_eq!(pattern.key(), "/users");
        assert_eq!(pattern.variable_names().collect::<Vec<_>>(), vec!["id", "field"]);
        assert_eq!(
            pattern.segments(),
            &[
                Segment::Literal("users".into()),
                Segment::Variable("id".into()),
                Segment::Variable("field".into()),
            ]
        );
    }

    #[test]
    fn test_root_level_variable() {
        let pattern: RoutePattern = "/@slug".parse().unwrap();
        assert_eq!(pattern.key(), "/");
        assert_eq!(pattern.arity(), 1);
    }

    #[test]
    fn test_marker_inside_segment_is_literal() {
        let pattern = RoutePattern::parse("/mail/user@example.com").unwrap();
        assert!(pattern.is_static());
    }

    #[test]
    fn test_rejects_malformed_patterns() {
        assert_eq!(RoutePattern::parse(""), Err(RouteError::EmptyPattern));
        assert_eq!(
            RoutePattern::parse("users"),
            Err(RouteError::MissingLeadingSlash("users".into()))
        );
        assert_eq!(
            RoutePattern::parse("/users/@"),
            Err(RouteError::EmptyVariable("/users/@".into()))
        );
        assert!(matches!(
            RoutePattern::parse("/a/@x/@x"),
            Err(RouteError::DuplicateVariable { name, .. }) if name == "x"
        ));
        assert!(matches!(
            RoutePattern::parse("/users/@id/posts"),
            Err(RouteError::LiteralAfterVariable { segment, .. }) if segment == "posts"
        ));
        assert_eq!(
            RoutePattern::parse("/a//@id"),
            Err(RouteError::EmptySegment("/a//@id".into()))
        );
    }

    #[test]
    fn test_split_and_join_agree() {
        let segments: Vec<&str> = split_path("/users/42").collect();
        assert_eq!(segments, vec!["users", "42"]);
        assert_eq!(prefix_key(&segments[..1]), "/users");
        assert_eq!(prefix_key(&[]), "/");
    }
}
