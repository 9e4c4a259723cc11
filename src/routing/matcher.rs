//! Path matching against a route table.
//!
//! # Responsibilities
//! - Exact match on static routes
//! - Prefix + arity match on dynamic routes, binding variables positionally
//! - Report why a dynamic lookup missed (for diagnostics only)
//!
//! # Design Decisions
//! - Static routes are always checked first, so `/users/me` beats `/users/@id`
//! - The longest literal prefix with dynamic routes decides; only the exact arity matches
//! - Arity mismatch resolves like an unknown route, never as an error, and never
//!   falls back to a shorter prefix
//! - Variables only bind non-empty segments (`/users/` does not match `/users/@id`)

use std::sync::Arc;

use crate::routing::pattern::{prefix_key, split_path};
use crate::routing::table::{RouteEntry, RouteTable};
use crate::routing::types::Method;

/// A resolved route with its bound path variables.
#[derive(Debug, Clone)]
pub struct RouteMatch<'a> {
    pub entry: &'a Arc<RouteEntry>,
    /// `(name, value)` pairs in declaration order.
    pub variables: Vec<(String, String)>,
}

impl RouteMatch<'_> {
    /// Value bound to `name`, if the route declares it.
    pub fn variable(&self, name: &str) -> Option<&str> {
        self.variables
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Result of matching a request path.
#[derive(Debug)]
pub enum Resolution<'a> {
    /// A route matched.
    Matched(RouteMatch<'a>),
    /// A dynamic prefix exists but none of its routes takes this many variables.
    ArityMismatch {
        prefix: String,
        declared: Vec<usize>,
        found: usize,
    },
    /// Nothing registered under any prefix of the path.
    NotFound,
}

impl<'a> Resolution<'a> {
    /// Collapse to a match; both miss variants become `None`.
    pub fn into_match(self) -> Option<RouteMatch<'a>> {
        match self {
            Resolution::Matched(m) => Some(m),
            Resolution::ArityMismatch { .. } | Resolution::NotFound => None,
        }
    }
}

/// Match `path` for `method` against `table`.
pub fn resolve<'a>(table: &'a RouteTable, method: Method, path: &str) -> Resolution<'a> {
    if let Some(entry) = table.static_route(method, path) {
        return Resolution::Matched(RouteMatch {
            entry,
            variables: Vec::new(),
        });
    }

    let segments: Vec<&str> = split_path(path).collect();

    // At least one trailing segment must remain for a variable.
    // The longest prefix with dynamic routes decides; shorter prefixes are not tried.
    for literal_len in (0..segments.len()).rev() {
        let prefix = prefix_key(&segments[..literal_len]);
        let Some(by_arity) = table.dynamic_routes(method, &prefix) else {
            continue;
        };

        let values = &segments[literal_len..];
        return match by_arity.get(&values.len()) {
            Some(_) if values.iter().any(|v| v.is_empty()) => Resolution::NotFound,
            Some(entry) => {
                let variables = entry
                    .variable_names()
                    .zip(values)
                    .map(|(name, value)| (name.to_string(), (*value).to_string()))
                    .collect();
                Resolution::Matched(RouteMatch { entry, variables })
            }
            None => {
                let mut declared: Vec<usize> = by_arity.keys().copied().collect();
                declared.sort_unstable();
                Resolution::ArityMismatch {
                    prefix,
                    declared,
                    found: values.len(),
                }
            }
        };
    }

    Resolution::NotFound
}
