//! Routing types and error definitions.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// HTTP methods a route can be registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
}

impl Method {
    /// Canonical upper-case method name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&axum::http::Method> for Method {
    type Error = RouteError;

    fn try_from(method: &axum::http::Method) -> Result<Self, Self::Error> {
        if *method == axum::http::Method::GET {
            Ok(Method::Get)
        } else if *method == axum::http::Method::POST {
            Ok(Method::Post)
        } else {
            Err(RouteError::UnsupportedMethod(method.to_string()))
        }
    }
}

/// What to do when a route is registered over an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictPolicy {
    /// Last registration wins, silently.
    #[default]
    Replace,
    /// Refuse the second registration.
    Reject,
    /// Last registration wins and a warning is logged.
    Warn,
}

/// Errors raised while building a route table.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouteError {
    /// Pattern string was empty.
    #[error("route pattern must not be empty")]
    EmptyPattern,

    /// Pattern did not start with `/`.
    #[error("route pattern '{0}' must start with '/'")]
    MissingLeadingSlash(String),

    /// A variable marker without a name, e.g. `/users/@`.
    #[error("route pattern '{0}' has an unnamed variable")]
    EmptyVariable(String),

    /// The same variable name appears twice in one pattern.
    #[error("route pattern '{pattern}' declares variable '{name}' more than once")]
    DuplicateVariable { pattern: String, name: String },

    /// A literal segment follows a variable segment.
    #[error("route pattern '{pattern}' has literal segment '{segment}' after a variable")]
    LiteralAfterVariable { pattern: String, segment: String },

    /// A dynamic pattern contains an empty literal segment (`//`).
    #[error("route pattern '{0}' has an empty segment")]
    EmptySegment(String),

    /// Registration refused by [`ConflictPolicy::Reject`].
    #[error("{method} route '{pattern}' conflicts with an existing registration")]
    Conflict { method: Method, pattern: String },

    /// Request method outside the supported set.
    #[error("unsupported method: {0}")]
    UnsupportedMethod(String),

    /// Global header name or value could not be used in a response.
    #[error("invalid header '{name}': {reason}")]
    InvalidHeader { name: String, reason: String },
}
