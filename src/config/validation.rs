//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (bind address parses, body limit > 0)
//! - Check global headers are valid HTTP header names and values
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RouterConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::RouterConfig;
use crate::http::response::parse_header;
use crate::observability::logging::is_known_level;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address '{address}' is not a socket address: {reason}")]
    InvalidBindAddress { address: String, reason: String },

    #[error("body.max_bytes must be greater than zero")]
    ZeroBodyLimit,

    #[error("header '{name}' is invalid: {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("logging.level '{0}' is not one of trace, debug, info, warn, error")]
    UnknownLogLevel(String),
}

/// Check every semantic constraint on `config`.
pub fn validate_config(config: &RouterConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Err(e) = config.listener.bind_address.parse::<SocketAddr>() {
        errors.push(ValidationError::InvalidBindAddress {
            address: config.listener.bind_address.clone(),
            reason: e.to_string(),
        });
    }

    if config.body.max_bytes == 0 {
        errors.push(ValidationError::ZeroBodyLimit);
    }

    // Empty names or values are skipped by the router, not rejected.
    for header in &config.headers {
        if header.name.is_empty() || header.value.is_empty() {
            continue;
        }
        if let Err(e) = parse_header(&header.name, &header.value) {
            errors.push(ValidationError::InvalidHeader {
                name: header.name.clone(),
                reason: e.to_string(),
            });
        }
    }

    if !is_known_level(&config.logging.level) {
        errors.push(ValidationError::UnknownLogLevel(config.logging.level.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::HeaderConfig;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(validate_config(&RouterConfig::default()), Ok(()));
    }

    #[test]
    fn test_reports_every_error() {
        let mut config = RouterConfig::default();
        config.listener.bind_address = "not-an-address".into();
        config.body.max_bytes = 0;
        config.logging.level = "chatty".into();
        config.headers.push(HeaderConfig {
            name: "bad header".into(),
            value: "x".into(),
        });

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(matches!(errors[0], ValidationError::InvalidBindAddress { .. }));
        assert_eq!(errors[1], ValidationError::ZeroBodyLimit);
        assert!(matches!(&errors[2], ValidationError::InvalidHeader { name, .. } if name == "bad header"));
        assert_eq!(errors[3], ValidationError::UnknownLogLevel("chatty".into()));
    }

    #[test]
    fn test_empty_headers_are_not_errors() {
        let mut config = RouterConfig::default();
        config.headers.push(HeaderConfig {
            name: "X-Empty".into(),
            value: String::new(),
        });
        assert_eq!(validate_config(&config), Ok(()));
    }
}
