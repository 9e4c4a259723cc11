//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber
//! - Derive the default filter from the configured level
//!
//! # Design Decisions
//! - `RUST_LOG` always wins over the configured level
//! - Initialization is idempotent; a second call reports an error instead of panicking

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Level names accepted in configuration.
pub const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Whether `level` is one of [`LEVELS`] (case-insensitive).
pub fn is_known_level(level: &str) -> bool {
    LEVELS.contains(&level.to_ascii_lowercase().as_str())
}

/// Filter directive used when `RUST_LOG` is not set.
pub fn default_directive(level: &str) -> String {
    let level = level.to_ascii_lowercase();
    format!("routeman={level},tower_http={level}")
}

/// Install the global subscriber.
pub fn init(level: &str) -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_directive(level).into()))
        .with(tracing_subscriber::fmt::layer())
        .try_init()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_levels() {
        assert!(is_known_level("info"));
        assert!(is_known_level("DEBUG"));
        assert!(!is_known_level("loud"));
    }

    #[test]
    fn test_default_directive() {
        assert_eq!(default_directive("Warn"), "routeman=warn,tower_http=warn");
    }
}
