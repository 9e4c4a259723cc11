//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::http::body::DEFAULT_MAX_BODY_BYTES;
use crate::routing::ConflictPolicy;

/// Root configuration for a router.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RouterConfig {
    /// Log registration, resolution and parsed payloads.
    pub verbose: bool,

    /// What to do when a route is registered twice.
    pub on_conflict: ConflictPolicy,

    pub listener: ListenerConfig,

    pub body: BodyConfig,

    pub logging: LoggingConfig,

    /// Headers sent on every response, in order.
    pub headers: Vec<HeaderConfig>,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:9000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:9000".to_string(),
        }
    }
}

/// Request body limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BodyConfig {
    /// Bodies larger than this fail parsing.
    pub max_bytes: usize,
}

impl Default for BodyConfig {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter level when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// A header added to every response.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HeaderConfig {
    pub name: String,
    pub value: String,
}
