//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Router / dispatcher / body parser produce:
//!     → tracing events with structured fields
//!     → one span per request carrying its request ID
//!
//! logging.rs installs the subscriber:
//!     → EnvFilter (RUST_LOG, else configured level)
//!     → fmt layer on stdout
//! ```
//!
//! # Design Decisions
//! - Verbose diagnostics are ordinary `info` events gated by the router's flag
//! - The library never installs a subscriber itself; binaries call `logging::init`

pub mod logging;
