//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → resolve the shutdown future passed to `Router::serve`
//!
//! Shutdown (shutdown.rs):
//!     trigger() → every subscriber's future resolves → server drains and exits
//! ```
//!
//! # Design Decisions
//! - Serving takes any `Future<Output = ()>` as its stop condition
//! - OS signals and programmatic shutdown share that one entry point

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::shutdown_signal;
