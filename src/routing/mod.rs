//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Registration (setup phase):
//!     "/users/@id"
//!     → pattern.rs (compile into literal/variable segments)
//!     → table.rs (store under method + key, apply conflict policy)
//!
//! Request (serving phase):
//!     method + path
//!     → matcher.rs (static exact match, then dynamic prefix + arity)
//!     → Return: RouteMatch { entry, variables } or a miss
//! ```
//!
//! # Design Decisions
//! - Patterns compiled once at registration, never re-split per request
//! - Table is immutable once serving starts (shared without locks)
//! - Deterministic: same input always matches same route

pub mod matcher;
pub mod pattern;
pub mod table;
pub mod types;

pub use matcher::{Resolution, RouteMatch};
pub use pattern::{RoutePattern, Segment};
pub use table::{Registration, RouteEntry, RouteOptions, RouteTable};
pub use types::{ConflictPolicy, Method, RouteError};
