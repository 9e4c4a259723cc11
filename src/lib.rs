//! Minimal HTTP request router.
//!
//! Register handlers for `GET`/`POST` patterns such as `/users/@id/@field`,
//! then serve them. Each request is resolved to a handler, its body is parsed
//! into named fields (urlencoded, JSON or multipart), path variables are merged
//! in, and the handler answers through a single-use response sink.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;

pub use config::schema::RouterConfig;
pub use http::{HandlerResult, RouteData, Router, Routes};
pub use lifecycle::Shutdown;
pub use routing::{ConflictPolicy, Method, RouteError, RouteOptions};
