//! HTTP request handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, every path routed to the dispatcher)
//!     → dispatch.rs (resolve route, apply global headers)
//!     → body.rs (urlencoded / JSON / multipart into fields and files)
//!     → request.rs (RouteData handed to the handler)
//!     → response.rs (handler writes exactly one response)
//!     → Send to client
//! ```

pub mod body;
pub mod dispatch;
pub mod handler;
pub mod request;
pub mod response;
pub mod server;

pub use body::{BodyError, BodyParser, FormParser, ParsedBody, DEFAULT_MAX_BODY_BYTES};
pub use dispatch::{Dispatcher, Outcome};
pub use handler::{BoxError, Handler, HandlerResult};
pub use request::{FieldValue, Fields, RequestId, RouteData, UploadedFile};
pub use response::{Payload, ResponseHead, ResponseSink};
pub use server::{Router, Routes, ServerError, DEFAULT_PORT};
