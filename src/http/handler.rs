//! Route handler abstraction.

use std::future::Future;

use futures_util::future::BoxFuture;

use crate::http::request::RouteData;

/// Error type handlers may return.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result of running a handler.
pub type HandlerResult = Result<(), BoxError>;

/// A route callback.
///
/// Implemented for any `Fn(RouteData) -> impl Future<Output = HandlerResult>`,
/// so plain `async fn show(data: RouteData) -> HandlerResult` items work directly.
/// The handler must call `data.response.send(..)` exactly once.
pub trait Handler: Send + Sync + 'static {
    fn call(&self, data: RouteData) -> BoxFuture<'static, HandlerResult>;
}

impl<F, Fut> Handler for F
where
    F: Fn(RouteData) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn call(&self, data: RouteData) -> BoxFuture<'static, HandlerResult> {
        Box::pin(self(data))
    }
}
