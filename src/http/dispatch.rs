//! Per-request dispatch.
//!
//! # Responsibilities
//! - Apply global headers before any other work
//! - Resolve the route; answer unknown routes with a 404 payload
//! - Parse the body for routes that expect one; answer failures with a 500 payload
//! - Run the handler behind an error/panic boundary and collect its one response
//!
//! # Design Decisions
//! - Parse errors are never shown to the client, only logged in verbose mode
//! - A handler that errors, panics or never replies still yields exactly one response
//! - The response is returned as soon as the handler sends it; the handler finishes in the background
//! - No timeout on handlers or body reads

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use axum::body::Body;
use axum::http::header::{HeaderName, HeaderValue};
use axum::http::{Request, StatusCode};
use axum::response::Response;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use serde::Serialize;
use tokio::sync::oneshot;
use tracing::Instrument;

use crate::http::body::{BodyParser, ParsedBody};
use crate::http::handler::HandlerResult;
use crate::http::request::{RequestId, RouteData};
use crate::http::response::{Payload, ResponseHead, ResponseSink};
use crate::routing::matcher::{self, Resolution};
use crate::routing::{Method, RouteTable};

/// Message sent for body-parse failures and handler faults.
pub const SERVER_ERROR_MESSAGE: &str = "Oops! That's an error. Please try again.";

/// How a request terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The handler sent its response.
    Responded,
    /// No route matched.
    Unmatched,
    /// The body parser failed.
    BodyParseFailed,
    /// The handler returned an error or panicked.
    HandlerFailed,
    /// The handler finished without using its response sink.
    NoResponse,
}

/// A handler call behind the panic boundary.
type HandlerRun = BoxFuture<'static, std::thread::Result<HandlerResult>>;

/// JSON body of dispatcher-generated replies.
#[derive(Debug, Serialize)]
struct StatusMessage {
    status: u16,
    message: String,
}

/// Routes requests to handlers. Immutable once built.
pub struct Dispatcher {
    table: RouteTable,
    headers: Vec<(HeaderName, HeaderValue)>,
    parser: Arc<dyn BodyParser>,
    verbose: bool,
}

impl Dispatcher {
    /// Build a dispatcher from a finished route table.
    pub fn new(
        table: RouteTable,
        headers: Vec<(HeaderName, HeaderValue)>,
        parser: Arc<dyn BodyParser>,
        verbose: bool,
    ) -> Self {
        Self {
            table,
            headers,
            parser,
            verbose,
        }
    }

    /// Routes this dispatcher serves.
    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    /// Global headers, in the order they are applied.
    pub fn headers(&self) -> &[(HeaderName, HeaderValue)] {
        &self.headers
    }

    /// Handle one request from start to termination.
    pub async fn dispatch(&self, request: Request<Body>) -> Response {
        self.dispatch_with_outcome(request).await.0
    }

    /// Like [`Dispatcher::dispatch`], also reporting how the request ended.
    pub async fn dispatch_with_outcome(&self, request: Request<Body>) -> (Response, Outcome) {
        let request_id = RequestId::new();
        let span = tracing::info_span!(
            "request",
            request_id = %request_id,
            method = %request.method(),
            path = %request.uri().path(),
        );

        async move {
            let (response, outcome) = self.run(request_id, request).await;
            tracing::debug!(status = %response.status(), outcome = ?outcome, "Request terminated");
            (response, outcome)
        }
        .instrument(span)
        .await
    }

    async fn run(&self, request_id: RequestId, request: Request<Body>) -> (Response, Outcome) {
        let head = ResponseHead::with_headers(&self.headers);
        let (parts, body) = request.into_parts();
        let path = parts.uri.path().to_string();

        if self.verbose {
            tracing::info!(path = %path, "Looking for route");
        }

        let resolution = match Method::try_from(&parts.method) {
            Ok(method) => matcher::resolve(&self.table, method, &path),
            Err(_) => Resolution::NotFound,
        };

        let route = match resolution {
            Resolution::Matched(route) => route,
            miss => {
                if self.verbose {
                    self.log_miss(&path, &miss);
                }
                return (not_found(head, &path), Outcome::Unmatched);
            }
        };

        let entry = Arc::clone(route.entry);
        if self.verbose {
            tracing::info!(
                pattern = %entry.pattern,
                variables = ?route.variables,
                "Route matched"
            );
        }

        let parsed = if entry.options.expects_body {
            match self.parser.parse(&parts, body).await {
                Ok(parsed) => parsed,
                Err(e) => {
                    if self.verbose {
                        tracing::info!(error = %e, "Body parsing failed");
                    }
                    return (server_error(head), Outcome::BodyParseFailed);
                }
            }
        } else {
            ParsedBody::default()
        };

        let ParsedBody { mut fields, files } = parsed;
        for (name, value) in route.variables {
            fields.insert(name, value);
        }

        if self.verbose {
            tracing::info!(fields = ?fields, "Parsed fields");
            let uploads: Vec<(&str, &str, usize)> = files
                .iter()
                .map(|f| (f.field_name.as_str(), f.file_name.as_str(), f.size()))
                .collect();
            tracing::info!(files = ?uploads, "Parsed files");
        }

        let (sink, rx) = ResponseSink::new(head.clone());
        let data = RouteData {
            request_id,
            fields,
            files: (!files.is_empty()).then_some(files),
            request: parts,
            response: sink,
        };

        let pattern = entry.pattern.to_string();
        let handler = Arc::clone(&entry.handler);
        let mut running: HandlerRun = AssertUnwindSafe(async move { handler.call(data).await })
            .catch_unwind()
            .boxed();
        let mut rx = rx;

        // The response goes out as soon as it is sent; the handler may keep running.
        tokio::select! {
            biased;
            result = &mut running => match result {
                Ok(Ok(())) => match rx.await {
                    Ok(response) => (response, Outcome::Responded),
                    Err(_) => no_response(head, &pattern),
                },
                fault => {
                    log_fault(&pattern, fault);
                    after_failure(rx, head)
                }
            },
            sent = &mut rx => {
                let reply = match sent {
                    Ok(response) => (response, Outcome::Responded),
                    Err(_) => no_response(head, &pattern),
                };
                tokio::spawn(finish_detached(running, pattern).instrument(tracing::Span::current()));
                reply
            }
        }
    }

    fn log_miss(&self, path: &str, miss: &Resolution<'_>) {
        if let Resolution::ArityMismatch {
            prefix,
            declared,
            found,
        } = miss
        {
            tracing::info!(
                path = %path,
                prefix = %prefix,
                declared = ?declared,
                found = found,
                "Dynamic prefix matched but variable count differs"
            );
        }
        let available: Vec<String> = self
            .table
            .routes()
            .map(|r| format!("{} {}", r.method, r.pattern))
            .collect();
        tracing::info!(path = %path, available = ?available, "No route matched");
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("table", &self.table)
            .field("headers", &self.headers)
            .field("verbose", &self.verbose)
            .finish_non_exhaustive()
    }
}

/// Run the rest of a handler whose response is already sent.
async fn finish_detached(running: HandlerRun, pattern: String) {
    match running.await {
        Ok(Ok(())) => {}
        fault => log_fault(&pattern, fault),
    }
}

fn log_fault(pattern: &str, fault: std::thread::Result<HandlerResult>) {
    match fault {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!(pattern = %pattern, error = %e, "Handler failed"),
        Err(panic) => tracing::error!(
            pattern = %pattern,
            panic = %panic_message(panic.as_ref()),
            "Handler panicked"
        ),
    }
}

fn no_response(head: ResponseHead, pattern: &str) -> (Response, Outcome) {
    tracing::warn!(pattern = %pattern, "Handler dropped its response without sending");
    (server_error(head), Outcome::NoResponse)
}

/// Use the handler's response if it got one out before failing.
fn after_failure(mut rx: oneshot::Receiver<Response>, head: ResponseHead) -> (Response, Outcome) {
    match rx.try_recv() {
        Ok(response) => (response, Outcome::HandlerFailed),
        Err(_) => (server_error(head), Outcome::HandlerFailed),
    }
}

fn not_found(head: ResponseHead, path: &str) -> Response {
    status_reply(head, StatusCode::NOT_FOUND, format!("Unknown route to {}.", path))
}

fn server_error(head: ResponseHead) -> Response {
    status_reply(head, StatusCode::INTERNAL_SERVER_ERROR, SERVER_ERROR_MESSAGE.to_string())
}

fn status_reply(head: ResponseHead, status: StatusCode, message: String) -> Response {
    let body = StatusMessage {
        status: status.as_u16(),
        message,
    };
    let payload = match Payload::json(&body) {
        Ok(payload) => payload,
        Err(_) => Payload::Text(body.message),
    };
    head.with_status(status).finish(payload)
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}
