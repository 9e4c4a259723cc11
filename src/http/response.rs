//! Response handling.
//!
//! # Responsibilities
//! - Carry the global headers applied before routing
//! - Turn a handler payload (text or structured) into a finished response
//! - Hand exactly one response back to the dispatcher
//!
//! # Design Decisions
//! - `send` consumes the sink, so a second terminal write cannot be expressed
//! - Text payloads are written verbatim; anything else is serialized as JSON
//! - Content-Type is filled in only when nothing set it already

use axum::body::Body;
use axum::http::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use serde::Serialize;
use tokio::sync::oneshot;

use crate::routing::RouteError;

const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";
const JSON_CONTENT_TYPE: &str = "application/json";

/// What a handler (or the dispatcher) writes back.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Written as-is.
    Text(String),
    /// Serialized JSON text.
    Json(String),
}

impl Payload {
    /// Serialize `value` as JSON, keeping struct field order.
    pub fn json<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        serde_json::to_string(value).map(Payload::Json)
    }

    fn content_type(&self) -> &'static str {
        match self {
            Payload::Text(_) => TEXT_CONTENT_TYPE,
            Payload::Json(_) => JSON_CONTENT_TYPE,
        }
    }

    fn into_body(self) -> Body {
        match self {
            Payload::Text(text) => Body::from(text),
            Payload::Json(json) => Body::from(json),
        }
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload::Text(text)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Payload::Text(text.to_string())
    }
}

impl From<serde_json::Value> for Payload {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::String(text) => Payload::Text(text),
            other => Payload::Json(other.to_string()),
        }
    }
}

/// Status and headers of a response that has not been written yet.
#[derive(Debug, Clone)]
pub struct ResponseHead {
    status: StatusCode,
    headers: HeaderMap,
}

impl ResponseHead {
    /// Start from the global header list, applied in registration order.
    ///
    /// A later header with the same name replaces an earlier one.
    pub fn with_headers<'a, I>(headers: I) -> Self
    where
        I: IntoIterator<Item = &'a (HeaderName, HeaderValue)>,
    {
        let mut map = HeaderMap::new();
        for (name, value) in headers {
            map.insert(name.clone(), value.clone());
        }
        Self {
            status: StatusCode::OK,
            headers: map,
        }
    }

    /// Status the response will be sent with.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Replace the status code.
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Headers the response will be sent with.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Finish the response with `payload` as its body.
    pub fn finish(mut self, payload: Payload) -> Response {
        if !self.headers.contains_key(CONTENT_TYPE) {
            self.headers
                .insert(CONTENT_TYPE, HeaderValue::from_static(payload.content_type()));
        }

        let mut response = Response::new(payload.into_body());
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

impl Default for ResponseHead {
    fn default() -> Self {
        Self::with_headers(std::iter::empty())
    }
}

/// Single-use reply handle given to a route handler.
#[derive(Debug)]
pub struct ResponseSink {
    head: ResponseHead,
    tx: oneshot::Sender<Response>,
}

impl ResponseSink {
    /// Create a sink and the receiver the dispatcher waits on.
    pub fn new(head: ResponseHead) -> (Self, oneshot::Receiver<Response>) {
        let (tx, rx) = oneshot::channel();
        (Self { head, tx }, rx)
    }

    /// Override the status code (200 by default).
    pub fn set_status(&mut self, status: StatusCode) -> &mut Self {
        self.head.status = status;
        self
    }

    /// Set a header on this response only, replacing any value of the same name.
    pub fn set_header(&mut self, name: &str, value: &str) -> Result<&mut Self, RouteError> {
        let (name, value) = parse_header(name, value)?;
        self.head.headers.insert(name, value);
        Ok(self)
    }

    /// Status and headers set so far.
    pub fn head(&self) -> &ResponseHead {
        &self.head
    }

    /// Write `payload` and finish the response.
    pub fn send(self, payload: impl Into<Payload>) {
        let response = self.head.finish(payload.into());
        if self.tx.send(response).is_err() {
            tracing::debug!("Response dropped: request already terminated");
        }
    }

    /// Serialize `value` as JSON and finish the response.
    ///
    /// On a serialization error the sink is dropped unsent and the dispatcher
    /// answers with its generic server error.
    pub fn send_json<T: Serialize>(self, value: &T) -> Result<(), serde_json::Error> {
        self.send(Payload::json(value)?);
        Ok(())
    }
}

/// Validate a header name/value pair for use in a response.
pub fn parse_header(name: &str, value: &str) -> Result<(HeaderName, HeaderValue), RouteError> {
    let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| RouteError::InvalidHeader {
        name: name.to_string(),
        reason: e.to_string(),
    })?;
    let header_value = HeaderValue::from_str(value).map_err(|e| RouteError::InvalidHeader {
        name: name.to_string(),
        reason: e.to_string(),
    })?;
    Ok((header_name, header_value))
}
