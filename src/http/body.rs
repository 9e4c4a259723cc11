//! Request body parsing.
//!
//! # Responsibilities
//! - Buffer the request body up to a configured limit
//! - Decode urlencoded forms, JSON objects and multipart forms into [`Fields`]
//! - Collect multipart file parts as [`UploadedFile`]s
//!
//! # Design Decisions
//! - An empty body always parses to empty fields, whatever the Content-Type
//! - A non-empty body without a recognised Content-Type is an error
//! - Files are kept in memory; the size limit bounds them

use axum::body::{Body, Bytes};
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::{FromRequest, Multipart};
use axum::http::header::CONTENT_TYPE;
use axum::http::request::Parts;
use axum::http::Request;
use futures_util::future::BoxFuture;
use thiserror::Error;

use crate::http::request::{Fields, UploadedFile};

/// Default body size limit (10 MiB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Errors that can occur while parsing a request body.
#[derive(Debug, Error)]
pub enum BodyError {
    /// The body stream failed or exceeded the size limit.
    #[error("failed to read request body: {0}")]
    Read(#[source] axum::Error),

    /// Body present but no Content-Type header.
    #[error("request body has no content-type")]
    MissingContentType,

    /// Content-Type the parser does not understand.
    #[error("unsupported content-type: {0}")]
    UnsupportedContentType(String),

    /// Malformed JSON.
    #[error("invalid JSON body: {0}")]
    Json(#[from] serde_json::Error),

    /// JSON body whose top level is not an object.
    #[error("JSON body must be an object")]
    JsonNotObject,

    /// Multipart request head was unusable (e.g. missing boundary).
    #[error("invalid multipart request: {0}")]
    MultipartRequest(#[from] MultipartRejection),

    /// Multipart stream was malformed.
    #[error("invalid multipart body: {0}")]
    Multipart(#[from] MultipartError),
}

/// Structured result of parsing a body.
#[derive(Debug, Default)]
pub struct ParsedBody {
    pub fields: Fields,
    pub files: Vec<UploadedFile>,
}

/// Turns a raw request body into fields and files.
pub trait BodyParser: Send + Sync + 'static {
    fn parse<'a>(&'a self, parts: &'a Parts, body: Body) -> BoxFuture<'a, Result<ParsedBody, BodyError>>;
}

/// Default parser for urlencoded, JSON and multipart bodies.
#[derive(Debug, Clone)]
pub struct FormParser {
    max_bytes: usize,
}

impl FormParser {
    /// Create a parser that rejects bodies larger than `max_bytes`.
    pub fn new(max_bytes: usize) -> Self {
        Self { max_bytes }
    }

    /// Configured body size limit.
    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    async fn parse_body(&self, parts: &Parts, body: Body) -> Result<ParsedBody, BodyError> {
        let bytes = axum::body::to_bytes(body, self.max_bytes)
            .await
            .map_err(BodyError::Read)?;
        if bytes.is_empty() {
            return Ok(ParsedBody::default());
        }

        let content_type = parts
            .headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .ok_or(BodyError::MissingContentType)?;
        let mime = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match mime.as_str() {
            "application/x-www-form-urlencoded" => Ok(parse_urlencoded(&bytes)),
            "application/json" => parse_json(&bytes),
            "multipart/form-data" => parse_multipart(parts, bytes).await,
            _ => Err(BodyError::UnsupportedContentType(mime)),
        }
    }
}

impl Default for FormParser {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_BODY_BYTES)
    }
}

impl BodyParser for FormParser {
    fn parse<'a>(&'a self, parts: &'a Parts, body: Body) -> BoxFuture<'a, Result<ParsedBody, BodyError>> {
        Box::pin(self.parse_body(parts, body))
    }
}

fn parse_urlencoded(bytes: &[u8]) -> ParsedBody {
    let fields = url::form_urlencoded::parse(bytes)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    ParsedBody {
        fields,
        files: Vec::new(),
    }
}

fn parse_json(bytes: &[u8]) -> Result<ParsedBody, BodyError> {
    let value: serde_json::Value = serde_json::from_slice(bytes)?;
    let serde_json::Value::Object(object) = value else {
        return Err(BodyError::JsonNotObject);
    };

    let mut fields = Fields::new();
    for (name, value) in object {
        match value {
            serde_json::Value::Array(items) => {
                let values: Vec<String> = items.into_iter().map(json_text).collect();
                fields.insert(name, values);
            }
            other => fields.insert(name, json_text(other)),
        }
    }
    Ok(ParsedBody {
        fields,
        files: Vec::new(),
    })
}

/// Strings stay bare, null is empty, anything else keeps its JSON text.
fn json_text(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

async fn parse_multipart(parts: &Parts, bytes: Bytes) -> Result<ParsedBody, BodyError> {
    let request = Request::from_parts(parts.clone(), Body::from(bytes));
    let mut multipart = Multipart::from_request(request, &()).await?;

    let mut parsed = ParsedBody::default();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match field.file_name().map(str::to_string) {
            Some(file_name) => {
                let content_type = field.content_type().map(str::to_string);
                let data = field.bytes().await?;
                parsed.files.push(UploadedFile {
                    field_name: name,
                    file_name,
                    content_type,
                    data,
                });
            }
            None => {
                let text = field.text().await?;
                parsed.fields.append(name, text);
            }
        }
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::request::FieldValue;

    fn head(content_type: Option<&str>) -> Parts {
        let mut builder = Request::builder().method("POST").uri("/submit");
        if let Some(ct) = content_type {
            builder = builder.header(CONTENT_TYPE, ct);
        }
        builder.body(()).unwrap().into_parts().0
    }

    async fn parse(content_type: Option<&str>, body: &'static str) -> Result<ParsedBody, BodyError> {
        let parts = head(content_type);
        FormParser::default().parse(&parts, Body::from(body)).await
    }

    #[tokio::test]
    async fn test_empty_body_without_content_type() {
        let parsed = parse(None, "").await.unwrap();
        assert!(parsed.fields.is_empty());
        assert!(parsed.files.is_empty());
    }

    #[tokio::test]
    async fn test_urlencoded_repeated_keys() {
        let parsed = parse(
            Some("application/x-www-form-urlencoded"),
            "name=Ada+Lovelace&tag=a&tag=b&note=50%25",
        )
        .await
        .unwrap();

        assert_eq!(parsed.fields.get("name"), Some("Ada Lovelace"));
        assert_eq!(parsed.fields.get_all("tag"), vec!["a", "b"]);
        assert_eq!(parsed.fields.get("note"), Some("50%"));
    }

    #[tokio::test]
    async fn test_json_object() {
        let parsed = parse(
            Some("application/json; charset=utf-8"),
            r#"{"name":"ada","age":36,"admin":false,"tags":["x",1],"extra":null}"#,
        )
        .await
        .unwrap();

        assert_eq!(parsed.fields.get("name"), Some("ada"));
        assert_eq!(parsed.fields.get("age"), Some("36"));
        assert_eq!(parsed.fields.get("admin"), Some("false"));
        assert_eq!(
            parsed.fields.value("tags"),
            Some(&FieldValue::List(vec!["x".into(), "1".into()]))
        );
        assert_eq!(parsed.fields.get("extra"), Some(""));
    }

    #[tokio::test]
    async fn test_malformed_json() {
        let err = parse(Some("application/json"), "{not json").await.unwrap_err();
        assert!(matches!(err, BodyError::Json(_)));

        let err = parse(Some("application/json"), "[1,2]").await.unwrap_err();
        assert!(matches!(err, BodyError::JsonNotObject));
    }

    #[tokio::test]
    async fn test_body_without_content_type() {
        let err = parse(None, "payload").await.unwrap_err();
        assert!(matches!(err, BodyError::MissingContentType));
    }

    #[tokio::test]
    async fn test_unsupported_content_type() {
        let err = parse(Some("text/csv"), "a,b").await.unwrap_err();
        assert!(matches!(err, BodyError::UnsupportedContentType(ct) if ct == "text/csv"));
    }

    #[tokio::test]
    async fn test_body_over_limit() {
        let parts = head(Some("application/x-www-form-urlencoded"));
        let err = FormParser::new(4)
            .parse(&parts, Body::from("name=too-long"))
            .await
            .unwrap_err();
        assert!(matches!(err, BodyError::Read(_)));
    }

    #[tokio::test]
    async fn test_multipart_fields_and_files() {
        let body = concat!(
            "--XBOUNDARY\r\n",
            "Content-Disposition: form-data; name=\"title\"\r\n",
            "\r\n",
            "Report\r\n",
            "--XBOUNDARY\r\n",
            "Content-Disposition: form-data; name=\"upload\"; filename=\"notes.txt\"\r\n",
            "Content-Type: text/plain\r\n",
            "\r\n",
            "line one\r\n",
            "--XBOUNDARY--\r\n",
        );
        let parsed = parse(Some("multipart/form-data; boundary=XBOUNDARY"), body)
            .await
            .unwrap();

        assert_eq!(parsed.fields.get("title"), Some("Report"));
        assert_eq!(parsed.files.len(), 1);
        let file = &parsed.files[0];
        assert_eq!(file.field_name, "upload");
        assert_eq!(file.file_name, "notes.txt");
        assert_eq!(file.content_type.as_deref(), Some("text/plain"));
        assert_eq!(&file.data[..], b"line one");
    }

    #[tokio::test]
    async fn test_multipart_truncated() {
        let body = concat!(
            "--XBOUNDARY\r\n",
            "Content-Disposition: form-data; name=\"title\"\r\n",
            "\r\n",
            "never closed",
        );
        let result = parse(Some("multipart/form-data; boundary=XBOUNDARY"), body).await;
        assert!(result.is_err());
    }
}
