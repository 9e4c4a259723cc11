//! Request-side data handed to route handlers.
//!
//! # Responsibilities
//! - Generate a unique request ID for log correlation
//! - Hold parsed body fields and uploaded files
//! - Bundle everything a handler receives into [`RouteData`]
//!
//! # Design Decisions
//! - Fields keep repeated keys as lists instead of dropping values
//! - Path variables are merged into the same field map as body fields,
//!   path values win on a name clash
//! - The raw request head is kept; the body has already been consumed by parsing

use std::collections::BTreeMap;

use axum::body::Bytes;
use axum::http::request::Parts;
use serde::Serialize;
use uuid::Uuid;

use crate::http::response::ResponseSink;

/// Unique identifier for a dispatched request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Generate a new random request ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

/// A single field value: one string, or every value sent under a repeated key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    List(Vec<String>),
}

impl FieldValue {
    /// First (or only) value.
    pub fn first(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            FieldValue::List(values) => values.first().map(String::as_str),
        }
    }

    /// All values in arrival order.
    pub fn all(&self) -> Vec<&str> {
        match self {
            FieldValue::Text(s) => vec![s.as_str()],
            FieldValue::List(values) => values.iter().map(String::as_str).collect(),
        }
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(values: Vec<String>) -> Self {
        FieldValue::List(values)
    }
}

/// Parsed fields and path variables, keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Fields(BTreeMap<String, FieldValue>);

impl Fields {
    /// Create an empty field map.
    pub fn new() -> Self {
        Self::default()
    }

    /// First value stored under `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(FieldValue::first)
    }

    /// The raw value stored under `name`.
    pub fn value(&self, name: &str) -> Option<&FieldValue> {
        self.0.get(name)
    }

    /// Every value stored under `name`, empty if absent.
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.0.get(name).map(FieldValue::all).unwrap_or_default()
    }

    /// Whether `name` is present.
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Set `name`, replacing any previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        self.0.insert(name.into(), value.into());
    }

    /// Add a value under `name`, turning an existing value into a list.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let value = value.into();
        match self.0.entry(name.into()) {
            std::collections::btree_map::Entry::Vacant(slot) => {
                slot.insert(FieldValue::Text(value));
            }
            std::collections::btree_map::Entry::Occupied(mut slot) => {
                let current = slot.get_mut();
                match current {
                    FieldValue::Text(existing) => {
                        let first = std::mem::take(existing);
                        *current = FieldValue::List(vec![first, value]);
                    }
                    FieldValue::List(values) => values.push(value),
                }
            }
        }
    }

    /// Number of distinct field names.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no fields were parsed.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Fields in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K, V> FromIterator<(K, V)> for Fields
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut fields = Fields::new();
        for (name, value) in iter {
            fields.append(name, value);
        }
        fields
    }
}

/// A file received in a multipart body.
#[derive(Debug, Clone, Serialize)]
pub struct UploadedFile {
    /// Form field the file was sent under.
    pub field_name: String,
    /// Client-supplied file name.
    pub file_name: String,
    /// Declared Content-Type of the part, if any.
    pub content_type: Option<String>,
    /// File contents.
    #[serde(skip)]
    pub data: Bytes,
}

impl UploadedFile {
    /// File size in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// Everything a handler receives for one request.
#[derive(Debug)]
pub struct RouteData {
    /// Correlates log lines for this request.
    pub request_id: RequestId,
    /// Body fields merged with path variables.
    pub fields: Fields,
    /// Present only when the body carried uploads.
    pub files: Option<Vec<UploadedFile>>,
    /// Method, URI, headers and extensions of the inbound request.
    pub request: Parts,
    /// Single-use reply channel.
    pub response: ResponseSink,
}
