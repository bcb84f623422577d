//! Document store port (Cloud Firestore).
//!
//! Documents are plain JSON objects. Adapters translate to and from their
//! native value encoding; timestamps travel as RFC 3339 strings.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};

pub type Document = Map<String, Value>;

/// Maximum number of writes accepted by a single [`DocumentStore::commit`].
pub const MAX_BATCH_WRITES: usize = 500;

/// Maximum number of values in an `In` filter.
pub const MAX_IN_VALUES: usize = 30;

/// Convert a JSON value into a document; non-objects become empty documents.
pub fn into_document(value: Value) -> Document {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Timestamp field value as stored in documents.
pub fn timestamp_value(at: DateTime<Utc>) -> Value {
    Value::String(at.to_rfc3339_opts(SecondsFormat::Millis, true))
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: String,
    pub data: Document,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Equal,
    In,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

/// Single-collection query with conjunctive filters.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub collection: String,
    pub filters: Vec<FieldFilter>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn collection(name: impl Into<String>) -> Self {
        Self {
            collection: name.into(),
            filters: Vec::new(),
            limit: None,
        }
    }

    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(FieldFilter {
            field: field.into(),
            op: FilterOp::Equal,
            value: value.into(),
        });
        self
    }

    pub fn where_in(mut self, field: impl Into<String>, values: Vec<Value>) -> Self {
        self.filters.push(FieldFilter {
            field: field.into(),
            op: FilterOp::In,
            value: Value::Array(values),
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Evaluate the filters against a document.
    pub fn matches(&self, doc: &Document) -> bool {
        self.filters.iter().all(|filter| {
            let field = doc.get(&filter.field).unwrap_or(&Value::Null);
            match filter.op {
                FilterOp::Equal => field == &filter.value,
                FilterOp::In => filter
                    .value
                    .as_array()
                    .is_some_and(|values| values.contains(field)),
            }
        })
    }
}

/// One operation inside a batch commit.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Create or replace; with `merge` only the given top-level fields change.
    Set {
        collection: String,
        id: String,
        data: Document,
        merge: bool,
    },
    /// Merge fields into an existing document; fails if it is absent.
    Update {
        collection: String,
        id: String,
        data: Document,
    },
    Delete {
        collection: String,
        id: String,
    },
}

impl WriteOp {
    pub fn target(&self) -> (&str, &str) {
        match self {
            WriteOp::Set { collection, id, .. }
            | WriteOp::Update { collection, id, .. }
            | WriteOp::Delete { collection, id } => (collection, id),
        }
    }
}

/// Reject path segments that would address a different document: empty,
/// containing `/`, the dot segments, or the reserved `__name__` form.
pub fn validate_document_path(collection: &str, id: &str) -> Result<(), DocumentStoreError> {
    for segment in [collection, id] {
        let reserved = segment.len() > 4 && segment.starts_with("__") && segment.ends_with("__");
        if segment.is_empty() || segment.contains('/') || segment == "." || segment == ".." || reserved {
            return Err(DocumentStoreError::InvalidId(format!("{collection}/{id}")));
        }
    }
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum DocumentStoreError {
    #[error("Invalid document path: {0}")]
    InvalidId(String),

    #[error("Document {collection}/{id} not found")]
    NotFound { collection: String, id: String },

    #[error("Document store rejected request ({status}): {message}")]
    Provider { status: u16, message: String },

    #[error("Document store unreachable: {0}")]
    Transport(String),

    #[error("Document encoding error: {0}")]
    Codec(String),

    #[error("Invalid batch: {0}")]
    InvalidBatch(String),

    #[error("Document store credentials error: {0}")]
    Credentials(String),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, DocumentStoreError>;

    async fn set(
        &self,
        collection: &str,
        id: &str,
        data: Document,
        merge: bool,
    ) -> Result<(), DocumentStoreError>;

    /// Merge `data` into an existing document. [`DocumentStoreError::NotFound`]
    /// when the document does not exist.
    async fn update(&self, collection: &str, id: &str, data: Document) -> Result<(), DocumentStoreError>;

    async fn delete(&self, collection: &str, id: &str) -> Result<(), DocumentStoreError>;

    /// Insert with a store-generated id and return that id.
    async fn add(&self, collection: &str, data: Document) -> Result<String, DocumentStoreError>;

    async fn query(&self, query: &Query) -> Result<Vec<StoredDocument>, DocumentStoreError>;

    /// Apply up to [`MAX_BATCH_WRITES`] writes atomically.
    async fn commit(&self, writes: Vec<WriteOp>) -> Result<(), DocumentStoreError>;
}
