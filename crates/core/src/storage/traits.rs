use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::sync::mpsc;

/// A schemaless document body: field name → JSON value.
/// Dates cross this boundary only as ISO-8601 strings.
pub type Document = Map<String, Value>;

/// One event on a live subscription: either the full current collection or
/// the error that terminated the listener.
pub type SnapshotEvent = Result<Vec<StoredDocument>, StoreError>;

/// Errors reported by a [`RecordStore`] backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The query cannot run as issued (e.g. a required index is missing).
    #[error("failed precondition: {0}")]
    FailedPrecondition(String),

    #[error("document not found: {collection}/{id}")]
    NotFound { collection: String, id: String },

    #[error("document already exists: {collection}/{id}")]
    AlreadyExists { collection: String, id: String },

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("internal store error: {0}")]
    Internal(String),
}

/// A document together with its store-assigned key.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: String,
    pub fields: Document,
}

impl StoredDocument {
    pub fn new(id: impl Into<String>, fields: Document) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }
}

/// Sort direction for an ordered query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Single-field ordering of a collection query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

impl OrderBy {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Ascending,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Descending,
        }
    }
}

/// A whole-collection query. Without `order_by` the store's natural order applies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pub order_by: Option<OrderBy>,
}

impl Query {
    pub fn ordered(order_by: OrderBy) -> Self {
        Self {
            order_by: Some(order_by),
        }
    }
}

/// A single write inside an atomic [`WriteBatch`].
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Insert under a fresh store-assigned key.
    Create { collection: String, fields: Document },
    /// Insert under a caller-chosen key; fails the batch if the key exists.
    CreateWithId {
        collection: String,
        id: String,
        fields: Document,
    },
    /// Insert or overwrite under a caller-chosen key.
    Set {
        collection: String,
        id: String,
        fields: Document,
    },
    /// Merge fields into an existing document; fails the batch if it is missing.
    Update {
        collection: String,
        id: String,
        fields: Document,
    },
    /// Remove a document. Removing a missing document is not an error.
    Delete { collection: String, id: String },
}

impl WriteOp {
    pub fn collection(&self) -> &str {
        match self {
            WriteOp::Create { collection, .. }
            | WriteOp::CreateWithId { collection, .. }
            | WriteOp::Set { collection, .. }
            | WriteOp::Update { collection, .. }
            | WriteOp::Delete { collection, .. } => collection,
        }
    }
}

/// An ordered list of writes committed all-or-nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self { ops: Vec::new() }
    }

    pub fn create(&mut self, collection: &str, fields: Document) -> &mut Self {
        self.ops.push(WriteOp::Create {
            collection: collection.to_string(),
            fields,
        });
        self
    }

    pub fn create_with_id(&mut self, collection: &str, id: &str, fields: Document) -> &mut Self {
        self.ops.push(WriteOp::CreateWithId {
            collection: collection.to_string(),
            id: id.to_string(),
            fields,
        });
        self
    }

    pub fn set(&mut self, collection: &str, id: &str, fields: Document) -> &mut Self {
        self.ops.push(WriteOp::Set {
            collection: collection.to_string(),
            id: id.to_string(),
            fields,
        });
        self
    }

    pub fn update(&mut self, collection: &str, id: &str, fields: Document) -> &mut Self {
        self.ops.push(WriteOp::Update {
            collection: collection.to_string(),
            id: id.to_string(),
            fields,
        });
        self
    }

    pub fn delete(&mut self, collection: &str, id: &str) -> &mut Self {
        self.ops.push(WriteOp::Delete {
            collection: collection.to_string(),
            id: id.to_string(),
        });
        self
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }
}

/// A live query handle. Yields the full collection on registration and after
/// every change; yields `None` once the store has dropped the listener.
///
/// Dropping the subscription releases the store-side listener.
pub struct Subscription {
    receiver: mpsc::UnboundedReceiver<SnapshotEvent>,
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(
        receiver: mpsc::UnboundedReceiver<SnapshotEvent>,
        release: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            receiver,
            release: Some(Box::new(release)),
        }
    }

    /// Wait for the next snapshot or error.
    pub async fn next(&mut self) -> Option<SnapshotEvent> {
        self.receiver.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("released", &self.release.is_none())
            .finish()
    }
}

/// Contract of the remote document database the farm data lives in.
///
/// Implementations must commit a [`WriteBatch`] atomically and notify every
/// live subscription on an affected collection after each successful write.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Human-readable backend name (for logs).
    fn name(&self) -> &str;

    /// Insert a document and return its new key.
    async fn create(&self, collection: &str, fields: Document) -> Result<String, StoreError>;

    /// Merge `fields` into an existing document.
    async fn update(&self, collection: &str, id: &str, fields: Document)
        -> Result<(), StoreError>;

    /// Remove a document by key.
    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;

    /// Read a single document by key.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<StoredDocument>, StoreError>;

    /// One-shot read of a whole collection.
    async fn fetch(&self, collection: &str, query: &Query)
        -> Result<Vec<StoredDocument>, StoreError>;

    /// Open a live query on a collection.
    async fn subscribe(&self, collection: &str, query: Query) -> Result<Subscription, StoreError>;

    /// Apply every write in `batch`, or none of them.
    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError>;
}
