//! In-process [`RecordStore`] with the same observable contract as the remote
//! document database: store-assigned keys, atomic batches, ordered live
//! queries that re-deliver the whole collection after every write.
//!
//! It also carries fault injection hooks (denied collections, failing writes,
//! listener errors) so the synchronization layer can be exercised against
//! permission and transport failures.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use log::debug;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::traits::{
    Direction, Document, Query, RecordStore, SnapshotEvent, StoreError, StoredDocument,
    Subscription, WriteBatch, WriteOp,
};

type Collections = HashMap<String, Vec<StoredDocument>>;

struct Listener {
    id: u64,
    collection: String,
    query: Query,
    sender: mpsc::UnboundedSender<SnapshotEvent>,
}

#[derive(Default)]
struct Faults {
    denied: HashSet<String>,
    next_write: Option<StoreError>,
    next_commit: Option<StoreError>,
}

#[derive(Default)]
struct MemoryState {
    collections: Collections,
    listeners: Vec<Listener>,
    next_listener_id: u64,
    faults: Faults,
}

impl MemoryState {
    fn check_access(&self, collection: &str) -> Result<(), StoreError> {
        if self.faults.denied.contains(collection) {
            return Err(StoreError::PermissionDenied(format!(
                "missing or insufficient permissions for `{collection}`"
            )));
        }
        Ok(())
    }

    fn snapshot(&self, collection: &str, query: &Query) -> Vec<StoredDocument> {
        let mut docs = self.collections.get(collection).cloned().unwrap_or_default();
        if let Some(order) = &query.order_by {
            // Stable sort: ties keep insertion order.
            docs.sort_by(|a, b| {
                let ord = compare_values(a.fields.get(&order.field), b.fields.get(&order.field));
                match order.direction {
                    Direction::Ascending => ord,
                    Direction::Descending => ord.reverse(),
                }
            });
        }
        docs
    }

    /// Push the current collection to every listener on it, dropping
    /// listeners whose receiving side is gone.
    fn notify(&mut self, collection: &str) {
        let mut closed = Vec::new();
        for listener in self.listeners.iter().filter(|l| l.collection == collection) {
            let docs = self.snapshot(collection, &listener.query);
            if listener.sender.send(Ok(docs)).is_err() {
                closed.push(listener.id);
            }
        }
        if !closed.is_empty() {
            self.listeners.retain(|l| !closed.contains(&l.id));
        }
    }
}

/// Ordering used by ordered queries: null < bool < number < string < other.
/// A missing field sorts as null.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(v: Option<&Value>) -> u8 {
        match v {
            None | Some(Value::Null) => 0,
            Some(Value::Bool(_)) => 1,
            Some(Value::Number(_)) => 2,
            Some(Value::String(_)) => 3,
            Some(_) => 4,
        }
    }

    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

fn new_key() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Apply one write to a working copy of the collections.
fn apply_op(collections: &mut Collections, op: WriteOp) -> Result<(), StoreError> {
    match op {
        WriteOp::Create { collection, fields } => {
            collections
                .entry(collection)
                .or_default()
                .push(StoredDocument::new(new_key(), fields));
        }
        WriteOp::CreateWithId {
            collection,
            id,
            fields,
        } => {
            let docs = collections.entry(collection.clone()).or_default();
            if docs.iter().any(|d| d.id == id) {
                return Err(StoreError::AlreadyExists { collection, id });
            }
            docs.push(StoredDocument::new(id, fields));
        }
        WriteOp::Set {
            collection,
            id,
            fields,
        } => {
            let docs = collections.entry(collection).or_default();
            match docs.iter_mut().find(|d| d.id == id) {
                Some(doc) => doc.fields = fields,
                None => docs.push(StoredDocument::new(id, fields)),
            }
        }
        WriteOp::Update {
            collection,
            id,
            fields,
        } => {
            let doc = collections
                .get_mut(&collection)
                .and_then(|docs| docs.iter_mut().find(|d| d.id == id))
                .ok_or_else(|| StoreError::NotFound {
                    collection: collection.clone(),
                    id: id.clone(),
                })?;
            for (key, value) in fields {
                doc.fields.insert(key, value);
            }
        }
        WriteOp::Delete { collection, id } => {
            if let Some(docs) = collections.get_mut(&collection) {
                docs.retain(|d| d.id != id);
            }
        }
    }
    Ok(())
}

/// Thread-safe in-memory document store.
///
/// Clones share the same underlying data.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    write_calls: Arc<AtomicUsize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Inspection ──────────────────────────────────────────────────

    /// All documents of a collection in insertion order.
    pub fn documents(&self, collection: &str) -> Vec<StoredDocument> {
        self.state
            .lock()
            .collections
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    pub fn document_count(&self, collection: &str) -> usize {
        self.state
            .lock()
            .collections
            .get(collection)
            .map_or(0, Vec::len)
    }

    /// Number of live listeners across all collections.
    pub fn listener_count(&self) -> usize {
        self.state.lock().listeners.len()
    }

    /// Number of write calls received (create, update, delete, commit),
    /// including ones that failed.
    pub fn write_calls(&self) -> usize {
        self.write_calls.load(AtomicOrdering::SeqCst)
    }

    // ── Fault injection ─────────────────────────────────────────────

    /// Reject every read, write, and subscription on `collection`.
    pub fn deny(&self, collection: &str) {
        self.state.lock().faults.denied.insert(collection.to_string());
    }

    pub fn allow(&self, collection: &str) {
        self.state.lock().faults.denied.remove(collection);
    }

    /// Fail the next single-document create/update/delete with `error`.
    pub fn fail_next_write(&self, error: StoreError) {
        self.state.lock().faults.next_write = Some(error);
    }

    /// Fail the next batch commit with `error`; nothing in it is applied.
    pub fn fail_next_commit(&self, error: StoreError) {
        self.state.lock().faults.next_commit = Some(error);
    }

    /// Terminate every live listener on `collection` with `error`.
    pub fn break_listeners(&self, collection: &str, error: StoreError) {
        let mut state = self.state.lock();
        state.listeners.retain(|l| {
            if l.collection == collection {
                let _ = l.sender.send(Err(error.clone()));
                false
            } else {
                true
            }
        });
    }

    // ── Internal ────────────────────────────────────────────────────

    fn write_one(&self, op: WriteOp) -> Result<Option<String>, StoreError> {
        self.write_calls.fetch_add(1, AtomicOrdering::SeqCst);
        let mut state = self.state.lock();
        if let Some(error) = state.faults.next_write.take() {
            return Err(error);
        }
        let collection = op.collection().to_string();
        state.check_access(&collection)?;

        // A fresh key has to be reported back, so pre-assign it.
        let (op, created_id) = match op {
            WriteOp::Create { collection, fields } => {
                let id = new_key();
                (
                    WriteOp::CreateWithId {
                        collection,
                        id: id.clone(),
                        fields,
                    },
                    Some(id),
                )
            }
            other => (other, None),
        };

        apply_op(&mut state.collections, op)?;
        state.notify(&collection);
        Ok(created_id)
    }

    fn release_listener(state: &Weak<Mutex<MemoryState>>, id: u64) {
        if let Some(state) = state.upgrade() {
            state.lock().listeners.retain(|l| l.id != id);
            debug!("event=listener_release module=memory_store status=ok listener_id={id}");
        }
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("MemoryStore")
            .field("collections", &state.collections.len())
            .field("listeners", &state.listeners.len())
            .finish()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn create(&self, collection: &str, fields: Document) -> Result<String, StoreError> {
        let id = self.write_one(WriteOp::Create {
            collection: collection.to_string(),
            fields,
        })?;
        id.ok_or_else(|| StoreError::Internal("create did not assign a key".into()))
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        fields: Document,
    ) -> Result<(), StoreError> {
        self.write_one(WriteOp::Update {
            collection: collection.to_string(),
            id: id.to_string(),
            fields,
        })
        .map(|_| ())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        self.write_one(WriteOp::Delete {
            collection: collection.to_string(),
            id: id.to_string(),
        })
        .map(|_| ())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<StoredDocument>, StoreError> {
        let state = self.state.lock();
        state.check_access(collection)?;
        Ok(state
            .collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| d.id == id))
            .cloned())
    }

    async fn fetch(
        &self,
        collection: &str,
        query: &Query,
    ) -> Result<Vec<StoredDocument>, StoreError> {
        let state = self.state.lock();
        state.check_access(collection)?;
        Ok(state.snapshot(collection, query))
    }

    async fn subscribe(&self, collection: &str, query: Query) -> Result<Subscription, StoreError> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let mut state = self.state.lock();
        state.check_access(collection)?;

        let id = state.next_listener_id;
        state.next_listener_id += 1;

        // Initial delivery, like a live query's first callback.
        let initial = state.snapshot(collection, &query);
        let _ = sender.send(Ok(initial));

        state.listeners.push(Listener {
            id,
            collection: collection.to_string(),
            query,
            sender,
        });
        debug!(
            "event=listener_open module=memory_store status=ok collection={collection} listener_id={id}"
        );

        let weak = Arc::downgrade(&self.state);
        Ok(Subscription::new(receiver, move || {
            MemoryStore::release_listener(&weak, id)
        }))
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        self.write_calls.fetch_add(1, AtomicOrdering::SeqCst);
        let mut state = self.state.lock();
        if let Some(error) = state.faults.next_commit.take() {
            return Err(error);
        }
        for op in batch.ops() {
            state.check_access(op.collection())?;
        }

        // Apply to a working copy of the touched collections, swap in on success.
        let touched: Vec<String> = {
            let mut seen = Vec::new();
            for op in batch.ops() {
                if !seen.iter().any(|c: &String| c == op.collection()) {
                    seen.push(op.collection().to_string());
                }
            }
            seen
        };
        let mut working: Collections = touched
            .iter()
            .map(|c| (c.clone(), state.collections.get(c).cloned().unwrap_or_default()))
            .collect();

        for op in batch.into_ops() {
            apply_op(&mut working, op)?;
        }

        state.collections.extend(working);
        for collection in &touched {
            state.notify(collection);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn compare_values_orders_by_type_then_value() {
        let a = json!(1);
        let b = json!(2.5);
        let s = json!("2024-06-01");
        assert_eq!(compare_values(Some(&a), Some(&b)), Ordering::Less);
        assert_eq!(compare_values(Some(&b), Some(&s)), Ordering::Less);
        assert_eq!(compare_values(None, Some(&a)), Ordering::Less);
        assert_eq!(
            compare_values(Some(&json!("2024-06-20")), Some(&json!("2024-06-15"))),
            Ordering::Greater
        );
    }

    #[test]
    fn apply_update_on_missing_document_is_not_found() {
        let mut collections = Collections::new();
        let err = apply_op(
            &mut collections,
            WriteOp::Update {
                collection: "ponds".into(),
                id: "nope".into(),
                fields: doc(json!({"name": "x"})),
            },
        )
        .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[test]
    fn apply_create_with_existing_id_is_rejected() {
        let mut collections = Collections::new();
        let op = WriteOp::CreateWithId {
            collection: "_metadata".into(),
            id: "seed".into(),
            fields: Document::new(),
        };
        apply_op(&mut collections, op.clone()).unwrap();
        let err = apply_op(&mut collections, op).unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists { .. }));
    }
}
