use log::{error, info};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::errors::CoreError;
use crate::models::feeding::{FeedingSchedule, NewFeedingSchedule};
use crate::storage::codec::{encode_fields, Draft, Entity};
use crate::storage::traits::{Query, RecordStore, StoreError, WriteBatch};

/// Typed writes against the record store.
///
/// Every operation validates first (no store call on invalid input) and
/// returns the store's failure as `CoreError::StorageWrite`. Nothing is retried
/// here. Writes become visible to readers through the next synchronizer
/// snapshot, not through the return value.
pub struct MutationService {
    store: Arc<dyn RecordStore>,
    /// Held from the read of the old schedule until its replacement commits.
    replace_lock: Mutex<()>,
}

impl MutationService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            replace_lock: Mutex::new(()),
        }
    }

    /// Insert a new record. The store assigns its identifier.
    pub async fn create<D: Draft>(&self, draft: &D) -> Result<(), CoreError> {
        draft.validate()?;
        let collection = <D::Target as Entity>::COLLECTION.name();
        let fields = encode_fields(draft)?;

        match self.store.create(collection, fields).await {
            Ok(id) => {
                info!("event=mutation module=mutation status=ok op=create collection={collection} id={id}");
                Ok(())
            }
            Err(source) => Err(self.failed("create", collection, source)),
        }
    }

    /// Overwrite every field of an existing record (last write wins).
    pub async fn update<T: Entity>(&self, entity: &T) -> Result<(), CoreError> {
        let id = require_id(entity.id())?;
        entity.validate()?;
        let collection = T::COLLECTION.name();
        let fields = encode_fields(entity)?;

        match self.store.update(collection, id, fields).await {
            Ok(()) => {
                info!("event=mutation module=mutation status=ok op=update collection={collection} id={id}");
                Ok(())
            }
            Err(source) => Err(self.failed("update", collection, source)),
        }
    }

    /// Remove a record by identifier.
    pub async fn delete<T: Entity>(&self, id: &str) -> Result<(), CoreError> {
        let id = require_id(id)?;
        let collection = T::COLLECTION.name();

        match self.store.delete(collection, id).await {
            Ok(()) => {
                info!("event=mutation module=mutation status=ok op=delete collection={collection} id={id}");
                Ok(())
            }
            Err(source) => Err(self.failed("delete", collection, source)),
        }
    }

    /// Replace the whole feeding schedule with `entries` in one atomic batch:
    /// every existing entry is deleted and every new one inserted, or nothing
    /// changes. Replaces through the same service run one at a time, so
    /// concurrent callers never leave a mix of their lists behind.
    pub async fn replace_feeding_schedules(
        &self,
        entries: &[NewFeedingSchedule],
    ) -> Result<(), CoreError> {
        let normalized = entries
            .iter()
            .map(NewFeedingSchedule::normalized)
            .collect::<Result<Vec<_>, _>>()?;
        let collection = FeedingSchedule::COLLECTION.name();

        let _replacing = self.replace_lock.lock().await;
        let existing = self
            .store
            .fetch(collection, &Query::default())
            .await
            .map_err(|source| self.failed("replace", collection, source))?;

        let mut batch = WriteBatch::new();
        for doc in &existing {
            batch.delete(collection, &doc.id);
        }
        for entry in &normalized {
            batch.create(collection, encode_fields(entry)?);
        }

        match self.store.commit(batch).await {
            Ok(()) => {
                info!(
                    "event=mutation module=mutation status=ok op=replace collection={collection} removed={} inserted={}",
                    existing.len(),
                    normalized.len()
                );
                Ok(())
            }
            Err(source) => Err(self.failed("replace", collection, source)),
        }
    }

    fn failed(&self, operation: &'static str, collection: &str, source: StoreError) -> CoreError {
        let err = CoreError::write(operation, collection, source);
        error!(
            "event=mutation module=mutation status=error op={operation} collection={collection} store={} error={err}",
            self.store.name()
        );
        err
    }
}

fn require_id(id: &str) -> Result<&str, CoreError> {
    if id.trim().is_empty() {
        return Err(CoreError::ValidationError("Record id must not be empty".into()));
    }
    Ok(id)
}
