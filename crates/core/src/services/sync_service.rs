//! Live, whole-collection synchronization from the record store.
//!
//! # Invariants
//! - Every delivered snapshot is the entire collection in query order, never a delta.
//! - Date fields are native dates in every delivered entity.
//! - After a subscription error nothing is delivered until a fresh subscription
//!   produces a good snapshot; the consumer keeps its last view meanwhile.
//! - Once `SyncHandle::unsubscribe` returns, no callback is running and none
//!   starts later. Calling it from inside the callback deadlocks.

use log::{debug, error, info, warn};
use parking_lot::Mutex;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::errors::CoreError;
use crate::models::settings::BackoffSettings;
use crate::storage::codec::{decode_document, Entity};
use crate::storage::traits::{OrderBy, Query, RecordStore, StoredDocument};

/// Callback receiving each rebuilt collection.
pub type SnapshotCallback<T> = Arc<dyn Fn(Vec<T>) + Send + Sync>;

/// Opens live subscriptions and republishes typed snapshots.
pub struct SyncService {
    store: Arc<dyn RecordStore>,
    backoff: BackoffSettings,
}

impl SyncService {
    pub fn new(store: Arc<dyn RecordStore>, backoff: BackoffSettings) -> Self {
        Self { store, backoff }
    }

    /// Start synchronizing the collection of `T`.
    ///
    /// `on_snapshot` is invoked with the full collection on the initial load and
    /// after every change. Must be called from within a tokio runtime.
    pub fn subscribe<T, F>(&self, order: Option<OrderBy>, on_snapshot: F) -> SyncHandle
    where
        T: Entity,
        F: Fn(Vec<T>) + Send + Sync + 'static,
    {
        let collection = T::COLLECTION.name();
        let cancelled = Arc::new(AtomicBool::new(false));
        let delivery = Arc::new(Mutex::new(()));
        let query = order.map(Query::ordered).unwrap_or_default();

        let worker = SyncWorker::<T> {
            store: Arc::clone(&self.store),
            query,
            backoff: self.backoff.clone(),
            cancelled: Arc::clone(&cancelled),
            delivery: Arc::clone(&delivery),
            on_snapshot: Arc::new(on_snapshot),
            _entity: PhantomData,
        };
        let task = tokio::spawn(worker.run());

        SyncHandle {
            collection,
            cancelled,
            delivery,
            task: Mutex::new(Some(task)),
        }
    }
}

/// Rebuild typed entities from a raw snapshot. Documents that fail to decode
/// are skipped and logged; the rest of the collection is still returned.
pub fn decode_snapshot<T: Entity>(docs: &[StoredDocument]) -> Vec<T> {
    docs.iter()
        .filter_map(|doc| match decode_document::<T>(doc) {
            Ok(entity) => Some(entity),
            Err(err) => {
                warn!(
                    "event=decode module=sync status=skipped collection={} id={} error={}",
                    T::COLLECTION.name(),
                    doc.id,
                    err
                );
                None
            }
        })
        .collect()
}

struct SyncWorker<T: Entity> {
    store: Arc<dyn RecordStore>,
    query: Query,
    backoff: BackoffSettings,
    cancelled: Arc<AtomicBool>,
    delivery: Arc<Mutex<()>>,
    on_snapshot: SnapshotCallback<T>,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> SyncWorker<T> {
    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Hand `items` to the callback unless cancelled. The cancel check and the
    /// call happen under the delivery lock that `unsubscribe` waits on.
    fn deliver(&self, items: Vec<T>) -> bool {
        let _delivering = self.delivery.lock();
        if self.is_cancelled() {
            return false;
        }
        (self.on_snapshot)(items);
        true
    }

    async fn run(self) {
        let collection = T::COLLECTION.name();
        let mut failures: u32 = 0;

        while !self.is_cancelled() {
            match self.store.subscribe(collection, self.query.clone()).await {
                Ok(mut subscription) => {
                    info!("event=subscribe module=sync status=ok collection={collection}");
                    while let Some(event) = subscription.next().await {
                        if self.is_cancelled() {
                            return;
                        }
                        match event {
                            Ok(docs) => {
                                failures = 0;
                                let items = decode_snapshot::<T>(&docs);
                                debug!(
                                    "event=snapshot module=sync status=ok collection={collection} documents={} delivered={}",
                                    docs.len(),
                                    items.len()
                                );
                                if !self.deliver(items) {
                                    return;
                                }
                            }
                            Err(source) => {
                                let err = CoreError::SubscriptionFailure {
                                    collection: collection.to_string(),
                                    source,
                                };
                                error!("event=subscribe module=sync status=error collection={collection} error={err}");
                                break;
                            }
                        }
                    }
                }
                Err(source) => {
                    let err = CoreError::SubscriptionFailure {
                        collection: collection.to_string(),
                        source,
                    };
                    error!("event=subscribe module=sync status=error collection={collection} error={err}");
                }
            }

            if self.is_cancelled() {
                return;
            }
            let delay = self.backoff.delay_for(failures);
            failures = failures.saturating_add(1);
            warn!(
                "event=resubscribe module=sync status=retry collection={collection} attempt={failures} delay_ms={}",
                delay.as_millis()
            );
            tokio::time::sleep(delay).await;
        }
    }
}

/// Handle to one running collection synchronizer.
///
/// Unsubscribing is idempotent. Dropping the handle unsubscribes.
pub struct SyncHandle {
    collection: &'static str,
    cancelled: Arc<AtomicBool>,
    delivery: Arc<Mutex<()>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl SyncHandle {
    pub fn collection(&self) -> &'static str {
        self.collection
    }

    pub fn is_active(&self) -> bool {
        !self.cancelled.load(Ordering::Acquire)
    }

    /// Stop delivering snapshots and release the store-side listener.
    ///
    /// Blocks until a callback already in flight has returned.
    pub fn unsubscribe(&self) {
        if self.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }
        drop(self.delivery.lock());
        // Aborting drops the task's `Subscription`, which releases the listener.
        if let Some(task) = self.task.lock().take() {
            task.abort();
        }
        info!(
            "event=unsubscribe module=sync status=ok collection={}",
            self.collection
        );
    }
}

impl Drop for SyncHandle {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl std::fmt::Debug for SyncHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncHandle")
            .field("collection", &self.collection)
            .field("active", &self.is_active())
            .finish()
    }
}
