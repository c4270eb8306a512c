pub mod errors;
pub mod logging;
pub mod models;
pub mod providers;
pub mod services;
pub mod storage;

use chrono::{NaiveDate, Utc};
use log::info;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;

use errors::CoreError;
use models::{
    advisory::{CareTipsRequest, FarmProfile},
    calendar::{CalendarEvent, NewCalendarEvent},
    farm::FarmSnapshot,
    feeding::{FeedingSchedule, NewFeedingSchedule},
    growth::{GrowthRecord, NewGrowthRecord},
    pond::{NewPond, Pond},
    settings::Settings,
    summary::FarmSummary,
    transaction::{NewTransaction, Transaction},
};
use services::{
    advisory_service::care_request_from_snapshot,
    mutation_service::MutationService,
    seed_service::SeedService,
    summary_service::SummaryService,
    sync_service::{SyncHandle, SyncService},
};
use storage::codec::Entity;
use storage::traits::{OrderBy, RecordStore};

enum Lifecycle {
    Idle,
    Starting,
    Started(Vec<SyncHandle>),
    Disposed,
}

impl Lifecycle {
    fn label(&self) -> &'static str {
        match self {
            Lifecycle::Idle => "idle",
            Lifecycle::Starting => "starting",
            Lifecycle::Started(_) => "started",
            Lifecycle::Disposed => "disposed",
        }
    }
}

/// Main entry point for the farm data layer.
///
/// Owns the live view of all five farm collections and every write
/// operation on them. Lifecycle: [`FarmData::new`] → [`FarmData::start`]
/// → [`FarmData::dispose`] (or drop).
///
/// Reads come from the latest delivered snapshot. Writes return once the
/// store accepted them; their effect shows up in a later snapshot.
#[must_use]
pub struct FarmData {
    settings: Settings,
    seed_service: SeedService,
    sync_service: SyncService,
    mutation_service: MutationService,
    summary_service: SummaryService,
    state: Arc<watch::Sender<FarmSnapshot>>,
    lifecycle: Mutex<Lifecycle>,
}

impl std::fmt::Debug for FarmData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let lifecycle = self.lifecycle.lock().label();
        let snapshot = self.state.borrow();
        f.debug_struct("FarmData")
            .field("lifecycle", &lifecycle)
            .field("ready", &snapshot.is_ready())
            .field("ponds", &snapshot.ponds.len())
            .field("transactions", &snapshot.transactions.len())
            .field("settings", &self.settings)
            .finish()
    }
}

impl FarmData {
    /// Build an idle aggregate. Nothing touches the store until `start`.
    pub fn new(store: Arc<dyn RecordStore>, settings: Settings) -> Self {
        Self::with_seed_date(store, settings, Utc::now().date_naive())
    }

    /// Like `new`, with the seed dataset's calendar reminders anchored on `today`.
    pub fn with_seed_date(store: Arc<dyn RecordStore>, settings: Settings, today: NaiveDate) -> Self {
        let (state, _) = watch::channel(FarmSnapshot::default());
        Self {
            seed_service: SeedService::with_today(Arc::clone(&store), today),
            sync_service: SyncService::new(Arc::clone(&store), settings.resubscribe.clone()),
            mutation_service: MutationService::new(store),
            summary_service: SummaryService::new(),
            settings,
            state: Arc::new(state),
            lifecycle: Mutex::new(Lifecycle::Idle),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    // ── Lifecycle ───────────────────────────────────────────────────

    /// Seed (when enabled) and open the five live subscriptions.
    ///
    /// Never fails: seeding and subscription errors are logged. Calling it
    /// again, or after `dispose`, does nothing.
    pub async fn start(&self) {
        {
            let mut lifecycle = self.lifecycle.lock();
            if !matches!(*lifecycle, Lifecycle::Idle) {
                return;
            }
            *lifecycle = Lifecycle::Starting;
        }

        if self.settings.seed_on_start {
            self.seed_service.ensure_seeded().await;
        }
        self.state.send_modify(|snapshot| snapshot.seeded = true);

        let mut lifecycle = self.lifecycle.lock();
        if !matches!(*lifecycle, Lifecycle::Starting) {
            // Disposed while seeding.
            return;
        }
        let handles = vec![
            self.track::<Pond>(None, |s, items| s.ponds = items),
            self.track::<FeedingSchedule>(Some(OrderBy::asc("time")), |s, items| {
                s.feeding_schedules = items
            }),
            self.track::<GrowthRecord>(Some(OrderBy::asc("date")), |s, items| {
                s.growth_records = items
            }),
            self.track::<Transaction>(Some(OrderBy::desc("date")), |s, items| {
                s.transactions = items
            }),
            self.track::<CalendarEvent>(None, |s, items| s.calendar_events = items),
        ];
        *lifecycle = Lifecycle::Started(handles);
        info!("event=start module=farm status=ok subscriptions=5");
    }

    /// Stop all subscriptions. Idempotent; the last snapshot stays readable.
    pub fn dispose(&self) {
        let previous = std::mem::replace(&mut *self.lifecycle.lock(), Lifecycle::Disposed);
        if let Lifecycle::Started(handles) = previous {
            for handle in &handles {
                handle.unsubscribe();
            }
            info!("event=dispose module=farm status=ok subscriptions={}", handles.len());
        }
        self.state.send_if_modified(|snapshot| !std::mem::replace(&mut snapshot.disposed, true));
    }

    fn track<T: Entity>(
        &self,
        order: Option<OrderBy>,
        apply: fn(&mut FarmSnapshot, Vec<T>),
    ) -> SyncHandle {
        let state = Arc::clone(&self.state);
        self.sync_service.subscribe::<T, _>(order, move |items| {
            state.send_modify(|snapshot| {
                apply(snapshot, items);
                snapshot.loaded.mark(T::COLLECTION);
            });
        })
    }

    // ── Reads ───────────────────────────────────────────────────────

    /// Copy of the latest view.
    pub fn snapshot(&self) -> FarmSnapshot {
        self.state.borrow().clone()
    }

    /// Change notifications: the receiver sees every recomposed snapshot.
    pub fn watch(&self) -> watch::Receiver<FarmSnapshot> {
        self.state.subscribe()
    }

    /// True once seeding has run and every collection delivered a snapshot.
    pub fn is_ready(&self) -> bool {
        self.state.borrow().is_ready()
    }

    /// Resolve once `is_ready` holds.
    ///
    /// Fails with `CoreError::Disposed` when the aggregate is disposed first,
    /// since readiness can no longer be reached.
    pub async fn wait_until_ready(&self) -> Result<(), CoreError> {
        let mut receiver = self.state.subscribe();
        let ready = receiver
            .wait_for(|snapshot| snapshot.is_ready() || snapshot.disposed)
            .await
            .map(|snapshot| snapshot.is_ready())
            .unwrap_or(false);
        if ready {
            Ok(())
        } else {
            Err(CoreError::Disposed)
        }
    }

    /// Dashboard figures from the current view.
    pub fn summary(&self, today: NaiveDate) -> FarmSummary {
        self.summary_service.summarize(&self.state.borrow(), today)
    }

    /// Care-tips request prefilled from the active ponds.
    pub fn care_request(&self, profile: &FarmProfile) -> CareTipsRequest {
        care_request_from_snapshot(&self.state.borrow(), profile)
    }

    // ── Pond operations ─────────────────────────────────────────────

    pub async fn add_pond(&self, pond: &NewPond) -> Result<(), CoreError> {
        self.mutation_service.create(pond).await
    }

    pub async fn update_pond(&self, pond: &Pond) -> Result<(), CoreError> {
        self.mutation_service.update(pond).await
    }

    pub async fn delete_pond(&self, id: &str) -> Result<(), CoreError> {
        self.mutation_service.delete::<Pond>(id).await
    }

    // ── Feeding schedule ────────────────────────────────────────────

    /// Atomically replace the whole schedule.
    pub async fn replace_feeding_schedules(
        &self,
        entries: &[NewFeedingSchedule],
    ) -> Result<(), CoreError> {
        self.mutation_service.replace_feeding_schedules(entries).await
    }

    // ── Growth records ──────────────────────────────────────────────

    pub async fn add_growth_record(&self, record: &NewGrowthRecord) -> Result<(), CoreError> {
        self.mutation_service.create(record).await
    }

    pub async fn update_growth_record(&self, record: &GrowthRecord) -> Result<(), CoreError> {
        self.mutation_service.update(record).await
    }

    pub async fn delete_growth_record(&self, id: &str) -> Result<(), CoreError> {
        self.mutation_service.delete::<GrowthRecord>(id).await
    }

    // ── Transactions ────────────────────────────────────────────────

    pub async fn add_transaction(&self, transaction: &NewTransaction) -> Result<(), CoreError> {
        self.mutation_service.create(transaction).await
    }

    pub async fn update_transaction(&self, transaction: &Transaction) -> Result<(), CoreError> {
        self.mutation_service.update(transaction).await
    }

    pub async fn delete_transaction(&self, id: &str) -> Result<(), CoreError> {
        self.mutation_service.delete::<Transaction>(id).await
    }

    // ── Calendar events ─────────────────────────────────────────────

    pub async fn add_calendar_event(&self, event: &NewCalendarEvent) -> Result<(), CoreError> {
        self.mutation_service.create(event).await
    }

    pub async fn update_calendar_event(&self, event: &CalendarEvent) -> Result<(), CoreError> {
        self.mutation_service.update(event).await
    }

    pub async fn delete_calendar_event(&self, id: &str) -> Result<(), CoreError> {
        self.mutation_service.delete::<CalendarEvent>(id).await
    }
}

impl Drop for FarmData {
    fn drop(&mut self) {
        self.dispose();
    }
}
