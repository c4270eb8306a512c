use chrono::{Days, NaiveDate, Utc};
use log::{error, info};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;

use crate::errors::CoreError;
use crate::models::calendar::NewCalendarEvent;
use crate::models::feeding::NewFeedingSchedule;
use crate::models::growth::NewGrowthRecord;
use crate::models::pond::{NewPond, PondStatus};
use crate::models::transaction::NewTransaction;
use crate::storage::codec::{encode_fields, Draft, Entity};
use crate::storage::traits::{RecordStore, StoreError, WriteBatch};

/// Reserved collection holding the seed marker.
pub const METADATA_COLLECTION: &str = "_metadata";

/// Key of the single seed-marker document.
pub const SEED_MARKER_ID: &str = "seed";

/// Version of the initial dataset written into the marker.
pub const SEED_VERSION: u32 = 1;

/// What a seeding attempt did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedOutcome {
    /// The initial dataset was written; `documents` counts entity documents (marker excluded).
    Seeded { documents: usize },
    /// A marker was already present (possibly written by a concurrent first boot).
    AlreadySeeded,
}

/// The fixed first-run dataset, before serialization.
#[derive(Debug, Clone, PartialEq)]
pub struct InitialDataset {
    pub ponds: Vec<NewPond>,
    pub feeding_schedules: Vec<NewFeedingSchedule>,
    pub growth_records: Vec<NewGrowthRecord>,
    pub transactions: Vec<NewTransaction>,
    pub calendar_events: Vec<NewCalendarEvent>,
}

impl InitialDataset {
    /// Build the dataset. Calendar reminders are placed relative to `today`.
    pub fn new(today: NaiveDate) -> Self {
        let d = |y, m, day| NaiveDate::from_ymd_opt(y, m, day).unwrap_or(today);
        let in_days = |n: u64| today.checked_add_days(Days::new(n)).unwrap_or(today);

        Self {
            ponds: vec![
                NewPond::new("Kolam A1", 100.0, 1500, PondStatus::Active),
                NewPond::new("Kolam A2", 100.0, 1500, PondStatus::Active),
                NewPond::new("Kolam B1", 120.0, 1800, PondStatus::Active),
                NewPond::new("Kolam B2", 120.0, 0, PondStatus::Maintenance),
            ],
            feeding_schedules: vec![
                NewFeedingSchedule::new("08:00", 10.0),
                NewFeedingSchedule::new("17:00", 12.0),
            ],
            growth_records: vec![
                NewGrowthRecord::with_notes(d(2024, 1, 15), 186.0, "Sampling awal"),
                NewGrowthRecord::with_notes(d(2024, 2, 15), 237.0, "Nafsu makan baik"),
                NewGrowthRecord::with_notes(d(2024, 3, 15), 273.0, "Pertumbuhan stabil"),
                NewGrowthRecord::with_notes(d(2024, 4, 15), 305.0, "Ukuran mulai seragam"),
                NewGrowthRecord::with_notes(d(2024, 5, 15), 359.0, "Siap panen sebagian"),
                NewGrowthRecord::with_notes(d(2024, 6, 15), 414.0, "Pasca panen parsial"),
            ],
            transactions: vec![
                NewTransaction::expense(d(2024, 6, 1), "Pembelian pakan 5 sak", 1_500_000.0),
                NewTransaction::expense(d(2024, 6, 5), "Pembelian probiotik", 250_000.0),
                NewTransaction::income(
                    d(2024, 6, 15),
                    "Penjualan panen parsial Kolam C1",
                    7_000_000.0,
                ),
                NewTransaction::expense(d(2024, 6, 20), "Biaya listrik dan air", 500_000.0),
            ],
            calendar_events: vec![
                NewCalendarEvent::new(today, "Cek kualitas air"),
                NewCalendarEvent::new(in_days(5), "Jadwal Sampling Bobot"),
                NewCalendarEvent::new(in_days(10), "Perkiraan Panen Kolam A1"),
            ],
        }
    }

    /// Number of entity documents in the dataset.
    pub fn len(&self) -> usize {
        self.ponds.len()
            + self.feeding_schedules.len()
            + self.growth_records.len()
            + self.transactions.len()
            + self.calendar_events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Serialize every record into one batch, followed by the create-if-absent marker.
    pub fn to_batch(&self, seeded_at: &str) -> Result<WriteBatch, CoreError> {
        let mut batch = WriteBatch::new();
        append_drafts(&mut batch, &self.ponds)?;
        append_drafts(&mut batch, &self.feeding_schedules)?;
        append_drafts(&mut batch, &self.growth_records)?;
        append_drafts(&mut batch, &self.transactions)?;
        append_drafts(&mut batch, &self.calendar_events)?;

        let marker = json!({ "seededAt": seeded_at, "version": SEED_VERSION });
        let Value::Object(marker) = marker else {
            return Err(CoreError::Serialization("seed marker is not an object".into()));
        };
        batch.create_with_id(METADATA_COLLECTION, SEED_MARKER_ID, marker);
        Ok(batch)
    }
}

fn append_drafts<D: Draft>(batch: &mut WriteBatch, drafts: &[D]) -> Result<(), CoreError> {
    let collection = <D::Target as Entity>::COLLECTION.name();
    for draft in drafts {
        batch.create(collection, encode_fields(draft)?);
    }
    Ok(())
}

/// Writes the initial dataset exactly once per store.
///
/// The marker is a single well-known document created with
/// create-if-absent semantics in the same batch as the data, so two
/// processes racing on a fresh store cannot both commit.
pub struct SeedService {
    store: Arc<dyn RecordStore>,
    today: NaiveDate,
}

impl SeedService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self::with_today(store, Utc::now().date_naive())
    }

    /// Seed with calendar reminders anchored on a fixed day.
    pub fn with_today(store: Arc<dyn RecordStore>, today: NaiveDate) -> Self {
        Self { store, today }
    }

    /// Seed if needed. Never fails: any error is logged and startup continues
    /// without (or with whatever was already in) the seed data.
    pub async fn ensure_seeded(&self) {
        let started_at = Instant::now();
        match self.try_seed().await {
            Ok(SeedOutcome::Seeded { documents }) => info!(
                "event=seed module=seed status=ok outcome=seeded documents={} duration_ms={}",
                documents,
                started_at.elapsed().as_millis()
            ),
            Ok(SeedOutcome::AlreadySeeded) => info!(
                "event=seed module=seed status=ok outcome=already_seeded duration_ms={}",
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=seed module=seed status=error duration_ms={} error={}",
                started_at.elapsed().as_millis(),
                err
            ),
        }
    }

    /// Seed if needed and report what happened.
    pub async fn try_seed(&self) -> Result<SeedOutcome, CoreError> {
        let marker = self
            .store
            .get(METADATA_COLLECTION, SEED_MARKER_ID)
            .await
            .map_err(CoreError::SeedFailure)?;
        if marker.is_some() {
            return Ok(SeedOutcome::AlreadySeeded);
        }

        let dataset = InitialDataset::new(self.today);
        let batch = dataset.to_batch(&Utc::now().to_rfc3339())?;

        match self.store.commit(batch).await {
            Ok(()) => Ok(SeedOutcome::Seeded {
                documents: dataset.len(),
            }),
            // Another process committed the marker between our check and commit.
            Err(StoreError::AlreadyExists { .. }) => Ok(SeedOutcome::AlreadySeeded),
            Err(source) => Err(CoreError::SeedFailure(source)),
        }
    }
}
