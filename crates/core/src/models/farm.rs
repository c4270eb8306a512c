use serde::{Deserialize, Serialize};

use super::calendar::CalendarEvent;
use super::feeding::FeedingSchedule;
use super::growth::GrowthRecord;
use super::pond::Pond;
use super::transaction::Transaction;

/// The five record collections that make up a farm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FarmCollection {
    Ponds,
    FeedingSchedules,
    GrowthRecords,
    Transactions,
    CalendarEvents,
}

impl FarmCollection {
    pub const ALL: [FarmCollection; 5] = [
        FarmCollection::Ponds,
        FarmCollection::FeedingSchedules,
        FarmCollection::GrowthRecords,
        FarmCollection::Transactions,
        FarmCollection::CalendarEvents,
    ];

    /// Collection name in the document store.
    pub fn name(&self) -> &'static str {
        match self {
            FarmCollection::Ponds => "ponds",
            FarmCollection::FeedingSchedules => "feedingSchedules",
            FarmCollection::GrowthRecords => "growthRecords",
            FarmCollection::Transactions => "transactions",
            FarmCollection::CalendarEvents => "calendarEvents",
        }
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

impl std::fmt::Display for FarmCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Which collections have delivered at least one snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadedCollections([bool; 5]);

impl LoadedCollections {
    pub fn mark(&mut self, collection: FarmCollection) {
        self.0[collection.index()] = true;
    }

    pub fn is_loaded(&self, collection: FarmCollection) -> bool {
        self.0[collection.index()]
    }

    pub fn all(&self) -> bool {
        self.0.iter().all(|loaded| *loaded)
    }
}

/// The latest view of all five collections, as last delivered by the store.
///
/// Each collection is replaced wholesale on every notification; nothing in
/// here is derived or cached across collections.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FarmSnapshot {
    /// Unspecified (store) order.
    pub ponds: Vec<Pond>,

    /// Ordered by time of day.
    pub feeding_schedules: Vec<FeedingSchedule>,

    /// Oldest sample first.
    pub growth_records: Vec<GrowthRecord>,

    /// Newest transaction first.
    pub transactions: Vec<Transaction>,

    /// Unspecified (store) order.
    pub calendar_events: Vec<CalendarEvent>,

    /// Collections that have delivered at least one snapshot.
    pub loaded: LoadedCollections,

    /// Whether the seeding step has run (successfully or not).
    pub seeded: bool,

    /// Set once the owner stopped following the store. No later snapshot arrives.
    pub disposed: bool,
}

impl FarmSnapshot {
    /// True once seeding has run and every collection is authoritative.
    pub fn is_ready(&self) -> bool {
        self.seeded && self.loaded.all()
    }
}
