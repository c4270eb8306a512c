use chrono::{Days, NaiveDate};

use crate::models::calendar::CalendarEvent;
use crate::models::farm::FarmSnapshot;
use crate::models::feeding::FeedingSchedule;
use crate::models::growth::GrowthRecord;
use crate::models::pond::{Pond, PondStatus};
use crate::models::summary::FarmSummary;
use crate::models::transaction::{Transaction, TransactionType};

/// Default look-ahead for upcoming calendar events.
pub const UPCOMING_WINDOW_DAYS: u64 = 14;

/// Derives dashboard figures from raw snapshots.
///
/// Pure computation over already-synchronized data. No I/O, nothing cached.
pub struct SummaryService;

impl SummaryService {
    pub fn new() -> Self {
        Self
    }

    /// Compute every dashboard figure for `today`.
    pub fn summarize(&self, snapshot: &FarmSnapshot, today: NaiveDate) -> FarmSummary {
        let active: Vec<&Pond> = self.active_ponds(&snapshot.ponds);
        let total_income = self.total_of(&snapshot.transactions, TransactionType::Income);
        let total_expense = self.total_of(&snapshot.transactions, TransactionType::Expense);

        FarmSummary {
            as_of_date: today,
            active_ponds: active.len(),
            active_area: active.iter().map(|p| p.area).sum(),
            total_fish: snapshot.ponds.iter().map(|p| u64::from(p.fish_count)).sum(),
            feeding_times: self.feeding_times(&snapshot.feeding_schedules),
            daily_feed_kg: snapshot.feeding_schedules.iter().map(|s| s.feed_amount).sum(),
            total_income,
            total_expense,
            net_balance: total_income - total_expense,
            latest_growth: self.latest_growth(&snapshot.growth_records).cloned(),
            upcoming_events: self
                .upcoming_events(&snapshot.calendar_events, today, UPCOMING_WINDOW_DAYS)
                .into_iter()
                .cloned()
                .collect(),
        }
    }

    pub fn active_ponds<'a>(&self, ponds: &'a [Pond]) -> Vec<&'a Pond> {
        ponds
            .iter()
            .filter(|p| p.status == PondStatus::Active)
            .collect()
    }

    /// Sum of amounts of one transaction type.
    pub fn total_of(&self, transactions: &[Transaction], kind: TransactionType) -> f64 {
        transactions
            .iter()
            .filter(|t| t.kind == kind)
            .map(|t| t.amount)
            .sum()
    }

    /// Σ income − Σ expense.
    pub fn net_balance(&self, transactions: &[Transaction]) -> f64 {
        transactions.iter().map(Transaction::signed_amount).sum()
    }

    pub fn feeding_times(&self, schedules: &[FeedingSchedule]) -> Vec<String> {
        schedules.iter().map(|s| s.time.clone()).collect()
    }

    /// The sample with the latest date (the last one on ties).
    pub fn latest_growth<'a>(&self, records: &'a [GrowthRecord]) -> Option<&'a GrowthRecord> {
        records.iter().max_by_key(|r| r.date)
    }

    pub fn events_on<'a>(&self, events: &'a [CalendarEvent], day: NaiveDate) -> Vec<&'a CalendarEvent> {
        events.iter().filter(|e| e.date == day).collect()
    }

    /// Events dated `from` through `from + days` inclusive, soonest first.
    pub fn upcoming_events<'a>(
        &self,
        events: &'a [CalendarEvent],
        from: NaiveDate,
        days: u64,
    ) -> Vec<&'a CalendarEvent> {
        let until = from.checked_add_days(Days::new(days)).unwrap_or(NaiveDate::MAX);
        let mut upcoming: Vec<&CalendarEvent> = events
            .iter()
            .filter(|e| e.date >= from && e.date <= until)
            .collect();
        upcoming.sort_by_key(|e| e.date);
        upcoming
    }
}

impl Default for SummaryService {
    fn default() -> Self {
        Self::new()
    }
}
