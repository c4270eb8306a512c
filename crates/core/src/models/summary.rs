use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::calendar::CalendarEvent;
use super::growth::GrowthRecord;

/// Dashboard figures derived from one farm snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FarmSummary {
    /// Date this summary was computed for
    pub as_of_date: NaiveDate,

    /// Number of ponds with status Active
    pub active_ponds: usize,

    /// Total area of active ponds in m²
    pub active_area: f64,

    /// Fish stocked across all ponds
    pub total_fish: u64,

    /// Feeding times of day in schedule order
    pub feeding_times: Vec<String>,

    /// Feed per day across all slots, kg
    pub daily_feed_kg: f64,

    /// Sum of all income transactions
    pub total_income: f64,

    /// Sum of all expense transactions
    pub total_expense: f64,

    /// total_income − total_expense
    pub net_balance: f64,

    /// Most recent growth sample, if any
    pub latest_growth: Option<GrowthRecord>,

    /// Events from `as_of_date` onwards within the look-ahead window, soonest first
    pub upcoming_events: Vec<CalendarEvent>,
}
