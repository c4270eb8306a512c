use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;
use crate::storage::codec::{Draft, Entity};

use super::farm::FarmCollection;

/// One daily feeding slot.
///
/// The schedule is managed as a whole set: it is replaced atomically rather
/// than edited entry by entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedingSchedule {
    /// Store-assigned identifier
    pub id: String,

    /// Time of day, `HH:MM` (24h)
    pub time: String,

    /// Feed per slot in kg
    pub feed_amount: f64,
}

/// A feeding slot as submitted for a schedule replace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFeedingSchedule {
    pub time: String,
    pub feed_amount: f64,
}

impl NewFeedingSchedule {
    pub fn new(time: impl Into<String>, feed_amount: f64) -> Self {
        Self {
            time: time.into(),
            feed_amount,
        }
    }

    /// Validate and return a copy with the time zero-padded to `HH:MM`.
    pub fn normalized(&self) -> Result<Self, CoreError> {
        validate_feed_amount(self.feed_amount)?;
        Ok(Self {
            time: normalize_time(&self.time)?,
            feed_amount: self.feed_amount,
        })
    }
}

/// Parse a 24h `H:MM` / `HH:MM` time and return it as `HH:MM`.
pub fn normalize_time(raw: &str) -> Result<String, CoreError> {
    let invalid = || CoreError::ValidationError(format!("Invalid feeding time {raw:?} (expected HH:MM)"));

    let (hours, minutes) = raw.split_once(':').ok_or_else(invalid)?;
    let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if !digits(hours) || hours.len() > 2 || !digits(minutes) || minutes.len() != 2 {
        return Err(invalid());
    }
    let hours: u32 = hours.parse().map_err(|_| invalid())?;
    let minutes: u32 = minutes.parse().map_err(|_| invalid())?;
    let time = NaiveTime::from_hms_opt(hours, minutes, 0).ok_or_else(invalid)?;
    Ok(time.format("%H:%M").to_string())
}

fn validate_feed_amount(feed_amount: f64) -> Result<(), CoreError> {
    if !feed_amount.is_finite() || feed_amount < 0.0 {
        return Err(CoreError::ValidationError(format!(
            "Feed amount must not be negative, got {feed_amount}"
        )));
    }
    Ok(())
}

impl Entity for FeedingSchedule {
    const COLLECTION: FarmCollection = FarmCollection::FeedingSchedules;
    const DATE_FIELDS: &'static [&'static str] = &[];

    fn id(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> Result<(), CoreError> {
        normalize_time(&self.time)?;
        validate_feed_amount(self.feed_amount)
    }
}

impl Draft for NewFeedingSchedule {
    type Target = FeedingSchedule;

    fn validate(&self) -> Result<(), CoreError> {
        self.normalized().map(|_| ())
    }
}
