use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;
use crate::storage::codec::{Draft, Entity};

use super::farm::FarmCollection;

/// A dated reminder on the cultivation calendar (water checks, sampling, harvest).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    /// Store-assigned identifier
    pub id: String,

    pub date: NaiveDate,

    pub title: String,

    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCalendarEvent {
    pub date: NaiveDate,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl NewCalendarEvent {
    pub fn new(date: NaiveDate, title: impl Into<String>) -> Self {
        Self {
            date,
            title: title.into(),
            description: None,
        }
    }

    pub fn with_description(
        date: NaiveDate,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            date,
            title: title.into(),
            description: Some(description.into()),
        }
    }
}

fn validate_title(title: &str) -> Result<(), CoreError> {
    if title.trim().is_empty() {
        return Err(CoreError::ValidationError("Event title must not be empty".into()));
    }
    Ok(())
}

impl Entity for CalendarEvent {
    const COLLECTION: FarmCollection = FarmCollection::CalendarEvents;
    const DATE_FIELDS: &'static [&'static str] = &["date"];

    fn id(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> Result<(), CoreError> {
        validate_title(&self.title)
    }
}

impl Draft for NewCalendarEvent {
    type Target = CalendarEvent;

    fn validate(&self) -> Result<(), CoreError> {
        validate_title(&self.title)
    }
}
