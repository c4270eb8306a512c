use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;
use crate::storage::codec::{Draft, Entity};

use super::farm::FarmCollection;

/// A growth sample: average fish weight measured on a given day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrowthRecord {
    /// Store-assigned identifier
    pub id: String,

    /// Sampling day (no time component)
    pub date: NaiveDate,

    /// Average weight in grams
    pub average_weight: f64,

    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewGrowthRecord {
    pub date: NaiveDate,
    pub average_weight: f64,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewGrowthRecord {
    pub fn new(date: NaiveDate, average_weight: f64) -> Self {
        Self {
            date,
            average_weight,
            notes: None,
        }
    }

    pub fn with_notes(date: NaiveDate, average_weight: f64, notes: impl Into<String>) -> Self {
        Self {
            date,
            average_weight,
            notes: Some(notes.into()),
        }
    }
}

fn validate_weight(average_weight: f64) -> Result<(), CoreError> {
    if !average_weight.is_finite() || average_weight <= 0.0 {
        return Err(CoreError::ValidationError(format!(
            "Average weight must be positive, got {average_weight}"
        )));
    }
    Ok(())
}

impl Entity for GrowthRecord {
    const COLLECTION: FarmCollection = FarmCollection::GrowthRecords;
    const DATE_FIELDS: &'static [&'static str] = &["date"];

    fn id(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> Result<(), CoreError> {
        validate_weight(self.average_weight)
    }
}

impl Draft for NewGrowthRecord {
    type Target = GrowthRecord;

    fn validate(&self) -> Result<(), CoreError> {
        validate_weight(self.average_weight)
    }
}
