use serde::{Deserialize, Serialize};

use crate::errors::CoreError;
use crate::storage::codec::{Draft, Entity};

use super::farm::FarmCollection;

/// Operational state of a pond. Serialized with the labels the dashboard stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PondStatus {
    #[serde(rename = "Aktif")]
    Active,
    #[serde(rename = "Tidak Aktif")]
    Inactive,
    #[serde(rename = "Perawatan")]
    Maintenance,
}

impl std::fmt::Display for PondStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PondStatus::Active => write!(f, "Aktif"),
            PondStatus::Inactive => write!(f, "Tidak Aktif"),
            PondStatus::Maintenance => write!(f, "Perawatan"),
        }
    }
}

/// A stored pond.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pond {
    /// Store-assigned identifier
    pub id: String,

    pub name: String,

    /// Surface area in m²
    pub area: f64,

    pub fish_count: u32,

    pub status: PondStatus,
}

/// Fields for a pond that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPond {
    pub name: String,
    pub area: f64,
    pub fish_count: u32,
    pub status: PondStatus,
}

impl NewPond {
    pub fn new(name: impl Into<String>, area: f64, fish_count: u32, status: PondStatus) -> Self {
        Self {
            name: name.into(),
            area,
            fish_count,
            status,
        }
    }
}

fn validate_pond(name: &str, area: f64) -> Result<(), CoreError> {
    if name.trim().is_empty() {
        return Err(CoreError::ValidationError("Pond name must not be empty".into()));
    }
    if !area.is_finite() || area <= 0.0 {
        return Err(CoreError::ValidationError(format!(
            "Pond area must be a positive number of m², got {area}"
        )));
    }
    Ok(())
}

impl Entity for Pond {
    const COLLECTION: FarmCollection = FarmCollection::Ponds;
    const DATE_FIELDS: &'static [&'static str] = &[];

    fn id(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> Result<(), CoreError> {
        validate_pond(&self.name, self.area)
    }
}

impl Draft for NewPond {
    type Target = Pond;

    fn validate(&self) -> Result<(), CoreError> {
        validate_pond(&self.name, self.area)
    }
}
