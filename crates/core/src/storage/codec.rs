//! The boundary between typed farm entities and schemaless store documents.
//!
//! In memory, dates are `NaiveDate`. On the wire they are ISO-8601 strings:
//! writes always emit `YYYY-MM-DD`; reads also accept full RFC 3339 timestamps
//! and keep the calendar day as written, so a record never drifts across a
//! timezone boundary.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::errors::CoreError;
use crate::models::farm::FarmCollection;

use super::traits::{Document, StoredDocument};

/// Wire format for date fields.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A farm record that lives in one collection of the store.
///
/// The serialized form uses the wire field names and includes `id`;
/// [`encode_fields`] strips it, [`decode_document`] puts it back.
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Collection the entity is stored in.
    const COLLECTION: FarmCollection;

    /// Wire names of the fields holding calendar dates.
    const DATE_FIELDS: &'static [&'static str];

    /// Store-assigned identifier.
    fn id(&self) -> &str;

    /// Check the entity's invariants before it is written.
    fn validate(&self) -> Result<(), CoreError>;
}

/// The fields of a not-yet-stored entity (everything but the identifier).
pub trait Draft: Serialize + Send + Sync {
    type Target: Entity;

    fn validate(&self) -> Result<(), CoreError>;
}

/// Parse a serialized date, accepting `YYYY-MM-DD`, RFC 3339 timestamps, and
/// offset-less `YYYY-MM-DDTHH:MM:SS[.fff]`.
pub fn parse_iso_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, DATE_FORMAT) {
        return Some(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        // The day as written, not shifted into UTC or local time.
        return Some(dt.naive_local().date());
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|dt| dt.date())
}

pub fn format_iso_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Serialize a draft or entity into a store document, without the `id` key.
pub fn encode_fields<S: Serialize>(value: &S) -> Result<Document, CoreError> {
    match serde_json::to_value(value) {
        Ok(Value::Object(mut fields)) => {
            fields.remove("id");
            Ok(fields)
        }
        Ok(other) => Err(CoreError::Serialization(format!(
            "expected a JSON object, got {other}"
        ))),
        Err(e) => Err(CoreError::Serialization(e.to_string())),
    }
}

/// Rebuild a typed entity from a stored document: normalize every date field
/// to `YYYY-MM-DD`, inject the document key as `id`, then deserialize.
pub fn decode_document<T: Entity>(doc: &StoredDocument) -> Result<T, CoreError> {
    let collection = T::COLLECTION.name();
    let mut fields = doc.fields.clone();

    for field in T::DATE_FIELDS {
        let normalized = match fields.get(*field) {
            Some(Value::String(raw)) => parse_iso_date(raw).map(format_iso_date).ok_or_else(|| {
                CoreError::Deserialization(format!(
                    "{collection}/{}: field `{field}` is not an ISO-8601 date: {raw:?}",
                    doc.id
                ))
            })?,
            // Missing or null: leave it to serde to accept or reject.
            None | Some(Value::Null) => continue,
            Some(other) => {
                return Err(CoreError::Deserialization(format!(
                    "{collection}/{}: field `{field}` must be a date string, got {other}",
                    doc.id
                )))
            }
        };
        fields.insert((*field).to_string(), Value::String(normalized));
    }

    fields.insert("id".to_string(), Value::String(doc.id.clone()));
    serde_json::from_value(Value::Object(fields))
        .map_err(|e| CoreError::Deserialization(format!("{collection}/{}: {e}", doc.id)))
}
