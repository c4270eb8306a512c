use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

/// Structured farm description used to request personalized care tips.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CareTipsRequest {
    pub pond_count: u32,

    /// Total pond area in m²
    pub pond_area: f64,

    pub catfish_type: String,

    /// Fish per m²
    pub stocking_density: f64,

    pub feed_type: String,

    pub water_source: String,

    #[serde(default)]
    pub disease_history: String,

    pub current_health_status: String,
}

impl CareTipsRequest {
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.pond_count < 1 {
            return Err(CoreError::ValidationError("Pond count must be at least 1".into()));
        }
        if !self.pond_area.is_finite() || self.pond_area <= 0.0 {
            return Err(CoreError::ValidationError("Pond area must be positive".into()));
        }
        if !self.stocking_density.is_finite() || self.stocking_density <= 0.0 {
            return Err(CoreError::ValidationError(
                "Stocking density must be positive".into(),
            ));
        }
        for (label, value) in [
            ("Catfish type", &self.catfish_type),
            ("Feed type", &self.feed_type),
            ("Water source", &self.water_source),
            ("Current health status", &self.current_health_status),
        ] {
            if value.trim().is_empty() {
                return Err(CoreError::ValidationError(format!("{label} must not be empty")));
            }
        }
        Ok(())
    }
}

/// The parts of a care-tips request that cannot be read from farm records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FarmProfile {
    pub catfish_type: String,
    pub stocking_density: f64,
    pub feed_type: String,
    pub water_source: String,
    #[serde(default)]
    pub disease_history: String,
    pub current_health_status: String,
}

/// Free-text advice returned by the advisory model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CareTips {
    pub care_tips: String,
}

/// Result of a photo-based health check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnosis {
    /// Whether the photo shows a catfish at all
    pub is_catfish: bool,

    /// Disease name, "Sehat" when healthy, "Tidak teridentifikasi" when not a catfish
    pub disease: String,

    /// What was observed in the photo
    pub diagnosis: String,

    /// Short actionable advice
    pub recommendation: String,
}

/// An image passed as `data:<mime>;base64,<payload>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageDataUri {
    pub mime_type: String,
    pub data: String,
}

impl ImageDataUri {
    pub fn parse(uri: &str) -> Result<Self, CoreError> {
        let invalid = |why: &str| CoreError::ValidationError(format!("Invalid image data URI: {why}"));

        let rest = uri
            .trim()
            .strip_prefix("data:")
            .ok_or_else(|| invalid("missing `data:` prefix"))?;
        let (mime_type, data) = rest
            .split_once(";base64,")
            .ok_or_else(|| invalid("expected `;base64,` encoding"))?;

        if !mime_type.starts_with("image/") || mime_type.len() <= "image/".len() {
            return Err(invalid("MIME type must be image/*"));
        }
        if data.is_empty() {
            return Err(invalid("empty payload"));
        }
        let valid_base64 = data
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'/' | b'='));
        if !valid_base64 {
            return Err(invalid("payload is not base64"));
        }

        Ok(Self {
            mime_type: mime_type.to_string(),
            data: data.to_string(),
        })
    }

    pub fn to_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}
