use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::errors::CoreError;

/// Environment variable that overrides `advisor.apiKey`.
pub const ADVISOR_API_KEY_ENV: &str = "FARM_ADVISOR_API_KEY";

/// Runtime configuration for the farm data layer.
/// Every field has a default, so a partial (or empty) JSON object is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Whether `FarmData::start` runs the one-time seeding step.
    pub seed_on_start: bool,

    /// Backoff applied when a live subscription fails and is reopened.
    pub resubscribe: BackoffSettings,

    /// Advisory / diagnosis API access.
    pub advisor: AdvisorSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            seed_on_start: true,
            resubscribe: BackoffSettings::default(),
            advisor: AdvisorSettings::default(),
        }
    }
}

impl Settings {
    /// Parse settings from a JSON document and validate them.
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        let settings: Settings = serde_json::from_str(json)
            .map_err(|e| CoreError::Config(format!("Invalid settings JSON: {e}")))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a JSON file, then apply environment overrides.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            CoreError::Config(format!("Cannot read settings file `{}`: {e}", path.display()))
        })?;
        Ok(Self::from_json(&raw)?.with_env_overrides())
    }

    /// Replace the advisor key with `FARM_ADVISOR_API_KEY` when it is set and non-empty.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(key) = std::env::var(ADVISOR_API_KEY_ENV) {
            if !key.trim().is_empty() {
                self.advisor.api_key = Some(key);
            }
        }
        self
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        self.resubscribe.validate()?;
        self.advisor.validate()
    }
}

/// Capped exponential backoff: `initial × multiplier^attempt`, at most `max`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BackoffSettings {
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub multiplier: f64,
}

impl Default for BackoffSettings {
    fn default() -> Self {
        Self {
            initial_delay_ms: 500,
            max_delay_ms: 30_000,
            multiplier: 2.0,
        }
    }
}

impl BackoffSettings {
    /// Delay before reopening after `attempt` consecutive failures (0-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = i32::try_from(attempt).unwrap_or(i32::MAX);
        let scaled = self.initial_delay_ms as f64 * self.multiplier.powi(exp);
        let capped = if scaled.is_finite() {
            scaled.min(self.max_delay_ms as f64)
        } else {
            self.max_delay_ms as f64
        };
        Duration::from_millis(capped as u64)
    }

    fn validate(&self) -> Result<(), CoreError> {
        if self.initial_delay_ms == 0 {
            return Err(CoreError::Config("resubscribe.initialDelayMs must be > 0".into()));
        }
        if self.max_delay_ms < self.initial_delay_ms {
            return Err(CoreError::Config(
                "resubscribe.maxDelayMs must be >= resubscribe.initialDelayMs".into(),
            ));
        }
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(CoreError::Config("resubscribe.multiplier must be >= 1".into()));
        }
        Ok(())
    }
}

/// Connection settings for the generative advisory API.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AdvisorSettings {
    /// Base URL of the API, without trailing slash
    pub endpoint: String,

    /// Model identifier
    pub model: String,

    /// API key; usually supplied through `FARM_ADVISOR_API_KEY`
    pub api_key: Option<String>,

    /// Per-request timeout
    pub timeout_secs: u64,
}

impl Default for AdvisorSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-2.0-flash".to_string(),
            api_key: None,
            timeout_secs: 30,
        }
    }
}

impl AdvisorSettings {
    fn validate(&self) -> Result<(), CoreError> {
        if self.endpoint.trim().is_empty() {
            return Err(CoreError::Config("advisor.endpoint must not be empty".into()));
        }
        if self.model.trim().is_empty() {
            return Err(CoreError::Config("advisor.model must not be empty".into()));
        }
        if self.timeout_secs == 0 {
            return Err(CoreError::Config("advisor.timeoutSecs must be > 0".into()));
        }
        Ok(())
    }
}

// Keeps the API key out of logs.
impl std::fmt::Debug for AdvisorSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdvisorSettings")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}
