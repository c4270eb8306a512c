use thiserror::Error;

use crate::storage::traits::StoreError;

/// Unified error type for the entire farm-data-core library.
/// Every public function returns `Result<T, CoreError>`.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Synchronization (absorbed and logged, never surfaced by start) ──
    #[error("Seeding failed: {0}")]
    SeedFailure(#[source] StoreError),

    #[error("Subscription to {collection} failed: {source}")]
    SubscriptionFailure {
        collection: String,
        #[source]
        source: StoreError,
    },

    // ── Lifecycle ───────────────────────────────────────────────────
    #[error("Farm data was disposed before it became ready")]
    Disposed,

    // ── Mutations ───────────────────────────────────────────────────
    #[error("Storage write failed ({operation} on {collection}): {source}")]
    StorageWrite {
        operation: &'static str,
        collection: String,
        #[source]
        source: StoreError,
    },

    #[error("Validation failed: {0}")]
    ValidationError(String),

    // ── Documents / Config ──────────────────────────────────────────
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Logging setup failed: {0}")]
    Logging(String),

    // ── Advisory API / Network ──────────────────────────────────────
    #[error("API error ({provider}): {message}")]
    Api {
        provider: String,
        message: String,
    },

    #[error("Network error: {0}")]
    Network(String),
}

impl CoreError {
    /// Shorthand used by the mutation facade to wrap a store failure.
    pub(crate) fn write(operation: &'static str, collection: &str, source: StoreError) -> Self {
        CoreError::StorageWrite {
            operation,
            collection: collection.to_string(),
            source,
        }
    }
}

// ── Conversion helpers (From impls) ─────────────────────────────────

impl From<std::io::Error> for CoreError {
    fn from(e: std::io::Error) -> Self {
        CoreError::Config(e.to_string())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Deserialization(e.to_string())
    }
}

impl From<reqwest::Error> for CoreError {
    fn from(e: reqwest::Error) -> Self {
        // reqwest errors carry the full URL; query parameters may hold credentials.
        let msg = e.to_string();
        let sanitized = if let Some(idx) = msg.find('?') {
            format!("{}?<query redacted>", &msg[..idx])
        } else {
            msg
        };
        CoreError::Network(sanitized)
    }
}
