// ═══════════════════════════════════════════════════════════════════
// Error Tests: CoreError / StoreError display, sources, From impls
// ═══════════════════════════════════════════════════════════════════

use std::error::Error;

use farm_data_core::errors::CoreError;
use farm_data_core::storage::traits::StoreError;

// ── Display formatting ──────────────────────────────────────────────

mod display {
    use super::*;

    #[test]
    fn seed_failure() {
        let err = CoreError::SeedFailure(StoreError::Unavailable("offline".into()));
        assert_eq!(err.to_string(), "Seeding failed: store unavailable: offline");
    }

    #[test]
    fn subscription_failure() {
        let err = CoreError::SubscriptionFailure {
            collection: "transactions".into(),
            source: StoreError::FailedPrecondition("index on date required".into()),
        };
        assert_eq!(
            err.to_string(),
            "Subscription to transactions failed: failed precondition: index on date required"
        );
    }

    #[test]
    fn storage_write() {
        let err = CoreError::StorageWrite {
            operation: "replace",
            collection: "feedingSchedules".into(),
            source: StoreError::PermissionDenied("read-only".into()),
        };
        assert_eq!(
            err.to_string(),
            "Storage write failed (replace on feedingSchedules): permission denied: read-only"
        );
    }

    #[test]
    fn disposed() {
        assert_eq!(
            CoreError::Disposed.to_string(),
            "Farm data was disposed before it became ready"
        );
    }

    #[test]
    fn validation_error() {
        let err = CoreError::ValidationError("Pond name must not be empty".into());
        assert_eq!(err.to_string(), "Validation failed: Pond name must not be empty");
    }

    #[test]
    fn api_error() {
        let err = CoreError::Api {
            provider: "Gemini".into(),
            message: "HTTP 429: quota".into(),
        };
        assert_eq!(err.to_string(), "API error (Gemini): HTTP 429: quota");
    }

    #[test]
    fn config_and_logging() {
        assert_eq!(
            CoreError::Config("bad".into()).to_string(),
            "Configuration error: bad"
        );
        assert_eq!(
            CoreError::Logging("twice".into()).to_string(),
            "Logging setup failed: twice"
        );
    }

    #[test]
    fn store_error_keys() {
        let err = StoreError::NotFound {
            collection: "ponds".into(),
            id: "abc".into(),
        };
        assert_eq!(err.to_string(), "document not found: ponds/abc");
        let err = StoreError::AlreadyExists {
            collection: "_metadata".into(),
            id: "seed".into(),
        };
        assert_eq!(err.to_string(), "document already exists: _metadata/seed");
    }
}

// ── Error sources ───────────────────────────────────────────────────

mod sources {
    use super::*;

    #[test]
    fn store_cause_is_chained() {
        let err = CoreError::StorageWrite {
            operation: "delete",
            collection: "ponds".into(),
            source: StoreError::Internal("disk".into()),
        };
        let source = err.source().unwrap();
        assert_eq!(source.to_string(), "internal store error: disk");
    }

    #[test]
    fn validation_has_no_source() {
        assert!(CoreError::ValidationError("x".into()).source().is_none());
    }
}

// ── From impls ──────────────────────────────────────────────────────

mod from_impls {
    use super::*;

    #[test]
    fn from_io_error_is_config() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "settings.json missing");
        let err: CoreError = io.into();
        assert!(matches!(err, CoreError::Config(ref m) if m.contains("settings.json missing")));
    }

    #[test]
    fn from_serde_json_error_is_deserialization() {
        let json_err = serde_json::from_str::<serde_json::Value>("{ nope").unwrap_err();
        let err: CoreError = json_err.into();
        assert!(matches!(err, CoreError::Deserialization(_)));
    }
}

// ── Trait bounds ────────────────────────────────────────────────────

mod std_error {
    use super::*;

    #[test]
    fn errors_are_send_sync_and_static() {
        fn assert_bounds<T: Error + Send + Sync + 'static>() {}
        assert_bounds::<CoreError>();
        assert_bounds::<StoreError>();
    }

    #[test]
    fn store_error_is_cloneable_and_comparable() {
        let a = StoreError::Unavailable("x".into());
        assert_eq!(a.clone(), a);
    }
}
