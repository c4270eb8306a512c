use chrono::NaiveDate;
use serde_json::{json, Value};
use std::time::Duration;

use farm_data_core::errors::CoreError;
use farm_data_core::models::growth::{GrowthRecord, NewGrowthRecord};
use farm_data_core::models::pond::{NewPond, PondStatus};
use farm_data_core::models::transaction::{Transaction, TransactionType};
use farm_data_core::storage::codec::{decode_document, encode_fields, format_iso_date};
use farm_data_core::storage::memory::MemoryStore;
use farm_data_core::storage::traits::{
    Document, OrderBy, Query, RecordStore, StoreError, StoredDocument, Subscription, WriteBatch,
};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn doc(value: Value) -> Document {
    value.as_object().cloned().unwrap()
}

fn ids(docs: &[StoredDocument]) -> Vec<String> {
    docs.iter().map(|d| d.id.clone()).collect()
}

async fn next_snapshot(sub: &mut Subscription) -> Vec<StoredDocument> {
    tokio::time::timeout(Duration::from_secs(1), sub.next())
        .await
        .expect("snapshot in time")
        .expect("listener open")
        .expect("snapshot, not error")
}

// ═══════════════════════════════════════════════════════════════════
//  MemoryStore: single-document operations
// ═══════════════════════════════════════════════════════════════════

mod documents {
    use super::*;

    #[tokio::test]
    async fn create_assigns_unique_keys() {
        let store = MemoryStore::new();
        let a = store.create("ponds", doc(json!({"name": "A"}))).await.unwrap();
        let b = store.create("ponds", doc(json!({"name": "B"}))).await.unwrap();
        assert_ne!(a, b);
        assert!(!a.is_empty());
        assert_eq!(store.document_count("ponds"), 2);
    }

    #[tokio::test]
    async fn get_returns_created_fields() {
        let store = MemoryStore::new();
        let id = store.create("ponds", doc(json!({"name": "A"}))).await.unwrap();
        let found = store.get("ponds", &id).await.unwrap().unwrap();
        assert_eq!(found.id, id);
        assert_eq!(found.fields["name"], json!("A"));
        assert!(store.get("ponds", "missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_merges_fields() {
        let store = MemoryStore::new();
        let id = store
            .create("ponds", doc(json!({"name": "A", "area": 10})))
            .await
            .unwrap();
        store
            .update("ponds", &id, doc(json!({"area": 20})))
            .await
            .unwrap();
        let fields = store.get("ponds", &id).await.unwrap().unwrap().fields;
        assert_eq!(fields["name"], json!("A"));
        assert_eq!(fields["area"], json!(20));
    }

    #[tokio::test]
    async fn update_missing_is_not_found() {
        let store = MemoryStore::new();
        let err = store
            .update("ponds", "nope", doc(json!({"area": 1})))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            StoreError::NotFound {
                collection: "ponds".into(),
                id: "nope".into()
            }
        );
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = MemoryStore::new();
        let id = store.create("ponds", doc(json!({}))).await.unwrap();
        store.delete("ponds", &id).await.unwrap();
        store.delete("ponds", &id).await.unwrap();
        assert_eq!(store.document_count("ponds"), 0);
    }

    #[tokio::test]
    async fn fetch_orders_by_field() {
        let store = MemoryStore::new();
        for date in ["2024-06-15", "2024-06-01", "2024-06-20"] {
            store
                .create("transactions", doc(json!({ "date": date })))
                .await
                .unwrap();
        }
        let docs = store
            .fetch("transactions", &Query::ordered(OrderBy::desc("date")))
            .await
            .unwrap();
        let dates: Vec<&Value> = docs.iter().map(|d| &d.fields["date"]).collect();
        assert_eq!(dates, [&json!("2024-06-20"), &json!("2024-06-15"), &json!("2024-06-01")]);
    }

    #[tokio::test]
    async fn denied_collection_rejects_everything() {
        let store = MemoryStore::new();
        store.deny("ponds");
        assert!(matches!(
            store.create("ponds", doc(json!({}))).await,
            Err(StoreError::PermissionDenied(_))
        ));
        assert!(matches!(
            store.fetch("ponds", &Query::default()).await,
            Err(StoreError::PermissionDenied(_))
        ));
        assert!(store.subscribe("ponds", Query::default()).await.is_err());

        store.allow("ponds");
        assert!(store.create("ponds", doc(json!({}))).await.is_ok());
    }

    #[tokio::test]
    async fn injected_write_failure_applies_once() {
        let store = MemoryStore::new();
        store.fail_next_write(StoreError::Unavailable("offline".into()));
        assert!(store.create("ponds", doc(json!({}))).await.is_err());
        assert!(store.create("ponds", doc(json!({}))).await.is_ok());
        assert_eq!(store.write_calls(), 2);
        assert_eq!(store.document_count("ponds"), 1);
    }
}

// ═══════════════════════════════════════════════════════════════════
//  MemoryStore: batches
// ═══════════════════════════════════════════════════════════════════

mod batches {
    use super::*;

    #[tokio::test]
    async fn commit_applies_every_op() {
        let store = MemoryStore::new();
        let old = store.create("feedingSchedules", doc(json!({"time": "08:00"}))).await.unwrap();

        let mut batch = WriteBatch::new();
        batch
            .delete("feedingSchedules", &old)
            .create("feedingSchedules", doc(json!({"time": "06:00"})))
            .set("_metadata", "seed", doc(json!({"version": 1})));
        assert_eq!(batch.len(), 3);
        store.commit(batch).await.unwrap();

        let times: Vec<Value> = store
            .documents("feedingSchedules")
            .into_iter()
            .map(|d| d.fields["time"].clone())
            .collect();
        assert_eq!(times, [json!("06:00")]);
        assert_eq!(store.document_count("_metadata"), 1);
    }

    #[tokio::test]
    async fn failing_op_rolls_back_whole_batch() {
        let store = MemoryStore::new();
        store
            .commit({
                let mut b = WriteBatch::new();
                b.create_with_id("_metadata", "seed", doc(json!({})));
                b
            })
            .await
            .unwrap();

        let mut batch = WriteBatch::new();
        batch
            .create("ponds", doc(json!({"name": "A"})))
            .create_with_id("_metadata", "seed", doc(json!({})));
        let err = store.commit(batch).await.unwrap_err();

        assert!(matches!(err, StoreError::AlreadyExists { .. }));
        assert_eq!(store.document_count("ponds"), 0);
    }

    #[tokio::test]
    async fn injected_commit_failure_changes_nothing() {
        let store = MemoryStore::new();
        store.fail_next_commit(StoreError::Unavailable("offline".into()));
        let mut batch = WriteBatch::new();
        batch.create("ponds", doc(json!({})));
        assert!(store.commit(batch).await.is_err());
        assert_eq!(store.document_count("ponds"), 0);
    }

    #[tokio::test]
    async fn update_of_missing_document_fails_batch() {
        let store = MemoryStore::new();
        let mut batch = WriteBatch::new();
        batch
            .create("ponds", doc(json!({})))
            .update("ponds", "ghost", doc(json!({"name": "x"})));
        assert!(store.commit(batch).await.is_err());
        assert_eq!(store.document_count("ponds"), 0);
    }
}

// ═══════════════════════════════════════════════════════════════════
//  MemoryStore: live subscriptions
// ═══════════════════════════════════════════════════════════════════

mod subscriptions {
    use super::*;

    #[tokio::test]
    async fn initial_snapshot_then_full_collection_per_change() {
        let store = MemoryStore::new();
        let first = store.create("ponds", doc(json!({"name": "A"}))).await.unwrap();

        let mut sub = store.subscribe("ponds", Query::default()).await.unwrap();
        assert_eq!(ids(&next_snapshot(&mut sub).await), [first.clone()]);

        let second = store.create("ponds", doc(json!({"name": "B"}))).await.unwrap();
        assert_eq!(ids(&next_snapshot(&mut sub).await), [first, second]);
    }

    #[tokio::test]
    async fn ordered_subscription_reorders_on_change() {
        let store = MemoryStore::new();
        let mut sub = store
            .subscribe("growthRecords", Query::ordered(OrderBy::asc("date")))
            .await
            .unwrap();
        assert!(next_snapshot(&mut sub).await.is_empty());

        store.create("growthRecords", doc(json!({"date": "2024-02-15"}))).await.unwrap();
        next_snapshot(&mut sub).await;
        store.create("growthRecords", doc(json!({"date": "2024-01-15"}))).await.unwrap();

        let dates: Vec<Value> = next_snapshot(&mut sub)
            .await
            .into_iter()
            .map(|d| d.fields["date"].clone())
            .collect();
        assert_eq!(dates, [json!("2024-01-15"), json!("2024-02-15")]);
    }

    #[tokio::test]
    async fn other_collections_do_not_notify() {
        let store = MemoryStore::new();
        let mut sub = store.subscribe("ponds", Query::default()).await.unwrap();
        next_snapshot(&mut sub).await;

        store.create("transactions", doc(json!({}))).await.unwrap();
        let pending = tokio::time::timeout(Duration::from_millis(50), sub.next()).await;
        assert!(pending.is_err(), "no snapshot expected for an unrelated write");
    }

    #[tokio::test]
    async fn dropping_subscription_releases_listener() {
        let store = MemoryStore::new();
        let sub = store.subscribe("ponds", Query::default()).await.unwrap();
        let other = store.subscribe("transactions", Query::default()).await.unwrap();
        assert_eq!(store.listener_count(), 2);

        drop(sub);
        assert_eq!(store.listener_count(), 1);
        drop(other);
        assert_eq!(store.listener_count(), 0);
    }

    #[tokio::test]
    async fn broken_listener_yields_error_then_ends() {
        let store = MemoryStore::new();
        let mut sub = store.subscribe("ponds", Query::default()).await.unwrap();
        next_snapshot(&mut sub).await;

        store.break_listeners("ponds", StoreError::FailedPrecondition("index missing".into()));
        let event = sub.next().await.unwrap();
        assert_eq!(
            event.unwrap_err(),
            StoreError::FailedPrecondition("index missing".into())
        );
        assert!(sub.next().await.is_none());
        assert_eq!(store.listener_count(), 0);
    }
}

// ═══════════════════════════════════════════════════════════════════
//  Codec
// ═══════════════════════════════════════════════════════════════════

mod codec {
    use super::*;

    #[test]
    fn encode_strips_id_and_writes_iso_dates() {
        let record = GrowthRecord {
            id: "g1".into(),
            date: d(2024, 3, 15),
            average_weight: 273.0,
            notes: None,
        };
        let fields = encode_fields(&record).unwrap();
        assert!(!fields.contains_key("id"));
        assert_eq!(fields["date"], json!("2024-03-15"));
        assert_eq!(fields["notes"], Value::Null);
    }

    #[test]
    fn encode_draft() {
        let fields = encode_fields(&NewPond::new("Kolam A1", 100.0, 1500, PondStatus::Active)).unwrap();
        assert_eq!(
            Value::Object(fields),
            json!({"name": "Kolam A1", "area": 100.0, "fishCount": 1500, "status": "Aktif"})
        );
    }

    #[test]
    fn decode_injects_key_as_id() {
        let stored = StoredDocument::new(
            "tx-1",
            doc(json!({
                "date": "2024-06-15",
                "description": "Panen",
                "type": "Pemasukan",
                "amount": 7000000
            })),
        );
        let tx: Transaction = decode_document(&stored).unwrap();
        assert_eq!(tx.id, "tx-1");
        assert_eq!(tx.kind, TransactionType::Income);
        assert_eq!(tx.amount, 7_000_000.0);
    }

    #[test]
    fn decode_keeps_written_day_of_timestamps() {
        for raw in [
            "2024-03-15T00:00:00.000Z",
            "2024-03-15T23:59:59+07:00",
            "2024-03-15T00:30:00-08:00",
        ] {
            let stored = StoredDocument::new("g", doc(json!({"date": raw, "averageWeight": 1.0})));
            let record: GrowthRecord = decode_document(&stored).unwrap();
            assert_eq!(record.date, d(2024, 3, 15), "{raw}");
        }
    }

    #[test]
    fn decode_rejects_bad_date_naming_the_field() {
        let stored = StoredDocument::new("g9", doc(json!({"date": "yesterday", "averageWeight": 1.0})));
        let err = decode_document::<GrowthRecord>(&stored).unwrap_err();
        assert!(matches!(err, CoreError::Deserialization(_)));
        let msg = err.to_string();
        assert!(msg.contains("`date`"));
        assert!(msg.contains("growthRecords/g9"));
    }

    #[test]
    fn decode_rejects_non_string_date() {
        let stored = StoredDocument::new("g", doc(json!({"date": 20240315, "averageWeight": 1.0})));
        assert!(decode_document::<GrowthRecord>(&stored).is_err());
    }

    #[test]
    fn decode_rejects_unknown_enum_label() {
        let stored = StoredDocument::new(
            "t",
            doc(json!({"date": "2024-06-01", "description": "x", "type": "Income", "amount": 1})),
        );
        assert!(decode_document::<Transaction>(&stored).is_err());
    }

    #[test]
    fn draft_date_round_trips_through_store_format() {
        let draft = NewGrowthRecord::with_notes(d(2024, 3, 15), 273.0, "Pertumbuhan stabil");
        let stored = StoredDocument::new("g1", encode_fields(&draft).unwrap());
        let record: GrowthRecord = decode_document(&stored).unwrap();
        assert_eq!(format_iso_date(record.date), "2024-03-15");
        assert_eq!(record.notes.as_deref(), Some("Pertumbuhan stabil"));
    }
}
