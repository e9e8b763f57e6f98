//! PostgreSQL-backed tests for the transaction repository.
//!
//! Each test provisions its own schema through `txhook-testing`. They need
//! `TEST_DATABASE_URL` and run with `cargo test -- --ignored`.

use std::time::Duration;

use anyhow::Result;
use serde_json::json;
use txhook_core::{
    CoreError, Storage, TransactionId, TransactionRecord, TransactionStore,
};
use txhook_testing::{TestDatabase, TransactionBuilder};

fn record(payload: serde_json::Value) -> TransactionRecord {
    TransactionRecord::from_value(payload).expect("valid payload")
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn upsert_inserts_and_returns_row() -> Result<()> {
    let db = TestDatabase::from_env().await?;
    let storage = db.storage();

    let row = storage
        .upsert(record(TransactionBuilder::sale("389404469").order_id("o1").build()))
        .await?;

    assert_eq!(row.id, TransactionId::from("389404469"));
    assert_eq!(row.order_id.as_deref(), Some("o1"));
    assert_eq!(row.amount, Some(12.5));
    assert_eq!(row.test, Some(true));
    assert_eq!(row.authorization.as_deref(), Some("ch_1AtJu6CvMDbAB21U1xIaCYG4"));
    assert_eq!(row.webhook["currency"], json!("USD"));
    assert!(row.created_at.is_some());

    db.cleanup().await
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn redelivery_keeps_one_row_with_latest_values() -> Result<()> {
    let db = TestDatabase::from_env().await?;
    let storage = db.storage();
    let id = TransactionId::from("t1");

    let first = storage
        .upsert(record(TransactionBuilder::new("t1").status("pending").amount("5.00").build()))
        .await?;
    let second =
        storage.upsert(record(TransactionBuilder::new("t1").status("success").build())).await?;

    assert_eq!(storage.transactions.count_by_id(&id).await?, 1);
    assert_eq!(second.status.as_deref(), Some("success"));
    assert_eq!(second.amount, None);
    assert_eq!(second.received_at, first.received_at);
    assert!(second.updated_at >= first.updated_at);

    let stored = storage.transactions.find_by_id(&id).await?.expect("row exists");
    assert_eq!(stored, second);

    db.cleanup().await
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn absent_optional_fields_persist_as_null() -> Result<()> {
    let db = TestDatabase::from_env().await?;
    let storage = db.storage();

    let row = storage
        .upsert(record(json!({ "id": "t2", "amount": "", "created_at": null })))
        .await?;

    assert_eq!(row.amount, None);
    assert_eq!(row.created_at, None);
    assert_eq!(row.processed_at, None);
    assert_eq!(row.test, None);
    assert_eq!(row.webhook, json!({ "id": "t2", "amount": "", "created_at": null }));

    db.cleanup().await
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn oddly_typed_fields_persist_as_text() -> Result<()> {
    let db = TestDatabase::from_env().await?;
    let storage = db.storage();

    let row = storage
        .upsert(record(json!({
            "id": "t4",
            "location_id": { "id": 5 },
            "message": 42,
            "test": "false",
            "error_code": ["card_declined"],
        })))
        .await?;

    assert_eq!(row.location_id.as_deref(), Some(r#"{"id":5}"#));
    assert_eq!(row.message.as_deref(), Some("42"));
    assert_eq!(row.test, Some(false));
    assert_eq!(row.error_code.as_deref(), Some(r#"["card_declined"]"#));
    assert_eq!(row.webhook["location_id"], json!({ "id": 5 }));

    db.cleanup().await
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn health_check_round_trips() -> Result<()> {
    let db = TestDatabase::from_env().await?;

    TransactionStore::health_check(&db.storage()).await?;

    db.cleanup().await
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn exhausted_pool_reports_pool_exhausted() -> Result<()> {
    let db = TestDatabase::from_env().await?;
    let pool = db.constrained_pool(1, Duration::from_millis(200)).await?;
    let storage = Storage::new(pool.clone());

    let held = pool.acquire().await?;
    let err = storage.upsert(record(json!({ "id": "t3" }))).await.unwrap_err();
    drop(held);

    assert_eq!(err, CoreError::PoolExhausted);
    assert_eq!(db.storage().transactions.count_by_id(&TransactionId::from("t3")).await?, 0);

    storage.upsert(record(json!({ "id": "t3" }))).await?;
    pool.close().await;

    db.cleanup().await
}
