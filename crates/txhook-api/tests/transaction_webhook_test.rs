//! Router-level tests for the transaction webhook endpoints.
//!
//! Drives the full axum stack with `oneshot` against the in-memory store and
//! checks status codes, response bodies and what was (not) persisted.

use std::sync::Arc;

use anyhow::Result;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use txhook_api::{create_router, crypto::generate_signature, IngestSettings};
use txhook_core::{CoreError, MockTransactionStore, TransactionId};
use txhook_testing::{
    request_with_signature, signed_request, test_state, TransactionBuilder, TEST_SECRET,
};

const PATH: &str = "/webhooks/transactions";

fn router(store: &MockTransactionStore, secret: Option<&str>) -> Router {
    create_router(test_state(Arc::new(store.clone()), secret))
}

async fn json_body(response: axum::response::Response) -> Result<Value> {
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[tokio::test]
async fn signed_transaction_is_stored() -> Result<()> {
    let store = MockTransactionStore::new();
    let body = TransactionBuilder::new("t1")
        .order_id("o1")
        .amount("12.50")
        .kind("sale")
        .status("success")
        .to_bytes();

    let response = router(&store, Some(TEST_SECRET))
        .oneshot(signed_request(PATH, body, TEST_SECRET))
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(json_body(response).await?, json!({ "status": "received", "id": "t1" }));

    let row = store.get(&TransactionId::from("t1")).await.expect("row stored");
    assert_eq!(row.order_id.as_deref(), Some("o1"));
    assert_eq!(row.amount, Some(12.5));
    assert_eq!(row.kind.as_deref(), Some("sale"));
    assert_eq!(row.status.as_deref(), Some("success"));
    assert_eq!(row.webhook["amount"], json!("12.50"));
    Ok(())
}

#[tokio::test]
async fn legacy_path_is_served() -> Result<()> {
    let store = MockTransactionStore::new();
    let body = TransactionBuilder::sale(389_404_469u64).to_bytes();

    let response = router(&store, Some(TEST_SECRET))
        .oneshot(signed_request("/api/webhook-transaction", body, TEST_SECRET))
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(store.get(&TransactionId::from("389404469")).await.is_some());
    Ok(())
}

#[tokio::test]
async fn missing_signature_is_unauthorized() -> Result<()> {
    let store = MockTransactionStore::new();

    let response = router(&store, Some(TEST_SECRET))
        .oneshot(request_with_signature(PATH, TransactionBuilder::new("t1").to_bytes(), None))
        .await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await?;
    assert_eq!(body["error"]["code"], "E1002");
    assert!(store.is_empty().await);
    Ok(())
}

#[tokio::test]
async fn tampered_body_is_unauthorized() -> Result<()> {
    let store = MockTransactionStore::new();
    let original = TransactionBuilder::new("t1").amount("12.50").to_bytes();
    let tampered = TransactionBuilder::new("t1").amount("99.99").to_bytes();
    let stale = generate_signature(&original, TEST_SECRET)?;

    let response = router(&store, Some(TEST_SECRET))
        .oneshot(request_with_signature(PATH, tampered, Some(&stale)))
        .await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await?;
    assert_eq!(body["error"]["code"], "E1001");
    assert!(!body.to_string().contains(&stale));
    assert_eq!(store.upsert_calls().await, 0);
    Ok(())
}

#[tokio::test]
async fn signature_from_other_secret_is_unauthorized() -> Result<()> {
    let store = MockTransactionStore::new();

    let response = router(&store, Some(TEST_SECRET))
        .oneshot(signed_request(PATH, TransactionBuilder::new("t1").to_bytes(), "wrong_secret"))
        .await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(store.is_empty().await);
    Ok(())
}

#[tokio::test]
async fn missing_secret_is_server_error() -> Result<()> {
    let store = MockTransactionStore::new();
    let body = TransactionBuilder::new("t1").to_bytes();

    let response = router(&store, None).oneshot(signed_request(PATH, body, TEST_SECRET)).await?;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(response).await?;
    assert_eq!(body["error"]["code"], "E3003");
    assert_eq!(store.upsert_calls().await, 0);
    Ok(())
}

#[tokio::test]
async fn missing_secret_is_reported_before_missing_signature() -> Result<()> {
    let store = MockTransactionStore::new();

    let response = router(&store, None)
        .oneshot(request_with_signature(PATH, "{}", None))
        .await?;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    Ok(())
}

#[tokio::test]
async fn malformed_bodies_are_bad_requests() -> Result<()> {
    let store = MockTransactionStore::new();
    let app = router(&store, Some(TEST_SECRET));

    let cases: [&[u8]; 5] = [
        b"not json",
        b"[1,2,3]",
        br#"{"amount":"12.50"}"#,
        br#"{"id":"t1","amount":"twelve"}"#,
        br#"{"id":"t1","created_at":"yesterday"}"#,
    ];

    for body in cases {
        let response = app.clone().oneshot(signed_request(PATH, body, TEST_SECRET)).await?;
        assert_eq!(
            response.status(),
            StatusCode::BAD_REQUEST,
            "body {:?}",
            String::from_utf8_lossy(body)
        );
    }

    assert_eq!(store.upsert_calls().await, 0);
    Ok(())
}

#[tokio::test]
async fn structured_ids_report_invalid_id() -> Result<()> {
    let store = MockTransactionStore::new();
    let app = router(&store, Some(TEST_SECRET));

    for body in [br#"{"id":{"value":"t1"}}"#.as_slice(), br#"{"id":["t1"]}"#.as_slice()] {
        let response = app.clone().oneshot(signed_request(PATH, body, TEST_SECRET)).await?;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await?["error"]["code"], "E1004");
    }

    assert_eq!(store.upsert_calls().await, 0);
    Ok(())
}

#[tokio::test]
async fn oddly_typed_descriptive_fields_are_stored() -> Result<()> {
    let store = MockTransactionStore::new();
    let body = br#"{"id":"t1","location_id":{"id":5},"message":42,"test":"false","error_code":["card_declined"]}"#;

    let response = router(&store, Some(TEST_SECRET))
        .oneshot(signed_request(PATH, body.as_slice(), TEST_SECRET))
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let row = store.get(&TransactionId::from("t1")).await.expect("row stored");
    assert_eq!(row.location_id.as_deref(), Some(r#"{"id":5}"#));
    assert_eq!(row.message.as_deref(), Some("42"));
    assert_eq!(row.test, Some(false));
    assert_eq!(row.error_code.as_deref(), Some(r#"["card_declined"]"#));
    Ok(())
}

#[tokio::test]
async fn get_is_method_not_allowed() -> Result<()> {
    let store = MockTransactionStore::new();

    let request = Request::builder().method("GET").uri(PATH).body(Body::empty())?;
    let response = router(&store, Some(TEST_SECRET)).oneshot(request).await?;

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert!(store.is_empty().await);
    Ok(())
}

#[tokio::test]
async fn persistence_failure_is_server_error() -> Result<()> {
    let store = MockTransactionStore::new();
    store.inject_upsert_error(CoreError::PoolExhausted).await;

    let response = router(&store, Some(TEST_SECRET))
        .oneshot(signed_request(PATH, TransactionBuilder::new("t1").to_bytes(), TEST_SECRET))
        .await?;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(response).await?;
    assert_eq!(body["error"]["code"], "E3002");
    assert_eq!(body["error"]["message"], "Server error");
    assert!(store.is_empty().await);
    Ok(())
}

#[tokio::test]
async fn redelivery_replaces_stored_row() -> Result<()> {
    let store = MockTransactionStore::new();
    let app = router(&store, Some(TEST_SECRET));

    let pending = TransactionBuilder::new("t1").status("pending").amount("5.00").to_bytes();
    let success = TransactionBuilder::new("t1").status("success").to_bytes();

    let first = app.clone().oneshot(signed_request(PATH, pending, TEST_SECRET)).await?;
    let second = app.oneshot(signed_request(PATH, success, TEST_SECRET)).await?;

    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(store.len().await, 1);

    let row = store.get(&TransactionId::from("t1")).await.expect("row stored");
    assert_eq!(row.status.as_deref(), Some("success"));
    assert_eq!(row.amount, None);
    Ok(())
}

#[tokio::test]
async fn oversized_body_is_rejected_before_verification() -> Result<()> {
    let store = MockTransactionStore::new();
    let settings = IngestSettings { max_payload_bytes: 64, ..IngestSettings::default() };
    let app = create_router(
        test_state(Arc::new(store.clone()), Some(TEST_SECRET)).with_settings(settings),
    );

    let body = TransactionBuilder::new("t1").field("message", "x".repeat(256)).to_bytes();
    let response = app.oneshot(signed_request(PATH, body, TEST_SECRET)).await?;

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(store.upsert_calls().await, 0);
    Ok(())
}

#[tokio::test]
async fn custom_signature_header_is_honoured() -> Result<()> {
    let store = MockTransactionStore::new();
    let settings = IngestSettings {
        signature_header: "x-test-signature".parse()?,
        ..IngestSettings::default()
    };
    let app = create_router(
        test_state(Arc::new(store.clone()), Some(TEST_SECRET)).with_settings(settings),
    );

    let body = TransactionBuilder::new("t1").to_bytes();
    let signature = generate_signature(&body, TEST_SECRET)?;
    let request = Request::builder()
        .method("POST")
        .uri(PATH)
        .header("x-test-signature", signature)
        .body(Body::from(body))?;

    let response = app.oneshot(request).await?;

    assert_eq!(response.status(), StatusCode::OK);
    Ok(())
}
