//! Transaction webhook handler.
//!
//! Verifies the signature over the exact body bytes, parses the body into a
//! `TransactionRecord` and upserts it. Each step short-circuits: nothing is
//! parsed before the signature passes and nothing is written before the
//! body parses.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};
use txhook_core::{PersistedTransaction, TransactionId, TransactionRecord};

use crate::{error::IngestError, AppState};

/// Response from successful ingestion.
#[derive(Debug, Serialize)]
pub struct ReceiptResponse {
    /// Always `"received"`.
    pub status: &'static str,
    /// Id of the stored transaction.
    pub id: TransactionId,
}

/// Receives a Shopify transaction webhook.
///
/// # Errors
///
/// Returns appropriate HTTP status codes:
/// - 400: Body is not a transaction object
/// - 401: Signature missing or not matching the body
/// - 500: Secret not configured, or persistence failed
#[instrument(
    name = "receive_transaction",
    skip(state, headers, body),
    fields(body_bytes = body.len())
)]
pub async fn receive_transaction(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    match ingest_transaction(&state, &headers, &body).await {
        Ok(row) => {
            info!(
                transaction_id = %row.id,
                received_at = %row.received_at,
                updated_at = %row.updated_at,
                "Transaction stored"
            );
            (StatusCode::OK, Json(ReceiptResponse { status: "received", id: row.id }))
                .into_response()
        },
        Err(err) => {
            report(&err);
            err.into_response()
        },
    }
}

/// Runs verification, parsing and persistence for one webhook body.
///
/// # Errors
///
/// Returns the first failing step as an `IngestError`.
pub async fn ingest_transaction(
    state: &AppState,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<PersistedTransaction, IngestError> {
    let signature = headers.get(&state.settings.signature_header).and_then(|v| v.to_str().ok());

    state.verifier.verify(body, signature)?;
    debug!("Webhook signature verified");

    let record = TransactionRecord::from_slice(body)?;
    info!(
        transaction_id = %record.id,
        order_id = record.order_id.as_deref().unwrap_or("none"),
        amount = ?record.amount,
        kind = record.kind.as_deref().unwrap_or("none"),
        status = record.status.as_deref().unwrap_or("none"),
        "Received transaction webhook"
    );

    let row = state.store.upsert(record).await?;
    Ok(row)
}

fn report(err: &IngestError) {
    match err {
        IngestError::Configuration => {
            error!(code = err.code(), "SHOPIFY_WEBHOOK_SECRET not configured, rejecting webhook");
        },
        IngestError::Authentication(reason) => {
            warn!(code = err.code(), reason = %reason, "Webhook signature rejected");
        },
        IngestError::MalformedPayload(reason) => {
            warn!(code = err.code(), reason = %reason, "Webhook body rejected");
        },
        IngestError::Persistence(cause) => {
            error!(code = err.code(), error = %cause, "Failed to store transaction");
        },
    }
}
