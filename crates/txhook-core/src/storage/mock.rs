//! In-memory transaction store for tests.
//!
//! Mirrors the upsert semantics of the PostgreSQL repository (one row per
//! id, last writer wins, `received_at` preserved) without a database, and
//! lets tests inject persistence failures.

use std::{collections::HashMap, future::Future, pin::Pin, sync::Arc};

use chrono::Utc;
use tokio::sync::RwLock;

use super::TransactionStore;
use crate::{
    error::{CoreError, Result},
    models::{PersistedTransaction, TransactionId, TransactionRecord},
};

/// Mock store keeping rows in a map keyed by transaction id.
///
/// Cloning shares state, so a test can keep one handle for assertions and
/// give another to the router.
#[derive(Clone, Default)]
pub struct MockTransactionStore {
    rows: Arc<RwLock<HashMap<TransactionId, PersistedTransaction>>>,
    upsert_calls: Arc<RwLock<usize>>,
    upsert_error: Arc<RwLock<Option<CoreError>>>,
    health_error: Arc<RwLock<Option<CoreError>>>,
}

impl MockTransactionStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next upsert fail with `error`. Later upserts succeed.
    pub async fn inject_upsert_error(&self, error: CoreError) {
        *self.upsert_error.write().await = Some(error);
    }

    /// Makes every health check fail with `error` until cleared.
    pub async fn set_health_error(&self, error: Option<CoreError>) {
        *self.health_error.write().await = error;
    }

    /// Returns the stored row for `id`, if any.
    pub async fn get(&self, id: &TransactionId) -> Option<PersistedTransaction> {
        self.rows.read().await.get(id).cloned()
    }

    /// Returns the number of stored rows.
    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    /// Returns whether no rows are stored.
    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }

    /// Returns how many upserts were attempted, including failed ones.
    pub async fn upsert_calls(&self) -> usize {
        *self.upsert_calls.read().await
    }
}

impl TransactionStore for MockTransactionStore {
    fn upsert(
        &self,
        record: TransactionRecord,
    ) -> Pin<Box<dyn Future<Output = Result<PersistedTransaction>> + Send + '_>> {
        Box::pin(async move {
            *self.upsert_calls.write().await += 1;

            if let Some(error) = self.upsert_error.write().await.take() {
                return Err(error);
            }

            let now = Utc::now();
            let mut rows = self.rows.write().await;
            let received_at = rows.get(&record.id).map_or(now, |existing| existing.received_at);

            let row = PersistedTransaction {
                id: record.id.clone(),
                order_id: record.order_id,
                kind: record.kind,
                gateway: record.gateway,
                status: record.status,
                message: record.message,
                created_at: record.created_at,
                test: record.test,
                authorization: record.authorization,
                location_id: record.location_id,
                user_id: record.user_id,
                parent_id: record.parent_id,
                processed_at: record.processed_at,
                device_id: record.device_id,
                error_code: record.error_code,
                source_name: record.source_name,
                amount: record.amount,
                currency: record.currency,
                payment_id: record.payment_id,
                manual_payment_gateway: record.manual_payment_gateway,
                admin_graphql_api_id: record.admin_graphql_api_id,
                webhook: record.webhook,
                received_at,
                updated_at: now,
            };

            rows.insert(record.id, row.clone());
            Ok(row)
        })
    }

    fn health_check(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            match self.health_error.read().await.clone() {
                Some(error) => Err(error),
                None => Ok(()),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn record(body: serde_json::Value) -> TransactionRecord {
        TransactionRecord::from_value(body).unwrap()
    }

    #[tokio::test]
    async fn upsert_replaces_existing_row() {
        let store = MockTransactionStore::new();

        let first = store.upsert(record(json!({ "id": "t1", "status": "pending" }))).await.unwrap();
        let second = store.upsert(record(json!({ "id": "t1", "status": "success" }))).await.unwrap();

        assert_eq!(store.len().await, 1);
        assert_eq!(second.status.as_deref(), Some("success"));
        assert_eq!(second.received_at, first.received_at);
        assert!(second.updated_at >= first.updated_at);
    }

    #[tokio::test]
    async fn injected_error_fails_only_the_next_upsert() {
        let store = MockTransactionStore::new();
        store.inject_upsert_error(CoreError::PoolExhausted).await;

        let err = store.upsert(record(json!({ "id": "t1" }))).await.unwrap_err();
        assert_eq!(err, CoreError::PoolExhausted);
        assert!(store.is_empty().await);

        store.upsert(record(json!({ "id": "t1" }))).await.unwrap();
        assert_eq!(store.len().await, 1);
        assert_eq!(store.upsert_calls().await, 2);
    }

    #[tokio::test]
    async fn health_error_is_reported_until_cleared() {
        let store = MockTransactionStore::new();
        store.set_health_error(Some(CoreError::Unavailable)).await;
        assert!(store.health_check().await.is_err());

        store.set_health_error(None).await;
        assert!(store.health_check().await.is_ok());
    }
}
