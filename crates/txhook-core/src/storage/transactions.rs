//! Repository for the `transactions` table.
//!
//! Owns the single upsert statement the service issues. Every write is one
//! `INSERT ... ON CONFLICT (id) DO UPDATE` so redelivered webhooks replace
//! the stored row instead of duplicating it.

use std::sync::Arc;

use sqlx::{types::Json, PgPool};

use crate::{
    error::Result,
    models::{PersistedTransaction, TransactionId, TransactionRecord},
};

/// DDL for the `transactions` table.
///
/// The service never applies this itself; it is here so test harnesses and
/// operators share one definition of the columns the upsert writes.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS transactions (
    id TEXT PRIMARY KEY,
    order_id TEXT,
    kind TEXT,
    gateway TEXT,
    status TEXT,
    message TEXT,
    created_at TIMESTAMPTZ,
    test BOOLEAN,
    "authorization" TEXT,
    location_id TEXT,
    user_id TEXT,
    parent_id TEXT,
    processed_at TIMESTAMPTZ,
    device_id TEXT,
    error_code TEXT,
    source_name TEXT,
    amount DOUBLE PRECISION,
    currency TEXT,
    payment_id TEXT,
    manual_payment_gateway TEXT,
    admin_graphql_api_id TEXT,
    webhook JSONB NOT NULL,
    received_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

const RETURNING_COLUMNS: &str = r#"
    id, order_id, kind, gateway, status, message, created_at, test, "authorization",
    location_id, user_id, parent_id, processed_at, device_id, error_code, source_name,
    amount, currency, payment_id, manual_payment_gateway, admin_graphql_api_id, webhook,
    received_at, updated_at
"#;

/// Repository for transaction rows.
pub struct Repository {
    pool: Arc<PgPool>,
}

impl Repository {
    /// Creates a new repository instance.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Returns a reference to the database pool.
    pub fn pool(&self) -> Arc<PgPool> {
        self.pool.clone()
    }

    /// Inserts a transaction or replaces every mutable column of the row
    /// with the same id, returning the row as stored.
    ///
    /// `received_at` is kept from the first write; `updated_at` moves on
    /// every write. The statement borrows one pooled connection and hands it
    /// back when it completes or fails.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::PoolExhausted` when no connection is available
    /// within the pool's acquire timeout, and another `CoreError` for any
    /// other database failure. Nothing is retried.
    pub async fn upsert(&self, record: &TransactionRecord) -> Result<PersistedTransaction> {
        let statement = format!(
            r#"
            INSERT INTO transactions (
                id, order_id, kind, gateway, status, message, created_at, test, "authorization",
                location_id, user_id, parent_id, processed_at, device_id, error_code, source_name,
                amount, currency, payment_id, manual_payment_gateway, admin_graphql_api_id, webhook
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11,
                $12, $13, $14, $15, $16, $17, $18, $19, $20, $21, $22
            )
            ON CONFLICT (id) DO UPDATE SET
                order_id = EXCLUDED.order_id,
                kind = EXCLUDED.kind,
                gateway = EXCLUDED.gateway,
                status = EXCLUDED.status,
                message = EXCLUDED.message,
                created_at = EXCLUDED.created_at,
                test = EXCLUDED.test,
                "authorization" = EXCLUDED."authorization",
                location_id = EXCLUDED.location_id,
                user_id = EXCLUDED.user_id,
                parent_id = EXCLUDED.parent_id,
                processed_at = EXCLUDED.processed_at,
                device_id = EXCLUDED.device_id,
                error_code = EXCLUDED.error_code,
                source_name = EXCLUDED.source_name,
                amount = EXCLUDED.amount,
                currency = EXCLUDED.currency,
                payment_id = EXCLUDED.payment_id,
                manual_payment_gateway = EXCLUDED.manual_payment_gateway,
                admin_graphql_api_id = EXCLUDED.admin_graphql_api_id,
                webhook = EXCLUDED.webhook,
                updated_at = NOW()
            RETURNING {RETURNING_COLUMNS}
            "#
        );

        let row = sqlx::query_as::<_, PersistedTransaction>(&statement)
            .bind(&record.id)
            .bind(&record.order_id)
            .bind(&record.kind)
            .bind(&record.gateway)
            .bind(&record.status)
            .bind(&record.message)
            .bind(record.created_at)
            .bind(record.test)
            .bind(&record.authorization)
            .bind(&record.location_id)
            .bind(&record.user_id)
            .bind(&record.parent_id)
            .bind(record.processed_at)
            .bind(&record.device_id)
            .bind(&record.error_code)
            .bind(&record.source_name)
            .bind(record.amount)
            .bind(&record.currency)
            .bind(&record.payment_id)
            .bind(&record.manual_payment_gateway)
            .bind(&record.admin_graphql_api_id)
            .bind(Json(&record.webhook))
            .fetch_one(&*self.pool)
            .await?;

        Ok(row)
    }

    /// Finds a stored transaction by id.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    pub async fn find_by_id(&self, id: &TransactionId) -> Result<Option<PersistedTransaction>> {
        let statement = format!("SELECT {RETURNING_COLUMNS} FROM transactions WHERE id = $1");

        let row = sqlx::query_as::<_, PersistedTransaction>(&statement)
            .bind(id)
            .fetch_optional(&*self.pool)
            .await?;

        Ok(row)
    }

    /// Counts rows stored under an id. Always 0 or 1 while the primary key
    /// holds.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    pub async fn count_by_id(&self, id: &TransactionId) -> Result<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM transactions WHERE id = $1")
            .bind(id)
            .fetch_one(&*self.pool)
            .await?;

        Ok(count)
    }
}
