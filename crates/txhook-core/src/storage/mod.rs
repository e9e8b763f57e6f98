//! Database access layer for transaction persistence.
//!
//! `Storage` wraps the shared connection pool and exposes the repositories.
//! Request handlers never see it directly: they depend on the
//! `TransactionStore` capability, which `Storage` implements for PostgreSQL
//! and `mock::MockTransactionStore` implements in memory for tests.

use std::{future::Future, pin::Pin, sync::Arc};

use sqlx::PgPool;

pub mod mock;
pub mod transactions;

use crate::{
    error::Result,
    models::{PersistedTransaction, TransactionRecord},
};

/// Persistence operations required by the webhook handler.
pub trait TransactionStore: Send + Sync + 'static {
    /// Inserts the record or replaces the stored row with the same id.
    ///
    /// Returns the row as persisted. Failures are returned as-is; callers
    /// must not assume anything was written.
    fn upsert(
        &self,
        record: TransactionRecord,
    ) -> Pin<Box<dyn Future<Output = Result<PersistedTransaction>> + Send + '_>>;

    /// Checks that the store can serve requests.
    fn health_check(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Container for repository instances sharing one connection pool.
#[derive(Clone)]
pub struct Storage {
    /// Repository for transaction rows.
    pub transactions: Arc<transactions::Repository>,
}

impl Storage {
    /// Creates a new storage instance with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        let pool = Arc::new(pool);

        Self { transactions: Arc::new(transactions::Repository::new(pool)) }
    }

    /// Performs a health check on the database connection.
    ///
    /// # Errors
    ///
    /// Returns `CoreError` if no connection can be acquired or the query
    /// fails.
    pub async fn health_check(&self) -> Result<()> {
        let _: (i32,) = sqlx::query_as("SELECT 1").fetch_one(&*self.transactions.pool()).await?;

        Ok(())
    }
}

impl TransactionStore for Storage {
    fn upsert(
        &self,
        record: TransactionRecord,
    ) -> Pin<Box<dyn Future<Output = Result<PersistedTransaction>> + Send + '_>> {
        Box::pin(async move { self.transactions.upsert(&record).await })
    }

    fn health_check(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move { Storage::health_check(self).await })
    }
}
