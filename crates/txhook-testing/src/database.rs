//! PostgreSQL test databases.
//!
//! Each `TestDatabase` owns a freshly created schema with the `transactions`
//! table, selected through `search_path` on every pooled connection, so
//! tests can run in parallel against one server without seeing each other's
//! rows. The server comes from `TEST_DATABASE_URL` only; the service's own
//! `DATABASE_URL` is never touched. Tests that need a server are marked
//! `#[ignore]` and run with `cargo test -- --ignored`.

use std::{str::FromStr, time::Duration};

use anyhow::{Context, Result};
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    PgPool,
};
use tracing::debug;
use txhook_core::{storage::transactions::SCHEMA, Storage};
use uuid::Uuid;

/// Isolated schema on the test server.
#[derive(Debug)]
pub struct TestDatabase {
    pool: PgPool,
    options: PgConnectOptions,
    schema: String,
}

const TEST_DATABASE_URL: &str = "TEST_DATABASE_URL";

fn database_url() -> Result<String> {
    std::env::var(TEST_DATABASE_URL)
        .ok()
        .filter(|url| !url.trim().is_empty())
        .with_context(|| format!("{TEST_DATABASE_URL} environment variable is required"))
}

impl TestDatabase {
    /// Creates an isolated schema on the `TEST_DATABASE_URL` server.
    ///
    /// # Errors
    ///
    /// Returns error if `TEST_DATABASE_URL` is unset, the server cannot be
    /// reached, or the schema cannot be created.
    pub async fn from_env() -> Result<Self> {
        let url = database_url()?;

        let base = PgConnectOptions::from_str(&url).context("failed to parse test database URL")?;
        let schema = format!("txhook_test_{}", Uuid::new_v4().simple());

        let admin = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(5))
            .connect_with(base.clone())
            .await
            .context("failed to connect to test database")?;
        sqlx::query(&format!("CREATE SCHEMA {schema}"))
            .execute(&admin)
            .await
            .with_context(|| format!("failed to create schema {schema}"))?;
        admin.close().await;

        let options = base.options([("search_path", schema.as_str())]);
        let pool = pool_for(&options, 5, Duration::from_secs(5)).await?;
        sqlx::query(SCHEMA).execute(&pool).await.context("failed to create transactions table")?;

        debug!(schema = %schema, "created test schema");
        Ok(Self { pool, options, schema })
    }

    /// Storage over this schema.
    pub fn storage(&self) -> Storage {
        Storage::new(self.pool.clone())
    }

    /// Opens a second pool on the same schema with the given limits, for
    /// exercising pool exhaustion.
    ///
    /// # Errors
    ///
    /// Returns error if the pool cannot connect.
    pub async fn constrained_pool(
        &self,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<PgPool> {
        pool_for(&self.options, max_connections, acquire_timeout).await
    }

    /// Drops the schema and closes the pool.
    ///
    /// # Errors
    ///
    /// Returns error if the schema cannot be dropped.
    pub async fn cleanup(self) -> Result<()> {
        sqlx::query(&format!("DROP SCHEMA IF EXISTS {} CASCADE", self.schema))
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to drop schema {}", self.schema))?;
        self.pool.close().await;
        Ok(())
    }
}

async fn pool_for(
    options: &PgConnectOptions,
    max_connections: u32,
    acquire_timeout: Duration,
) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .min_connections(0)
        .acquire_timeout(acquire_timeout)
        .connect_with(options.clone())
        .await
        .context("failed to create test pool")
}
