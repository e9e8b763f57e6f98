//! txhook: Shopify transaction webhook receiver.
//!
//! Main entry point. Loads configuration, connects to PostgreSQL, serves
//! the webhook endpoints and closes the pool after graceful shutdown.

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use tracing::{error, info, warn};
use txhook_api::{start_server, AppState, Config};
use txhook_core::Storage;

const MAX_CONNECT_ATTEMPTS: u32 = 5;
const CONNECT_RETRY_DELAY: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    info!("Starting txhook transaction webhook receiver");

    let config = Config::load()?;
    info!(
        database_url = %config.database_url_masked(),
        environment = %config.app_env,
        max_connections = config.database_max_connections,
        acquire_timeout_secs = config.database_connection_timeout,
        "Configuration loaded"
    );

    let verifier = config.verifier();
    if !verifier.is_configured() {
        error!("SHOPIFY_WEBHOOK_SECRET is not set; every webhook will be rejected with 500");
    }

    let pool = create_database_pool(&config).await?;
    info!("Database connection pool established");

    let state = AppState::new(Arc::new(Storage::new(pool.clone())), Arc::new(verifier))
        .with_settings(config.ingest_settings()?);
    let addr = config.parse_server_addr()?;

    info!(addr = %addr, "txhook is ready to receive webhooks");
    let served = start_server(state, addr).await;

    pool.close().await;
    info!("Database connections closed");

    served.context("HTTP server failed")?;
    info!("txhook shutdown complete");
    Ok(())
}

/// Initializes tracing with environment-based configuration.
fn init_tracing() {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,txhook=debug,tower_http=debug"));

    let fmt_layer = fmt::layer().with_target(true).with_file(true).with_line_number(true);

    tracing_subscriber::registry().with(filter).with(fmt_layer).init();
}

/// Creates the database connection pool, retrying while the server comes up.
async fn create_database_pool(config: &Config) -> Result<sqlx::PgPool> {
    let options = config.connect_options()?;
    let mut attempt = 1;

    loop {
        match config.pool_options().connect_with(options.clone()).await {
            Ok(pool) => {
                sqlx::query("SELECT 1")
                    .execute(&pool)
                    .await
                    .context("Failed to verify database connection")?;

                return Ok(pool);
            },
            Err(e) if attempt < MAX_CONNECT_ATTEMPTS => {
                warn!(
                    attempt,
                    max_attempts = MAX_CONNECT_ATTEMPTS,
                    error = %e,
                    "Database connection failed, retrying"
                );
                attempt += 1;
                tokio::time::sleep(CONNECT_RETRY_DELAY).await;
            },
            Err(e) => {
                return Err(e).context("Failed to create database connection pool after retries");
            },
        }
    }
}
