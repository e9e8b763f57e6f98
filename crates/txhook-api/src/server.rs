//! HTTP server configuration and request routing.
//!
//! Requests flow through middleware in order:
//! 1. Request ID generation
//! 2. Request/response logging
//! 3. Timeout enforcement
//! 4. Panic recovery
//! 5. Body size limit (webhook routes only)
//! 6. Handler execution
//!
//! # Graceful Shutdown
//!
//! On SIGINT or SIGTERM the server stops accepting connections and waits for
//! in-flight requests before `start_server` returns. Closing the database
//! pool is left to the caller.

use std::net::SocketAddr;

use axum::{
    extract::{DefaultBodyLimit, Request},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use tower_http::{catch_panic::CatchPanicLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{handlers, AppState};

/// Primary webhook path.
pub const WEBHOOK_PATH: &str = "/webhooks/transactions";

/// Path the service was first deployed under; kept so existing Shopify
/// subscriptions keep working.
pub const LEGACY_WEBHOOK_PATH: &str = "/api/webhook-transaction";

/// Creates the Axum router with all routes and middleware.
///
/// Webhook paths accept `POST` only; other methods get 405 from the method
/// router. Bodies larger than `settings.max_payload_bytes` get 413 before
/// the handler runs.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
///
/// use txhook_api::{create_router, AppState, HmacVerifier};
/// use txhook_core::Storage;
///
/// async fn start(pool: sqlx::PgPool) {
///     let state = AppState::new(Arc::new(Storage::new(pool)), Arc::new(HmacVerifier::new("s")));
///     let app = create_router(state);
///     // Serve the app...
/// }
/// ```
pub fn create_router(state: AppState) -> Router {
    let health_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/live", get(handlers::liveness_check));

    let webhook_routes = Router::new()
        .route(WEBHOOK_PATH, post(handlers::receive_transaction))
        .route(LEGACY_WEBHOOK_PATH, post(handlers::receive_transaction))
        .layer(DefaultBodyLimit::max(state.settings.max_payload_bytes));

    Router::new()
        .merge(health_routes)
        .merge(webhook_routes)
        .layer(CatchPanicLayer::new())
        .layer(TimeoutLayer::new(state.settings.request_timeout))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(inject_request_id))
        .with_state(state)
}

/// Middleware to inject request ID into all responses.
async fn inject_request_id(mut req: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    req.extensions_mut().insert(request_id.clone());

    let mut response = next.run(req).await;

    if let Ok(header_value) = request_id.parse() {
        response.headers_mut().insert("X-Request-Id", header_value);
    }

    response
}

/// Starts the HTTP server with graceful shutdown support.
///
/// # Errors
///
/// Returns `std::io::Error` if the address cannot be bound or serving fails.
pub async fn start_server(state: AppState, addr: SocketAddr) -> Result<(), std::io::Error> {
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    info!("HTTP server listening on {}", actual_addr);

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    info!("HTTP server stopped gracefully");
    Ok(())
}

/// Waits for CTRL+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received CTRL+C, starting graceful shutdown");
        },
        () = terminate => {
            info!("Received SIGTERM, starting graceful shutdown");
        },
    }

    warn!("Waiting for in-flight webhooks to complete");
}
