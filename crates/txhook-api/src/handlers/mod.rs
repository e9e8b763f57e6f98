//! HTTP request handlers.
//!
//! - `transactions` - Shopify transaction webhook ingestion
//! - `health` - health and liveness probes
//!
//! Failures are rendered through `IngestError`, so every error response has
//! the same `{"error": {"code", "message"}}` shape.

pub mod health;
pub mod transactions;

pub use health::{health_check, liveness_check};
pub use transactions::receive_transaction;
