//! HTTP surface of the transaction webhook receiver.
//!
//! Verifies Shopify signatures over the raw body, turns the payload into a
//! `TransactionRecord` and hands it to the injected `TransactionStore`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::{sync::Arc, time::Duration};

use axum::http::HeaderName;
use txhook_core::TransactionStore;

pub mod config;
pub mod crypto;
pub mod error;
pub mod handlers;
pub mod server;

pub use config::{Config, Environment};
pub use crypto::{HmacVerifier, WebhookVerifier};
pub use error::IngestError;
pub use server::{create_router, start_server};

/// Request-path settings derived from configuration.
#[derive(Debug, Clone)]
pub struct IngestSettings {
    /// Header carrying the webhook signature.
    pub signature_header: HeaderName,
    /// Largest accepted body in bytes; larger bodies get 413.
    pub max_payload_bytes: usize,
    /// Overall per-request deadline.
    pub request_timeout: Duration,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            signature_header: HeaderName::from_static(crypto::SHOPIFY_SIGNATURE_HEADER),
            max_payload_bytes: 1024 * 1024,
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// Persistence capability.
    pub store: Arc<dyn TransactionStore>,
    /// Signature verification capability.
    pub verifier: Arc<dyn WebhookVerifier>,
    /// Request-path settings.
    pub settings: IngestSettings,
}

impl AppState {
    /// Creates state with default settings.
    pub fn new(store: Arc<dyn TransactionStore>, verifier: Arc<dyn WebhookVerifier>) -> Self {
        Self { store, verifier, settings: IngestSettings::default() }
    }

    /// Replaces the request-path settings.
    #[must_use]
    pub fn with_settings(mut self, settings: IngestSettings) -> Self {
        self.settings = settings;
        self
    }
}
