//! Payload builders and signed request fixtures.

use std::sync::Arc;

use axum::{body::Body, http::Request};
use serde_json::{json, Map, Value};
use txhook_api::{
    crypto::{generate_signature, SHOPIFY_SIGNATURE_HEADER},
    AppState, HmacVerifier,
};
use txhook_core::TransactionStore;

/// Secret used by fixtures unless a test picks its own.
pub const TEST_SECRET: &str = "shpss_test_secret";

/// Builder for Shopify transaction payloads.
///
/// Unset fields are omitted from the JSON entirely, which is how Shopify
/// sends absent values for most of them.
#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    fields: Map<String, Value>,
}

impl TransactionBuilder {
    /// Starts a payload with only an id.
    pub fn new(id: impl Into<Value>) -> Self {
        let mut fields = Map::new();
        fields.insert("id".to_string(), id.into());
        Self { fields }
    }

    /// A realistic sale with every common field set.
    pub fn sale(id: impl Into<Value>) -> Self {
        Self::new(id)
            .field("order_id", 450_789_469)
            .field("kind", "sale")
            .field("gateway", "bogus")
            .field("status", "success")
            .field("message", "Bogus Gateway: Forced success")
            .field("created_at", "2024-03-14T11:02:33-04:00")
            .field("processed_at", "2024-03-14T11:02:33-04:00")
            .field("test", true)
            .field("authorization", "ch_1AtJu6CvMDbAB21U1xIaCYG4")
            .field("amount", "12.50")
            .field("currency", "USD")
            .field("source_name", "web")
            .field("admin_graphql_api_id", "gid://shopify/OrderTransaction/389404469")
    }

    /// Sets an arbitrary field.
    #[must_use]
    pub fn field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    /// Sets `order_id`.
    #[must_use]
    pub fn order_id(self, order_id: impl Into<Value>) -> Self {
        self.field("order_id", order_id)
    }

    /// Sets `amount`.
    #[must_use]
    pub fn amount(self, amount: impl Into<Value>) -> Self {
        self.field("amount", amount)
    }

    /// Sets `kind`.
    #[must_use]
    pub fn kind(self, kind: &str) -> Self {
        self.field("kind", kind)
    }

    /// Sets `status`.
    #[must_use]
    pub fn status(self, status: &str) -> Self {
        self.field("status", status)
    }

    /// Sets a field to JSON `null`.
    #[must_use]
    pub fn null(self, key: &str) -> Self {
        self.field(key, Value::Null)
    }

    /// Returns the payload as JSON.
    pub fn build(self) -> Value {
        Value::Object(self.fields)
    }

    /// Returns the payload serialized compactly.
    pub fn to_bytes(&self) -> Vec<u8> {
        json!(self.fields).to_string().into_bytes()
    }
}

/// POST request carrying `body` signed with `secret`.
///
/// # Panics
///
/// Panics if the request cannot be built.
pub fn signed_request(uri: &str, body: impl Into<Vec<u8>>, secret: &str) -> Request<Body> {
    let body = body.into();
    let signature = generate_signature(&body, secret).expect("HMAC accepts any key");
    request_with_signature(uri, body, Some(&signature))
}

/// POST request with an explicit signature header, or none.
///
/// # Panics
///
/// Panics if the request cannot be built.
pub fn request_with_signature(
    uri: &str,
    body: impl Into<Vec<u8>>,
    signature: Option<&str>,
) -> Request<Body> {
    let mut builder =
        Request::builder().method("POST").uri(uri).header("content-type", "application/json");
    if let Some(signature) = signature {
        builder = builder.header(SHOPIFY_SIGNATURE_HEADER, signature);
    }
    builder.body(Body::from(body.into())).expect("valid request")
}

/// Application state over `store` with default settings.
pub fn test_state(store: Arc<dyn TransactionStore>, secret: Option<&str>) -> AppState {
    let verifier = HmacVerifier::from_optional(secret.map(str::to_string));
    AppState::new(store, Arc::new(verifier))
}
