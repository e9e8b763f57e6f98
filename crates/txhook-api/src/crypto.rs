//! Cryptographic utilities for webhook signature validation.
//!
//! Shopify signs each webhook with HMAC-SHA256 over the raw request body,
//! keyed by the app's shared secret, and sends the base64 digest in the
//! `X-Shopify-Hmac-Sha256` header. Verification must run on the body bytes
//! exactly as received: re-serializing the JSON, even to an equivalent
//! document, changes the digest.

use std::fmt;

use base64::{prelude::BASE64_STANDARD, Engine};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Header Shopify uses to carry the body signature.
pub const SHOPIFY_SIGNATURE_HEADER: &str = "x-shopify-hmac-sha256";

/// Signature validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SignatureError {
    /// Missing or empty signature header.
    #[error("signature header missing")]
    MissingSignature,
    /// Signature does not match the body.
    #[error("signature verification failed")]
    Mismatch,
    /// Secret cannot be used as an HMAC key.
    #[error("invalid secret key")]
    InvalidSecret,
}

/// Generates the base64 HMAC-SHA256 signature of `payload`.
///
/// # Errors
///
/// Returns `SignatureError::InvalidSecret` if the secret is rejected as an
/// HMAC key.
///
/// # Example
///
/// ```
/// use txhook_api::crypto::{generate_signature, verify};
///
/// let body = br#"{"id":"t1"}"#;
/// let signature = generate_signature(body, "shpss_secret").unwrap();
/// assert!(verify(body, Some(&signature), "shpss_secret"));
/// ```
pub fn generate_signature(payload: &[u8], secret: &str) -> Result<String, SignatureError> {
    let mut mac = keyed_mac(secret)?;
    mac.update(payload);
    Ok(BASE64_STANDARD.encode(mac.finalize().into_bytes()))
}

/// Checks a claimed signature against `payload`.
///
/// An absent or empty claim fails with `MissingSignature` before any digest
/// is computed. A claim that is not canonical base64 can never equal an
/// encoded digest and fails with `Mismatch`. The digest comparison itself is
/// constant-time.
///
/// # Errors
///
/// Returns the reason the signature was rejected.
pub fn check_signature(
    payload: &[u8],
    signature: Option<&str>,
    secret: &str,
) -> Result<(), SignatureError> {
    let signature = match signature {
        Some(signature) if !signature.is_empty() => signature,
        _ => return Err(SignatureError::MissingSignature),
    };

    let claimed = BASE64_STANDARD.decode(signature).map_err(|_| SignatureError::Mismatch)?;

    let mut mac = keyed_mac(secret)?;
    mac.update(payload);
    mac.verify_slice(&claimed).map_err(|_| SignatureError::Mismatch)
}

/// Returns whether `signature` is the valid signature of `payload`.
///
/// Missing and mismatched signatures both yield `false`; use
/// [`check_signature`] to tell them apart.
pub fn verify(payload: &[u8], signature: Option<&str>, secret: &str) -> bool {
    check_signature(payload, signature, secret).is_ok()
}

fn keyed_mac(secret: &str) -> Result<HmacSha256, SignatureError> {
    HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::InvalidSecret)
}

/// Failure modes of a `WebhookVerifier`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum VerifyError {
    /// No shared secret is configured. This is a server fault, not a
    /// rejection of the sender.
    #[error("webhook secret is not configured")]
    MissingSecret,
    /// The sender's signature was rejected.
    #[error(transparent)]
    Signature(#[from] SignatureError),
}

/// Authenticity check applied to every inbound webhook body.
pub trait WebhookVerifier: Send + Sync + 'static {
    /// Verifies `payload` against the claimed `signature`.
    ///
    /// # Errors
    ///
    /// Returns `VerifyError::MissingSecret` when the verifier cannot run at
    /// all, and `VerifyError::Signature` when the signature is rejected.
    fn verify(&self, payload: &[u8], signature: Option<&str>) -> Result<(), VerifyError>;
}

/// HMAC-SHA256 verifier holding the shared secret.
///
/// The secret is optional so the service can start without it; every
/// verification then fails with `MissingSecret` before hashing anything.
#[derive(Clone)]
pub struct HmacVerifier {
    secret: Option<String>,
}

impl HmacVerifier {
    /// Creates a verifier for the given secret. An empty secret counts as
    /// not configured.
    pub fn new(secret: impl Into<String>) -> Self {
        Self::from_optional(Some(secret.into()))
    }

    /// Creates a verifier from an optional secret.
    pub fn from_optional(secret: Option<String>) -> Self {
        Self { secret: secret.filter(|secret| !secret.is_empty()) }
    }

    /// Creates a verifier with no secret.
    pub fn unconfigured() -> Self {
        Self { secret: None }
    }

    /// Returns whether a secret is configured.
    pub fn is_configured(&self) -> bool {
        self.secret.is_some()
    }
}

impl fmt::Debug for HmacVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HmacVerifier")
            .field("secret", &self.secret.as_ref().map(|_| "[redacted]"))
            .finish()
    }
}

impl WebhookVerifier for HmacVerifier {
    fn verify(&self, payload: &[u8], signature: Option<&str>) -> Result<(), VerifyError> {
        let Some(secret) = self.secret.as_deref() else {
            return Err(VerifyError::MissingSecret);
        };

        check_signature(payload, signature, secret).map_err(VerifyError::from)
    }
}
