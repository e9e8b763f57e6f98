//! Request-level error type for the webhook endpoints.
//!
//! Every failure a handler can hit is one `IngestError` variant, and each
//! variant maps to exactly one status code at the response boundary. Bodies
//! carry a stable code from the error taxonomy and a generic message; the
//! secret, computed digests and database details stay in the logs.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use txhook_core::{CoreError, PayloadError};

use crate::crypto::{SignatureError, VerifyError};

/// Failure while ingesting a transaction webhook.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The service cannot verify webhooks, usually because no secret is
    /// configured.
    #[error("webhook secret is not configured")]
    Configuration,

    /// The signature was missing or did not match the body.
    #[error("authentication failed: {0}")]
    Authentication(SignatureError),

    /// The body is not a transaction object.
    #[error("malformed payload: {0}")]
    MalformedPayload(#[from] PayloadError),

    /// Persisting the transaction failed.
    #[error("persistence failed: {0}")]
    Persistence(#[from] CoreError),
}

impl From<VerifyError> for IngestError {
    fn from(err: VerifyError) -> Self {
        match err {
            VerifyError::MissingSecret | VerifyError::Signature(SignatureError::InvalidSecret) => {
                Self::Configuration
            },
            VerifyError::Signature(reason) => Self::Authentication(reason),
        }
    }
}

impl IngestError {
    /// Returns the HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Configuration | Self::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Authentication(_) => StatusCode::UNAUTHORIZED,
            Self::MalformedPayload(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Returns the error code from the taxonomy.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Configuration => "E3003",
            Self::Authentication(SignatureError::MissingSignature) => "E1002",
            Self::Authentication(_) => "E1001",
            Self::MalformedPayload(err) => err.code(),
            Self::Persistence(err) => err.code(),
        }
    }

    /// Message safe to return to the sender.
    pub fn public_message(&self) -> String {
        match self {
            Self::Configuration => "Server configuration error".to_string(),
            Self::Authentication(_) => "Webhook signature is not valid.".to_string(),
            Self::MalformedPayload(err) => err.to_string(),
            Self::Persistence(_) => "Server error".to_string(),
        }
    }
}

/// Error response with code and message.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error details including code and message
    pub error: ErrorDetail,
}

/// Detailed error information.
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    /// Error code from the taxonomy
    pub code: String,
    /// Human-readable error description
    pub message: String,
}

impl IntoResponse for IngestError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: ErrorDetail { code: self.code().to_string(), message: self.public_message() },
        };

        (self.status(), Json(body)).into_response()
    }
}
