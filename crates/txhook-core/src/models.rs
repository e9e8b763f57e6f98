//! Transaction domain models and strongly-typed identifiers.
//!
//! A Shopify transaction webhook arrives as loosely-typed JSON: ids may be
//! strings or integers, amounts are decimal strings, timestamps are ISO
//! strings, and descriptive fields occasionally carry nested objects. This module turns that document into a `TransactionRecord` with
//! every field coerced to the column type it is stored as, while keeping the
//! original document alongside for audit.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::PayloadError;

type PgDb = sqlx::Postgres;
type PgValueRef<'r> = sqlx::postgres::PgValueRef<'r>;
type PgTypeInfo = sqlx::postgres::PgTypeInfo;
type PgArgumentBuffer = sqlx::postgres::PgArgumentBuffer;
type EncodeResult =
    Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync + 'static>>;
type BoxDynError = sqlx::error::BoxDynError;

/// Strongly-typed transaction identifier.
///
/// Shopify transaction ids are 64-bit integers in the JSON payload but may
/// be forwarded as strings by proxies, so the id is normalised to its text
/// rendering. It is the conflict target of the upsert.
///
/// # Example
///
/// ```
/// use txhook_core::models::TransactionId;
/// let id = TransactionId::from("389404469");
/// assert_eq!(id.to_string(), "389404469");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(pub String);

impl TransactionId {
    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TransactionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for TransactionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl TryFrom<Value> for TransactionId {
    type Error = PayloadError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::String(text) if !text.trim().is_empty() => Ok(Self(text)),
            Value::Number(number) if number.is_u64() || number.is_i64() => {
                Ok(Self(number.to_string()))
            },
            _ => Err(PayloadError::InvalidId),
        }
    }
}

impl sqlx::Type<PgDb> for TransactionId {
    fn type_info() -> PgTypeInfo {
        <String as sqlx::Type<PgDb>>::type_info()
    }
}

impl<'r> sqlx::Decode<'r, PgDb> for TransactionId {
    fn decode(value: PgValueRef<'r>) -> Result<Self, BoxDynError> {
        let id = <String as sqlx::Decode<PgDb>>::decode(value)?;
        Ok(Self(id))
    }
}

impl sqlx::Encode<'_, PgDb> for TransactionId {
    fn encode_by_ref(&self, buf: &mut PgArgumentBuffer) -> EncodeResult {
        <String as sqlx::Encode<PgDb>>::encode_by_ref(&self.0, buf)
    }
}

/// Wire shape of the transaction webhook body.
///
/// Every field is taken as raw JSON so one oddly-typed descriptive field
/// cannot reject the whole event. Absent fields read as `Value::Null`.
/// Unknown fields are ignored here; they survive in
/// `TransactionRecord::webhook`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TransactionPayload {
    id: Value,
    order_id: Value,
    parent_id: Value,
    payment_id: Value,
    admin_graphql_api_id: Value,
    kind: Value,
    gateway: Value,
    status: Value,
    source_name: Value,
    manual_payment_gateway: Value,
    amount: Value,
    currency: Value,
    created_at: Value,
    processed_at: Value,
    message: Value,
    authorization: Value,
    location_id: Value,
    user_id: Value,
    device_id: Value,
    error_code: Value,
    test: Value,
}

/// A transaction notification with every field coerced to its stored type.
///
/// Optional fields that are absent, `null`, or (for amounts and timestamps)
/// empty strings stay `None` and are persisted as SQL `NULL`, never as zero
/// or the epoch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionRecord {
    /// Transaction identity, unique in storage.
    pub id: TransactionId,
    /// Order the transaction belongs to.
    pub order_id: Option<String>,
    /// Parent transaction, e.g. the authorization a capture settles.
    pub parent_id: Option<String>,
    /// Payment id assigned by the checkout.
    pub payment_id: Option<String>,
    /// GraphQL global id of the transaction.
    pub admin_graphql_api_id: Option<String>,
    /// Transaction kind (`sale`, `capture`, `refund`, ...).
    pub kind: Option<String>,
    /// Payment gateway name.
    pub gateway: Option<String>,
    /// Transaction status (`success`, `failure`, ...).
    pub status: Option<String>,
    /// Channel that created the transaction.
    pub source_name: Option<String>,
    /// Manual payment gateway flag or name, as text.
    pub manual_payment_gateway: Option<String>,
    /// Amount parsed from its decimal string.
    pub amount: Option<f64>,
    /// ISO 4217 currency code.
    pub currency: Option<String>,
    /// When the transaction was created upstream.
    pub created_at: Option<DateTime<Utc>>,
    /// When the transaction was processed upstream.
    pub processed_at: Option<DateTime<Utc>>,
    /// Gateway message.
    pub message: Option<String>,
    /// Gateway authorization code.
    pub authorization: Option<String>,
    /// Point-of-sale location.
    pub location_id: Option<String>,
    /// Staff user who processed the transaction.
    pub user_id: Option<String>,
    /// Point-of-sale device.
    pub device_id: Option<String>,
    /// Standardized gateway error code.
    pub error_code: Option<String>,
    /// Whether this is a test transaction.
    pub test: Option<bool>,
    /// The complete original payload.
    pub webhook: serde_json::Value,
}

impl TransactionRecord {
    /// Parses and coerces a raw webhook body.
    ///
    /// Call this only after the body's signature has been verified; the bytes
    /// given here are never re-serialized for verification.
    ///
    /// # Errors
    ///
    /// Returns `PayloadError` if the body is not JSON, lacks a usable id, or
    /// carries an amount or timestamp that cannot be coerced.
    pub fn from_slice(body: &[u8]) -> Result<Self, PayloadError> {
        let webhook: serde_json::Value =
            serde_json::from_slice(body).map_err(PayloadError::InvalidJson)?;
        Self::from_value(webhook)
    }

    /// Coerces an already-decoded webhook document.
    ///
    /// # Errors
    ///
    /// See [`TransactionRecord::from_slice`].
    pub fn from_value(webhook: serde_json::Value) -> Result<Self, PayloadError> {
        // Serde would otherwise accept a long enough array positionally.
        if !webhook.is_object() {
            return Err(PayloadError::InvalidShape(serde::de::Error::custom(
                "expected a JSON object",
            )));
        }

        let payload =
            TransactionPayload::deserialize(&webhook).map_err(PayloadError::InvalidShape)?;

        let id = TransactionId::try_from(payload.id)?;

        Ok(Self {
            id,
            order_id: text(payload.order_id),
            parent_id: text(payload.parent_id),
            payment_id: text(payload.payment_id),
            admin_graphql_api_id: text(payload.admin_graphql_api_id),
            kind: text(payload.kind),
            gateway: text(payload.gateway),
            status: text(payload.status),
            source_name: text(payload.source_name),
            manual_payment_gateway: text(payload.manual_payment_gateway),
            amount: parse_amount(payload.amount)?,
            currency: text(payload.currency),
            created_at: parse_timestamp("created_at", payload.created_at)?,
            processed_at: parse_timestamp("processed_at", payload.processed_at)?,
            message: text(payload.message),
            authorization: text(payload.authorization),
            location_id: text(payload.location_id),
            user_id: text(payload.user_id),
            device_id: text(payload.device_id),
            error_code: text(payload.error_code),
            test: flag(&payload.test),
            webhook,
        })
    }
}

/// Renders a descriptive field as stored text.
///
/// Scalars keep their transmitted rendering; objects and arrays are stored
/// as compact JSON.
fn text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        nested @ (Value::Array(_) | Value::Object(_)) => Some(nested.to_string()),
    }
}

/// Reads the `test` flag. Values that are not recognisably boolean are NULL.
fn flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(flag) => Some(*flag),
        Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        },
        Value::Number(number) => match number.as_u64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        _ => None,
    }
}

/// Parses a transmitted amount. Empty strings count as absent.
fn parse_amount(value: Value) -> Result<Option<f64>, PayloadError> {
    let invalid = |value: String| PayloadError::InvalidAmount { value };

    match value {
        Value::Null => Ok(None),
        Value::String(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            match trimmed.parse::<f64>() {
                Ok(amount) if amount.is_finite() => Ok(Some(amount)),
                _ => Err(invalid(text)),
            }
        },
        Value::Number(number) => {
            number.as_f64().map(Some).ok_or_else(|| invalid(number.to_string()))
        },
        other => Err(invalid(other.to_string())),
    }
}

/// Parses an ISO-like timestamp. Empty strings count as absent.
///
/// Accepts RFC 3339 (what Shopify sends), the same with a space separator,
/// offset-less date-times (read as UTC) and bare dates (UTC midnight).
fn parse_timestamp(
    field: &'static str,
    value: Value,
) -> Result<Option<DateTime<Utc>>, PayloadError> {
    let raw = match value {
        Value::Null => return Ok(None),
        Value::String(raw) => raw,
        other => return Err(PayloadError::InvalidTimestamp { field, value: other.to_string() }),
    };
    let text = raw.trim();
    if text.is_empty() {
        return Ok(None);
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Ok(Some(parsed.with_timezone(&Utc)));
    }
    if let Ok(parsed) = DateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Ok(Some(parsed.with_timezone(&Utc)));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(Some(naive.and_utc()));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(Some(midnight.and_utc()));
        }
    }

    Err(PayloadError::InvalidTimestamp { field, value: raw })
}

/// A row of the `transactions` table as returned by the upsert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PersistedTransaction {
    /// Transaction identity.
    pub id: TransactionId,
    /// Order the transaction belongs to.
    pub order_id: Option<String>,
    /// Transaction kind.
    pub kind: Option<String>,
    /// Payment gateway name.
    pub gateway: Option<String>,
    /// Transaction status.
    pub status: Option<String>,
    /// Gateway message.
    pub message: Option<String>,
    /// Upstream creation time.
    pub created_at: Option<DateTime<Utc>>,
    /// Test transaction flag.
    pub test: Option<bool>,
    /// Gateway authorization code.
    pub authorization: Option<String>,
    /// Point-of-sale location.
    pub location_id: Option<String>,
    /// Staff user.
    pub user_id: Option<String>,
    /// Parent transaction.
    pub parent_id: Option<String>,
    /// Upstream processing time.
    pub processed_at: Option<DateTime<Utc>>,
    /// Point-of-sale device.
    pub device_id: Option<String>,
    /// Gateway error code.
    pub error_code: Option<String>,
    /// Originating channel.
    pub source_name: Option<String>,
    /// Parsed amount.
    pub amount: Option<f64>,
    /// Currency code.
    pub currency: Option<String>,
    /// Checkout payment id.
    pub payment_id: Option<String>,
    /// Manual payment gateway, as text.
    pub manual_payment_gateway: Option<String>,
    /// GraphQL global id.
    pub admin_graphql_api_id: Option<String>,
    /// Original payload.
    pub webhook: serde_json::Value,
    /// First time this id was stored.
    pub received_at: DateTime<Utc>,
    /// Last time this id was written.
    pub updated_at: DateTime<Utc>,
}
