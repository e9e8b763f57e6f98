//! Property tests for turning webhook bodies into transaction records.

use proptest::prelude::*;
use serde_json::Value;
use txhook_core::{PayloadError, TransactionRecord};
use txhook_testing::property::{raw_body, transaction_payload};

proptest! {
    #[test]
    fn valid_payloads_always_coerce(payload in transaction_payload()) {
        let body = serde_json::to_vec(&payload).unwrap();

        let record = TransactionRecord::from_slice(&body).unwrap();

        prop_assert_eq!(&record.webhook, &payload);
        let expected_id = match &payload["id"] {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        };
        prop_assert_eq!(record.id.as_str(), expected_id.as_str());
        prop_assert_eq!(record.amount.is_none(), payload["amount"].is_null());
    }

    #[test]
    fn arbitrary_bytes_never_panic(body in raw_body()) {
        let _ = TransactionRecord::from_slice(&body);
    }

    #[test]
    fn numeric_and_string_amounts_agree(units in 0u32..1_000_000) {
        let as_number = serde_json::json!({ "id": "t", "amount": units });
        let as_text = serde_json::json!({ "id": "t", "amount": units.to_string() });

        let from_number = TransactionRecord::from_value(as_number).unwrap();
        let from_text = TransactionRecord::from_value(as_text).unwrap();

        prop_assert_eq!(from_number.amount, from_text.amount);
        prop_assert_eq!(from_number.amount, Some(f64::from(units)));
    }
}

#[test]
fn missing_id_is_rejected() {
    let err = TransactionRecord::from_slice(br#"{"amount":"1.00"}"#).unwrap_err();

    assert!(matches!(err, PayloadError::InvalidId));
}

#[test]
fn arrays_are_not_transactions() {
    let long_array = serde_json::to_vec(&vec![1; 32]).unwrap();

    let err = TransactionRecord::from_slice(&long_array).unwrap_err();

    assert!(matches!(err, PayloadError::InvalidShape(_)));
}
