//! Proptest strategies for webhook bodies and signatures.

use proptest::prelude::{any, prop, prop_oneof, Just, Strategy};
use serde_json::{json, Value};

/// Arbitrary raw bodies, including non-UTF-8 bytes.
pub fn raw_body() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..2048)
}

/// Non-empty secrets.
pub fn secret() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_]{1,64}"
}

/// Transaction ids as Shopify or a proxy might send them.
pub fn transaction_id() -> impl Strategy<Value = Value> {
    prop_oneof![
        (1u64..=u64::MAX / 2).prop_map(Value::from),
        "[0-9]{1,18}".prop_map(Value::from),
        "[a-z][a-z0-9_-]{0,31}".prop_map(Value::from),
    ]
}

/// Amounts as decimal strings, numbers or absent values.
pub fn amount() -> impl Strategy<Value = Value> {
    prop_oneof![
        (0u32..10_000_000, 0u32..100).prop_map(|(units, cents)| json!(format!("{units}.{cents:02}"))),
        (0u32..10_000_000).prop_map(Value::from),
        Just(Value::Null),
    ]
}

/// Valid transaction payloads with a random subset of fields.
pub fn transaction_payload() -> impl Strategy<Value = Value> {
    (
        transaction_id(),
        amount(),
        prop::option::of("[a-z]{3,10}"),
        prop::option::of(prop_oneof![Just("sale"), Just("refund"), Just("capture")]),
        prop::option::of(any::<bool>()),
    )
        .prop_map(|(id, amount, gateway, kind, test)| {
            let mut payload = json!({ "id": id, "amount": amount });
            if let Some(gateway) = gateway {
                payload["gateway"] = json!(gateway);
            }
            if let Some(kind) = kind {
                payload["kind"] = json!(kind);
            }
            if let Some(test) = test {
                payload["test"] = json!(test);
            }
            payload
        })
}
