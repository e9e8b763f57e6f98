#![no_main]

//! Fuzz target for turning verified webhook bodies into records.
//!
//! Arbitrary bytes must either coerce or fail with a `PayloadError`; a
//! record, when produced, keeps the decoded body verbatim.

use libfuzzer_sys::fuzz_target;
use txhook_core::TransactionRecord;

fuzz_target!(|data: &[u8]| {
    if let Ok(record) = TransactionRecord::from_slice(data) {
        assert!(!record.id.as_str().is_empty());
        assert!(record.webhook.is_object());
        assert!(record.amount.map_or(true, f64::is_finite));
    }
});
