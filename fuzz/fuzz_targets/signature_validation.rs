#![no_main]

//! Fuzz target for webhook signature validation.
//!
//! Splits the input into a body and a claimed signature header and checks
//! that verification never panics and only accepts the genuine digest.

use libfuzzer_sys::fuzz_target;
use txhook_api::crypto::{check_signature, generate_signature, verify};

const SECRET: &str = "fuzz_secret";

fuzz_target!(|data: &[u8]| {
    let split = data.iter().position(|&b| b == b'\n').unwrap_or(data.len());
    let (body, rest) = data.split_at(split);
    let claim = String::from_utf8_lossy(rest.get(1..).unwrap_or_default());

    let genuine = generate_signature(body, SECRET).expect("HMAC accepts any key");
    let accepted = check_signature(body, Some(&claim), SECRET).is_ok();
    assert_eq!(accepted, claim == genuine);

    assert!(verify(body, Some(&genuine), SECRET));
    assert!(!verify(body, None, SECRET));
});
