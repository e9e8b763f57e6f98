//! Test infrastructure for the transaction webhook receiver.
//!
//! Provides isolated PostgreSQL schemas, payload builders, signed request
//! fixtures and proptest strategies.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod database;
pub mod fixtures;
pub mod property;

pub use database::TestDatabase;
pub use fixtures::{
    request_with_signature, signed_request, test_state, TransactionBuilder, TEST_SECRET,
};
