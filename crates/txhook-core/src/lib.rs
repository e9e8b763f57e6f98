//! Core domain models, errors and storage for the transaction webhook
//! receiver.
//!
//! Provides the typed `TransactionRecord` built from a webhook body, the
//! error taxonomy shared across crates, and the `TransactionStore`
//! capability with its PostgreSQL and in-memory implementations.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod models;
pub mod storage;

pub use error::{CoreError, PayloadError, Result};
pub use models::{PersistedTransaction, TransactionId, TransactionRecord};
pub use storage::{mock::MockTransactionStore, Storage, TransactionStore};
