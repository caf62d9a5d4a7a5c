//! Order number allocation
//!
//! Wraps the storage sequence counter into human-readable order numbers of
//! the form `ORD-2024-0001`. Uniqueness and ordering come from the counter
//! itself; the year in the middle is presentational.

use crate::orders::storage::{OrderStorage, StorageResult};
use chrono::{Datelike, Utc};

/// Attempts per allocation before the error surfaces to the caller
const MAX_ALLOC_ATTEMPTS: u32 = 3;

/// Allocates globally unique, strictly increasing order numbers
#[derive(Clone)]
pub struct OrderNumberAllocator {
    storage: OrderStorage,
    prefix: String,
}

impl OrderNumberAllocator {
    pub fn new(storage: OrderStorage, prefix: impl Into<String>) -> Self {
        Self {
            storage,
            prefix: prefix.into(),
        }
    }

    /// Allocate the next order number
    ///
    /// Retries transient storage failures up to [`MAX_ALLOC_ATTEMPTS`]
    /// times. The counter increment commits in its own transaction, so a
    /// retry after a failed commit can never hand out a duplicate: either
    /// the increment committed (and the retry draws a fresh number) or it
    /// aborted (and the retry draws the same, never-issued number).
    pub fn next(&self) -> StorageResult<String> {
        let mut attempt = 1;
        loop {
            match self.storage.next_order_sequence() {
                Ok(seq) => {
                    return Ok(format_order_number(&self.prefix, Utc::now().year(), seq));
                }
                Err(err) if err.is_transient() && attempt < MAX_ALLOC_ATTEMPTS => {
                    tracing::warn!(
                        attempt,
                        error = %err,
                        "Order number allocation failed, retrying"
                    );
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// `{prefix}-{year}-{seq:04}`; the sequence widens past 9999 rather than wrap
pub fn format_order_number(prefix: &str, year: i32, seq: u64) -> String {
    format!("{prefix}-{year}-{seq:04}")
}
