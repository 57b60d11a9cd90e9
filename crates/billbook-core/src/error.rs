//! # Error Types
//!
//! Errors raised by the foundational types. All errors use `thiserror`
//! for derive-based `Display` and `Error` implementations.
//!
//! ## Design
//!
//! - Validation errors name the offending field and the accepted range.
//! - Data-source errors carry the operation that failed so operators can
//!   tell a connection problem from a malformed row.

use thiserror::Error;

/// Top-level error type for billbook core types.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A request field was outside its accepted range.
    #[error("invalid {field}: {reason}")]
    Validation {
        /// Name of the rejected field.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// Loading records from the data source failed.
    #[error("data source error: {0}")]
    Source(#[from] SourceError),
}

impl CoreError {
    /// Shorthand for a [`CoreError::Validation`].
    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }
}

/// Error returned by a [`TransactionSource`](crate::source::TransactionSource).
#[derive(Error, Debug)]
pub enum SourceError {
    /// The backing store could not be reached or the query failed.
    #[error("query {operation} failed: {message}")]
    Query {
        /// Operation being performed (e.g. `"fetch_expenses"`).
        operation: &'static str,
        /// Underlying error message.
        message: String,
    },

    /// A row could not be converted into a domain record.
    #[error("malformed {table} row {id}: {reason}")]
    MalformedRow {
        /// Table the row came from.
        table: &'static str,
        /// Row identifier.
        id: String,
        /// What was wrong with it.
        reason: String,
    },
}
