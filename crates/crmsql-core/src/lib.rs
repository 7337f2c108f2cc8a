//! Core types and traits for CRMSQL.
//!
//! This crate provides the foundations every other CRMSQL crate builds on:
//!
//! - `Value` and `Row` for parameter binding and result decoding
//! - `Connection` / `TransactionOps`, the statement execution contract
//! - `Error` for all failures that cross the storage boundary
//! - `Outcome` and `Cx` re-exported from asupersync for cancel-correct I/O

// Re-export asupersync primitives for structured concurrency
pub use asupersync::{Cx, Outcome};

pub mod connection;
pub mod error;
pub mod identifiers;
pub mod row;
pub mod value;

pub use connection::{Connection, PreparedStatement, TransactionOps};
pub use error::{
    ConnectionError, ConnectionErrorKind, Error, QueryError, QueryErrorKind, Result, SchemaError,
    SchemaErrorKind, TransactionError, TransactionErrorKind, TypeError,
};
pub use identifiers::{quote_ident, sql_literal};
pub use row::{ColumnInfo, FromValue, Row};
pub use value::Value;

/// Unwrap an `Outcome::Ok`, returning any other variant from the enclosing
/// function unchanged.
///
/// ```ignore
/// let rows = try_outcome!(conn.query(cx, "SELECT 1", &[]).await);
/// ```
#[macro_export]
macro_rules! try_outcome {
    ($outcome:expr) => {
        match $outcome {
            $crate::Outcome::Ok(value) => value,
            $crate::Outcome::Err(e) => return $crate::Outcome::Err(e.into()),
            $crate::Outcome::Cancelled(r) => return $crate::Outcome::Cancelled(r),
            $crate::Outcome::Panicked(p) => return $crate::Outcome::Panicked(p),
        }
    };
}
