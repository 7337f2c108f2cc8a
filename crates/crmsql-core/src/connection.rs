//! Database connection traits.
//!
//! - [`Connection`] executes statements and opens transactions
//! - [`TransactionOps`] is the statement surface inside a transaction
//! - [`PreparedStatement`] is a validated statement kept for repeated execution
//!
//! All operations take an asupersync `Cx` and report through `Outcome`, so a
//! cancelled caller never observes a half-applied result.

use crate::error::Error;
use crate::row::Row;
use crate::value::Value;
use asupersync::{Cx, Outcome};
use std::future::Future;

/// A statement the driver has already compiled once.
///
/// Record templates keep one of these per generated statement so that the
/// parameter count is checked before any value is bound.
#[derive(Debug, Clone)]
pub struct PreparedStatement {
    id: u64,
    sql: String,
    param_count: usize,
    columns: Vec<String>,
}

impl PreparedStatement {
    /// Created by drivers.
    pub fn new(id: u64, sql: String, param_count: usize, columns: Vec<String>) -> Self {
        Self {
            id,
            sql,
            param_count,
            columns,
        }
    }

    pub const fn id(&self) -> u64 {
        self.id
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub const fn param_count(&self) -> usize {
        self.param_count
    }

    /// Result column names (empty for statements that return no rows).
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Check if the provided parameters match the expected count.
    pub fn validate_params(&self, params: &[Value]) -> bool {
        params.len() == self.param_count
    }
}

/// A database connection capable of executing statements.
///
/// ```rust,ignore
/// let rows = conn.query(&cx, "SELECT recid FROM CRM_KP WHERE F2 = ?", &[Value::from("X")]).await;
/// let tx = conn.begin(&cx).await?;
/// tx.execute(&cx, "DELETE FROM CRM_KP WHERE recid = ?", &[Value::from("KP1")]).await?;
/// tx.commit(&cx).await?;
/// ```
pub trait Connection: Send + Sync {
    /// The transaction type returned by this connection.
    type Tx<'conn>: TransactionOps
    where
        Self: 'conn;

    /// Execute a query and return all rows.
    fn query(
        &self,
        cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<Vec<Row>, Error>> + Send;

    /// Execute a query and return the first row, if any.
    fn query_one(
        &self,
        cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<Option<Row>, Error>> + Send;

    /// Execute a statement and return the number of affected rows.
    fn execute(
        &self,
        cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<u64, Error>> + Send;

    /// Execute several statements in order, stopping at the first failure.
    fn batch(
        &self,
        cx: &Cx,
        statements: &[(String, Vec<Value>)],
    ) -> impl Future<Output = Outcome<Vec<u64>, Error>> + Send;

    /// Begin a transaction.
    fn begin(&self, cx: &Cx) -> impl Future<Output = Outcome<Self::Tx<'_>, Error>> + Send;

    /// Compile a statement without running it.
    fn prepare(
        &self,
        cx: &Cx,
        sql: &str,
    ) -> impl Future<Output = Outcome<PreparedStatement, Error>> + Send;

    /// Execute a prepared statement and return all rows.
    fn query_prepared(
        &self,
        cx: &Cx,
        stmt: &PreparedStatement,
        params: &[Value],
    ) -> impl Future<Output = Outcome<Vec<Row>, Error>> + Send;

    /// Execute a prepared statement and return the number of affected rows.
    fn execute_prepared(
        &self,
        cx: &Cx,
        stmt: &PreparedStatement,
        params: &[Value],
    ) -> impl Future<Output = Outcome<u64, Error>> + Send;

    /// Check that the handle still answers.
    fn ping(&self, cx: &Cx) -> impl Future<Output = Outcome<(), Error>> + Send;
}

/// Statement surface of an open transaction.
///
/// Dropping a transaction without calling [`commit`](TransactionOps::commit)
/// rolls it back.
pub trait TransactionOps: Send {
    fn query(
        &self,
        cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<Vec<Row>, Error>> + Send;

    fn execute(
        &self,
        cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<u64, Error>> + Send;

    /// Commit the transaction.
    fn commit(self, cx: &Cx) -> impl Future<Output = Outcome<(), Error>> + Send;

    /// Roll back the transaction.
    fn rollback(self, cx: &Cx) -> impl Future<Output = Outcome<(), Error>> + Send;
}
