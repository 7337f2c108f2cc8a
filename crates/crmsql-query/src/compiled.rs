//! The result of compiling a query tree.

use crate::record_set::RecordSet;
use asupersync::{Cx, Outcome};
use crmsql_core::{Connection, Error, SchemaError, Value, try_outcome};

/// Where one tree node's columns sit in a result row.
///
/// Computed in the same pass that writes the select list, so decoding a row
/// with it can never drift from the statement text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeOutput {
    pub alias: String,
    pub info_area_id: String,
    pub field_ids: Vec<i32>,
    pub first_field_index: usize,
    pub link_field_names: Vec<String>,
    pub first_link_field_index: usize,
    pub record_id_index: usize,
    pub info_area_id_index: usize,
}

impl NodeOutput {
    /// Result column of `field_id`, if the node selects it.
    pub fn field_index(&self, field_id: i32) -> Option<usize> {
        self.field_ids
            .iter()
            .position(|&id| id == field_id)
            .map(|pos| self.first_field_index + pos)
    }

    pub fn link_field_index(&self, name: &str) -> Option<usize> {
        self.link_field_names
            .iter()
            .position(|n| n == name)
            .map(|pos| self.first_link_field_index + pos)
    }
}

/// SQL text, bound parameters and output layout of one compilation.
#[derive(Debug, Clone)]
pub struct CompiledQuery {
    sql: String,
    params: Vec<Value>,
    error: Option<SchemaError>,
    outputs: Vec<NodeOutput>,
}

impl CompiledQuery {
    pub(crate) fn new(
        sql: String,
        params: Vec<Value>,
        error: Option<SchemaError>,
        outputs: Vec<NodeOutput>,
    ) -> Self {
        Self {
            sql,
            params,
            error,
            outputs,
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Parameters in placeholder order.
    pub fn params(&self) -> &[Value] {
        &self.params
    }

    /// First schema problem met while compiling.
    pub fn error(&self) -> Option<&SchemaError> {
        self.error.as_ref()
    }

    pub fn is_valid(&self) -> bool {
        self.error.is_none()
    }

    /// Output layout of every node that contributes columns, in tree
    /// pre-order.
    pub fn outputs(&self) -> &[NodeOutput] {
        &self.outputs
    }

    pub fn output(&self, alias: &str) -> Option<&NodeOutput> {
        self.outputs.iter().find(|o| o.alias == alias)
    }

    /// `Err` when the statement must not run.
    #[allow(clippy::result_large_err)]
    pub fn check(&self) -> Result<(), Error> {
        match &self.error {
            Some(error) => Err(Error::Schema(error.clone())),
            None => Ok(()),
        }
    }

    /// Run the statement. Refused without touching the connection when
    /// compilation recorded a problem.
    pub async fn execute<C: Connection>(&self, cx: &Cx, conn: &C) -> Outcome<RecordSet, Error> {
        if let Some(error) = &self.error {
            tracing::warn!(
                kind = ?error.kind,
                message = %error.message,
                "refusing to execute query with unresolved schema"
            );
            return Outcome::Err(Error::Schema(error.clone()));
        }
        let rows = try_outcome!(conn.query(cx, &self.sql, &self.params).await);
        tracing::debug!(rows = rows.len(), "query executed");
        Outcome::Ok(RecordSet::new(rows, self.outputs.clone()))
    }
}
