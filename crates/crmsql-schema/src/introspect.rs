//! Live physical schema introspection.
//!
//! Only what the DDL diff needs: table names from `sqlite_master` and column
//! names from `PRAGMA table_info`.

use asupersync::{Cx, Outcome};
use crmsql_core::{Connection, Error, quote_ident};
use std::collections::BTreeSet;

/// Column layout of one existing table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhysicalTable {
    pub name: String,
    pub columns: Vec<String>,
}

impl PhysicalTable {
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            columns,
        }
    }

    /// Column names compare case-insensitively, as in SQLite.
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.eq_ignore_ascii_case(name))
    }
}

/// List all user tables.
pub async fn table_names<C: Connection>(cx: &Cx, conn: &C) -> Outcome<BTreeSet<String>, Error> {
    let sql = "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'";
    let rows = match conn.query(cx, sql, &[]).await {
        Outcome::Ok(rows) => rows,
        Outcome::Err(e) => return Outcome::Err(e),
        Outcome::Cancelled(r) => return Outcome::Cancelled(r),
        Outcome::Panicked(p) => return Outcome::Panicked(p),
    };

    Outcome::Ok(rows.iter().filter_map(|row| row.column(0)).collect())
}

/// Read the column list of `table_name`. A missing table yields no columns.
pub async fn table_columns<C: Connection>(
    cx: &Cx,
    conn: &C,
    table_name: &str,
) -> Outcome<PhysicalTable, Error> {
    let sql = format!("PRAGMA table_info({})", quote_ident(table_name));
    let rows = match conn.query(cx, &sql, &[]).await {
        Outcome::Ok(rows) => rows,
        Outcome::Err(e) => return Outcome::Err(e),
        Outcome::Cancelled(r) => return Outcome::Cancelled(r),
        Outcome::Panicked(p) => return Outcome::Panicked(p),
    };

    let columns = rows
        .iter()
        .filter_map(|row| row.get_named::<String>("name").ok())
        .collect();
    Outcome::Ok(PhysicalTable::new(table_name, columns))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn has_column_ignores_case() {
        let table = PhysicalTable::new("CRM_KP", vec!["recid".to_string(), "F1".to_string()]);
        assert!(table.has_column("RECID"));
        assert!(table.has_column("f1"));
        assert!(!table.has_column("F2"));
    }
}
