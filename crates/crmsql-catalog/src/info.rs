//! Catalog descriptors and their statements.

use crate::value::{CatalogValue, CatalogValueKind};
use crate::value_set::{CatalogSortOrder, CatalogValueSet};
use asupersync::{Cx, Outcome};
use crmsql_core::{Connection, Error, Row, TransactionOps, Value, try_outcome};
use crmsql_schema::{Cached, naming};

/// Closed set of catalog variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogKind {
    Fixed,
    Variable,
    Dependent { parent_catalog_nr: i32 },
}

impl CatalogKind {
    pub fn is_fixed(self) -> bool {
        self == CatalogKind::Fixed
    }

    pub fn is_variable(self) -> bool {
        !self.is_fixed()
    }

    pub fn is_dependent(self) -> bool {
        matches!(self, CatalogKind::Dependent { .. })
    }

    /// Display order for this kind. `fixed_by_sort_info` is the per-database
    /// switch for fixed catalogs.
    pub fn sort_order(self, fixed_by_sort_info: bool) -> CatalogSortOrder {
        match self {
            CatalogKind::Fixed if fixed_by_sort_info => CatalogSortOrder::FixedBySortInfo,
            CatalogKind::Fixed => CatalogSortOrder::FixedByText,
            CatalogKind::Variable | CatalogKind::Dependent { .. } => {
                CatalogSortOrder::VariableBySortInfo
            }
        }
    }
}

/// One catalog and its lazily loaded, unfiltered value set.
#[derive(Debug, Clone)]
pub struct CatalogInfo {
    nr: i32,
    kind: CatalogKind,
    values: Cached<CatalogValueSet>,
}

impl CatalogInfo {
    pub fn new(nr: i32, kind: CatalogKind) -> Self {
        Self {
            nr,
            kind,
            values: Cached::Stale,
        }
    }

    pub fn nr(&self) -> i32 {
        self.nr
    }

    pub fn kind(&self) -> CatalogKind {
        self.kind
    }

    pub fn database_table_name(&self) -> String {
        if self.kind.is_fixed() {
            naming::fixed_catalog_table(self.nr)
        } else {
            naming::variable_catalog_table(self.nr)
        }
    }

    fn value_columns(&self) -> Vec<&'static str> {
        let mut columns = vec!["code", "text", "sortinfo", "access"];
        if self.kind.is_variable() {
            columns.extend(["extkey", "tenant"]);
        }
        if self.kind.is_dependent() {
            columns.push("parentcode");
        }
        columns
    }

    pub fn create_table_statement(&self) -> String {
        let mut columns = vec!["code INTEGER", "text TEXT COLLATE NOCASE"];
        if self.kind.is_variable() {
            columns.extend(["extkey TEXT", "tenant INTEGER"]);
        }
        if self.kind.is_dependent() {
            columns.push("parentcode INTEGER");
        }
        columns.extend(["sortinfo INTEGER", "access INTEGER"]);
        format!(
            "CREATE TABLE {} ({})",
            self.database_table_name(),
            columns.join(", ")
        )
    }

    /// The `SELECT` loading the values. A parent filter only applies to
    /// dependent catalogs and only for `parent_code >= 0`.
    pub fn select_statement(&self, parent_code: i32) -> (String, Vec<Value>) {
        let mut sql = format!(
            "SELECT {} FROM {}",
            self.value_columns().join(", "),
            self.database_table_name()
        );
        let mut params = Vec::new();
        if self.kind.is_dependent() && parent_code >= 0 {
            sql.push_str(" WHERE parentcode = ?");
            params.push(Value::Int(parent_code));
        }
        (sql, params)
    }

    fn value_from_row(&self, row: &Row) -> CatalogValue {
        let code = row.column_int(0, 0) as i32;
        let text = row.column(1).unwrap_or_default();
        let sort_info = row.column_int(2, 0) as i32;
        let access = row.column_int(3, 0) as i32;
        let kind = match self.kind {
            CatalogKind::Dependent { .. } => CatalogValueKind::Dependent {
                ext_key: row.column(4).unwrap_or_default(),
                tenant: row.column_int(5, 0) as i32,
                parent_code: row.column_int(6, 0) as i32,
            },
            CatalogKind::Variable => CatalogValueKind::Variable {
                ext_key: row.column(4).unwrap_or_default(),
                tenant: row.column_int(5, 0) as i32,
            },
            CatalogKind::Fixed => CatalogValueKind::Fixed,
        };
        CatalogValue {
            code,
            text,
            sort_info,
            access,
            kind,
        }
    }

    /// Read the catalog table into a fresh, sorted value set.
    ///
    /// A failing query is logged and yields an empty set; cancellation is
    /// passed through.
    #[tracing::instrument(level = "debug", skip(self, cx, conn), fields(catalog = self.nr))]
    pub async fn create_value_set<C: Connection>(
        &self,
        cx: &Cx,
        conn: &C,
        parent_code: i32,
        fixed_by_sort_info: bool,
    ) -> Outcome<CatalogValueSet, Error> {
        let mut set = CatalogValueSet::new(Some(self.kind.sort_order(fixed_by_sort_info)));
        let (sql, params) = self.select_statement(parent_code);
        match conn.query(cx, &sql, &params).await {
            Outcome::Ok(rows) => {
                for row in &rows {
                    set.add(self.value_from_row(row));
                }
            }
            Outcome::Err(e) => {
                tracing::warn!(catalog = self.nr, error = %e, "catalog values could not be read");
            }
            Outcome::Cancelled(r) => return Outcome::Cancelled(r),
            Outcome::Panicked(p) => return Outcome::Panicked(p),
        }
        set.sort();
        Outcome::Ok(set)
    }

    /// The unfiltered value set, loading it on first use.
    pub async fn value_set<C: Connection>(
        &mut self,
        cx: &Cx,
        conn: &C,
        fixed_by_sort_info: bool,
    ) -> Outcome<&mut CatalogValueSet, Error> {
        let loaded = if self.values.is_fresh() {
            None
        } else {
            Some(try_outcome!(
                self.create_value_set(cx, conn, -1, fixed_by_sort_info)
                    .await
            ))
        };
        let sort_order = self.kind.sort_order(fixed_by_sort_info);
        Outcome::Ok(
            self.values
                .get_or_insert_with(|| loaded.unwrap_or_else(|| CatalogValueSet::new(Some(sort_order)))),
        )
    }

    /// Replace the loaded values without touching storage.
    pub fn set_values(&mut self, values: CatalogValueSet) {
        self.values.set(values);
    }

    /// Drop the loaded values; the next access reloads them.
    pub fn reset(&mut self) {
        self.values.invalidate();
    }

    pub fn is_loaded(&self) -> bool {
        self.values.is_fresh()
    }

    /// Replace the stored values with `values` in one transaction.
    ///
    /// Dropping the transaction on any failure rolls it back, so the table
    /// is either fully rewritten or untouched.
    #[tracing::instrument(level = "debug", skip(self, cx, conn, values), fields(catalog = self.nr))]
    pub async fn update<C: Connection>(
        &mut self,
        cx: &Cx,
        conn: &C,
        values: &CatalogValueSet,
    ) -> Outcome<(), Error> {
        let table = self.database_table_name();
        let columns = self.value_columns();
        let insert = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table,
            columns.join(", "),
            vec!["?"; columns.len()].join(", ")
        );

        let tx = try_outcome!(conn.begin(cx).await);
        try_outcome!(tx.execute(cx, &format!("DELETE FROM {}", table), &[]).await);
        for value in values.values() {
            let params = self.value_params(value);
            try_outcome!(tx.execute(cx, &insert, &params).await);
        }
        try_outcome!(tx.commit(cx).await);

        tracing::debug!(catalog = self.nr, rows = values.len(), "catalog rewritten");
        self.values.invalidate();
        Outcome::Ok(())
    }

    fn value_params(&self, value: &CatalogValue) -> Vec<Value> {
        let mut params = vec![
            Value::Int(value.code),
            Value::from(value.text.as_str()),
            Value::Int(value.sort_info),
            Value::Int(value.access),
        ];
        if self.kind.is_variable() {
            params.push(Value::from(value.ext_key().unwrap_or_default()));
            params.push(Value::Int(value.tenant()));
        }
        if self.kind.is_dependent() {
            params.push(Value::Int(value.parent_code().unwrap_or(0)));
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_predicates() {
        assert!(CatalogKind::Fixed.is_fixed());
        assert!(!CatalogKind::Fixed.is_variable());
        let dep = CatalogKind::Dependent {
            parent_catalog_nr: 3,
        };
        assert!(dep.is_variable());
        assert!(dep.is_dependent());
        assert!(!CatalogKind::Variable.is_dependent());
    }

    #[test]
    fn select_columns_by_kind() {
        let fixed = CatalogInfo::new(2, CatalogKind::Fixed);
        assert_eq!(
            fixed.select_statement(5),
            (
                "SELECT code, text, sortinfo, access FROM CRM_FIXCAT_2".to_string(),
                vec![]
            )
        );

        let var = CatalogInfo::new(4, CatalogKind::Variable);
        assert_eq!(
            var.select_statement(-1).0,
            "SELECT code, text, sortinfo, access, extkey, tenant FROM CRM_VARCAT_4"
        );

        let dep = CatalogInfo::new(
            6,
            CatalogKind::Dependent {
                parent_catalog_nr: 4,
            },
        );
        assert_eq!(
            dep.select_statement(3),
            (
                "SELECT code, text, sortinfo, access, extkey, tenant, parentcode FROM CRM_VARCAT_6 WHERE parentcode = ?"
                    .to_string(),
                vec![Value::Int(3)]
            )
        );
        assert!(dep.select_statement(-1).1.is_empty());
    }

    #[test]
    fn create_table_layout() {
        let dep = CatalogInfo::new(
            6,
            CatalogKind::Dependent {
                parent_catalog_nr: 4,
            },
        );
        assert_eq!(
            dep.create_table_statement(),
            "CREATE TABLE CRM_VARCAT_6 (code INTEGER, text TEXT COLLATE NOCASE, extkey TEXT, tenant INTEGER, \
             parentcode INTEGER, sortinfo INTEGER, access INTEGER)"
        );
        assert_eq!(
            CatalogInfo::new(1, CatalogKind::Fixed).create_table_statement(),
            "CREATE TABLE CRM_FIXCAT_1 (code INTEGER, text TEXT COLLATE NOCASE, sortinfo INTEGER, access INTEGER)"
        );
    }

    #[test]
    fn row_decoding_picks_most_specific_variant() {
        let dep = CatalogInfo::new(
            6,
            CatalogKind::Dependent {
                parent_catalog_nr: 4,
            },
        );
        let row = Row::new(
            ["code", "text", "sortinfo", "access", "extkey", "tenant", "parentcode"]
                .map(String::from)
                .to_vec(),
            vec![
                Value::Int(10),
                Value::from("Berlin"),
                Value::Int(0),
                Value::Int(0),
                Value::from("EXT-10"),
                Value::Int(2),
                Value::Int(49),
            ],
        );
        let value = dep.value_from_row(&row);
        assert_eq!(value.parent_code(), Some(49));
        assert_eq!(value.tenant(), 2);
        assert_eq!(value.ext_key(), Some("EXT-10"));
    }
}
