//! All catalogs of one database.

use crate::info::{CatalogInfo, CatalogKind};
use crate::value_set::CatalogValueSet;
use asupersync::{Cx, Outcome};
use crmsql_core::{Connection, Error, TransactionOps, try_outcome};
use crmsql_schema::introspect;
use std::collections::BTreeMap;

/// Catalog descriptors from `fixcatinfo` and `varcatinfo`, each with its
/// lazily loaded value set.
#[derive(Debug, Clone, Default)]
pub struct CatalogStore {
    fixed: BTreeMap<i32, CatalogInfo>,
    variable: BTreeMap<i32, CatalogInfo>,
    fixed_by_sort_info: bool,
}

impl CatalogStore {
    pub fn new(fixed_by_sort_info: bool) -> Self {
        Self {
            fixed_by_sort_info,
            ..Self::default()
        }
    }

    pub fn fixed_by_sort_info(&self) -> bool {
        self.fixed_by_sort_info
    }

    pub fn add(&mut self, info: CatalogInfo) {
        let map = if info.kind().is_fixed() {
            &mut self.fixed
        } else {
            &mut self.variable
        };
        map.insert(info.nr(), info);
    }

    pub fn fixed_catalog(&self, nr: i32) -> Option<&CatalogInfo> {
        self.fixed.get(&nr)
    }

    pub fn variable_catalog(&self, nr: i32) -> Option<&CatalogInfo> {
        self.variable.get(&nr)
    }

    fn catalog_mut(&mut self, fixed: bool, nr: i32) -> Option<&mut CatalogInfo> {
        if fixed {
            self.fixed.get_mut(&nr)
        } else {
            self.variable.get_mut(&nr)
        }
    }

    pub fn catalogs(&self) -> impl Iterator<Item = &CatalogInfo> {
        self.fixed.values().chain(self.variable.values())
    }

    /// Read `fixcatinfo(catnr)` and `varcatinfo(catnr, parentcatnr)`.
    #[tracing::instrument(level = "debug", skip(cx, conn))]
    pub async fn load<C: Connection>(
        cx: &Cx,
        conn: &C,
        fixed_by_sort_info: bool,
    ) -> Outcome<CatalogStore, Error> {
        let mut store = CatalogStore::new(fixed_by_sort_info);

        let rows = try_outcome!(conn.query(cx, "SELECT catnr FROM fixcatinfo", &[]).await);
        for row in &rows {
            store.add(CatalogInfo::new(row.column_int(0, 0) as i32, CatalogKind::Fixed));
        }

        let rows = try_outcome!(
            conn.query(cx, "SELECT catnr, parentcatnr FROM varcatinfo", &[])
                .await
        );
        for row in &rows {
            let parent = row.column_int(1, 0) as i32;
            let kind = if parent > 0 {
                CatalogKind::Dependent {
                    parent_catalog_nr: parent,
                }
            } else {
                CatalogKind::Variable
            };
            store.add(CatalogInfo::new(row.column_int(0, 0) as i32, kind));
        }

        tracing::debug!(
            fixed = store.fixed.len(),
            variable = store.variable.len(),
            "catalog store loaded"
        );
        Outcome::Ok(store)
    }

    /// Write `fixcatinfo` / `varcatinfo` in one transaction.
    #[tracing::instrument(level = "debug", skip(self, cx, conn))]
    pub async fn save_info<C: Connection>(&self, cx: &Cx, conn: &C) -> Outcome<(), Error> {
        let tx = try_outcome!(conn.begin(cx).await);
        try_outcome!(
            tx.execute(cx, "CREATE TABLE IF NOT EXISTS fixcatinfo (catnr INTEGER)", &[])
                .await
        );
        try_outcome!(
            tx.execute(
                cx,
                "CREATE TABLE IF NOT EXISTS varcatinfo (catnr INTEGER, parentcatnr INTEGER)",
                &[],
            )
            .await
        );
        try_outcome!(tx.execute(cx, "DELETE FROM fixcatinfo", &[]).await);
        try_outcome!(tx.execute(cx, "DELETE FROM varcatinfo", &[]).await);
        for nr in self.fixed.keys() {
            try_outcome!(
                tx.execute(
                    cx,
                    "INSERT INTO fixcatinfo (catnr) VALUES (?)",
                    &[(*nr).into()],
                )
                .await
            );
        }
        for info in self.variable.values() {
            let parent = match info.kind() {
                CatalogKind::Dependent { parent_catalog_nr } => parent_catalog_nr,
                _ => 0,
            };
            try_outcome!(
                tx.execute(
                    cx,
                    "INSERT INTO varcatinfo (catnr, parentcatnr) VALUES (?, ?)",
                    &[info.nr().into(), parent.into()],
                )
                .await
            );
        }
        tx.commit(cx).await
    }

    /// The value set of a catalog, loaded on first access. `None` when the
    /// catalog is unknown.
    pub async fn value_set<C: Connection>(
        &mut self,
        cx: &Cx,
        conn: &C,
        fixed: bool,
        nr: i32,
    ) -> Outcome<Option<&mut CatalogValueSet>, Error> {
        let fixed_by_sort_info = self.fixed_by_sort_info;
        let Some(info) = self.catalog_mut(fixed, nr) else {
            return Outcome::Ok(None);
        };
        let set = try_outcome!(info.value_set(cx, conn, fixed_by_sort_info).await);
        Outcome::Ok(Some(set))
    }

    /// Values of a dependent catalog for one parent code. Not cached.
    pub async fn dependent_values<C: Connection>(
        &self,
        cx: &Cx,
        conn: &C,
        nr: i32,
        parent_code: i32,
    ) -> Outcome<Option<CatalogValueSet>, Error> {
        let Some(info) = self.variable.get(&nr) else {
            return Outcome::Ok(None);
        };
        let set = try_outcome!(
            info.create_value_set(cx, conn, parent_code, self.fixed_by_sort_info)
                .await
        );
        Outcome::Ok(Some(set))
    }

    /// Discard the loaded values of one catalog.
    pub fn reset(&mut self, fixed: bool, nr: i32) {
        if let Some(info) = self.catalog_mut(fixed, nr) {
            info.reset();
        }
    }

    pub fn reset_all(&mut self) {
        self.fixed.values_mut().for_each(CatalogInfo::reset);
        self.variable.values_mut().for_each(CatalogInfo::reset);
    }

    /// Rewrite one catalog table.
    pub async fn update<C: Connection>(
        &mut self,
        cx: &Cx,
        conn: &C,
        fixed: bool,
        nr: i32,
        values: &CatalogValueSet,
    ) -> Outcome<(), Error> {
        match self.catalog_mut(fixed, nr) {
            Some(info) => info.update(cx, conn, values).await,
            None => Outcome::Err(Error::Custom(format!(
                "unknown {} catalog {}",
                if fixed { "fixed" } else { "variable" },
                nr
            ))),
        }
    }

    /// Create the value table of every catalog that has none yet.
    #[tracing::instrument(level = "debug", skip(self, cx, conn))]
    pub async fn ensure_ddl<C: Connection>(&self, cx: &Cx, conn: &C) -> Outcome<usize, Error> {
        let existing = try_outcome!(introspect::table_names(cx, conn).await);
        let statements: Vec<String> = self
            .catalogs()
            .filter(|c| !existing.contains(&c.database_table_name()))
            .map(CatalogInfo::create_table_statement)
            .collect();
        if statements.is_empty() {
            return Outcome::Ok(0);
        }

        let tx = try_outcome!(conn.begin(cx).await);
        for sql in &statements {
            tracing::debug!(sql = %sql, "creating catalog table");
            try_outcome!(tx.execute(cx, sql, &[]).await);
        }
        try_outcome!(tx.commit(cx).await);
        Outcome::Ok(statements.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalogs_are_split_by_kind() {
        let mut store = CatalogStore::new(false);
        store.add(CatalogInfo::new(1, CatalogKind::Fixed));
        store.add(CatalogInfo::new(1, CatalogKind::Variable));
        store.add(CatalogInfo::new(
            2,
            CatalogKind::Dependent {
                parent_catalog_nr: 1,
            },
        ));
        assert!(store.fixed_catalog(1).is_some());
        assert_eq!(
            store.variable_catalog(1).map(CatalogInfo::database_table_name),
            Some("CRM_VARCAT_1".to_string())
        );
        assert!(store.variable_catalog(2).is_some_and(|c| c.kind().is_dependent()));
        assert!(store.fixed_catalog(2).is_none());
        assert_eq!(store.catalogs().count(), 3);
    }

    #[test]
    fn reset_discards_loaded_values() {
        let mut store = CatalogStore::new(false);
        let mut info = CatalogInfo::new(3, CatalogKind::Fixed);
        info.set_values(CatalogValueSet::new(None));
        store.add(info);
        assert!(store.fixed_catalog(3).is_some_and(CatalogInfo::is_loaded));
        store.reset(true, 3);
        assert!(!store.fixed_catalog(3).is_some_and(CatalogInfo::is_loaded));
    }
}
