//! An opened record store: connection, schema, catalogs and options.

use crate::options::DatabaseOptions;
use asupersync::{Cx, Outcome};
use crmsql_catalog::{CatalogStore, CatalogValue, CatalogValueSet};
use crmsql_core::{Connection, Error, try_outcome};
use crmsql_query::{CompiledQuery, QueryTreeItem, RecordSet, RecordTemplate};
use crmsql_schema::data_model::METADATA_TABLES;
use crmsql_schema::{DataModel, introspect};

/// Everything needed to generate and run statements against one store.
///
/// The schema and catalogs are loaded once by [`open`](Database::open) and
/// are read-only afterwards, apart from lazily loaded catalog values.
#[derive(Debug)]
pub struct Database<C: Connection> {
    conn: C,
    model: DataModel,
    catalogs: CatalogStore,
    options: DatabaseOptions,
}

impl<C: Connection> Database<C> {
    pub fn new(conn: C, model: DataModel, catalogs: CatalogStore, options: DatabaseOptions) -> Self {
        Self {
            conn,
            model,
            catalogs,
            options,
        }
    }

    /// Load the data model and catalog descriptors from the store.
    ///
    /// A store without metadata tables opens with an empty schema.
    #[tracing::instrument(level = "debug", skip(cx, conn))]
    pub async fn open(cx: &Cx, conn: C, options: DatabaseOptions) -> Outcome<Self, Error> {
        let existing = try_outcome!(introspect::table_names(cx, &conn).await);

        let model = if METADATA_TABLES.iter().all(|(name, _)| existing.contains(*name)) {
            try_outcome!(DataModel::load(cx, &conn).await)
        } else {
            tracing::info!("no schema metadata found, starting with an empty data model");
            DataModel::new()
        };

        let fixed_by_sort_info = options.fixed_catalog_sort_by_sortinfo;
        let catalogs = if existing.contains("fixcatinfo") && existing.contains("varcatinfo") {
            try_outcome!(CatalogStore::load(cx, &conn, fixed_by_sort_info).await)
        } else {
            CatalogStore::new(fixed_by_sort_info)
        };

        tracing::info!(tables = model.len(), "database opened");
        Outcome::Ok(Self::new(conn, model, catalogs, options))
    }

    pub fn connection(&self) -> &C {
        &self.conn
    }

    pub fn into_connection(self) -> C {
        self.conn
    }

    pub fn model(&self) -> &DataModel {
        &self.model
    }

    /// Mutable schema access, e.g. to register virtual links after loading.
    pub fn model_mut(&mut self) -> &mut DataModel {
        &mut self.model
    }

    pub fn catalogs(&self) -> &CatalogStore {
        &self.catalogs
    }

    pub fn catalogs_mut(&mut self) -> &mut CatalogStore {
        &mut self.catalogs
    }

    pub fn options(&self) -> &DatabaseOptions {
        &self.options
    }

    /// A record template stamping the configured timestamp column.
    #[allow(clippy::result_large_err)]
    pub fn template(&self, info_area_id: &str, field_ids: Vec<i32>) -> Result<RecordTemplate, Error> {
        Ok(RecordTemplate::from_model(&self.model, info_area_id, field_ids)?
            .with_timestamp_column(self.options.timestamp_column))
    }

    /// A root query node honoring the lookup-row option.
    #[allow(clippy::result_large_err)]
    pub fn query(&self, info_area_id: &str, field_ids: Vec<i32>) -> Result<QueryTreeItem, Error> {
        let template = self.template(info_area_id, field_ids)?;
        Ok(QueryTreeItem::root(template).with_ignore_lookup_rows(self.options.ignore_lookup_rows))
    }

    pub fn compile(&self, tree: &mut QueryTreeItem) -> CompiledQuery {
        tree.compile(&self.model)
    }

    /// Compile and run `tree`.
    pub async fn execute(&self, cx: &Cx, tree: &mut QueryTreeItem) -> Outcome<RecordSet, Error> {
        let compiled = self.compile(tree);
        compiled.execute(cx, &self.conn).await
    }

    /// Bring entity and catalog tables in line with the loaded metadata.
    /// Returns the number of DDL statements executed.
    pub async fn ensure_ddl(&self, cx: &Cx) -> Outcome<usize, Error> {
        let entities = try_outcome!(self.model.ensure_ddl(cx, &self.conn).await);
        let catalogs = try_outcome!(self.catalogs.ensure_ddl(cx, &self.conn).await);
        tracing::info!(entities, catalogs, "schema ensured");
        Outcome::Ok(entities + catalogs)
    }

    /// Persist the data model and catalog descriptors.
    pub async fn save_metadata(&self, cx: &Cx) -> Outcome<(), Error> {
        try_outcome!(self.model.save(cx, &self.conn).await);
        self.catalogs.save_info(cx, &self.conn).await
    }

    /// Display text of a catalog code; `None` for unknown catalogs or codes.
    pub async fn catalog_text(
        &mut self,
        cx: &Cx,
        fixed: bool,
        nr: i32,
        code: i32,
    ) -> Outcome<Option<String>, Error> {
        let set = try_outcome!(self.catalogs.value_set(cx, &self.conn, fixed, nr).await);
        Outcome::Ok(set.and_then(|set| set.text_for_code(code).map(str::to_string)))
    }

    /// Values of a catalog in its display order.
    pub async fn catalog_values(
        &mut self,
        cx: &Cx,
        fixed: bool,
        nr: i32,
    ) -> Outcome<Vec<CatalogValue>, Error> {
        let set = try_outcome!(self.catalogs.value_set(cx, &self.conn, fixed, nr).await);
        let values: Vec<CatalogValue> = match set {
            Some(set) => set.sorted_values().into_iter().cloned().collect(),
            None => Vec::new(),
        };
        Outcome::Ok(values)
    }

    /// Rewrite the stored values of one catalog; the loaded set is dropped.
    pub async fn update_catalog(
        &mut self,
        cx: &Cx,
        fixed: bool,
        nr: i32,
        values: &CatalogValueSet,
    ) -> Outcome<(), Error> {
        self.catalogs.update(cx, &self.conn, fixed, nr, values).await
    }

    /// Values of a dependent catalog for one parent code, in display order.
    pub async fn dependent_catalog_values(
        &self,
        cx: &Cx,
        nr: i32,
        parent_code: i32,
    ) -> Outcome<Vec<CatalogValue>, Error> {
        let set = try_outcome!(
            self.catalogs
                .dependent_values(cx, &self.conn, nr, parent_code)
                .await
        );
        let Some(mut set) = set else {
            return Outcome::Ok(Vec::new());
        };
        let values: Vec<CatalogValue> = set.sorted_values().into_iter().cloned().collect();
        Outcome::Ok(values)
    }
}
