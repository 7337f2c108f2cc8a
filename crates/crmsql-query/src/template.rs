//! Single-record statements of one info area.
//!
//! A [`RecordTemplate`] fixes the field ids (and denormalized link columns)
//! one record is read and written with. The five canonical statements are
//! generated on first use and kept, together with the prepared statement
//! compiled from each of them.

use asupersync::{Cx, Outcome};
use crmsql_core::{Connection, Error, PreparedStatement, Row, SchemaErrorKind, Value, try_outcome};
use crmsql_schema::{Cached, DataModel, TableInfo, naming};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Which reserved timestamp column a write stamps with `datetime('now')`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampColumn {
    /// Rows written while applying server data.
    #[default]
    Sync,
    /// Rows changed locally.
    Update,
}

impl TimestampColumn {
    pub const fn column_name(self) -> &'static str {
        match self {
            TimestampColumn::Sync => naming::SYNC_COLUMN,
            TimestampColumn::Update => naming::UPDATE_COLUMN,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    Insert,
    Update,
    Select,
    Exists,
    Delete,
}

impl StatementKind {
    pub const ALL: [StatementKind; 5] = [
        StatementKind::Insert,
        StatementKind::Update,
        StatementKind::Select,
        StatementKind::Exists,
        StatementKind::Delete,
    ];

    const fn slot(self) -> usize {
        match self {
            StatementKind::Insert => 0,
            StatementKind::Update => 1,
            StatementKind::Select => 2,
            StatementKind::Exists => 3,
            StatementKind::Delete => 4,
        }
    }
}

/// One row as seen through a template.
///
/// `values` line up with the template's field ids and `link_values` with
/// its link column names; missing trailing entries are written as NULL.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    pub info_area_id: String,
    pub record_id: String,
    pub values: Vec<Value>,
    pub link_values: Vec<Value>,
    /// Row only exists to resolve lookups.
    pub lookup: bool,
}

impl Record {
    pub fn new(info_area_id: impl Into<String>, record_id: impl Into<String>) -> Self {
        Self {
            info_area_id: info_area_id.into(),
            record_id: record_id.into(),
            ..Self::default()
        }
    }

    pub fn with_values(mut self, values: Vec<Value>) -> Self {
        self.values = values;
        self
    }

    pub fn with_link_values(mut self, link_values: Vec<Value>) -> Self {
        self.link_values = link_values;
        self
    }

    pub fn with_lookup(mut self, lookup: bool) -> Self {
        self.lookup = lookup;
        self
    }

    /// Value of the `index`-th template field, NULL when absent.
    pub fn value(&self, index: usize) -> &Value {
        self.values.get(index).unwrap_or(&Value::Null)
    }
}

/// Statement generator and cache for one info area and field list.
#[derive(Debug, Clone)]
pub struct RecordTemplate {
    table: Arc<TableInfo>,
    field_ids: Vec<i32>,
    link_field_names: Vec<String>,
    empty_field_ids: BTreeSet<i32>,
    include_lookup_for_new: bool,
    include_lookup_for_update: bool,
    timestamp_column: TimestampColumn,
    sql: [Cached<String>; 5],
    prepared: [Cached<PreparedStatement>; 5],
}

impl RecordTemplate {
    /// Field ids below zero are placeholders: they keep their position in
    /// the select list as `null` and are never written.
    pub fn new(table: Arc<TableInfo>, field_ids: Vec<i32>) -> Self {
        Self {
            table,
            field_ids,
            link_field_names: Vec::new(),
            empty_field_ids: BTreeSet::new(),
            include_lookup_for_new: false,
            include_lookup_for_update: false,
            timestamp_column: TimestampColumn::default(),
            sql: Default::default(),
            prepared: Default::default(),
        }
    }

    pub fn from_model(model: &DataModel, info_area_id: &str, field_ids: Vec<i32>) -> Result<Self, Error> {
        let table = model.table(info_area_id).ok_or_else(|| {
            Error::schema(
                SchemaErrorKind::TableNotFound,
                format!("unknown info area {}", info_area_id),
            )
        })?;
        Ok(Self::new(Arc::clone(table), field_ids))
    }

    /// Denormalized link columns carried on the row (`LINK_FI_0`, ...).
    pub fn with_link_fields<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.link_field_names = names.into_iter().map(Into::into).collect();
        self.invalidate();
        self
    }

    /// Fields selected as `null` and left out of writes.
    pub fn with_empty_fields(mut self, field_ids: impl IntoIterator<Item = i32>) -> Self {
        self.empty_field_ids = field_ids.into_iter().collect();
        self.invalidate();
        self
    }

    /// Write the `lookup` flag on insert and/or update.
    pub fn with_lookup(mut self, for_new: bool, for_update: bool) -> Self {
        self.include_lookup_for_new = for_new;
        self.include_lookup_for_update = for_update;
        self.invalidate();
        self
    }

    pub fn with_timestamp_column(mut self, column: TimestampColumn) -> Self {
        self.timestamp_column = column;
        self.invalidate();
        self
    }

    fn invalidate(&mut self) {
        self.sql.iter_mut().for_each(Cached::invalidate);
        self.prepared.iter_mut().for_each(Cached::invalidate);
    }

    pub fn table(&self) -> &Arc<TableInfo> {
        &self.table
    }

    pub fn info_area_id(&self) -> &str {
        self.table.info_area_id()
    }

    pub fn field_ids(&self) -> &[i32] {
        &self.field_ids
    }

    pub fn link_field_names(&self) -> &[String] {
        &self.link_field_names
    }

    pub fn timestamp_column(&self) -> TimestampColumn {
        self.timestamp_column
    }

    pub fn is_empty_field(&self, field_id: i32) -> bool {
        field_id < 0 || self.empty_field_ids.contains(&field_id)
    }

    /// Positions and ids of the fields that are actually written.
    fn written_fields(&self) -> impl Iterator<Item = (usize, i32)> + '_ {
        self.field_ids
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, id)| !self.is_empty_field(*id))
    }

    /// Statement text for `kind`, built on first request.
    pub fn sql(&mut self, kind: StatementKind) -> &str {
        let slot = kind.slot();
        if !self.sql[slot].is_fresh() {
            let sql = self.build_sql(kind);
            self.sql[slot].set(sql);
        }
        self.sql[slot].get().map_or("", String::as_str)
    }

    /// True once the statement text for `kind` has been generated.
    pub fn is_cached(&self, kind: StatementKind) -> bool {
        self.sql[kind.slot()].is_fresh()
    }

    fn build_sql(&self, kind: StatementKind) -> String {
        let table = self.table.database_table_name();
        let recid = naming::RECORD_ID_COLUMN;
        match kind {
            StatementKind::Insert => {
                let mut columns = vec![recid.to_string(), naming::INFO_AREA_ID_COLUMN.to_string()];
                columns.extend(self.written_fields().map(|(_, id)| naming::field_column(id)));
                columns.extend(self.link_field_names.iter().cloned());
                let mut values = vec!["?"; columns.len()];
                columns.push(self.timestamp_column.column_name().to_string());
                values.push("datetime('now')");
                if self.include_lookup_for_new {
                    columns.push(naming::LOOKUP_COLUMN.to_string());
                    values.push("?");
                }
                format!(
                    "INSERT INTO {} ({}) VALUES ({})",
                    table,
                    columns.join(", "),
                    values.join(", ")
                )
            }
            StatementKind::Update => {
                let mut assignments: Vec<String> = self
                    .written_fields()
                    .map(|(_, id)| format!("{} = ?", naming::field_column(id)))
                    .collect();
                assignments.extend(self.link_field_names.iter().map(|name| format!("{} = ?", name)));
                assignments.push(format!(
                    "{} = datetime('now')",
                    self.timestamp_column.column_name()
                ));
                if self.include_lookup_for_update {
                    assignments.push(format!("{} = ?", naming::LOOKUP_COLUMN));
                }
                format!(
                    "UPDATE {} SET {} WHERE {} = ?",
                    table,
                    assignments.join(", "),
                    recid
                )
            }
            StatementKind::Select => {
                let mut columns: Vec<String> = self
                    .field_ids
                    .iter()
                    .map(|&id| {
                        if self.is_empty_field(id) {
                            "null".to_string()
                        } else {
                            naming::field_column(id)
                        }
                    })
                    .collect();
                columns.extend(self.link_field_names.iter().cloned());
                columns.push(naming::INFO_AREA_ID_COLUMN.to_string());
                format!(
                    "SELECT {} FROM {} WHERE {} = ?",
                    columns.join(", "),
                    table,
                    recid
                )
            }
            StatementKind::Exists => format!("SELECT {recid} FROM {table} WHERE {recid} = ?"),
            StatementKind::Delete => format!("DELETE FROM {table} WHERE {recid} = ?"),
        }
    }

    fn link_params(&self, record: &Record) -> Vec<Value> {
        (0..self.link_field_names.len())
            .map(|i| record.link_values.get(i).cloned().unwrap_or(Value::Null))
            .collect()
    }

    /// Parameters for `kind`, in placeholder order.
    pub fn params(&self, kind: StatementKind, record: &Record) -> Vec<Value> {
        let record_id = Value::from(record.record_id.as_str());
        let lookup = Value::BigInt(i64::from(record.lookup));
        match kind {
            StatementKind::Insert => {
                let info_area_id = if record.info_area_id.is_empty() {
                    self.info_area_id()
                } else {
                    record.info_area_id.as_str()
                };
                let mut params = vec![record_id, Value::from(info_area_id)];
                params.extend(self.written_fields().map(|(i, _)| record.value(i).clone()));
                params.extend(self.link_params(record));
                if self.include_lookup_for_new {
                    params.push(lookup);
                }
                params
            }
            StatementKind::Update => {
                let mut params: Vec<Value> = self
                    .written_fields()
                    .map(|(i, _)| record.value(i).clone())
                    .collect();
                params.extend(self.link_params(record));
                if self.include_lookup_for_update {
                    params.push(lookup);
                }
                params.push(record_id);
                params
            }
            StatementKind::Select | StatementKind::Exists | StatementKind::Delete => vec![record_id],
        }
    }

    async fn prepared<C: Connection>(
        &mut self,
        cx: &Cx,
        conn: &C,
        kind: StatementKind,
    ) -> Outcome<PreparedStatement, Error> {
        let slot = kind.slot();
        if let Some(stmt) = self.prepared[slot].get() {
            return Outcome::Ok(stmt.clone());
        }
        let sql = self.sql(kind).to_string();
        let stmt = try_outcome!(conn.prepare(cx, &sql).await);
        tracing::trace!(info_area_id = %self.info_area_id(), ?kind, "prepared record statement");
        Outcome::Ok(self.prepared[slot].set(stmt).clone())
    }

    async fn run<C: Connection>(
        &mut self,
        cx: &Cx,
        conn: &C,
        kind: StatementKind,
        record: &Record,
    ) -> Outcome<u64, Error> {
        let stmt = try_outcome!(self.prepared(cx, conn, kind).await);
        let params = self.params(kind, record);
        conn.execute_prepared(cx, &stmt, &params).await
    }

    pub async fn insert<C: Connection>(&mut self, cx: &Cx, conn: &C, record: &Record) -> Outcome<u64, Error> {
        self.run(cx, conn, StatementKind::Insert, record).await
    }

    /// Returns the number of rows changed; 0 when the record does not exist.
    pub async fn update<C: Connection>(&mut self, cx: &Cx, conn: &C, record: &Record) -> Outcome<u64, Error> {
        self.run(cx, conn, StatementKind::Update, record).await
    }

    pub async fn delete<C: Connection>(&mut self, cx: &Cx, conn: &C, record_id: &str) -> Outcome<u64, Error> {
        let record = Record::new(self.info_area_id(), record_id);
        self.run(cx, conn, StatementKind::Delete, &record).await
    }

    pub async fn exists<C: Connection>(&mut self, cx: &Cx, conn: &C, record_id: &str) -> Outcome<bool, Error> {
        let stmt = try_outcome!(self.prepared(cx, conn, StatementKind::Exists).await);
        let rows = try_outcome!(
            conn.query_prepared(cx, &stmt, &[Value::from(record_id)])
                .await
        );
        Outcome::Ok(!rows.is_empty())
    }

    /// Read one record by id.
    pub async fn read<C: Connection>(
        &mut self,
        cx: &Cx,
        conn: &C,
        record_id: &str,
    ) -> Outcome<Option<Record>, Error> {
        let stmt = try_outcome!(self.prepared(cx, conn, StatementKind::Select).await);
        let rows = try_outcome!(
            conn.query_prepared(cx, &stmt, &[Value::from(record_id)])
                .await
        );
        Outcome::Ok(rows.first().map(|row| self.decode(record_id, row)))
    }

    fn decode(&self, record_id: &str, row: &Row) -> Record {
        let value_at = |i: usize| row.get(i).cloned().unwrap_or(Value::Null);
        let field_count = self.field_ids.len();
        let link_count = self.link_field_names.len();
        Record {
            info_area_id: row
                .column(field_count + link_count)
                .unwrap_or_else(|| self.info_area_id().to_string()),
            record_id: record_id.to_string(),
            values: (0..field_count).map(value_at).collect(),
            link_values: (field_count..field_count + link_count).map(value_at).collect(),
            lookup: false,
        }
    }
}
