//! The loaded schema: every info area, plus metadata persistence and DDL.

use crate::field::{FieldInfo, FieldType, parse_array_field_indices};
use crate::introspect;
use crate::link::{LinkFieldInfo, LinkInfo, LinkRelation};
use crate::table::TableInfo;
use asupersync::{Cx, Outcome};
use crmsql_core::{Connection, Error, Row, TransactionOps, Value, try_outcome};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Metadata tables, created on save when missing.
pub const METADATA_TABLES: [(&str, &str); 4] = [
    (
        "tableinfo",
        "CREATE TABLE IF NOT EXISTS tableinfo (infoareaid TEXT, rootinfoareaid TEXT, name TEXT, haslookup INTEGER)",
    ),
    (
        "fieldinfo",
        "CREATE TABLE IF NOT EXISTS fieldinfo (infoareaid TEXT, fieldid INTEGER, xmlname TEXT, name TEXT, \
         fieldtype TEXT, fieldlen INTEGER, cat INTEGER, ucat INTEGER, attributes INTEGER, repMode TEXT, \
         rights INTEGER, format TEXT, arrayfieldindices TEXT)",
    ),
    (
        "linkinfo",
        "CREATE TABLE IF NOT EXISTS linkinfo (infoareaid TEXT, targetinfoareaid TEXT, linkid INTEGER, \
         reverseLinkId INTEGER, relationtype TEXT, sourcefieldid INTEGER, destfieldid INTEGER, useLinkFields INTEGER)",
    ),
    (
        "linkfields",
        "CREATE TABLE IF NOT EXISTS linkfields (infoareaid TEXT, targetinfoareaid TEXT, linkid INTEGER, nr INTEGER, \
         sourceFieldId INTEGER, destFieldId INTEGER, sourcevalue TEXT, destvalue TEXT)",
    ),
];

type LinkKey = (String, String, i32);

/// All info areas known to the client.
///
/// Tables are shared behind `Arc` so compiled record templates can hold on to
/// the table they were built for while the model stays cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct DataModel {
    tables: BTreeMap<String, Arc<TableInfo>>,
}

impl DataModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a table. Sub-areas are also recorded on their root.
    pub fn add_table(&mut self, table: TableInfo) {
        if !table.is_root() {
            if let Some(root) = self.table_mut(table.root_info_area_id()) {
                root.add_virtual_info_area(table.info_area_id());
            }
        }
        let virtual_areas: Vec<String> = self
            .tables
            .values()
            .filter(|t| !t.is_root() && t.root_info_area_id() == table.info_area_id())
            .map(|t| t.info_area_id().to_string())
            .collect();
        let mut table = table;
        for area in virtual_areas {
            table.add_virtual_info_area(area);
        }
        self.tables
            .insert(table.info_area_id().to_string(), Arc::new(table));
    }

    pub fn table(&self, info_area_id: &str) -> Option<&Arc<TableInfo>> {
        self.tables.get(info_area_id)
    }

    /// Mutable access for registration (e.g. virtual links). Clones the table
    /// if a template still shares it.
    pub fn table_mut(&mut self, info_area_id: &str) -> Option<&mut TableInfo> {
        self.tables.get_mut(info_area_id).map(Arc::make_mut)
    }

    pub fn tables(&self) -> impl Iterator<Item = &Arc<TableInfo>> {
        self.tables.values()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Whether lookup-only rows may exist for `info_area_id`.
    pub fn has_lookup(&self, info_area_id: &str) -> bool {
        self.table(info_area_id).is_some_and(|t| t.has_lookup())
    }

    pub fn sort(&mut self) {
        for table in self.tables.values_mut() {
            Arc::make_mut(table).sort();
        }
    }

    /// Load `tableinfo`, `fieldinfo`, `linkinfo` and `linkfields`.
    ///
    /// Rows referring to unknown info areas are skipped with a warning.
    #[tracing::instrument(level = "debug", skip(cx, conn))]
    pub async fn load<C: Connection>(cx: &Cx, conn: &C) -> Outcome<DataModel, Error> {
        let mut tables: BTreeMap<String, TableInfo> = BTreeMap::new();

        let rows = try_outcome!(
            conn.query(
                cx,
                "SELECT infoareaid, rootinfoareaid, name, haslookup FROM tableinfo",
                &[],
            )
            .await
        );
        for row in &rows {
            let Some(info_area_id) = row.column(0) else {
                continue;
            };
            let table = TableInfo::new(
                info_area_id.clone(),
                row.column(1).unwrap_or_default(),
                row.column(2).unwrap_or_default(),
            )
            .with_lookup(row.column_int(3, 0) != 0);
            tables.insert(info_area_id, table);
        }

        let rows = try_outcome!(
            conn.query(
                cx,
                "SELECT infoareaid, fieldid, xmlname, name, fieldtype, fieldlen, cat, ucat, attributes, \
                 repMode, rights, format, arrayfieldindices FROM fieldinfo",
                &[],
            )
            .await
        );
        for row in &rows {
            let field = field_from_row(row);
            match tables.get_mut(&field.info_area_id) {
                Some(table) => table.add_field(field),
                None => tracing::warn!(
                    info_area = %field.info_area_id,
                    field_id = field.field_id,
                    "fieldinfo row for unknown info area"
                ),
            }
        }

        let rows = try_outcome!(
            conn.query(
                cx,
                "SELECT infoareaid, targetinfoareaid, linkid, nr, sourceFieldId, destFieldId, sourcevalue, destvalue \
                 FROM linkfields ORDER BY infoareaid, targetinfoareaid, linkid, nr",
                &[],
            )
            .await
        );
        let mut link_fields: BTreeMap<LinkKey, Vec<LinkFieldInfo>> = BTreeMap::new();
        for row in &rows {
            let key = (
                row.column(0).unwrap_or_default(),
                row.column(1).unwrap_or_default(),
                row.column_int(2, 0) as i32,
            );
            let pair = LinkFieldInfo {
                source_field_id: row.column_int(4, -1) as i32,
                dest_field_id: row.column_int(5, -1) as i32,
                source_value: row.column(6).unwrap_or_default(),
                dest_value: row.column(7).unwrap_or_default(),
            };
            link_fields.entry(key).or_default().push(pair);
        }

        let rows = try_outcome!(
            conn.query(
                cx,
                "SELECT infoareaid, targetinfoareaid, linkid, reverseLinkId, relationtype, sourcefieldid, \
                 destfieldid, useLinkFields FROM linkinfo",
                &[],
            )
            .await
        );
        for row in &rows {
            let mut link = LinkInfo::new(
                row.column(0).unwrap_or_default(),
                row.column(1).unwrap_or_default(),
                row.column_int(2, 0) as i32,
                row.column_int(3, 0) as i32,
                LinkRelation::parse(&row.column(4).unwrap_or_default()),
            )
            .with_field_link(row.column_int(5, -1) as i32, row.column_int(6, -1) as i32);
            if row.column_int(7, 0) != 0 {
                let key = (
                    link.info_area_id.clone(),
                    link.target_info_area_id.clone(),
                    link.link_id,
                );
                link = link.with_link_fields(link_fields.remove(&key).unwrap_or_default());
            }
            match tables.get_mut(&link.info_area_id) {
                Some(table) => table.add_link(link),
                None => tracing::warn!(
                    info_area = %link.info_area_id,
                    target = %link.target_info_area_id,
                    "linkinfo row for unknown info area"
                ),
            }
        }

        let mut model = DataModel::new();
        let (roots, subs): (Vec<_>, Vec<_>) = tables.into_values().partition(TableInfo::is_root);
        for mut table in roots.into_iter().chain(subs) {
            table.sort();
            model.add_table(table);
        }
        tracing::debug!(tables = model.len(), "data model loaded");
        Outcome::Ok(model)
    }

    /// Re-write all metadata tables in one transaction.
    ///
    /// Any failure drops the transaction, which rolls it back.
    #[tracing::instrument(level = "debug", skip(self, cx, conn))]
    pub async fn save<C: Connection>(&self, cx: &Cx, conn: &C) -> Outcome<(), Error> {
        let tx = try_outcome!(conn.begin(cx).await);

        for (name, create) in METADATA_TABLES {
            try_outcome!(tx.execute(cx, create, &[]).await);
            try_outcome!(tx.execute(cx, &format!("DELETE FROM {}", name), &[]).await);
        }

        for table in self.tables.values() {
            try_outcome!(
                tx.execute(
                    cx,
                    "INSERT INTO tableinfo (infoareaid, rootinfoareaid, name, haslookup) VALUES (?, ?, ?, ?)",
                    &[
                        Value::from(table.info_area_id()),
                        Value::from(table.root_info_area_id()),
                        Value::from(table.name()),
                        Value::Bool(table.has_lookup()),
                    ],
                )
                .await
            );

            for field in table.fields() {
                let indices = field
                    .array_field_indices
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(",");
                try_outcome!(
                    tx.execute(
                        cx,
                        "INSERT INTO fieldinfo (infoareaid, fieldid, xmlname, name, fieldtype, fieldlen, cat, ucat, \
                         attributes, repMode, rights, format, arrayfieldindices) \
                         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                        &[
                            Value::from(field.info_area_id.as_str()),
                            Value::Int(field.field_id),
                            Value::from(field.xml_name.as_str()),
                            Value::from(field.name.as_str()),
                            Value::Text(field.field_type.code().to_string()),
                            Value::Int(field.field_len),
                            Value::Int(field.cat),
                            Value::Int(field.ucat),
                            Value::Int(field.attributes),
                            Value::from(field.rep_mode.as_str()),
                            Value::Int(field.rights),
                            Value::from(field.format.as_str()),
                            Value::Text(indices),
                        ],
                    )
                    .await
                );
            }

            for link in table.links() {
                try_outcome!(
                    tx.execute(
                        cx,
                        "INSERT INTO linkinfo (infoareaid, targetinfoareaid, linkid, reverseLinkId, relationtype, \
                         sourcefieldid, destfieldid, useLinkFields) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                        &[
                            Value::from(link.info_area_id.as_str()),
                            Value::from(link.target_info_area_id.as_str()),
                            Value::Int(link.link_id),
                            Value::Int(link.reverse_link_id),
                            Value::from(link.relation.code()),
                            Value::Int(link.source_field_id),
                            Value::Int(link.dest_field_id),
                            Value::Bool(link.use_link_fields),
                        ],
                    )
                    .await
                );
                for (nr, pair) in link.link_fields.iter().enumerate() {
                    try_outcome!(
                        tx.execute(
                            cx,
                            "INSERT INTO linkfields (infoareaid, targetinfoareaid, linkid, nr, sourceFieldId, \
                             destFieldId, sourcevalue, destvalue) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                            &[
                                Value::from(link.info_area_id.as_str()),
                                Value::from(link.target_info_area_id.as_str()),
                                Value::Int(link.link_id),
                                Value::BigInt(nr as i64),
                                Value::Int(pair.source_field_id),
                                Value::Int(pair.dest_field_id),
                                Value::from(pair.source_value.as_str()),
                                Value::from(pair.dest_value.as_str()),
                            ],
                        )
                        .await
                    );
                }
            }
        }

        try_outcome!(tx.commit(cx).await);
        tracing::debug!(tables = self.tables.len(), "data model saved");
        Outcome::Ok(())
    }

    /// The DDL needed to bring the live store in line with the model.
    pub async fn ddl_statements<C: Connection>(
        &self,
        cx: &Cx,
        conn: &C,
    ) -> Outcome<Vec<String>, Error> {
        let existing = try_outcome!(introspect::table_names(cx, conn).await);
        let mut statements = Vec::new();
        for table in self.tables.values().filter(|t| t.is_root()) {
            let name = table.database_table_name();
            if existing.contains(&name) {
                let physical = try_outcome!(introspect::table_columns(cx, conn, &name).await);
                statements.extend(table.alter_table_statements(&physical, &existing));
            } else {
                statements.push(table.create_table_statement());
                let empty = introspect::PhysicalTable::new(name, Vec::new());
                statements.extend(
                    table
                        .alter_table_statements(&empty, &existing)
                        .into_iter()
                        .filter(|s| s.starts_with("CREATE")),
                );
            }
        }
        Outcome::Ok(statements)
    }

    /// Create missing entity/participants tables and add missing columns,
    /// all in one transaction. Returns the number of statements executed.
    #[tracing::instrument(level = "debug", skip(self, cx, conn))]
    pub async fn ensure_ddl<C: Connection>(&self, cx: &Cx, conn: &C) -> Outcome<usize, Error> {
        let statements = try_outcome!(self.ddl_statements(cx, conn).await);
        if statements.is_empty() {
            return Outcome::Ok(0);
        }

        let tx = try_outcome!(conn.begin(cx).await);
        for sql in &statements {
            tracing::debug!(sql = %sql, "applying DDL");
            try_outcome!(tx.execute(cx, sql, &[]).await);
        }
        try_outcome!(tx.commit(cx).await);
        Outcome::Ok(statements.len())
    }
}

fn field_from_row(row: &Row) -> FieldInfo {
    FieldInfo {
        info_area_id: row.column(0).unwrap_or_default(),
        field_id: row.column_int(1, -1) as i32,
        xml_name: row.column(2).unwrap_or_default(),
        name: row.column(3).unwrap_or_default(),
        field_type: FieldType::from_code(&row.column(4).unwrap_or_default()),
        field_len: row.column_int(5, 0) as i32,
        cat: row.column_int(6, 0) as i32,
        ucat: row.column_int(7, 0) as i32,
        attributes: row.column_int(8, 0) as i32,
        rep_mode: row.column(9).unwrap_or_default(),
        rights: row.column_int(10, 0) as i32,
        format: row.column(11).unwrap_or_default(),
        array_field_indices: parse_array_field_indices(&row.column(12).unwrap_or_default()),
    }
}
