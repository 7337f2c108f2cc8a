//! CRMSQL - metadata-driven SQL for an embedded CRM record store.
//!
//! The record store's schema is data, not code: info areas, fields and links
//! are described by metadata tables and loaded at startup. CRMSQL turns that
//! description into SQL:
//!
//! - Schema catalog: field and link metadata, physical naming, DDL ensure
//! - Catalog value store: lazily loaded code/text enumerations
//! - Record templates: cached single-row statements per info area
//! - Query trees: nested joins and existence tests compiled into one `SELECT`
//!
//! # Quick Start
//!
//! ```ignore
//! use crmsql::prelude::*;
//! use crmsql_sqlite::SqliteConnection;
//!
//! async fn companies_with_contacts(cx: &Cx, conn: SqliteConnection) {
//!     let db = Database::open(cx, conn, DatabaseOptions::new()).await.unwrap();
//!
//!     let contacts = QueryTreeItem::child(db.template("KP", vec![2]).unwrap(), -1, Relation::With);
//!     let mut tree = db
//!         .query("FI", vec![0, 1])
//!         .unwrap()
//!         .with_condition(TreeItemCondition::field_value(0, CompareOp::Equal, "Acme*"))
//!         .with_sort(SortField::asc(0))
//!         .with_child(contacts);
//!
//!     let rows = db.execute(cx, &mut tree).await.unwrap();
//!     for row in 0..rows.row_count() {
//!         for record in rows.records(row) {
//!             println!("{} {:?}", record.info_area_id, record.values);
//!         }
//!     }
//! }
//! ```
//!
//! All I/O goes through a [`Connection`] and returns an asupersync
//! [`Outcome`]; statement generation itself is synchronous.

pub mod database;
pub mod options;

pub use database::Database;
pub use options::DatabaseOptions;

pub use crmsql_core::{
    Connection, Cx, Error, Outcome, PreparedStatement, Row, SchemaError, SchemaErrorKind,
    TransactionOps, Value, try_outcome,
};

pub use crmsql_schema::{
    Cached, DataModel, FieldInfo, FieldType, LinkColumnSide, LinkFieldInfo, LinkInfo,
    LinkRelation, PhysicalTable, TableInfo, VirtualLinkInfo, naming,
};

pub use crmsql_catalog::{
    CatalogInfo, CatalogKind, CatalogSortOrder, CatalogStore, CatalogValue, CatalogValueKind,
    CatalogValueSet, TenantAccess,
};

pub use crmsql_query::{
    CompareOp, CompiledQuery, ConditionValue, FieldNameCondition, FieldValueCondition,
    ForeignKeyCondition, NodeOutput, NodeRecord, QueryTreeItem, Record, RecordSet,
    RecordTemplate, Relation, RelationOp, SortField, StatementCreationContext, StatementKind,
    TimestampColumn, TreeItemCondition,
};

/// The types most callers need.
///
/// ```ignore
/// use crmsql::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        CatalogValue, CompareOp, CompiledQuery, Connection, Cx, Database, DatabaseOptions,
        DataModel, Error, Outcome, QueryTreeItem, Record, RecordSet, RecordTemplate, Relation,
        SortField, TimestampColumn, TreeItemCondition, Value,
    };
}
