//! Statement generation for CRMSQL.
//!
//! `crmsql-query` turns abstract record descriptions into SQL against the
//! physical schema described by a [`DataModel`](crmsql_schema::DataModel).
//!
//! # Role In The Architecture
//!
//! - **Record templates**: the canonical single-row statements of one info
//!   area (`INSERT`, `UPDATE`, `SELECT`, `EXISTS`, `DELETE`), cached per
//!   template together with their prepared statements.
//! - **Condition model**: [`TreeItemCondition`] predicates over fields,
//!   raw columns, foreign keys and AND/OR groups.
//! - **Query tree compiler**: [`QueryTreeItem`] trees rooted at one info
//!   area compile into one `SELECT` with joins, `EXISTS` sub-selects and an
//!   output layout used to split result rows back into per-node records.
//!
//! Compilation is synchronous and never fails outright: schema problems are
//! collected on the [`StatementCreationContext`] and surface through
//! [`CompiledQuery::check`], which [`CompiledQuery::execute`] honors.

pub mod compiled;
pub mod condition;
pub mod context;
pub mod link_join;
pub mod record_set;
pub mod template;
pub mod tree;

pub use compiled::{CompiledQuery, NodeOutput};
pub use condition::{
    CompareOp, ConditionValue, FieldNameCondition, FieldValueCondition, ForeignKeyCondition,
    RelationOp, TreeItemCondition,
};
pub use context::StatementCreationContext;
pub use link_join::{LinkJoin, link_predicate};
pub use record_set::{NodeRecord, RecordSet};
pub use template::{Record, RecordTemplate, StatementKind, TimestampColumn};
pub use tree::{QueryTreeItem, Relation, SortField};
