//! Schema catalog for CRMSQL.
//!
//! The physical schema of the record store is not known at compile time. It
//! is described by metadata tables (`tableinfo`, `fieldinfo`, `linkinfo`,
//! `linkfields`) and loaded into a [`DataModel`] at startup. This crate
//! provides:
//!
//! - [`FieldInfo`] / [`FieldType`]: abstract field id to physical column mapping
//! - [`LinkInfo`]: one edge between two info areas and how it is encoded
//! - [`VirtualLinkInfo`]: a two-hop link through an intermediate table
//! - [`TableInfo`]: fields, links and link resolution for one info area
//! - [`DataModel`]: metadata load/save and DDL ensure against a live store
//! - [`introspect`]: reading the live physical table layout
//! - [`naming`]: the fixed physical naming rules

pub mod cached;
pub mod data_model;
pub mod field;
pub mod introspect;
pub mod link;
pub mod naming;
pub mod table;

pub use cached::Cached;
pub use data_model::DataModel;
pub use field::{FieldInfo, FieldType};
pub use introspect::PhysicalTable;
pub use link::{LinkColumnSide, LinkFieldInfo, LinkInfo, LinkRelation, VirtualLinkInfo};
pub use table::TableInfo;
