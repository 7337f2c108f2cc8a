//! Catalog value store.
//!
//! Catalogs are small code/text enumerations, one physical table each:
//!
//! - fixed catalogs (`CRM_FIXCAT_<nr>`): no tenant, no parent
//! - variable catalogs (`CRM_VARCAT_<nr>`): tenant scoped, external key
//! - dependent catalogs: variable catalogs filtered by a parent code
//!
//! [`CatalogStore`] knows every catalog from `fixcatinfo`/`varcatinfo` and
//! loads a [`CatalogValueSet`] per catalog the first time it is asked for.

pub mod info;
pub mod store;
pub mod value;
pub mod value_set;

pub use info::{CatalogInfo, CatalogKind};
pub use store::CatalogStore;
pub use value::{CatalogValue, CatalogValueKind, TenantAccess};
pub use value_set::{CatalogSortOrder, CatalogValueSet};
