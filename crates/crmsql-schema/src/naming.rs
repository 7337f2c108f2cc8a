//! Physical naming rules.
//!
//! Every physical identifier the layer emits is derived here, so the DDL
//! generator, the record templates and the query compiler always agree.

/// Primary key column of every entity table.
pub const RECORD_ID_COLUMN: &str = "recid";
/// Concrete info-area id of the row (virtual sub-areas share one table).
pub const INFO_AREA_ID_COLUMN: &str = "title";
/// Timestamp set when the row was last synchronized.
pub const SYNC_COLUMN: &str = "sync";
/// Timestamp set on local modification.
pub const UPDATE_COLUMN: &str = "upd";
/// Flag marking rows that only exist to resolve lookups.
pub const LOOKUP_COLUMN: &str = "lookup";

/// Reserved columns in creation order, with their physical types.
pub const RESERVED_COLUMNS: [(&str, &str); 5] = [
    (RECORD_ID_COLUMN, "TEXT PRIMARY KEY"),
    (INFO_AREA_ID_COLUMN, "TEXT"),
    (SYNC_COLUMN, "TEXT"),
    (UPDATE_COLUMN, "TEXT"),
    (LOOKUP_COLUMN, "INTEGER"),
];

/// Alias used for the intermediate table inside foreign-key sub-selects.
pub const FOREIGN_KEY_ALIAS: &str = "FKEY";

pub fn table_name(root_info_area_id: &str) -> String {
    format!("CRM_{}", root_info_area_id)
}

pub fn field_column(field_id: i32) -> String {
    format!("F{}", field_id)
}

/// Link ids below zero denote "default link" and share the slot of id 0.
pub fn link_slot(link_id: i32) -> i32 {
    link_id.max(0)
}

pub fn link_column(target_info_area_id: &str, link_id: i32) -> String {
    format!("LINK_{}_{}", target_info_area_id, link_slot(link_id))
}

/// Record-id half of a generic link.
pub fn generic_link_record_column(link_id: i32) -> String {
    format!("LINK_RECID_{}", link_slot(link_id))
}

/// Info-area discriminator half of a generic link.
pub fn generic_link_info_area_column(link_id: i32) -> String {
    format!("LINK_IA_{}", link_slot(link_id))
}

pub fn participants_table(root_info_area_id: &str, field_id: i32) -> String {
    format!("CRM_{}_PART_F{}", root_info_area_id, field_id)
}

pub fn fixed_catalog_table(catalog_nr: i32) -> String {
    format!("CRM_FIXCAT_{}", catalog_nr)
}

pub fn variable_catalog_table(catalog_nr: i32) -> String {
    format!("CRM_VARCAT_{}", catalog_nr)
}

/// True for the info-area ids that older metadata uses interchangeably for
/// the person/company root.
pub fn is_interchangeable_root(info_area_id: &str) -> bool {
    info_area_id == "KP" || info_area_id == "CP"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_links_share_slot_zero() {
        assert_eq!(link_column("FI", -1), "LINK_FI_0");
        assert_eq!(link_column("FI", 0), "LINK_FI_0");
        assert_eq!(link_column("FI", 3), "LINK_FI_3");
        assert_eq!(generic_link_record_column(-1), "LINK_RECID_0");
        assert_eq!(generic_link_info_area_column(2), "LINK_IA_2");
    }

    #[test]
    fn physical_tables() {
        assert_eq!(table_name("KP"), "CRM_KP");
        assert_eq!(field_column(12), "F12");
        assert_eq!(participants_table("MA", 5), "CRM_MA_PART_F5");
        assert_eq!(fixed_catalog_table(7), "CRM_FIXCAT_7");
        assert_eq!(variable_catalog_table(7), "CRM_VARCAT_7");
    }
}
