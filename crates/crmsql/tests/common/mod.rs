#![allow(dead_code)]

use asupersync::Outcome;
use crmsql::{
    CatalogInfo, CatalogKind, CatalogStore, DataModel, Error, FieldInfo, FieldType, LinkInfo,
    LinkRelation, TableInfo,
};

pub fn unwrap_outcome<T>(outcome: Outcome<T, Error>) -> T {
    match outcome {
        Outcome::Ok(v) => v,
        Outcome::Err(e) => panic!("unexpected error: {e}"),
        Outcome::Cancelled(r) => panic!("cancelled: {r:?}"),
        Outcome::Panicked(p) => panic!("panicked: {p:?}"),
    }
}

/// Companies (FI), persons (KP) and activities (MA).
///
/// - FI: 0 name, 1 city, 2 country (fixed catalog 1); lookup rows allowed
/// - KP: 0 name, 1 first name, 2 age, 3 vip
/// - MA: 0 subject, 1 date; belongs to a company and a person
pub fn crm_model() -> DataModel {
    let mut fi = TableInfo::new("FI", "FI", "Company").with_lookup(true);
    fi.add_field(FieldInfo::new("FI", 0, FieldType::Char));
    fi.add_field(FieldInfo::new("FI", 1, FieldType::Char));
    fi.add_field(FieldInfo::new("FI", 2, FieldType::FixedCatalog).with_catalog(1, 0));
    fi.add_link(LinkInfo::new("FI", "KP", 0, 0, LinkRelation::OneToMany));
    fi.add_link(LinkInfo::new("FI", "MA", 0, 0, LinkRelation::OneToMany));

    let mut kp = TableInfo::new("KP", "KP", "Person");
    kp.add_field(FieldInfo::new("KP", 0, FieldType::Char));
    kp.add_field(FieldInfo::new("KP", 1, FieldType::Char));
    kp.add_field(FieldInfo::new("KP", 2, FieldType::Long));
    kp.add_field(FieldInfo::new("KP", 3, FieldType::Boolean));
    kp.add_link(LinkInfo::new("KP", "FI", 0, 0, LinkRelation::ManyToOne));
    kp.add_link(LinkInfo::new("KP", "MA", 0, 0, LinkRelation::OneToMany));

    let mut ma = TableInfo::new("MA", "MA", "Activity");
    ma.add_field(FieldInfo::new("MA", 0, FieldType::Char));
    ma.add_field(FieldInfo::new("MA", 1, FieldType::Date));
    ma.add_link(LinkInfo::new("MA", "FI", 0, 0, LinkRelation::ManyToOne));
    ma.add_link(LinkInfo::new("MA", "KP", 0, 0, LinkRelation::ManyToOne));

    let mut model = DataModel::new();
    model.add_table(fi);
    model.add_table(kp);
    model.add_table(ma);
    model.sort();
    model
}

/// Fixed catalog 1 (countries), variable catalog 2 (regions) and catalog 3
/// depending on catalog 2.
pub fn crm_catalogs(fixed_by_sort_info: bool) -> CatalogStore {
    let mut store = CatalogStore::new(fixed_by_sort_info);
    store.add(CatalogInfo::new(1, CatalogKind::Fixed));
    store.add(CatalogInfo::new(2, CatalogKind::Variable));
    store.add(CatalogInfo::new(
        3,
        CatalogKind::Dependent {
            parent_catalog_nr: 2,
        },
    ));
    store
}
