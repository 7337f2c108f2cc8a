mod common;

use asupersync::runtime::RuntimeBuilder;
use asupersync::{Cx, Outcome};

use common::{crm_catalogs, crm_model, unwrap_outcome};
use crmsql::prelude::*;
use crmsql::{CatalogSortOrder, CatalogValueSet, SchemaErrorKind};
use crmsql_sqlite::SqliteConnection;

/// Acme and Globex are regular companies, Initech only exists for lookups.
/// Ann and Bob work for Acme, Cid for Globex; Ann has one visit.
async fn seeded(cx: &Cx, options: DatabaseOptions) -> Database<SqliteConnection> {
    let conn = SqliteConnection::open_memory().expect("open sqlite memory db");
    let mut db = Database::new(conn, crm_model(), crm_catalogs(false), options);
    unwrap_outcome(db.ensure_ddl(cx).await);

    let mut companies = db
        .template("FI", vec![0, 1, 2])
        .expect("FI template")
        .with_lookup(true, false);
    for (id, name, city, country, lookup) in [
        ("FI1", "Acme", "Vienna", 1, false),
        ("FI2", "Globex", "Berlin", 2, false),
        ("FI3", "Initech", "Graz", 1, true),
    ] {
        let record = Record::new("FI", id)
            .with_values(vec![Value::from(name), Value::from(city), Value::Int(country)])
            .with_lookup(lookup);
        unwrap_outcome(companies.insert(cx, db.connection(), &record).await);
    }

    let mut persons = db
        .template("KP", vec![0, 2])
        .expect("KP template")
        .with_link_fields(["LINK_FI_0"]);
    for (id, name, age, company) in [
        ("KP1", "Ann", 34, "FI1"),
        ("KP2", "Bob", 51, "FI1"),
        ("KP3", "Cid", 28, "FI2"),
    ] {
        let record = Record::new("KP", id)
            .with_values(vec![Value::from(name), Value::Int(age)])
            .with_link_values(vec![Value::from(company)]);
        unwrap_outcome(persons.insert(cx, db.connection(), &record).await);
    }

    let mut activities = db
        .template("MA", vec![0])
        .expect("MA template")
        .with_link_fields(["LINK_FI_0", "LINK_KP_0"]);
    let visit = Record::new("MA", "MA1")
        .with_values(vec![Value::from("Visit")])
        .with_link_values(vec![Value::from("FI1"), Value::from("KP1")]);
    unwrap_outcome(activities.insert(cx, db.connection(), &visit).await);

    let mut countries = CatalogValueSet::new(Some(CatalogSortOrder::FixedByText));
    countries.add(CatalogValue::fixed(1, "Austria", 0));
    countries.add(CatalogValue::fixed(2, "Germany", 0));
    unwrap_outcome(db.update_catalog(cx, true, 1, &countries).await);

    db
}

fn child(db: &Database<SqliteConnection>, ia: &str, fields: Vec<i32>, relation: Relation) -> QueryTreeItem {
    QueryTreeItem::child(db.template(ia, fields).expect("template"), -1, relation)
}

fn root_names(rows: &RecordSet) -> Vec<String> {
    (0..rows.row_count())
        .filter_map(|row| rows.node_record(row, 0))
        .filter_map(|record| record.field(0).map(str::to_string))
        .collect()
}

#[test]
fn joined_children_come_back_as_node_records() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();

    rt.block_on(async {
        let db = seeded(&cx, DatabaseOptions::new()).await;

        let mut tree = db
            .query("FI", vec![0])
            .expect("FI query")
            .with_sort(SortField::asc(0))
            .with_child(child(&db, "KP", vec![0, 2], Relation::Join).with_sort(SortField::asc(0)));
        let rows = unwrap_outcome(db.execute(&cx, &mut tree).await);

        assert_eq!(rows.row_count(), 3);
        let pairs: Vec<(String, String)> = (0..rows.row_count())
            .map(|row| {
                let records = rows.records(row);
                (
                    records[0].field(0).unwrap_or_default().to_string(),
                    records[1].field(0).unwrap_or_default().to_string(),
                )
            })
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("Acme".to_string(), "Ann".to_string()),
                ("Acme".to_string(), "Bob".to_string()),
                ("Globex".to_string(), "Cid".to_string()),
            ]
        );

        let first = rows.records(0);
        assert_eq!(first[0].info_area_id, "FI");
        assert_eq!(first[0].record_id.as_deref(), Some("FI1"));
        assert_eq!(first[1].info_area_id, "KP");
        assert_eq!(first[1].record_id.as_deref(), Some("KP1"));
        assert_eq!(first[1].field(2), Some("34"));

        let child_output = &rows.outputs()[1];
        assert_eq!(Some(child_output.record_id_index), tree.children()[0].record_id_index());
    });
}

#[test]
fn left_join_keeps_parents_without_children() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();

    rt.block_on(async {
        let db = seeded(&cx, DatabaseOptions::new()).await;

        let mut tree = db
            .query("KP", vec![0])
            .expect("KP query")
            .with_sort(SortField::asc(0))
            .with_child(child(&db, "MA", vec![0], Relation::LeftJoin));
        let rows = unwrap_outcome(db.execute(&cx, &mut tree).await);

        assert_eq!(root_names(&rows), vec!["Ann", "Bob", "Cid"]);
        let ann = rows.records(0);
        assert_eq!(ann[1].field(0), Some("Visit"));
        let bob = rows.records(1);
        assert!(bob[1].is_empty());
        assert_eq!(bob[1].info_area_id, "MA");
        assert_eq!(bob[1].field(0), None);

        let mut filtered = db
            .query("KP", vec![0])
            .expect("KP query")
            .with_condition(TreeItemCondition::field_value(0, CompareOp::Equal, "a*"))
            .with_child(child(&db, "MA", vec![0], Relation::LeftJoin));
        let rows = unwrap_outcome(db.execute(&cx, &mut filtered).await);
        assert_eq!(root_names(&rows), vec!["Ann"]);

        let mut limited = db
            .query("KP", vec![0])
            .expect("KP query")
            .with_sort(SortField::desc(0))
            .with_max_results(2);
        let rows = unwrap_outcome(db.execute(&cx, &mut limited).await);
        assert_eq!(root_names(&rows), vec!["Cid", "Bob"]);
    });
}

#[test]
fn existence_children_filter_without_adding_columns() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();

    rt.block_on(async {
        let db = seeded(&cx, DatabaseOptions::new()).await;

        let mut without_persons = db
            .query("FI", vec![0])
            .expect("FI query")
            .with_child(child(&db, "KP", vec![], Relation::Without));
        let rows = unwrap_outcome(db.execute(&cx, &mut without_persons).await);
        assert_eq!(root_names(&rows), vec!["Initech"]);
        assert_eq!(rows.outputs().len(), 1);

        let cid = child(&db, "KP", vec![], Relation::Having)
            .with_condition(TreeItemCondition::field_value(0, CompareOp::Equal, "Cid"));
        let mut employs_cid = db.query("FI", vec![0]).expect("FI query").with_child(cid);
        let rows = unwrap_outcome(db.execute(&cx, &mut employs_cid).await);
        assert_eq!(root_names(&rows), vec!["Globex"]);

        let cid = child(&db, "KP", vec![], Relation::HavingOptional)
            .with_condition(TreeItemCondition::field_value(0, CompareOp::Equal, "Cid"));
        let mut either = db
            .query("FI", vec![0])
            .expect("FI query")
            .with_sort(SortField::asc(0))
            .with_child(cid)
            .with_child(child(&db, "MA", vec![], Relation::HavingOptional));
        let rows = unwrap_outcome(db.execute(&cx, &mut either).await);
        assert_eq!(root_names(&rows), vec!["Acme", "Globex"]);
    });
}

#[test]
fn lookup_rows_are_skipped_when_configured() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();

    rt.block_on(async {
        let db = seeded(&cx, DatabaseOptions::new().ignore_lookup_rows(true)).await;

        let mut all = db
            .query("FI", vec![0])
            .expect("FI query")
            .with_sort(SortField::asc(0));
        let rows = unwrap_outcome(db.execute(&cx, &mut all).await);
        assert_eq!(root_names(&rows), vec!["Acme", "Globex"]);

        let mut without_persons = db
            .query("FI", vec![0])
            .expect("FI query")
            .with_child(child(&db, "KP", vec![], Relation::Without));
        let rows = unwrap_outcome(db.execute(&cx, &mut without_persons).await);
        assert!(rows.is_empty());
    });
}

#[test]
fn catalog_and_empty_value_conditions() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();

    rt.block_on(async {
        let db = seeded(&cx, DatabaseOptions::new()).await;

        let mut by_text = db
            .query("FI", vec![0])
            .expect("FI query")
            .with_sort(SortField::asc(0))
            .with_condition(TreeItemCondition::field_value(2, CompareOp::Equal, "Austria"));
        let compiled = db.compile(&mut by_text);
        assert!(compiled.sql().contains("_FI.F2 IN (SELECT code FROM CRM_FIXCAT_1 WHERE text = ?)"));
        let rows = unwrap_outcome(compiled.execute(&cx, db.connection()).await);
        assert_eq!(root_names(&rows), vec!["Acme", "Initech"]);

        let mut by_code = db
            .query("FI", vec![0])
            .expect("FI query")
            .with_condition(TreeItemCondition::field_value(2, CompareOp::Equal, "2"));
        let rows = unwrap_outcome(db.execute(&cx, &mut by_code).await);
        assert_eq!(root_names(&rows), vec!["Globex"]);

        let mut has_city = db
            .query("FI", vec![0])
            .expect("FI query")
            .with_condition(TreeItemCondition::field_value(1, CompareOp::NotEqual, ""));
        let rows = unwrap_outcome(db.execute(&cx, &mut has_city).await);
        assert_eq!(rows.row_count(), 3);

        let mut no_vip = db
            .query("KP", vec![0])
            .expect("KP query")
            .with_condition(TreeItemCondition::field_value(3, CompareOp::Equal, "false"));
        let rows = unwrap_outcome(db.execute(&cx, &mut no_vip).await);
        assert_eq!(rows.row_count(), 3);
    });
}

#[test]
fn schema_errors_refuse_execution() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();

    rt.block_on(async {
        let db = seeded(&cx, DatabaseOptions::new()).await;

        let mut unknown_field = db.query("KP", vec![0, 9]).expect("KP query");
        match db.execute(&cx, &mut unknown_field).await {
            Outcome::Err(Error::Schema(e)) => assert_eq!(e.kind, SchemaErrorKind::FieldNotFound),
            other => panic!("expected schema error, got {other:?}"),
        }

        let mut unknown_link = db
            .query("FI", vec![0])
            .expect("FI query")
            .with_child(QueryTreeItem::child(
                db.template("KP", vec![0]).expect("KP template"),
                7,
                Relation::Join,
            ));
        let compiled = db.compile(&mut unknown_link);
        assert_eq!(compiled.error().map(|e| e.kind), Some(SchemaErrorKind::LinkNotFound));
        assert!(compiled.check().is_err());
    });
}
