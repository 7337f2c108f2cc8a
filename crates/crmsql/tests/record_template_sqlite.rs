mod common;

use asupersync::Cx;
use asupersync::runtime::RuntimeBuilder;

use common::{crm_catalogs, crm_model, unwrap_outcome};
use crmsql::StatementKind;
use crmsql::prelude::*;
use crmsql_sqlite::SqliteConnection;

fn ann() -> Record {
    Record::new("KP", "KP1")
        .with_values(vec![
            Value::from("Ann"),
            Value::from("Smith"),
            Value::BigInt(42),
            Value::Bool(true),
        ])
        .with_link_values(vec![Value::from("FI1")])
}

#[test]
fn insert_read_update_delete() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();

    rt.block_on(async {
        let conn = SqliteConnection::open_memory().expect("open sqlite memory db");
        let db = Database::new(conn, crm_model(), crm_catalogs(false), DatabaseOptions::new());
        unwrap_outcome(db.ensure_ddl(&cx).await);

        let mut template = db
            .template("KP", vec![0, 1, 2, 3])
            .expect("KP template")
            .with_link_fields(["LINK_FI_0"]);

        assert!(!unwrap_outcome(template.exists(&cx, db.connection(), "KP1").await));
        assert_eq!(unwrap_outcome(template.insert(&cx, db.connection(), &ann()).await), 1);
        assert!(template.is_cached(StatementKind::Insert));
        assert!(unwrap_outcome(template.exists(&cx, db.connection(), "KP1").await));

        let read = unwrap_outcome(template.read(&cx, db.connection(), "KP1").await).expect("KP1 stored");
        assert_eq!(read.info_area_id, "KP");
        assert_eq!(read.record_id, "KP1");
        assert_eq!(read.values[0], Value::from("Ann"));
        assert_eq!(read.values[1], Value::from("Smith"));
        assert_eq!(read.values[2].as_i64(), Some(42));
        assert_eq!(read.values[3].as_i64(), Some(1));
        assert_eq!(read.link_values, vec![Value::from("FI1")]);

        let changed = Record::new("KP", "KP1").with_values(vec![
            Value::from("Anne"),
            Value::from("Smith"),
            Value::BigInt(43),
            Value::Bool(false),
        ]);
        assert_eq!(unwrap_outcome(template.update(&cx, db.connection(), &changed).await), 1);
        let read = unwrap_outcome(template.read(&cx, db.connection(), "KP1").await).expect("KP1 stored");
        assert_eq!(read.values[0], Value::from("Anne"));
        assert_eq!(read.values[2].as_i64(), Some(43));
        // link values missing from the record are written as NULL
        assert_eq!(read.link_values, vec![Value::Null]);

        let missing = Record::new("KP", "KP9").with_values(vec![Value::from("Nobody")]);
        assert_eq!(unwrap_outcome(template.update(&cx, db.connection(), &missing).await), 0);

        assert_eq!(unwrap_outcome(template.delete(&cx, db.connection(), "KP1").await), 1);
        assert!(!unwrap_outcome(template.exists(&cx, db.connection(), "KP1").await));
        assert!(unwrap_outcome(template.read(&cx, db.connection(), "KP1").await).is_none());
    });
}

#[test]
fn writes_stamp_the_configured_timestamp_column() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();

    rt.block_on(async {
        let conn = SqliteConnection::open_memory().expect("open sqlite memory db");
        let options = DatabaseOptions::new().timestamp_column(TimestampColumn::Update);
        let db = Database::new(conn, crm_model(), crm_catalogs(false), options);
        unwrap_outcome(db.ensure_ddl(&cx).await);

        let mut template = db.template("KP", vec![0]).expect("KP template");
        assert_eq!(template.timestamp_column(), TimestampColumn::Update);
        let record = Record::new("KP", "KP1").with_values(vec![Value::from("Ann")]);
        unwrap_outcome(template.insert(&cx, db.connection(), &record).await);

        let rows = unwrap_outcome(
            db.connection()
                .query(&cx, "SELECT sync, upd, title FROM CRM_KP WHERE recid = ?", &[Value::from("KP1")])
                .await,
        );
        assert_eq!(rows.len(), 1);
        assert!(rows[0].is_null(0));
        assert!(!rows[0].is_null(1));
        assert_eq!(rows[0].column(2).as_deref(), Some("KP"));
    });
}

#[test]
fn placeholder_fields_are_read_as_null_and_never_written() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();

    rt.block_on(async {
        let conn = SqliteConnection::open_memory().expect("open sqlite memory db");
        let db = Database::new(conn, crm_model(), crm_catalogs(false), DatabaseOptions::new());
        unwrap_outcome(db.ensure_ddl(&cx).await);

        let mut full = db.template("KP", vec![0, 1]).expect("KP template");
        let record = Record::new("KP", "KP1").with_values(vec![Value::from("Ann"), Value::from("Smith")]);
        unwrap_outcome(full.insert(&cx, db.connection(), &record).await);

        let mut partial = db.template("KP", vec![-1, 1]).expect("KP template");
        assert_eq!(
            partial.sql(StatementKind::Update),
            "UPDATE CRM_KP SET F1 = ?, sync = datetime('now') WHERE recid = ?"
        );
        let change = Record::new("KP", "KP1").with_values(vec![Value::from("ignored"), Value::from("Jones")]);
        assert_eq!(unwrap_outcome(partial.update(&cx, db.connection(), &change).await), 1);

        let read = unwrap_outcome(partial.read(&cx, db.connection(), "KP1").await).expect("KP1 stored");
        assert_eq!(read.values, vec![Value::Null, Value::from("Jones")]);
        let read = unwrap_outcome(full.read(&cx, db.connection(), "KP1").await).expect("KP1 stored");
        assert_eq!(read.values, vec![Value::from("Ann"), Value::from("Jones")]);
    });
}

#[test]
fn repeated_templates_share_prepared_statements() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();

    rt.block_on(async {
        let conn = SqliteConnection::open_memory().expect("open sqlite memory db");
        let db = Database::new(conn, crm_model(), crm_catalogs(false), DatabaseOptions::new());
        unwrap_outcome(db.ensure_ddl(&cx).await);

        let mut template = db.template("KP", vec![0, 1]).expect("KP template");
        assert!(!unwrap_outcome(template.exists(&cx, db.connection(), "KP1").await));
        let kept = db.connection().prepared_statement_count();
        assert_eq!(kept, 1);

        for _ in 0..1000 {
            let mut template = db.template("KP", vec![0, 1]).expect("KP template");
            assert!(!unwrap_outcome(template.exists(&cx, db.connection(), "KP1").await));
        }
        assert_eq!(db.connection().prepared_statement_count(), kept);
    });
}
