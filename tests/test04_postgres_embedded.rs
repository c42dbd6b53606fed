#![cfg(feature = "test-utils")]

use simple_db::prelude::*;
use simple_db::test_utils::{setup_postgres_embedded, stop_postgres_embedded};

#[test]
fn test04_postgres_clients() -> Result<(), Box<dyn std::error::Error>> {
    let embedded = setup_postgres_embedded("simple_db_test")?;
    let options = embedded.options.clone();

    let outcome = exercise(&options);
    stop_postgres_embedded(embedded);
    outcome
}

fn exercise(options: &ConnectOptions) -> Result<(), Box<dyn std::error::Error>> {
    legacy(options)?;
    prepared(options)?;
    connect_failures(options)?;
    Ok(())
}

fn legacy(options: &ConnectOptions) -> Result<(), Box<dyn std::error::Error>> {
    let mut db = LegacyClient::connect(options)?.with_debug(true);
    assert!(db.query(
        "CREATE TABLE legacy_items (id SERIAL PRIMARY KEY, label TEXT NOT NULL, qty INT4)",
        DEFAULT_SLOT
    ));
    assert_eq!(db.next_id("legacy_items", 0), Some(1));

    for (label, qty) in [("it's", 1), (r"back\slash", 2)] {
        let id = db.query_id(
            format!(
                "INSERT INTO legacy_items (label, qty) VALUES ('{}', {qty})",
                simple_db::escape::escape_literal(label)
            ),
            0,
        );
        assert_eq!(id, i64::from(qty));
        assert_eq!(
            db.get(format!("SELECT label FROM legacy_items WHERE id = {id}"), 1),
            Some(RowValues::Text(label.to_string()))
        );
    }
    assert_eq!(db.next_id("legacy_items", 0), Some(3));

    let insert = db
        .build(
            &[("label", RowValues::from("built")), ("qty", RowValues::Int(7))],
            "legacy_items",
            BuildAction::Insert,
            "",
        )?;
    assert_eq!(insert.query, r#"INSERT INTO "legacy_items" ("label", "qty") VALUES ($1, $2);"#);
    assert!(db.query(insert, 0));
    assert_eq!(db.rows(0), Some(1));
    assert_eq!(db.last_id(), 3);

    assert_eq!(db.execute("SELECT * FROM legacy_items WHERE qty > 100", 0), Some(vec![]));
    assert!(!db.query("SELECT * FROM nowhere", 0));
    assert!(matches!(db.last_error(), Some(SimpleDbError::PostgresError(_))));
    db.end();
    Ok(())
}

fn prepared(options: &ConnectOptions) -> Result<(), Box<dyn std::error::Error>> {
    let mut db = PreparedClient::connect(options)?;
    db.exec(
        "CREATE TABLE prepared_items (id BIGSERIAL PRIMARY KEY, label TEXT, price FLOAT4, \
         made TIMESTAMPTZ, tags JSONB)",
    )?;

    let made = chrono::NaiveDate::from_ymd_opt(2024, 5, 6)
        .and_then(|d| d.and_hms_opt(7, 8, 9))
        .ok_or("bad date")?;
    let id = db.query_id(
        "INSERT INTO prepared_items (label, price, made, tags) \
         VALUES (:label, :price, :made, :tags)",
        vec![
            ("label", RowValues::from("lamp")),
            ("price", RowValues::Float(12.5)),
            ("made", RowValues::Timestamp(made)),
            ("tags", RowValues::JSON(serde_json::json!(["a", "b"]))),
        ],
        Some("prepared_items_id_seq"),
    )?;
    assert_eq!(id, 1);

    let row = db
        .sexecute("SELECT * FROM prepared_items WHERE id = $1", vec![RowValues::Int(id)])?
        .ok_or("expected a row")?;
    assert_eq!(row.get("price"), Some(&RowValues::Float(12.5)));
    assert_eq!(row.get("made"), Some(&RowValues::Timestamp(made)));
    assert_eq!(row.get("tags"), Some(&RowValues::JSON(serde_json::json!(["a", "b"]))));

    db.begin_transaction()?;
    db.exec("DELETE FROM prepared_items")?;
    assert_eq!(db.call("inTransaction", &[])?, CallOutput::Bool(true));
    db.call("rollBack", &[])?;
    assert_eq!(
        db.get("SELECT count(*) FROM prepared_items", (), 0)?,
        Some(RowValues::Int(1))
    );

    db.exec("BEGIN")?;
    assert!(db.in_transaction());
    db.exec("DELETE FROM prepared_items")?;
    db.commit()?;
    assert!(!db.in_transaction());
    assert_eq!(
        db.get("SELECT count(*) FROM prepared_items", (), 0)?,
        Some(RowValues::Int(0))
    );

    db.call("exec", &["START TRANSACTION".into()])?;
    assert_eq!(db.call("inTransaction", &[])?, CallOutput::Bool(true));
    db.exec("ROLLBACK")?;
    assert!(!db.in_transaction());
    assert!(db.commit().is_err());

    assert!(db.query("SELECT * FROM nowhere", ()).is_err());
    assert!(db.last_statement().is_none());
    assert_eq!(db.get("SELECT 1 + 1", (), 0)?, Some(RowValues::Int(2)));
    db.end()?;
    Ok(())
}

fn connect_failures(options: &ConnectOptions) -> Result<(), Box<dyn std::error::Error>> {
    let mut missing_db = options.clone();
    missing_db.database = "no_such_database".to_string();

    let err = LegacyClient::connect(&missing_db).err().ok_or("connect should fail")?;
    assert_eq!(err.to_string(), "The website is temporarily unavailable (E#002).");

    let err = PreparedClient::connect(&missing_db).err().ok_or("connect should fail")?;
    assert!(err
        .to_string()
        .starts_with("The website is temporarily unavailable (E#002 :: "));

    let mut wrong_port = options.clone();
    wrong_port.port = Some(1);
    let err = LegacyClient::connect(&wrong_port).err().ok_or("connect should fail")?;
    assert_eq!(err.to_string(), "The website is temporarily unavailable (E#001).");
    Ok(())
}
