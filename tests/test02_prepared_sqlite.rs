#![cfg(feature = "sqlite")]

use simple_db::prelude::*;

fn client() -> Result<PreparedClient, Box<dyn std::error::Error>> {
    let mut db = PreparedClient::connect(&ConnectOptions::sqlite(":memory:"))?;
    db.exec("CREATE TABLE people (id INTEGER PRIMARY KEY, name TEXT NOT NULL, age INTEGER)")?;
    for (name, age) in [("ann", 31), ("bo", 9), ("cy", 54)] {
        db.query(
            "INSERT INTO people (name, age) VALUES (:name, :age)",
            vec![("name", RowValues::from(name)), ("age", RowValues::Int(age))],
        )?;
    }
    Ok(db)
}

#[test]
fn test02_named_and_positional_binding() -> Result<(), Box<dyn std::error::Error>> {
    let mut db = client()?;

    let by_name = db.get(
        "SELECT name FROM people WHERE age > :min AND age < :max",
        vec![("min", RowValues::Int(10)), ("max", RowValues::Int(40))],
        0,
    )?;
    assert_eq!(by_name, Some(RowValues::Text("ann".into())));

    let positional = db.execute(
        "SELECT name, age FROM people WHERE age >= ?1 ORDER BY age",
        vec![RowValues::Int(31)],
    )?;
    let names: Vec<_> = positional
        .iter()
        .filter_map(|row| row.get("name").and_then(RowValues::as_text))
        .collect();
    assert_eq!(names, ["ann", "cy"]);

    let bare = db.get("SELECT age FROM people WHERE name = ?", [RowValues::from("bo")], 0)?;
    assert_eq!(bare, Some(RowValues::Int(9)));

    // a name used twice binds once
    let total = db.get(
        "SELECT :n + :n",
        vec![(":n", RowValues::Int(21))],
        0,
    )?;
    assert_eq!(total, Some(RowValues::Int(42)));

    assert!(matches!(
        db.query("SELECT :missing", vec![("other", RowValues::Int(1))]),
        Err(SimpleDbError::ParameterError(_))
    ));
    Ok(())
}

#[test]
fn test02_new_query_invalidates_previous_cursor() -> Result<(), Box<dyn std::error::Error>> {
    let mut db = client()?;

    let stmt = db.query("SELECT name FROM people ORDER BY id", ())?;
    assert!(stmt.fetch().is_some());
    assert_eq!(stmt.remaining(), 2);

    db.query("SELECT age FROM people WHERE name = 'cy'", ())?;
    let stmt = db.last_statement().ok_or("expected a statement")?;
    assert_eq!(stmt.column_names(), ["age"]);
    assert_eq!(stmt.fetch_column(0), Some(RowValues::Int(54)));
    assert!(stmt.fetch().is_none());
    assert_eq!(db.rows(), Some(1));
    Ok(())
}

#[test]
fn test02_empty_results_and_failures() -> Result<(), Box<dyn std::error::Error>> {
    let mut db = client()?;

    assert!(db.execute("SELECT * FROM people WHERE age > 100", ())?.is_empty());
    assert_eq!(db.sexecute("SELECT * FROM people WHERE age > 100", ())?, None);
    assert_eq!(db.get("SELECT name FROM people WHERE age > 100", (), 0)?, None);
    assert_eq!(db.get("SELECT name FROM people WHERE id = 1", (), 5)?, None);

    assert!(db.query_id("INSERT INTO nowhere (x) VALUES (1)", (), None).is_err());
    assert_eq!(db.rows(), None);

    let id = db.query_id(
        "INSERT INTO people (name, age) VALUES (?1, ?2)",
        vec![RowValues::from("dee"), RowValues::Null],
        None,
    )?;
    assert_eq!(id, 4);
    assert_eq!(db.last_id(None)?, 4);
    assert_eq!(db.rows(), Some(1));

    let row = db
        .sexecute("SELECT * FROM people WHERE id = ?1", vec![RowValues::Int(id)])?
        .ok_or("expected a row")?;
    assert!(row.get("age").is_some_and(RowValues::is_null));
    assert_eq!(row.to_json(), serde_json::json!({"id": 4, "name": "dee", "age": null}));
    Ok(())
}

#[test]
fn test02_transactions() -> Result<(), Box<dyn std::error::Error>> {
    let mut db = client()?;

    db.begin_transaction()?;
    assert!(db.in_transaction());
    db.exec("DELETE FROM people")?;
    db.rollback()?;
    assert!(!db.in_transaction());
    assert_eq!(db.get("SELECT count(*) FROM people", (), 0)?, Some(RowValues::Int(3)));

    db.begin_transaction()?;
    assert!(db.begin_transaction().is_err());
    assert_eq!(db.exec("UPDATE people SET age = age + 1")?, 3);
    db.commit()?;
    assert_eq!(
        db.get("SELECT age FROM people WHERE name = 'bo'", (), 0)?,
        Some(RowValues::Int(10))
    );
    assert!(db.commit().is_err());
    Ok(())
}

#[test]
fn test02_placeholder_translation() -> Result<(), Box<dyn std::error::Error>> {
    let options = ConnectOptions::builder()
        .engine(DatabaseType::Sqlite)
        .database(":memory:")
        .translation(true)
        .build()?;
    let mut db = PreparedClient::connect(&options)?;
    assert_eq!(db.engine(), Some(DatabaseType::Sqlite));

    let sum = db.get("SELECT $1 * $2", vec![RowValues::Int(6), RowValues::Int(7)], 0)?;
    assert_eq!(sum, Some(RowValues::Int(42)));
    assert_eq!(
        db.last_statement().map(|stmt| stmt.sql().to_string()),
        Some("SELECT ?1 * ?2".to_string())
    );
    Ok(())
}

#[test]
fn test02_connect_failure_carries_driver_text() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let missing = dir.path().join("absent").join("app.db");

    let err = PreparedClient::connect(&ConnectOptions::sqlite(missing.to_string_lossy()))
        .err()
        .ok_or("connect should fail")?;
    let message = err.to_string();
    assert!(message.starts_with("The website is temporarily unavailable (E#001 :: "));
    assert!(message.ends_with(")."));
    assert!(matches!(err, SimpleDbError::Unavailable { detail: Some(_), .. }));
    Ok(())
}

#[test]
fn test02_end_releases_everything() -> Result<(), Box<dyn std::error::Error>> {
    let mut db = client()?;
    db.query("SELECT * FROM people", ())?;
    db.end()?;
    assert!(db.last_statement().is_none());
    assert!(matches!(db.exec("SELECT 1"), Err(SimpleDbError::ConnectionClosed)));
    assert!(matches!(db.begin_transaction(), Err(SimpleDbError::ConnectionClosed)));
    Ok(())
}
