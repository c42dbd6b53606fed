//! Walk through both clients against one database.
//!
//! ```text
//! cargo run --example sample -- --engine sqlite --database :memory:
//! RUST_LOG=simple_db=debug cargo run --example sample -- --engine postgres \
//!     --host localhost --database app --user app --password secret
//! ```

use std::path::PathBuf;

use clap::Parser;
use simple_db::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Run the sample queries with the legacy and prepared clients")]
struct Args {
    /// Database engine
    #[arg(long, value_enum, default_value_t = DatabaseType::default())]
    engine: DatabaseType,

    /// Read connection options from a JSON file instead of the flags below
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, default_value = ":memory:")]
    database: String,

    #[arg(long, default_value = "localhost")]
    host: String,

    #[arg(long)]
    port: Option<u16>,

    #[arg(long, default_value = "")]
    user: String,

    #[arg(long, default_value = "")]
    password: String,

    /// Log failing SQL from the legacy client
    #[arg(long)]
    debug: bool,
}

impl Args {
    fn options(&self) -> Result<ConnectOptions, Box<dyn std::error::Error>> {
        if let Some(path) = &self.config {
            return Ok(ConnectOptions::from_json(&std::fs::read_to_string(path)?)?);
        }
        let mut builder = ConnectOptions::builder()
            .engine(self.engine)
            .host(&self.host)
            .database(&self.database)
            .user(&self.user)
            .password(&self.password);
        if let Some(port) = self.port {
            builder = builder.port(port);
        }
        Ok(builder.build()?)
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let options = args.options()?;

    legacy(&options, args.debug)?;
    prepared(&options)?;
    Ok(())
}

fn setup_sql(engine: DatabaseType) -> &'static str {
    match engine {
        #[cfg(feature = "sqlite")]
        DatabaseType::Sqlite => {
            "CREATE TABLE IF NOT EXISTS sample (id INTEGER PRIMARY KEY, field TEXT, this TEXT)"
        }
        #[cfg(feature = "postgres")]
        DatabaseType::Postgres => {
            "CREATE TABLE IF NOT EXISTS sample (id SERIAL PRIMARY KEY, field TEXT, this TEXT)"
        }
    }
}

fn legacy(options: &ConnectOptions, debug: bool) -> Result<(), Box<dyn std::error::Error>> {
    let mut db = LegacyClient::connect_or_exit(options).with_debug(debug);
    // A second, independent connection, e.g. to another database.
    let mut db2 = LegacyClient::connect_or_exit(options).with_debug(debug);

    for client in [&mut db, &mut db2] {
        if !client.query(setup_sql(options.engine), DEFAULT_SLOT) {
            return Err(format!("setup failed: {:?}", client.last_error()).into());
        }
    }
    let seed = db.build(
        &[("field", RowValues::from("bar")), ("this", RowValues::from("that"))],
        "sample",
        BuildAction::Insert,
        "",
    )?;
    let id = db.query_id(seed, DEFAULT_SLOT);
    println!("inserted id {id}, next id {:?}", db.next_id("sample", 1));

    let variable = "foo";

    // one row
    let row = db.sexecute(
        format!(
            "SELECT * FROM sample WHERE field = '{}' LIMIT 1",
            db.prepare(variable)
        ),
        DEFAULT_SLOT,
    );
    println!("{}", row.map_or(serde_json::Value::Null, |r| r.to_json()));

    // up to five rows
    let rows = db.execute("SELECT * FROM sample LIMIT 5", DEFAULT_SLOT).unwrap_or_default();
    let rows: Vec<_> = rows.iter().map(DbRow::to_json).collect();
    println!("{}", serde_json::to_string_pretty(&rows)?);

    // no results wanted
    let update = format!(
        "UPDATE sample SET field = '{}' WHERE this = 'that'",
        db2.prepare(variable)
    );
    if db2.query(update, DEFAULT_SLOT) {
        println!("updated {} row(s)", db2.rows(DEFAULT_SLOT).unwrap_or(0));
    }

    db.end();
    db2.end();
    Ok(())
}

fn prepared(options: &ConnectOptions) -> Result<(), Box<dyn std::error::Error>> {
    let mut db = PreparedClient::connect_or_exit(options);
    db.exec(setup_sql(options.engine))?;

    let row = db.sexecute(
        "SELECT * FROM sample WHERE field = :field LIMIT 1",
        vec![("field", RowValues::from("foo"))],
    )?;
    println!("{}", row.map_or(serde_json::Value::Null, |r| r.to_json()));

    db.begin_transaction()?;
    db.query(
        "UPDATE sample SET field = :field WHERE this = :this",
        vec![("field", RowValues::from("baz")), ("this", RowValues::from("that"))],
    )?;
    println!("updated {} row(s) in a transaction", db.rows().unwrap_or(0));
    db.call("rollBack", &[])?;

    match db.call("getAttribute", &[]) {
        Ok(output) => println!("{output}"),
        Err(err) => println!("{err}"),
    }
    db.end()?;
    Ok(())
}
