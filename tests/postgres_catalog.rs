#![cfg(feature = "postgres")]

//! Runs only when `REL_TEST_PG_DSN` points at a scratch database, e.g.
//! `REL_TEST_PG_DSN="host=localhost dbname=rel_test user=postgres" cargo test`.

use rel::demo::{self, RunOptions};
use rel::prelude::*;

fn pg_config() -> Option<DbConfig> {
    let dsn = std::env::var("REL_TEST_PG_DSN").ok()?;
    Some(
        DbConfig::postgres(PostgresOptions::from_dsn(dsn))
            .with_pool(PoolSettings::default().max_open(2)),
    )
}

const CREATE: RunOptions = RunOptions {
    create_schema: true,
    trace_sql: false,
};

// One entry point: every step truncates the shared catalog.
#[tokio::test]
async fn postgres_catalog() -> Result<(), Box<dyn std::error::Error>> {
    let Some(config) = pg_config() else {
        eprintln!("REL_TEST_PG_DSN not set; skipping");
        return Ok(());
    };
    both_walkthroughs_agree(&config).await?;
    dropped_transaction_rolls_back(&config).await?;
    timestamps_round_trip(&config).await?;
    timestamptz_columns_accept_timestamps(&config).await?;
    dropped_transaction_without_runtime_is_discarded(&config).await?;
    Ok(())
}

async fn both_walkthroughs_agree(config: &DbConfig) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open(config).await?;

    let orm_first = demo::orm::run(&db, CREATE).await?;
    let orm_second = demo::orm::run(&db, CREATE).await?;
    assert_eq!(orm_first, orm_second);

    let builder = demo::builder::run(&db, CREATE).await?;
    assert_eq!(builder.products, orm_first.products);
    assert_eq!(builder.specs, orm_first.specs);
    db.close();
    Ok(())
}

async fn dropped_transaction_rolls_back(config: &DbConfig) -> Result<(), Box<dyn std::error::Error>> {
    let config = config.clone().with_pool(PoolSettings::default().max_open(1));
    let db = Database::open(&config).await?;
    let mut conn = db.connection().await?;
    schema::create(&mut conn).await?;
    schema::truncate(&mut conn, schema::TABLES).await?;

    let dbmap = {
        let mut dbmap = DbMap::new(db.naming());
        dbmap.add_table::<Product>();
        dbmap
    };
    let mut tx = conn.begin().await?;
    demo::orm::create_product(&dbmap, &mut tx, "zip", "Zip").await?;
    drop(tx);
    // Single-connection pool: the checkout waits for the rollback to hand it back.
    let mut conn = db.connection().await?;
    assert_eq!(schema::count(&mut conn, "product").await?, 0);
    Ok(())
}

async fn timestamps_round_trip(config: &DbConfig) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open(config).await?;
    let mut conn = db.connection().await?;
    schema::create(&mut conn).await?;
    schema::truncate(&mut conn, schema::TABLES).await?;

    let mut dbmap = DbMap::new(db.naming());
    dbmap.add_table::<Product>();
    let at = chrono::NaiveDate::from_ymd_opt(2024, 1, 1)
        .and_then(|d| d.and_hms_micro_opt(8, 0, 0, 250_000))
        .expect("valid timestamp");
    dbmap.insert(&mut conn, &Product::new("foo", "Foo", at)).await?;

    let foo = dbmap
        .get::<Product, _>(&mut conn, &[RowValues::from("foo")])
        .await?
        .expect("foo exists");
    assert_eq!(foo.created_at, at);
    Ok(())
}

async fn timestamptz_columns_accept_timestamps(
    config: &DbConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open(config).await?;
    let mut conn = db.connection().await?;
    conn.execute_batch("CREATE TEMP TABLE stamped (id TEXT PRIMARY KEY, at TIMESTAMPTZ NOT NULL)")
        .await?;
    let at = chrono::NaiveDate::from_ymd_opt(2024, 1, 1)
        .and_then(|d| d.and_hms_micro_opt(8, 0, 0, 250_000))
        .expect("valid timestamp");
    let inserted = conn
        .dml(
            "INSERT INTO stamped (id, at) VALUES ($1, $2)",
            &[RowValues::from("foo"), RowValues::from(at)],
        )
        .await?;
    assert_eq!(inserted, 1);

    let rs = conn.select("SELECT at FROM stamped", &[]).await?;
    let back = rs.results[0].get("at").and_then(RowValues::as_timestamp);
    assert_eq!(back, Some(at));
    Ok(())
}

async fn dropped_transaction_without_runtime_is_discarded(
    config: &DbConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = config.clone().with_pool(PoolSettings::default().max_open(1));
    let db = Database::open(&config).await?;
    let mut conn = db.connection().await?;
    schema::create(&mut conn).await?;
    schema::truncate(&mut conn, schema::TABLES).await?;

    let dbmap = {
        let mut dbmap = DbMap::new(db.naming());
        dbmap.add_table::<Product>();
        dbmap
    };
    let mut tx = conn.begin().await?;
    demo::orm::create_product(&dbmap, &mut tx, "zip", "Zip").await?;
    std::thread::spawn(move || drop(tx))
        .join()
        .expect("drop thread");

    // The only pooled connection was discarded, so this one is fresh and outside the
    // abandoned transaction.
    let mut conn = db.connection().await?;
    assert_eq!(schema::count(&mut conn, "product").await?, 0);
    Ok(())
}
