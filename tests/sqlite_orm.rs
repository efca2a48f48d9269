#![cfg(feature = "sqlite")]

mod common;

use common::{at, catalog_map, product_names, sqlite_catalog};
use rel::demo::{self, RunOptions};
use rel::prelude::*;

#[tokio::test]
async fn truncate_empties_every_table() -> Result<(), Box<dyn std::error::Error>> {
    let (db, _dir) = sqlite_catalog(2).await?;
    demo::orm::run(&db, RunOptions::default()).await?;

    let mut conn = db.connection().await?;
    assert_eq!(schema::count(&mut conn, "product").await?, 3);
    assert_eq!(schema::count(&mut conn, "image").await?, 2);

    catalog_map().truncate_tables(&mut conn).await?;
    for table in schema::TABLES {
        assert_eq!(schema::count(&mut conn, table).await?, 0, "{table}");
    }

    // Twice in a row is fine.
    catalog_map().truncate_tables(&mut conn).await?;
    Ok(())
}

#[tokio::test]
async fn products_come_back_in_creation_order() -> Result<(), Box<dyn std::error::Error>> {
    let (db, _dir) = sqlite_catalog(1).await?;
    let dbmap = catalog_map();
    let mut conn = db.connection().await?;

    demo::orm::create_product_at(&dbmap, &mut conn, "bar", "Barr", at(8, 0, 1)).await?;
    demo::orm::create_product_at(&dbmap, &mut conn, "foo", "Foo", at(8, 0, 0)).await?;

    let products = demo::orm::find_products(&dbmap, &mut conn).await?;
    let ids: Vec<&str> = products.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, ["foo", "bar"]);
    assert_eq!(products[0].created_at, at(8, 0, 0));
    Ok(())
}

#[tokio::test]
async fn committed_transaction_shows_insert_and_rename() -> Result<(), Box<dyn std::error::Error>> {
    let (db, _dir) = sqlite_catalog(1).await?;
    let dbmap = catalog_map();
    let mut conn = db.connection().await?;
    demo::orm::create_product(&dbmap, &mut conn, "foo", "Foo").await?;
    demo::orm::create_product(&dbmap, &mut conn, "bar", "Barr").await?;

    let mut tx = conn.begin().await?;
    assert!(tx.in_transaction());
    demo::orm::create_product(&dbmap, &mut tx, "zip", "Zip").await?;
    let mut bar = dbmap
        .get::<Product, _>(&mut tx, &[RowValues::from("bar")])
        .await?
        .expect("bar exists");
    bar.name = "Bar".into();
    assert_eq!(dbmap.update(&mut tx, &bar).await?, 1);
    let mut conn = tx.commit().await?;

    assert_eq!(product_names(&mut conn).await?, ["bar:Bar", "foo:Foo", "zip:Zip"]);
    Ok(())
}

#[tokio::test]
async fn rolled_back_transaction_shows_nothing() -> Result<(), Box<dyn std::error::Error>> {
    let (db, _dir) = sqlite_catalog(1).await?;
    let dbmap = catalog_map();
    let mut conn = db.connection().await?;
    demo::orm::create_product(&dbmap, &mut conn, "bar", "Barr").await?;

    let mut tx = conn.begin().await?;
    demo::orm::create_product(&dbmap, &mut tx, "zip", "Zip").await?;
    Update::table("product")
        .set("name", "Bar")
        .where_eq("id", "bar")
        .exec(&mut tx)
        .await?;
    let mut conn = tx.rollback().await?;

    assert_eq!(product_names(&mut conn).await?, ["bar:Barr"]);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn dropped_transaction_rolls_back() -> Result<(), Box<dyn std::error::Error>> {
    let (db, _dir) = sqlite_catalog(1).await?;
    let dbmap = catalog_map();
    {
        let mut tx = db.connection().await?.begin().await?;
        demo::orm::create_product(&dbmap, &mut tx, "zip", "Zip").await?;
    }

    // Single-connection pool: the checkout waits until the rollback has returned it.
    let mut conn = db.connection().await?;
    assert!(!conn.in_transaction());
    assert!(product_names(&mut conn).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn missing_rows_and_unmapped_types() -> Result<(), Box<dyn std::error::Error>> {
    let (db, _dir) = sqlite_catalog(1).await?;
    let mut conn = db.connection().await?;

    let mut dbmap = DbMap::new(NamingConvention::Snake);
    dbmap.add_table::<Product>();

    let none = dbmap
        .get::<Product, _>(&mut conn, &[RowValues::from("ghost")])
        .await?;
    assert!(none.is_none());

    let ghost = Product::new("ghost", "Ghost", at(9, 0, 0));
    let err = dbmap.update(&mut conn, &ghost).await.unwrap_err();
    assert!(matches!(err, RelError::NotFound { ref key, .. } if key == "\"ghost\""));

    let err = dbmap.insert(&mut conn, &Spec::new("s", 1, "ghost")).await.unwrap_err();
    assert!(matches!(err, RelError::UnmappedEntity("Spec")));

    // Decoding needs only the field list, so plain selects work unregistered.
    let specs: Vec<Spec> = dbmap.select(&mut conn, "SELECT * FROM spec", &[]).await?;
    assert!(specs.is_empty());
    Ok(())
}

#[tokio::test]
async fn foreign_keys_are_enforced() -> Result<(), Box<dyn std::error::Error>> {
    let (db, _dir) = sqlite_catalog(1).await?;
    let dbmap = catalog_map();
    let mut conn = db.connection().await?;

    let err = demo::orm::create_spec(&dbmap, &mut conn, "orphan", 1, "nope")
        .await
        .unwrap_err();
    assert_eq!(err.stage(), Some(Stage::Insert));
    assert!(!err.is_transient());
    assert!(err.to_string().starts_with("Insert: "));
    Ok(())
}

#[tokio::test]
async fn specs_sort_by_weight_and_filter_by_name() -> Result<(), Box<dyn std::error::Error>> {
    let (db, _dir) = sqlite_catalog(1).await?;
    let dbmap = catalog_map();
    let mut conn = db.connection().await?;
    for (id, name) in [("foo", "Foo"), ("bar", "Bar"), ("zip", "Zip")] {
        demo::orm::create_product(&dbmap, &mut conn, id, name).await?;
    }
    demo::orm::create_spec(&dbmap, &mut conn, "zspec", 3, "zip").await?;
    demo::orm::create_spec(&dbmap, &mut conn, "fspec", 1, "foo").await?;
    demo::orm::create_spec(&dbmap, &mut conn, "bspec", 2, "bar").await?;

    let weights: Vec<i32> = demo::orm::find_specs(&dbmap, &mut conn)
        .await?
        .iter()
        .map(|s| s.weight)
        .collect();
    assert_eq!(weights, [1, 2, 3]);

    let heavy = demo::orm::find_specs_heavier_than(&dbmap, &mut conn, 1).await?;
    let ids: Vec<&str> = heavy.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, ["bspec", "zspec"]);
    Ok(())
}

#[tokio::test]
async fn joins_pair_each_child_with_its_product() -> Result<(), Box<dyn std::error::Error>> {
    let (db, _dir) = sqlite_catalog(1).await?;
    let dbmap = catalog_map();
    let mut conn = db.connection().await?;
    demo::orm::create_product_at(&dbmap, &mut conn, "foo", "Foo", at(8, 0, 0)).await?;
    demo::orm::create_product_at(&dbmap, &mut conn, "bar", "Bar", at(8, 0, 1)).await?;
    demo::orm::create_spec(&dbmap, &mut conn, "fspec", 1, "foo").await?;
    demo::orm::create_spec(&dbmap, &mut conn, "bspec", 2, "bar").await?;
    demo::orm::create_image(&dbmap, &mut conn, "fpng", "foo.png", "foo").await?;
    demo::orm::create_image(&dbmap, &mut conn, "fgif", "foo.gif", "foo").await?;

    let specs = demo::orm::join_product_specs(&dbmap, &mut conn).await?;
    assert_eq!(specs.len(), 2);
    for row in &specs {
        assert_eq!(row.left.id, row.right.product_id);
    }
    assert_eq!(specs[0].left.created_at, at(8, 0, 0));
    assert_eq!(specs[1].left.name, "Bar");

    let images = demo::orm::join_product_images(&dbmap, &mut conn).await?;
    let pairs: Vec<(String, String)> = images
        .into_iter()
        .map(|row| (row.left.id, row.right.url))
        .collect();
    assert_eq!(
        pairs,
        [
            ("foo".to_string(), "foo.gif".to_string()),
            ("foo".to_string(), "foo.png".to_string())
        ]
    );
    Ok(())
}

#[tokio::test]
async fn whole_run_is_repeatable() -> Result<(), Box<dyn std::error::Error>> {
    let (db, _dir) = sqlite_catalog(2).await?;
    let first = demo::orm::run(&db, RunOptions::default()).await?;
    let traced = RunOptions {
        trace_sql: true,
        ..RunOptions::default()
    };
    let second = demo::orm::run(&db, traced).await?;
    assert_eq!(first, second);

    let products: Vec<(&str, &str)> = first
        .products
        .iter()
        .map(|(id, name)| (id.as_str(), name.as_str()))
        .collect();
    assert_eq!(products, [("bar", "Bar"), ("foo", "Foo"), ("zip", "Zip")]);
    assert_eq!(first.specs.len(), 3);
    assert_eq!(first.images.len(), 2);

    let stats = db.stats();
    assert_eq!(stats.max_open, 2);
    assert!(stats.to_string().starts_with("Settings: ConnMaxLifetime: 30m"));
    db.close();
    Ok(())
}

#[tokio::test]
async fn creates_schema_on_an_empty_database() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("fresh.db");
    let db = Database::open(&DbConfig::sqlite(path.to_string_lossy().into_owned())).await?;
    let options = RunOptions {
        create_schema: true,
        ..RunOptions::default()
    };
    let snapshot = demo::orm::run(&db, options).await?;
    assert_eq!(snapshot.products.len(), 3);
    Ok(())
}

#[tokio::test]
async fn unusable_pool_settings_fail_to_open() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("catalog.db").to_string_lossy().into_owned();
    let zero_open = PoolSettings {
        max_open: 0,
        ..PoolSettings::default()
    };
    let bad = [
        PoolSettings::default().max_open(2).min_idle(Some(5)),
        PoolSettings::default().max_lifetime(Some(std::time::Duration::ZERO)),
        PoolSettings::default().connection_timeout(std::time::Duration::ZERO),
        zero_open,
    ];
    for settings in bad {
        let err = Database::open(&DbConfig::sqlite(path.clone()).with_pool(settings))
            .await
            .unwrap_err();
        assert!(matches!(err, RelError::ConfigError(_)), "{settings:?}: {err}");
    }
    Ok(())
}
