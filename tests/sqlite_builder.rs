#![cfg(feature = "sqlite")]

mod common;

use common::{at, product_names, sqlite_catalog};
use rel::demo::{self, RunOptions};
use rel::prelude::*;

#[tokio::test]
async fn find_orders_filters_and_counts() -> Result<(), Box<dyn std::error::Error>> {
    let (db, _dir) = sqlite_catalog(2).await?;
    let session = Session::new(db.clone());
    {
        let mut conn = session.connection().await?;
        demo::builder::create_product_at(&mut conn, "foo", "Foo", at(8, 0, 0)).await?;
        demo::builder::create_product_at(&mut conn, "bar", "Barr", at(8, 0, 1)).await?;
        demo::builder::create_product_at(&mut conn, "zip", "Zip", at(8, 0, 2)).await?;
    }

    let products = session.collection("product");
    let newest_first: Vec<String> = products
        .find()
        .order_by("-created_at")
        .all::<Product>()
        .await?
        .into_iter()
        .map(|p| p.id)
        .collect();
    assert_eq!(newest_first, ["zip", "bar", "foo"]);

    let bar = products.find().where_eq("name", "Barr").one::<Product>().await?;
    assert_eq!(bar.map(|p| p.id).as_deref(), Some("bar"));
    assert!(products.find().where_eq("id", "ghost").one::<Product>().await?.is_none());

    assert_eq!(products.find().count().await?, 3);
    assert_eq!(products.find().where_eq("id", "foo").count().await?, 1);
    Ok(())
}

#[tokio::test]
async fn tx_commits_on_ok() -> Result<(), Box<dyn std::error::Error>> {
    let (db, _dir) = sqlite_catalog(2).await?;
    let session = Session::new(db.clone());
    {
        let mut conn = session.connection().await?;
        demo::builder::create_product(&mut conn, "bar", "Barr").await?;
    }

    demo::builder::rename_in_tx(&session).await?;

    let mut conn = session.connection().await?;
    assert_eq!(product_names(&mut conn).await?, ["bar:Bar", "zip:Zip"]);
    Ok(())
}

#[tokio::test]
async fn tx_rolls_back_and_returns_the_error() -> Result<(), Box<dyn std::error::Error>> {
    let (db, _dir) = sqlite_catalog(2).await?;
    let session = Session::new(db.clone());

    let err = session
        .tx(|tx| {
            Box::pin(async move {
                demo::builder::create_product(tx, "zip", "Zip").await?;
                // Unknown parent: the store rejects it.
                demo::builder::create_spec(tx, "zspec", 3, "nope").await?;
                Ok(())
            })
        })
        .await
        .unwrap_err();
    assert_eq!(err.stage(), Some(Stage::Insert));

    let mut conn = session.connection().await?;
    assert!(product_names(&mut conn).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn tx_returns_the_callback_value() -> Result<(), Box<dyn std::error::Error>> {
    let (db, _dir) = sqlite_catalog(1).await?;
    let session = Session::new(db);
    {
        let mut conn = session.connection().await?;
        demo::builder::create_product(&mut conn, "bar", "Barr").await?;
    }

    let renamed = session
        .tx(|tx| {
            Box::pin(async move {
                Update::table("product")
                    .set("name", "Bar")
                    .where_eq("id", "bar")
                    .exec(tx)
                    .await
            })
        })
        .await?;
    assert_eq!(renamed, 1);
    Ok(())
}

#[tokio::test]
async fn identifiers_are_validated() -> Result<(), Box<dyn std::error::Error>> {
    let (db, _dir) = sqlite_catalog(1).await?;
    let session = Session::new(db);

    let err = session
        .collection("product; DROP TABLE spec")
        .truncate()
        .await
        .unwrap_err();
    assert!(matches!(err, RelError::InvalidIdentifier(_)));

    let err = session
        .collection("product")
        .find()
        .order_by("name DESC, id")
        .all::<Product>()
        .await
        .unwrap_err();
    assert!(matches!(err, RelError::InvalidIdentifier(_)));

    let mut conn = session.connection().await?;
    assert_eq!(schema::count(&mut conn, "spec").await?, 0);
    Ok(())
}

#[tokio::test]
async fn whole_run_is_repeatable_and_matches_the_orm_run() -> Result<(), Box<dyn std::error::Error>> {
    let (db, _dir) = sqlite_catalog(1).await?;
    let first = demo::builder::run(&db, RunOptions::default()).await?;
    let second = demo::builder::run(&db, RunOptions::default()).await?;
    assert_eq!(first, second);
    assert!(first.images.is_empty());

    let orm = demo::orm::run(&db, RunOptions::default()).await?;
    assert_eq!(orm.products, first.products);
    assert_eq!(orm.specs, first.specs);
    Ok(())
}

#[tokio::test]
async fn camel_naming_flows_through_both_layers() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("camel.db");
    let config = DbConfig::sqlite(path.to_string_lossy().into_owned())
        .with_naming(NamingConvention::Camel);
    let db = Database::open(&config).await?;
    let options = RunOptions {
        create_schema: true,
        ..RunOptions::default()
    };

    let builder = demo::builder::run(&db, options).await?;
    let orm = demo::orm::run(&db, options).await?;
    assert_eq!(builder.products, orm.products);

    let mut conn = db.connection().await?;
    assert_eq!(schema::count(&mut conn, "productCategory").await?, 0);
    let rs = conn.select("SELECT createdAt FROM product", &[]).await?;
    assert_eq!(rs.len(), 3);
    Ok(())
}

#[tokio::test]
async fn reads_inside_tx_share_its_connection() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("catalog.db");
    let pool = PoolSettings::default()
        .max_open(1)
        .connection_timeout(std::time::Duration::from_secs(2));
    let db = Database::open(&DbConfig::sqlite(path.to_string_lossy().into_owned()).with_pool(pool))
        .await?;
    let session = Session::new(db);
    {
        let mut conn = session.connection().await?;
        schema::create(&mut conn).await?;
        demo::builder::create_product_at(&mut conn, "foo", "Foo", at(8, 0, 0)).await?;
    }

    let reader = session.clone();
    let (seen, count) = session
        .tx(move |tx| {
            Box::pin(async move {
                demo::builder::create_product_at(tx, "zip", "Zip", at(8, 0, 1)).await?;
                let products = reader.collection("product");
                let seen: Vec<String> = products
                    .find()
                    .order_by("created_at")
                    .all_in::<Product, _>(tx)
                    .await?
                    .into_iter()
                    .map(|p| p.id)
                    .collect();
                let count = products.find().count_in(tx).await?;
                Ok((seen, count))
            })
        })
        .await?;
    assert_eq!(seen, ["foo", "zip"]);
    assert_eq!(count, 2);
    Ok(())
}

#[tokio::test]
async fn rename_in_tx_rolls_back_without_the_row_to_rename() -> Result<(), Box<dyn std::error::Error>> {
    let (db, _dir) = sqlite_catalog(1).await?;
    let session = Session::new(db);

    let err = demo::builder::rename_in_tx(&session).await.unwrap_err();
    assert_eq!(err.stage(), Some(Stage::Select));

    let mut conn = session.connection().await?;
    assert!(product_names(&mut conn).await?.is_empty());
    Ok(())
}
