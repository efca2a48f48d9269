//! Catalog walkthrough through [`Session`] and the statement builders.

use chrono::NaiveDateTime;

use super::{RunOptions, Snapshot, log_products, log_specs, now};
use crate::builder::{Collection, InsertInto, Session, Update};
use crate::error::{RelError, Stage};
use crate::executor::Executor;
use crate::models::{Product, Spec};
use crate::pool::Database;
use crate::schema;
use crate::types::RowValues;

/// Insert a product stamped with the current time.
///
/// # Errors
/// Returns the insert's error tagged `Insert`.
pub async fn create_product<E: Executor>(
    exec: &mut E,
    id: &str,
    name: &str,
) -> Result<Product, RelError> {
    create_product_at(exec, id, name, now()).await
}

/// Insert a product with both timestamps set to `at`.
///
/// # Errors
/// Returns the insert's error tagged `Insert`.
pub async fn create_product_at<E: Executor>(
    exec: &mut E,
    id: &str,
    name: &str,
    at: NaiveDateTime,
) -> Result<Product, RelError> {
    let product = Product::new(id, name, at);
    InsertInto::table(exec.naming().table("product"))
        .values(&product)
        .exec(exec)
        .await
        .map_err(|e| e.during(Stage::Insert))?;
    Ok(product)
}

/// Every product of `collection`, oldest first.
///
/// # Errors
/// Returns the query's error tagged `Select`.
pub async fn find_products(collection: &Collection<'_>) -> Result<Vec<Product>, RelError> {
    let products = collection
        .find()
        .order_by(&collection.naming().column("created_at"))
        .all::<Product>()
        .await
        .map_err(|e| e.during(Stage::Select))?;
    log_products(&products);
    Ok(products)
}

/// # Errors
/// Returns the insert's error tagged `Insert`.
pub async fn create_spec<E: Executor>(
    exec: &mut E,
    id: &str,
    weight: i32,
    product_id: &str,
) -> Result<Spec, RelError> {
    let spec = Spec::new(id, weight, product_id);
    InsertInto::table(exec.naming().table("spec"))
        .values(&spec)
        .exec(exec)
        .await
        .map_err(|e| e.during(Stage::Insert))?;
    Ok(spec)
}

/// Every spec of `collection`, lightest first.
///
/// # Errors
/// Returns the query's error tagged `Select`.
pub async fn find_specs(collection: &Collection<'_>) -> Result<Vec<Spec>, RelError> {
    let specs = collection
        .find()
        .order_by(&collection.naming().column("weight"))
        .all::<Spec>()
        .await
        .map_err(|e| e.during(Stage::Select))?;
    log_specs(&specs);
    Ok(specs)
}

/// Insert `zip`, read `bar` back and rename it to `Bar`, all in one transaction.
///
/// # Errors
/// Returns the failing statement's error after rolling back.
pub async fn rename_in_tx(session: &Session) -> Result<(), RelError> {
    let reader = session.clone();
    session
        .tx(move |tx| {
            Box::pin(async move {
                create_product(tx, "zip", "Zip").await?;
                let naming = tx.naming();
                let table = naming.table("product");
                let id_column = naming.column("id");
                let bar = reader
                    .collection(&table)
                    .find()
                    .where_eq(&id_column, "bar")
                    .one_in::<Product, _>(tx)
                    .await
                    .map_err(|e| e.during(Stage::Select))?
                    .ok_or_else(|| {
                        RelError::NotFound {
                            table: table.clone(),
                            key: RowValues::from("bar").to_string(),
                        }
                        .during(Stage::Select)
                    })?;
                Update::table(table.as_str())
                    .set(&naming.column("name"), "Bar")
                    .where_eq(&id_column, bar.id.as_str())
                    .exec(tx)
                    .await
                    .map_err(|e| e.during(Stage::Update))?;
                Ok(())
            })
        })
        .await
}

/// Run the whole walkthrough and return the final catalog contents.
///
/// Connections are checked out per step, so a single-connection pool is enough.
///
/// # Errors
/// Returns the first failing step's error, tagged with its stage.
pub async fn run(db: &Database, options: RunOptions) -> Result<Snapshot, RelError> {
    let session = Session::new(db.clone());
    let naming = db.naming();
    tracing::info!("{}", db.stats());

    if options.create_schema {
        let mut conn = session.connection().await.map_err(|e| e.during(Stage::Open))?;
        schema::create(&mut conn)
            .await
            .map_err(|e| e.during(Stage::Schema))?;
    }

    for name in schema::TABLES.iter().rev() {
        session
            .collection(&naming.table(name))
            .truncate()
            .await
            .map_err(|e| e.during(Stage::Truncate))?;
    }

    let products = session.collection(&naming.table("product"));
    {
        let mut conn = session.connection().await.map_err(|e| e.during(Stage::Open))?;
        create_product(&mut conn, "foo", "Foo").await?;
        create_product(&mut conn, "bar", "Barr").await?;
    }
    find_products(&products).await?;

    rename_in_tx(&session).await?;

    find_products(&products).await?;

    {
        let mut conn = session.connection().await.map_err(|e| e.during(Stage::Open))?;
        create_spec(&mut conn, "fspec", 1, "foo").await?;
        create_spec(&mut conn, "bspec", 2, "bar").await?;
        create_spec(&mut conn, "zspec", 3, "zip").await?;
    }
    find_specs(&session.collection(&naming.table("spec"))).await?;

    let mut conn = session.connection().await.map_err(|e| e.during(Stage::Open))?;
    Snapshot::capture(&mut conn)
        .await
        .map_err(|e| e.during(Stage::Select))
}
