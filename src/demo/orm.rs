//! Catalog walkthrough through [`DbMap`].

use chrono::NaiveDateTime;

use super::{RunOptions, Snapshot, log_images, log_products, log_specs, now};
use crate::entity::{Entity, JoinProjection};
use crate::error::{RelError, Stage};
use crate::executor::Executor;
use crate::models::{Category, Image, Product, ProductCategory, ProductImage, ProductSpec, Spec};
use crate::orm::DbMap;
use crate::pool::Database;
use crate::schema;
use crate::types::RowValues;

/// Registry used by the walkthrough.
///
/// # Errors
/// Returns `RelError::MissingColumn` if a key override names an unknown field.
pub fn catalog_map(db: &Database, options: RunOptions) -> Result<DbMap, RelError> {
    let mut dbmap = DbMap::new(db.naming());
    if options.trace_sql {
        dbmap.trace_on();
    }
    dbmap.add_table::<Category>();
    dbmap.add_table::<Image>();
    dbmap.add_table::<Product>().set_keys(&["id"])?;
    dbmap.add_table::<Spec>();
    dbmap.add_table::<ProductCategory>();
    Ok(dbmap)
}

/// Insert a product stamped with the current time.
///
/// # Errors
/// Returns the insert's error tagged `Insert`.
pub async fn create_product<E: Executor>(
    dbmap: &DbMap,
    exec: &mut E,
    id: &str,
    name: &str,
) -> Result<Product, RelError> {
    create_product_at(dbmap, exec, id, name, now()).await
}

/// Insert a product with both timestamps set to `at`.
///
/// # Errors
/// Returns the insert's error tagged `Insert`.
pub async fn create_product_at<E: Executor>(
    dbmap: &DbMap,
    exec: &mut E,
    id: &str,
    name: &str,
    at: NaiveDateTime,
) -> Result<Product, RelError> {
    let product = Product::new(id, name, at);
    dbmap
        .insert(exec, &product)
        .await
        .map_err(|e| e.during(Stage::Insert))?;
    Ok(product)
}

/// Every product, oldest first.
///
/// # Errors
/// Returns the query's error tagged `Select`.
pub async fn find_products<E: Executor>(
    dbmap: &DbMap,
    exec: &mut E,
) -> Result<Vec<Product>, RelError> {
    let sql = select_ordered::<Product>(dbmap, "created_at");
    let products: Vec<Product> = dbmap
        .select(exec, &sql, &[])
        .await
        .map_err(|e| e.during(Stage::Select))?;
    log_products(&products);
    Ok(products)
}

/// # Errors
/// Returns the insert's error tagged `Insert`.
pub async fn create_spec<E: Executor>(
    dbmap: &DbMap,
    exec: &mut E,
    id: &str,
    weight: i32,
    product_id: &str,
) -> Result<Spec, RelError> {
    let spec = Spec::new(id, weight, product_id);
    dbmap
        .insert(exec, &spec)
        .await
        .map_err(|e| e.during(Stage::Insert))?;
    Ok(spec)
}

/// Every spec, lightest first.
///
/// # Errors
/// Returns the query's error tagged `Select`.
pub async fn find_specs<E: Executor>(
    dbmap: &DbMap,
    exec: &mut E,
) -> Result<Vec<Spec>, RelError> {
    let sql = select_ordered::<Spec>(dbmap, "weight");
    let specs: Vec<Spec> = dbmap
        .select(exec, &sql, &[])
        .await
        .map_err(|e| e.during(Stage::Select))?;
    log_specs(&specs);
    Ok(specs)
}

/// # Errors
/// Returns the insert's error tagged `Insert`.
pub async fn create_image<E: Executor>(
    dbmap: &DbMap,
    exec: &mut E,
    id: &str,
    url: &str,
    product_id: &str,
) -> Result<Image, RelError> {
    let image = Image::new(id, url, product_id);
    dbmap
        .insert(exec, &image)
        .await
        .map_err(|e| e.during(Stage::Insert))?;
    Ok(image)
}

/// Every image, ordered by URL.
///
/// # Errors
/// Returns the query's error tagged `Select`.
pub async fn find_images<E: Executor>(
    dbmap: &DbMap,
    exec: &mut E,
) -> Result<Vec<Image>, RelError> {
    let sql = select_ordered::<Image>(dbmap, "url");
    let images: Vec<Image> = dbmap
        .select(exec, &sql, &[])
        .await
        .map_err(|e| e.during(Stage::Select))?;
    log_images(&images);
    Ok(images)
}

/// Specs heavier than `weight`, through a `:weight` named parameter.
///
/// # Errors
/// Returns the query's error tagged `Select`.
pub async fn find_specs_heavier_than<E: Executor>(
    dbmap: &DbMap,
    exec: &mut E,
    weight: i32,
) -> Result<Vec<Spec>, RelError> {
    let naming = dbmap.naming();
    let sql = format!(
        "select * from {table} where {col} > :weight order by {col}",
        table = Spec::table_name(naming),
        col = naming.column("weight"),
    );
    let specs: Vec<Spec> = dbmap
        .named_select(exec, &sql, &[("weight", weight.into())])
        .await
        .map_err(|e| e.during(Stage::Select))?;
    for spec in &specs {
        tracing::info!("Spec: {spec}");
    }
    Ok(specs)
}

/// One row per spec, paired with its product.
///
/// # Errors
/// Returns the query's error tagged `Join`.
pub async fn join_product_specs<E: Executor>(
    dbmap: &DbMap,
    exec: &mut E,
) -> Result<Vec<ProductSpec>, RelError> {
    let naming = dbmap.naming();
    let fields = JoinProjection::new(naming)
        .with::<Product>("p")
        .with::<Spec>("s")
        .to_sql()
        .map_err(|e| e.during(Stage::Join))?;
    let sql = format!(
        "SELECT {fields} FROM {product} p JOIN {spec} s ON p.{id} = s.{product_id} ORDER BY s.{weight}",
        product = Product::table_name(naming),
        spec = Spec::table_name(naming),
        id = naming.column("id"),
        product_id = naming.column("product_id"),
        weight = naming.column("weight"),
    );
    let rows: Vec<ProductSpec> = dbmap
        .select_joined(exec, &sql, &[], ("p", "s"))
        .await
        .map_err(|e| e.during(Stage::Join))?;
    for row in &rows {
        tracing::info!("{row}");
    }
    Ok(rows)
}

/// One row per image, paired with its product.
///
/// # Errors
/// Returns the query's error tagged `Join`.
pub async fn join_product_images<E: Executor>(
    dbmap: &DbMap,
    exec: &mut E,
) -> Result<Vec<ProductImage>, RelError> {
    let naming = dbmap.naming();
    let fields = JoinProjection::new(naming)
        .with::<Product>("p")
        .with::<Image>("i")
        .to_sql()
        .map_err(|e| e.during(Stage::Join))?;
    let sql = format!(
        "SELECT {fields} FROM {product} p JOIN {image} i ON p.{id} = i.{product_id} ORDER BY i.{url}",
        product = Product::table_name(naming),
        image = Image::table_name(naming),
        id = naming.column("id"),
        product_id = naming.column("product_id"),
        url = naming.column("url"),
    );
    let rows: Vec<ProductImage> = dbmap
        .select_joined(exec, &sql, &[], ("p", "i"))
        .await
        .map_err(|e| e.during(Stage::Join))?;
    for row in &rows {
        tracing::info!("{row}");
    }
    Ok(rows)
}

fn select_ordered<T: Entity>(dbmap: &DbMap, order_field: &str) -> String {
    let naming = dbmap.naming();
    format!(
        "select * from {} order by {}",
        T::table_name(naming),
        naming.column(order_field)
    )
}

/// Run the whole walkthrough and return the final catalog contents.
///
/// # Errors
/// Returns the first failing step's error, tagged with its stage.
pub async fn run(db: &Database, options: RunOptions) -> Result<Snapshot, RelError> {
    let dbmap = catalog_map(db, options)?;
    tracing::info!("{}", db.stats());

    let mut conn = db.connection().await.map_err(|e| e.during(Stage::Open))?;
    if options.create_schema {
        schema::create(&mut conn)
            .await
            .map_err(|e| e.during(Stage::Schema))?;
    }

    dbmap
        .truncate_tables(&mut conn)
        .await
        .map_err(|e| e.during(Stage::Truncate))?;

    create_product(&dbmap, &mut conn, "foo", "Foo").await?;
    create_product(&dbmap, &mut conn, "bar", "Barr").await?;
    find_products(&dbmap, &mut conn).await?;

    let mut tx = conn.begin().await.map_err(|e| e.during(Stage::Begin))?;
    create_product(&dbmap, &mut tx, "zip", "Zip").await?;
    let mut bar = dbmap
        .get::<Product, _>(&mut tx, &[RowValues::from("bar")])
        .await
        .map_err(|e| e.during(Stage::Select))?
        .ok_or_else(|| {
            RelError::NotFound {
                table: Product::table_name(dbmap.naming()),
                key: "bar".into(),
            }
            .during(Stage::Select)
        })?;
    bar.name = "Bar".into();
    dbmap
        .update(&mut tx, &bar)
        .await
        .map_err(|e| e.during(Stage::Update))?;
    let mut conn = tx.commit().await.map_err(|e| e.during(Stage::Commit))?;

    find_products(&dbmap, &mut conn).await?;

    create_spec(&dbmap, &mut conn, "fspec", 1, "foo").await?;
    create_spec(&dbmap, &mut conn, "bspec", 2, "bar").await?;
    create_spec(&dbmap, &mut conn, "zspec", 3, "zip").await?;
    find_specs(&dbmap, &mut conn).await?;

    find_specs_heavier_than(&dbmap, &mut conn, 1).await?;
    join_product_specs(&dbmap, &mut conn).await?;

    create_image(&dbmap, &mut conn, "fgif", "foo.gif", "foo").await?;
    create_image(&dbmap, &mut conn, "fpng", "foo.png", "foo").await?;
    find_images(&dbmap, &mut conn).await?;

    join_product_images(&dbmap, &mut conn).await?;

    Snapshot::capture(&mut conn)
        .await
        .map_err(|e| e.during(Stage::Select))
}
