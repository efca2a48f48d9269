#![allow(dead_code)]

use rel::prelude::*;
use tempfile::TempDir;

/// File-backed catalog in a fresh temp dir. Keep the `TempDir` alive for the test.
pub async fn sqlite_catalog(max_open: u32) -> Result<(Database, TempDir), RelError> {
    let dir = tempfile::tempdir().map_err(|e| RelError::ConfigError(e.to_string()))?;
    let path = dir.path().join("catalog.db");
    let config = DbConfig::sqlite(path.to_string_lossy().into_owned())
        .with_pool(PoolSettings::default().max_open(max_open));
    let db = Database::open(&config).await?;
    let mut conn = db.connection().await?;
    schema::create(&mut conn).await?;
    Ok((db, dir))
}

pub fn at(hour: u32, minute: u32, second: u32) -> chrono::NaiveDateTime {
    chrono::NaiveDate::from_ymd_opt(2024, 1, 1)
        .and_then(|d| d.and_hms_opt(hour, minute, second))
        .expect("valid timestamp")
}

pub fn catalog_map() -> DbMap {
    let mut dbmap = DbMap::new(NamingConvention::Snake);
    dbmap.add_table::<Product>();
    dbmap.add_table::<Spec>();
    dbmap.add_table::<Image>();
    dbmap.add_table::<Category>();
    dbmap.add_table::<ProductCategory>();
    dbmap
}

pub async fn product_names(exec: &mut impl Executor) -> Result<Vec<String>, RelError> {
    let products: Vec<Product> = catalog_map()
        .select(exec, "SELECT * FROM product ORDER BY id", &[])
        .await?;
    Ok(products.into_iter().map(|p| format!("{}:{}", p.id, p.name)).collect())
}
