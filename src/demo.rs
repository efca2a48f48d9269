//! The two catalog walkthroughs: one through [`DbMap`](crate::orm::DbMap), one through
//! the [`builder`](crate::builder) layer.
//!
//! Both run truncate, insert, read, a transactional rename, more inserts and reads, in
//! that order, logging each read. The first failing step ends the run with an error
//! tagged by its [`Stage`](crate::error::Stage).

pub mod builder;
pub mod orm;

use serde::Serialize;

use crate::error::RelError;
use crate::executor::Executor;
use crate::models::{Image, Product, Spec};
use crate::orm::DbMap;

/// Switches shared by both walkthroughs.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct RunOptions {
    /// Create missing catalog tables before truncating.
    pub create_schema: bool,
    /// Log generated SQL on the `rel::sql` target.
    pub trace_sql: bool,
}

/// Catalog contents without timestamps, for comparing runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    /// `(id, name)`
    pub products: Vec<(String, String)>,
    /// `(id, weight, product_id)`
    pub specs: Vec<(String, i32, String)>,
    /// `(id, url, product_id)`
    pub images: Vec<(String, String, String)>,
}

impl Snapshot {
    /// Read the catalog ordered by id.
    ///
    /// # Errors
    /// Returns the first failing query's error.
    pub async fn capture<E: Executor>(exec: &mut E) -> Result<Self, RelError> {
        let naming = exec.naming();
        let dbmap = DbMap::new(naming);
        let by_id = |type_name: &str| {
            format!(
                "SELECT * FROM {} ORDER BY {}",
                naming.table(type_name),
                naming.column("id")
            )
        };

        let products: Vec<Product> = dbmap.select(exec, &by_id("Product"), &[]).await?;
        let specs: Vec<Spec> = dbmap.select(exec, &by_id("Spec"), &[]).await?;
        let images: Vec<Image> = dbmap.select(exec, &by_id("Image"), &[]).await?;

        Ok(Self {
            products: products.into_iter().map(|p| (p.id, p.name)).collect(),
            specs: specs
                .into_iter()
                .map(|s| (s.id, s.weight, s.product_id))
                .collect(),
            images: images
                .into_iter()
                .map(|i| (i.id, i.url, i.product_id))
                .collect(),
        })
    }
}

pub(crate) fn log_products(products: &[Product]) {
    let values: Vec<String> = products.iter().map(|p| format!("{}:{}", p.id, p.name)).collect();
    tracing::info!("Products: [{}]", values.join(", "));
}

pub(crate) fn log_specs(specs: &[Spec]) {
    let values: Vec<String> = specs.iter().map(|s| format!("{}:{}", s.id, s.weight)).collect();
    tracing::info!("Specs: [{}]", values.join(", "));
}

pub(crate) fn log_images(images: &[Image]) {
    let values: Vec<String> = images.iter().map(|i| format!("{}:{}", i.id, i.url)).collect();
    tracing::info!("Images: [{}]", values.join(", "));
}

pub(crate) fn now() -> chrono::NaiveDateTime {
    chrono::Utc::now().naive_utc()
}
