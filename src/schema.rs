//! Catalog tables: creation, truncation and row counts.

use crate::entity::Entity;
use crate::error::RelError;
use crate::executor::Executor;
use crate::models::{Category, Image, Product, ProductCategory, Spec};
use crate::naming::{NamingConvention, check_identifier, to_snake_case};
use crate::types::Dialect;

/// Catalog tables, parents before the tables that reference them.
pub const TABLES: &[&str] = &["product", "category", "spec", "image", "product_category"];

#[derive(Clone, Copy)]
enum ColumnType {
    Text,
    Integer,
    Timestamp,
}

impl ColumnType {
    fn sql(self, dialect: Dialect) -> &'static str {
        match (self, dialect) {
            (ColumnType::Text, _) => "TEXT",
            (ColumnType::Integer, _) => "INTEGER",
            (ColumnType::Timestamp, Dialect::Postgres) => "TIMESTAMP",
            // Fixed-width text, see `TIMESTAMP_TEXT_FORMAT`.
            (ColumnType::Timestamp, Dialect::Sqlite) => "TEXT",
        }
    }
}

struct TableDef {
    type_name: &'static str,
    fields: &'static [&'static str],
    types: &'static [ColumnType],
    keys: &'static [&'static str],
    /// `(field, referenced type)`; the referenced column is always `id`.
    references: &'static [(&'static str, &'static str)],
}

const DEFINITIONS: &[TableDef] = &[
    TableDef {
        type_name: Product::TYPE_NAME,
        fields: Product::FIELDS,
        types: &[
            ColumnType::Text,
            ColumnType::Text,
            ColumnType::Timestamp,
            ColumnType::Timestamp,
        ],
        keys: Product::KEYS,
        references: &[],
    },
    TableDef {
        type_name: Category::TYPE_NAME,
        fields: Category::FIELDS,
        types: &[ColumnType::Text, ColumnType::Text],
        keys: Category::KEYS,
        references: &[],
    },
    TableDef {
        type_name: Spec::TYPE_NAME,
        fields: Spec::FIELDS,
        types: &[ColumnType::Text, ColumnType::Integer, ColumnType::Text],
        keys: Spec::KEYS,
        references: &[("product_id", Product::TYPE_NAME)],
    },
    TableDef {
        type_name: Image::TYPE_NAME,
        fields: Image::FIELDS,
        types: &[ColumnType::Text, ColumnType::Text, ColumnType::Text],
        keys: Image::KEYS,
        references: &[("product_id", Product::TYPE_NAME)],
    },
    TableDef {
        type_name: ProductCategory::TYPE_NAME,
        fields: ProductCategory::FIELDS,
        types: &[ColumnType::Text, ColumnType::Text],
        keys: ProductCategory::KEYS,
        references: &[
            ("product_id", Product::TYPE_NAME),
            ("category_id", Category::TYPE_NAME),
        ],
    },
];

impl TableDef {
    fn create_statement(&self, dialect: Dialect, naming: NamingConvention) -> String {
        let mut parts: Vec<String> = self
            .fields
            .iter()
            .zip(self.types)
            .map(|(field, ty)| format!("{} {} NOT NULL", naming.column(field), ty.sql(dialect)))
            .collect();
        let keys: Vec<String> = self.keys.iter().map(|k| naming.column(k)).collect();
        parts.push(format!("PRIMARY KEY ({})", keys.join(", ")));
        for (field, target) in self.references {
            parts.push(format!(
                "FOREIGN KEY ({}) REFERENCES {} ({})",
                naming.column(field),
                naming.table(target),
                naming.column("id")
            ));
        }
        format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            naming.table(self.type_name),
            parts.join(", ")
        )
    }
}

/// Create the catalog tables that do not exist yet.
///
/// # Errors
/// Returns `RelError` if a statement fails.
pub async fn create<E: Executor>(exec: &mut E) -> Result<(), RelError> {
    let dialect = exec.dialect();
    let naming = exec.naming();
    let ddl: Vec<String> = DEFINITIONS
        .iter()
        .map(|def| def.create_statement(dialect, naming))
        .collect();
    exec.execute_batch(&format!("{};", ddl.join(";\n"))).await?;
    tracing::debug!(tables = DEFINITIONS.len(), "schema ready");
    Ok(())
}

/// Remove every row from each of `tables`.
///
/// Known catalog tables are emptied children first so foreign keys never block the
/// delete; other names go before them in the order given.
///
/// # Errors
/// Returns `RelError::InvalidIdentifier` for a bad table name, or the statement's error.
pub async fn truncate<E: Executor>(exec: &mut E, tables: &[&str]) -> Result<(), RelError> {
    for table in tables {
        check_identifier(table)?;
    }

    let mut ordered = tables.to_vec();
    ordered.sort_by_key(|table| {
        let snake = to_snake_case(table);
        TABLES
            .iter()
            .position(|known| *known == snake)
            .map_or(0, |pos| TABLES.len() - pos)
    });

    let dialect = exec.dialect();
    for table in ordered {
        exec.execute_batch(&dialect.truncate_statement(table)).await?;
        tracing::debug!(table, "truncated");
    }
    Ok(())
}

/// Number of rows in `table`.
///
/// # Errors
/// Returns `RelError::InvalidIdentifier` for a bad table name, or the query's error.
pub async fn count<E: Executor>(exec: &mut E, table: &str) -> Result<i64, RelError> {
    let table = check_identifier(table)?;
    let rs = exec
        .select(&format!("SELECT COUNT(*) AS n FROM {table}"), &[])
        .await?;
    rs.results
        .first()
        .and_then(|row| row.get_by_index(0))
        .and_then(|v| v.as_int().copied())
        .ok_or_else(|| RelError::ExecutionError(format!("COUNT on {table} returned no integer")))
}
