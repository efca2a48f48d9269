//! Struct-mapping access: register record types once, then insert, fetch and update
//! whole records.
//!
//! ```rust,no_run
//! use rel::prelude::*;
//!
//! # async fn demo(db: &Database) -> Result<(), RelError> {
//! let mut dbmap = DbMap::new(db.naming());
//! dbmap.add_table::<Product>().set_keys(&["id"])?;
//! dbmap.add_table::<Spec>();
//!
//! let mut conn = db.connection().await?;
//! let now = chrono::Utc::now().naive_utc();
//! dbmap.insert(&mut conn, &Product::new("foo", "Foo", now)).await?;
//! let foo = dbmap.get::<Product, _>(&mut conn, &[RowValues::from("foo")]).await?;
//! # let _ = foo;
//! # Ok(())
//! # }
//! ```

use crate::entity::{Entity, Joined, RowReader, decode_all};
use crate::error::RelError;
use crate::executor::Executor;
use crate::named::NamedQuery;
use crate::naming::{NamingConvention, check_identifier};
use crate::schema;
use crate::types::RowValues;

/// Table registered for one record type.
#[derive(Debug, Clone)]
pub struct TableMap {
    type_name: &'static str,
    table: String,
    fields: &'static [&'static str],
    columns: Vec<String>,
    /// Indices into `fields` of the key fields.
    keys: Vec<usize>,
}

impl TableMap {
    fn new<T: Entity>(naming: NamingConvention) -> Self {
        let keys = T::KEYS
            .iter()
            .filter_map(|key| T::FIELDS.iter().position(|f| f == key))
            .collect();
        Self {
            type_name: T::TYPE_NAME,
            table: T::table_name(naming),
            fields: T::FIELDS,
            columns: T::column_names(naming),
            keys,
        }
    }

    /// Replace the key fields.
    ///
    /// # Errors
    /// Returns `RelError::ExecutionError` for an empty key list and
    /// `RelError::MissingColumn` if a name is not a field of the record.
    pub fn set_keys(&mut self, keys: &[&str]) -> Result<&mut Self, RelError> {
        if keys.is_empty() {
            return Err(RelError::ExecutionError(format!(
                "{} needs at least one key field",
                self.type_name
            )));
        }
        let mut positions = Vec::with_capacity(keys.len());
        for key in keys {
            let pos = self
                .fields
                .iter()
                .position(|f| f == key)
                .ok_or_else(|| RelError::MissingColumn(format!("{}.{key}", self.type_name)))?;
            positions.push(pos);
        }
        self.keys = positions;
        Ok(self)
    }

    #[must_use]
    pub fn table_name(&self) -> &str {
        &self.table
    }

    /// Key column names.
    #[must_use]
    pub fn key_columns(&self) -> Vec<&str> {
        self.keys.iter().map(|&i| self.columns[i].as_str()).collect()
    }

    fn is_key(&self, index: usize) -> bool {
        self.keys.contains(&index)
    }
}

/// Registry of record types and the tables they map to.
#[derive(Debug, Clone)]
pub struct DbMap {
    naming: NamingConvention,
    tables: Vec<TableMap>,
    trace: bool,
}

impl DbMap {
    #[must_use]
    pub fn new(naming: NamingConvention) -> Self {
        Self {
            naming,
            tables: Vec::new(),
            trace: false,
        }
    }

    #[must_use]
    pub fn naming(&self) -> NamingConvention {
        self.naming
    }

    /// Register `T`, replacing an earlier registration of the same type.
    pub fn add_table<T: Entity>(&mut self) -> &mut TableMap {
        let map = TableMap::new::<T>(self.naming);
        let index = match self.tables.iter().position(|t| t.type_name == T::TYPE_NAME) {
            Some(index) => {
                self.tables[index] = map;
                index
            }
            None => {
                self.tables.push(map);
                self.tables.len() - 1
            }
        };
        &mut self.tables[index]
    }

    /// Log every statement with its parameters at debug level on the `rel::sql` target.
    pub fn trace_on(&mut self) -> &mut Self {
        self.trace = true;
        self
    }

    pub fn trace_off(&mut self) -> &mut Self {
        self.trace = false;
        self
    }

    /// Registration for `T`.
    ///
    /// # Errors
    /// Returns `RelError::UnmappedEntity` if `T` was never added.
    pub fn table_for<T: Entity>(&self) -> Result<&TableMap, RelError> {
        self.tables
            .iter()
            .find(|t| t.type_name == T::TYPE_NAME)
            .ok_or(RelError::UnmappedEntity(T::TYPE_NAME))
    }

    fn trace(&self, sql: &str, params: &[RowValues]) {
        if self.trace {
            tracing::debug!(target: "rel::sql", ?params, "[SQL] {sql}");
        }
    }

    /// Insert `row` as a new record.
    ///
    /// # Errors
    /// Returns `RelError::UnmappedEntity` for unregistered types, or the statement's error.
    pub async fn insert<T: Entity, E: Executor>(
        &self,
        exec: &mut E,
        row: &T,
    ) -> Result<(), RelError> {
        let map = self.table_for::<T>()?;
        let dialect = exec.dialect();
        let placeholders: Vec<String> =
            (1..=map.columns.len()).map(|i| dialect.placeholder(i)).collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            map.table,
            map.columns.join(", "),
            placeholders.join(", ")
        );
        let params = row.to_values();
        self.trace(&sql, &params);
        exec.dml(&sql, &params).await?;
        Ok(())
    }

    /// Fetch the record whose key columns equal `keys`, in key order.
    ///
    /// # Errors
    /// Returns `RelError::UnmappedEntity` for unregistered types,
    /// `RelError::ExecutionError` if the number of key values is wrong, or the query's
    /// error.
    pub async fn get<T: Entity, E: Executor>(
        &self,
        exec: &mut E,
        keys: &[RowValues],
    ) -> Result<Option<T>, RelError> {
        let map = self.table_for::<T>()?;
        let key_columns = map.key_columns();
        if key_columns.len() != keys.len() {
            return Err(RelError::ExecutionError(format!(
                "{} has {} key column(s), got {} value(s)",
                map.table,
                key_columns.len(),
                keys.len()
            )));
        }
        let dialect = exec.dialect();
        let conditions: Vec<String> = key_columns
            .iter()
            .enumerate()
            .map(|(i, col)| format!("{col} = {}", dialect.placeholder(i + 1)))
            .collect();
        let sql = format!(
            "SELECT {} FROM {} WHERE {}",
            map.columns.join(", "),
            map.table,
            conditions.join(" AND ")
        );
        self.trace(&sql, keys);
        let rs = exec.select(&sql, keys).await?;
        rs.results
            .first()
            .map(|row| T::from_row(&RowReader::new(row, self.naming)))
            .transpose()
    }

    /// Write every non-key column of `row`, matching on its key columns.
    ///
    /// # Errors
    /// Returns `RelError::NotFound` when no row has the key, `RelError::UnmappedEntity`
    /// for unregistered types, or the statement's error.
    pub async fn update<T: Entity, E: Executor>(
        &self,
        exec: &mut E,
        row: &T,
    ) -> Result<usize, RelError> {
        let map = self.table_for::<T>()?;
        let values = row.to_values();
        let dialect = exec.dialect();

        let mut sets = Vec::new();
        let mut conditions = Vec::new();
        let mut params = Vec::with_capacity(values.len());
        let mut key_values = Vec::new();
        for (i, (column, value)) in map.columns.iter().zip(&values).enumerate() {
            if !map.is_key(i) {
                params.push(value.clone());
                sets.push(format!("{column} = {}", dialect.placeholder(params.len())));
            }
        }
        if sets.is_empty() {
            return Err(RelError::ExecutionError(format!(
                "{} has no non-key columns to update",
                map.table
            )));
        }
        for &i in &map.keys {
            params.push(values[i].clone());
            key_values.push(values[i].to_string());
            conditions.push(format!("{} = {}", map.columns[i], dialect.placeholder(params.len())));
        }

        let sql = format!(
            "UPDATE {} SET {} WHERE {}",
            map.table,
            sets.join(", "),
            conditions.join(" AND ")
        );
        self.trace(&sql, &params);
        let affected = exec.dml(&sql, &params).await?;
        if affected == 0 {
            return Err(RelError::NotFound {
                table: map.table.clone(),
                key: key_values.join(", "),
            });
        }
        Ok(affected)
    }

    /// Run arbitrary SQL and decode each row as `T`.
    ///
    /// # Errors
    /// Returns the query's error or the first decoding error.
    pub async fn select<T: Entity, E: Executor>(
        &self,
        exec: &mut E,
        sql: &str,
        params: &[RowValues],
    ) -> Result<Vec<T>, RelError> {
        self.trace(sql, params);
        let rs = exec.select(sql, params).await?;
        decode_all(&rs, self.naming)
    }

    /// Run SQL projected with [`JoinProjection`](crate::entity::JoinProjection) and decode
    /// each row as a pair, reading `A` under `aliases.0` and `B` under `aliases.1`.
    ///
    /// # Errors
    /// Returns the query's error or the first decoding error.
    pub async fn select_joined<A: Entity, B: Entity, E: Executor>(
        &self,
        exec: &mut E,
        sql: &str,
        params: &[RowValues],
        aliases: (&str, &str),
    ) -> Result<Vec<Joined<A, B>>, RelError> {
        self.trace(sql, params);
        let rs = exec.select(sql, params).await?;
        rs.iter()
            .map(|row| Joined::from_row(row, self.naming, aliases))
            .collect()
    }

    /// Like [`DbMap::select`] with `:name` parameters.
    ///
    /// # Errors
    /// Returns `RelError::NamedParameter` for unparsable SQL or a missing value, the
    /// query's error, or the first decoding error.
    pub async fn named_select<T: Entity, E: Executor>(
        &self,
        exec: &mut E,
        sql: &str,
        values: &[(&str, RowValues)],
    ) -> Result<Vec<T>, RelError> {
        let (sql, params) = NamedQuery::parse(sql)?.bind(exec.dialect(), values)?;
        self.select(exec, &sql, &params).await
    }

    /// Empty every registered table.
    ///
    /// # Errors
    /// Returns the first failing statement's error.
    pub async fn truncate_tables<E: Executor>(&self, exec: &mut E) -> Result<(), RelError> {
        let tables: Vec<&str> = self.tables.iter().map(|t| t.table.as_str()).collect();
        for table in &tables {
            check_identifier(table)?;
            self.trace(&exec.dialect().truncate_statement(table), &[]);
        }
        schema::truncate(exec, &tables).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Product, ProductCategory, Spec};

    #[test]
    fn keys_default_to_registry_and_can_change() {
        let mut dbmap = DbMap::new(NamingConvention::Snake);
        assert_eq!(dbmap.add_table::<ProductCategory>().key_columns(), vec![
            "product_id",
            "category_id"
        ]);
        let spec = dbmap.add_table::<Spec>();
        spec.set_keys(&["product_id"]).unwrap();
        assert_eq!(spec.key_columns(), vec!["product_id"]);
        assert!(matches!(
            spec.set_keys(&["nope"]),
            Err(RelError::MissingColumn(_))
        ));
    }

    #[test]
    fn empty_key_list_is_rejected_and_keeps_old_keys() {
        let mut dbmap = DbMap::new(NamingConvention::Snake);
        let product = dbmap.add_table::<Product>();
        assert!(matches!(
            product.set_keys(&[]),
            Err(RelError::ExecutionError(_))
        ));
        assert_eq!(product.key_columns(), vec!["id"]);
    }

    #[test]
    fn unregistered_types_are_rejected() {
        let dbmap = DbMap::new(NamingConvention::Snake);
        assert!(matches!(
            dbmap.table_for::<Product>(),
            Err(RelError::UnmappedEntity("Product"))
        ));
    }

    #[test]
    fn re_registering_replaces() {
        let mut dbmap = DbMap::new(NamingConvention::Camel);
        dbmap.add_table::<ProductCategory>();
        dbmap.add_table::<ProductCategory>();
        assert_eq!(dbmap.tables.len(), 1);
        assert_eq!(dbmap.tables[0].table_name(), "productCategory");
    }
}
