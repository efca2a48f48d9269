use super::{Session, where_clause};
use crate::entity::{Entity, decode_all};
use crate::error::RelError;
use crate::executor::Executor;
use crate::naming::{NamingConvention, check_identifier};
use crate::schema;
use crate::types::{Dialect, RowValues};

/// Rows of one table, addressed by name.
#[derive(Debug, Clone)]
pub struct Collection<'s> {
    session: &'s Session,
    name: String,
}

impl<'s> Collection<'s> {
    pub(super) fn new(session: &'s Session, name: &str) -> Self {
        Self {
            session,
            name: name.to_string(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Naming convention of the session's database.
    #[must_use]
    pub fn naming(&self) -> NamingConvention {
        self.session.database().naming()
    }

    #[must_use]
    pub fn find(&self) -> Find<'s> {
        Find {
            session: self.session,
            table: self.name.clone(),
            conditions: Vec::new(),
            order: Vec::new(),
        }
    }

    /// Remove every row.
    ///
    /// # Errors
    /// Returns `RelError::InvalidIdentifier` for a bad collection name, or the
    /// statement's error.
    pub async fn truncate(&self) -> Result<(), RelError> {
        let mut conn = self.session.connection().await?;
        self.truncate_in(&mut conn).await
    }

    /// [`Collection::truncate`] on `exec`, e.g. inside [`Session::tx`].
    ///
    /// # Errors
    /// Same as [`Collection::truncate`].
    pub async fn truncate_in<E: Executor>(&self, exec: &mut E) -> Result<(), RelError> {
        schema::truncate(exec, &[self.name.as_str()]).await
    }
}

/// A pending query over one collection.
#[derive(Debug, Clone)]
pub struct Find<'s> {
    session: &'s Session,
    table: String,
    conditions: Vec<(String, RowValues)>,
    /// `(column, descending)`
    order: Vec<(String, bool)>,
}

impl Find<'_> {
    #[must_use]
    pub fn where_eq(mut self, column: &str, value: impl Into<RowValues>) -> Self {
        self.conditions.push((column.to_string(), value.into()));
        self
    }

    /// Sort by `column`; a leading `-` sorts descending.
    #[must_use]
    pub fn order_by(mut self, column: &str) -> Self {
        let (column, descending) = match column.strip_prefix('-') {
            Some(rest) => (rest, true),
            None => (column, false),
        };
        self.order.push((column.to_string(), descending));
        self
    }

    fn build(
        &self,
        projection: &str,
        dialect: Dialect,
        limit: Option<u32>,
    ) -> Result<(String, Vec<RowValues>), RelError> {
        let table = check_identifier(&self.table)?;
        let mut params = Vec::new();
        let mut sql = format!("SELECT {projection} FROM {table}");
        sql.push_str(&where_clause(dialect, &self.conditions, &mut params)?);
        if !self.order.is_empty() {
            let mut terms = Vec::with_capacity(self.order.len());
            for (column, descending) in &self.order {
                check_identifier(column)?;
                terms.push(if *descending {
                    format!("{column} DESC")
                } else {
                    format!("{column} ASC")
                });
            }
            sql.push_str(" ORDER BY ");
            sql.push_str(&terms.join(", "));
        }
        if let Some(limit) = limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        Ok((sql, params))
    }

    /// Every matching row as `T`, on a connection of its own.
    ///
    /// # Errors
    /// Returns `RelError::InvalidIdentifier` for bad names, the query's error, or the
    /// first decoding error.
    pub async fn all<T: Entity>(&self) -> Result<Vec<T>, RelError> {
        let mut conn = self.session.connection().await?;
        self.all_in(&mut conn).await
    }

    /// [`Find::all`] on `exec`. Inside [`Session::tx`] this reads the transaction's
    /// own uncommitted rows without a second checkout.
    ///
    /// # Errors
    /// Same as [`Find::all`].
    pub async fn all_in<T: Entity, E: Executor>(&self, exec: &mut E) -> Result<Vec<T>, RelError> {
        let naming = exec.naming();
        let columns = T::column_names(naming).join(", ");
        let (sql, params) = self.build(&columns, exec.dialect(), None)?;
        let rs = exec.select(&sql, &params).await?;
        decode_all(&rs, naming)
    }

    /// The first matching row, if any.
    ///
    /// # Errors
    /// Same as [`Find::all`].
    pub async fn one<T: Entity>(&self) -> Result<Option<T>, RelError> {
        let mut conn = self.session.connection().await?;
        self.one_in(&mut conn).await
    }

    /// # Errors
    /// Same as [`Find::all`].
    pub async fn one_in<T: Entity, E: Executor>(
        &self,
        exec: &mut E,
    ) -> Result<Option<T>, RelError> {
        let naming = exec.naming();
        let columns = T::column_names(naming).join(", ");
        let (sql, params) = self.build(&columns, exec.dialect(), Some(1))?;
        let rs = exec.select(&sql, &params).await?;
        Ok(decode_all(&rs, naming)?.into_iter().next())
    }

    /// Number of matching rows.
    ///
    /// # Errors
    /// Returns `RelError::InvalidIdentifier` for bad names or the query's error.
    pub async fn count(&self) -> Result<i64, RelError> {
        let mut conn = self.session.connection().await?;
        self.count_in(&mut conn).await
    }

    /// # Errors
    /// Same as [`Find::count`].
    pub async fn count_in<E: Executor>(&self, exec: &mut E) -> Result<i64, RelError> {
        let unordered = Find {
            order: Vec::new(),
            ..self.clone()
        };
        let (sql, params) = unordered.build("COUNT(*) AS n", exec.dialect(), None)?;
        let rs = exec.select(&sql, &params).await?;
        rs.results
            .first()
            .and_then(|row| row.get_by_index(0))
            .and_then(|v| v.as_int().copied())
            .ok_or_else(|| {
                RelError::ExecutionError(format!("COUNT on {} returned no integer", self.table))
            })
    }
}
