use std::borrow::Cow;

use super::where_clause;
use crate::error::RelError;
use crate::executor::Executor;
use crate::naming::check_identifier;
use crate::types::{Dialect, RowValues};

/// UPDATE of a named table with equality conditions.
#[derive(Debug, Clone)]
pub struct Update<'a> {
    table: Cow<'a, str>,
    sets: Vec<(String, RowValues)>,
    conditions: Vec<(String, RowValues)>,
}

impl<'a> Update<'a> {
    #[must_use]
    pub fn table(name: impl Into<Cow<'a, str>>) -> Self {
        Self {
            table: name.into(),
            sets: Vec::new(),
            conditions: Vec::new(),
        }
    }

    #[must_use]
    pub fn set(mut self, column: &str, value: impl Into<RowValues>) -> Self {
        self.sets.push((column.to_string(), value.into()));
        self
    }

    #[must_use]
    pub fn where_eq(mut self, column: &str, value: impl Into<RowValues>) -> Self {
        self.conditions.push((column.to_string(), value.into()));
        self
    }

    fn build(&self, dialect: Dialect) -> Result<(String, Vec<RowValues>), RelError> {
        let table = check_identifier(&self.table)?;
        if self.sets.is_empty() {
            return Err(RelError::ExecutionError(format!("UPDATE {table} without SET")));
        }
        let mut params = Vec::with_capacity(self.sets.len() + self.conditions.len());
        let mut assignments = Vec::with_capacity(self.sets.len());
        for (column, value) in &self.sets {
            check_identifier(column)?;
            params.push(value.clone());
            assignments.push(format!("{column} = {}", dialect.placeholder(params.len())));
        }
        let mut sql = format!("UPDATE {table} SET {}", assignments.join(", "));
        sql.push_str(&where_clause(dialect, &self.conditions, &mut params)?);
        Ok((sql, params))
    }

    /// Run against `exec` and return the affected row count.
    ///
    /// # Errors
    /// Returns `RelError::InvalidIdentifier` for bad names, `RelError::ExecutionError`
    /// when nothing is set, or the statement's error.
    pub async fn exec<E: Executor>(self, exec: &mut E) -> Result<usize, RelError> {
        let (sql, params) = self.build(exec.dialect())?;
        exec.dml(&sql, &params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sets_come_before_conditions() {
        let (sql, params) = Update::table("product")
            .set("name", "Bar")
            .where_eq("id", "bar")
            .build(Dialect::Sqlite)
            .unwrap();
        assert_eq!(sql, "UPDATE product SET name = ?1 WHERE id = ?2");
        assert_eq!(params, vec![RowValues::from("Bar"), RowValues::from("bar")]);
    }

    #[test]
    fn update_without_set_is_an_error() {
        assert!(Update::table("product").where_eq("id", "bar").build(Dialect::Postgres).is_err());
    }
}
