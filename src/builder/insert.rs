use std::borrow::Cow;

use crate::entity::Entity;
use crate::error::RelError;
use crate::executor::Executor;
use crate::naming::check_identifier;
use crate::types::RowValues;

/// Single-row INSERT into a named table.
#[derive(Debug, Clone)]
pub struct InsertInto<'a> {
    table: Cow<'a, str>,
    fields: &'static [&'static str],
    values: Vec<RowValues>,
}

impl<'a> InsertInto<'a> {
    #[must_use]
    pub fn table(name: impl Into<Cow<'a, str>>) -> Self {
        Self {
            table: name.into(),
            fields: &[],
            values: Vec::new(),
        }
    }

    /// Take columns and values from a record.
    #[must_use]
    pub fn values<T: Entity>(mut self, row: &T) -> Self {
        self.fields = T::FIELDS;
        self.values = row.to_values();
        self
    }

    /// Run against `exec` and return the affected row count.
    ///
    /// # Errors
    /// Returns `RelError::InvalidIdentifier` for a bad table name,
    /// `RelError::ExecutionError` when no values were given, or the statement's error.
    pub async fn exec<E: Executor>(self, exec: &mut E) -> Result<usize, RelError> {
        let table = check_identifier(&self.table)?;
        if self.values.is_empty() {
            return Err(RelError::ExecutionError(format!(
                "INSERT INTO {table} without values"
            )));
        }
        let naming = exec.naming();
        let dialect = exec.dialect();
        let columns: Vec<String> = self.fields.iter().map(|f| naming.column(f)).collect();
        let placeholders: Vec<String> =
            (1..=columns.len()).map(|i| dialect.placeholder(i)).collect();
        let sql = format!(
            "INSERT INTO {table} ({}) VALUES ({})",
            columns.join(", "),
            placeholders.join(", ")
        );
        exec.dml(&sql, &self.values).await
    }
}
