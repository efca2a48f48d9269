//! Query-builder access: collections addressed by table name, fluent statements, and a
//! callback-scoped transaction.

mod collection;
mod insert;
mod update;

use std::future::Future;
use std::pin::Pin;

pub use collection::{Collection, Find};
pub use insert::InsertInto;
pub use update::Update;

use crate::error::{RelError, Stage};
use crate::executor::{Connection, Idle, Transaction};
use crate::naming::check_identifier;
use crate::pool::Database;
use crate::types::{Dialect, RowValues};

/// Future returned by a [`Session::tx`] callback; it may borrow the transaction.
pub type TxFuture<'t, T> = Pin<Box<dyn Future<Output = Result<T, RelError>> + 't>>;

/// Entry point of the builder layer.
#[derive(Debug, Clone)]
pub struct Session {
    db: Database,
}

impl Session {
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    #[must_use]
    pub fn database(&self) -> &Database {
        &self.db
    }

    #[must_use]
    pub fn collection(&self, name: &str) -> Collection<'_> {
        Collection::new(self, name)
    }

    /// Check out a connection for statements outside a transaction.
    ///
    /// # Errors
    /// Returns `RelError::ConnectionError` if the pool cannot provide one.
    pub async fn connection(&self) -> Result<Connection<Idle>, RelError> {
        self.db.connection().await
    }

    /// Run `f` inside a transaction.
    ///
    /// Commits when `f` returns `Ok` and rolls back when it returns `Err`, handing the
    /// error back unchanged.
    ///
    /// ```rust,no_run
    /// use rel::prelude::*;
    ///
    /// # async fn demo(session: &Session) -> Result<(), RelError> {
    /// let renamed = session
    ///     .tx(|tx| {
    ///         Box::pin(async move {
    ///             Update::table("product").set("name", "Bar").where_eq("id", "bar").exec(tx).await
    ///         })
    ///     })
    ///     .await?;
    /// # let _ = renamed;
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    /// Returns the callback's error after rolling back, or a `Begin`/`Commit` staged
    /// error if the transaction itself fails.
    pub async fn tx<T, F>(&self, f: F) -> Result<T, RelError>
    where
        F: for<'t> FnOnce(&'t mut Transaction) -> TxFuture<'t, T>,
    {
        let mut tx = self
            .db
            .connection()
            .await?
            .begin()
            .await
            .map_err(|e| e.during(Stage::Begin))?;

        let outcome = f(&mut tx).await;
        match outcome {
            Ok(value) => {
                tx.commit().await.map_err(|e| e.during(Stage::Commit))?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::warn!("rollback after failed transaction body: {rollback_err}");
                }
                Err(err)
            }
        }
    }
}

/// `col = value` conditions joined with `AND`, numbering placeholders after `params`.
fn where_clause(
    dialect: Dialect,
    conditions: &[(String, RowValues)],
    params: &mut Vec<RowValues>,
) -> Result<String, RelError> {
    if conditions.is_empty() {
        return Ok(String::new());
    }
    let mut parts = Vec::with_capacity(conditions.len());
    for (column, value) in conditions {
        check_identifier(column)?;
        params.push(value.clone());
        parts.push(format!("{column} = {}", dialect.placeholder(params.len())));
    }
    Ok(format!(" WHERE {}", parts.join(" AND ")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn where_clause_numbers_after_existing_params() {
        let mut params = vec![RowValues::from("Bar")];
        let clause = where_clause(
            Dialect::Postgres,
            &[("id".into(), "bar".into()), ("name".into(), "Barr".into())],
            &mut params,
        )
        .unwrap();
        assert_eq!(clause, " WHERE id = $2 AND name = $3");
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn where_clause_rejects_expressions() {
        let mut params = Vec::new();
        let err = where_clause(Dialect::Sqlite, &[("1=1 OR id".into(), 1.into())], &mut params)
            .unwrap_err();
        assert!(matches!(err, RelError::InvalidIdentifier(_)));
    }
}
