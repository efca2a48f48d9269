//! The statement-running capability shared by idle connections and open transactions.

mod connection;
mod tx;

use std::future::Future;

pub use connection::{Connection, Idle, InTx, Transaction};

use crate::error::RelError;
use crate::naming::NamingConvention;
use crate::results::ResultSet;
use crate::types::{Dialect, RowValues};

/// Anything that can run statements: an idle [`Connection`] (auto-commit) or an open
/// [`Transaction`].
///
/// The mapping layers are generic over this trait, so the same helper inserts through a
/// plain connection or inside a transaction:
/// ```rust,no_run
/// use rel::prelude::*;
///
/// async fn rename<E: Executor>(exec: &mut E, id: &str, name: &str) -> Result<usize, RelError> {
///     Update::table("product").set("name", name).where_eq("id", id).exec(exec).await
/// }
/// ```
pub trait Executor {
    /// SQL flavor of the underlying store.
    fn dialect(&self) -> Dialect;

    /// Naming convention inherited from the [`Database`](crate::pool::Database).
    fn naming(&self) -> NamingConvention;

    /// Run one or more parameterless statements.
    #[allow(clippy::manual_async_fn)]
    fn execute_batch(&mut self, sql: &str) -> impl Future<Output = Result<(), RelError>>;

    /// Run one INSERT/UPDATE/DELETE and return the affected row count.
    #[allow(clippy::manual_async_fn)]
    fn dml(
        &mut self,
        query: &str,
        params: &[RowValues],
    ) -> impl Future<Output = Result<usize, RelError>>;

    /// Run one SELECT and collect its rows.
    #[allow(clippy::manual_async_fn)]
    fn select(
        &mut self,
        query: &str,
        params: &[RowValues],
    ) -> impl Future<Output = Result<ResultSet, RelError>>;
}
