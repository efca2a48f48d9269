use std::marker::PhantomData;
#[cfg(feature = "sqlite")]
use std::sync::Arc;

use bb8::PooledConnection;

use super::Executor;
use crate::error::RelError;
use crate::naming::NamingConvention;
#[cfg(feature = "postgres")]
use crate::postgres::{self, PgManager};
use crate::results::ResultSet;
#[cfg(feature = "sqlite")]
use crate::sqlite::{self, SqliteManager};
use crate::types::{Dialect, RowValues};

/// Marker types for typestate
pub enum Idle {}
pub enum InTx {}

/// A connection with an open transaction.
pub type Transaction = Connection<InTx>;

pub(crate) enum Backend {
    #[cfg(feature = "postgres")]
    Postgres(PooledConnection<'static, PgManager>),
    #[cfg(feature = "sqlite")]
    Sqlite(PooledConnection<'static, SqliteManager>),
}

impl Backend {
    fn dialect(&self) -> Dialect {
        match self {
            #[cfg(feature = "postgres")]
            Backend::Postgres(_) => Dialect::Postgres,
            #[cfg(feature = "sqlite")]
            Backend::Sqlite(_) => Dialect::Sqlite,
        }
    }

    pub(crate) async fn execute_batch(&mut self, sql: &str) -> Result<(), RelError> {
        match self {
            #[cfg(feature = "postgres")]
            Backend::Postgres(client) => postgres::execute_batch(client, sql).await,
            #[cfg(feature = "sqlite")]
            Backend::Sqlite(conn) => sqlite::execute_batch(Arc::clone(&**conn), sql).await,
        }
    }

    async fn dml(&mut self, query: &str, params: &[RowValues]) -> Result<usize, RelError> {
        match self {
            #[cfg(feature = "postgres")]
            Backend::Postgres(client) => postgres::execute_dml(client, query, params).await,
            #[cfg(feature = "sqlite")]
            Backend::Sqlite(conn) => sqlite::execute_dml(Arc::clone(&**conn), query, params).await,
        }
    }

    async fn select(&mut self, query: &str, params: &[RowValues]) -> Result<ResultSet, RelError> {
        match self {
            #[cfg(feature = "postgres")]
            Backend::Postgres(client) => postgres::execute_select(client, query, params).await,
            #[cfg(feature = "sqlite")]
            Backend::Sqlite(conn) => {
                sqlite::execute_select(Arc::clone(&**conn), query, params).await
            }
        }
    }
}

/// Typestate wrapper around a pooled connection.
///
/// `Connection<Idle>` runs every statement in auto-commit mode; [`Connection::begin`]
/// turns it into a `Connection<InTx>` whose statements share one transaction until
/// [`commit`](Connection::<InTx>::commit) or [`rollback`](Connection::<InTx>::rollback)
/// hands the idle connection back. Dropping a `Connection<InTx>` rolls the transaction
/// back before the connection returns to the pool.
pub struct Connection<State> {
    pub(crate) conn: Option<Backend>,
    pub(crate) naming: NamingConvention,
    /// True when a transaction is in flight and must be rolled back if dropped.
    pub(crate) needs_rollback: bool,
    pub(crate) _state: PhantomData<State>,
}

impl Connection<Idle> {
    #[cfg(feature = "postgres")]
    pub(crate) fn postgres(
        conn: PooledConnection<'static, PgManager>,
        naming: NamingConvention,
    ) -> Self {
        Self::new(Backend::Postgres(conn), naming, false)
    }

    #[cfg(feature = "sqlite")]
    pub(crate) fn sqlite(
        conn: PooledConnection<'static, SqliteManager>,
        naming: NamingConvention,
    ) -> Self {
        Self::new(Backend::Sqlite(conn), naming, false)
    }
}

impl<State> Connection<State> {
    pub(crate) fn new(backend: Backend, naming: NamingConvention, needs_rollback: bool) -> Self {
        Self {
            conn: Some(backend),
            naming,
            needs_rollback,
            _state: PhantomData,
        }
    }

    pub(crate) fn backend_mut(&mut self) -> Result<&mut Backend, RelError> {
        self.conn
            .as_mut()
            .ok_or_else(|| RelError::ExecutionError("connection already taken".into()))
    }

    pub(crate) fn take_backend(&mut self) -> Result<Backend, RelError> {
        self.conn
            .take()
            .ok_or_else(|| RelError::ExecutionError("connection already taken".into()))
    }

    /// Whether this connection is inside an unfinished transaction.
    #[must_use]
    pub fn in_transaction(&self) -> bool {
        self.needs_rollback
    }
}

impl<State> Executor for Connection<State> {
    fn dialect(&self) -> Dialect {
        // A taken connection can no longer run anything; its dialect is never observed.
        self.conn.as_ref().map_or(Dialect::Postgres, Backend::dialect)
    }

    fn naming(&self) -> NamingConvention {
        self.naming
    }

    async fn execute_batch(&mut self, sql: &str) -> Result<(), RelError> {
        self.backend_mut()?.execute_batch(sql).await
    }

    async fn dml(&mut self, query: &str, params: &[RowValues]) -> Result<usize, RelError> {
        self.backend_mut()?.dml(query, params).await
    }

    async fn select(&mut self, query: &str, params: &[RowValues]) -> Result<ResultSet, RelError> {
        self.backend_mut()?.select(query, params).await
    }
}
