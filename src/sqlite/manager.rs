use std::future::Future;
use std::sync::Arc;

use bb8::{ManageConnection, Pool};
use tokio::sync::Mutex;

use crate::config::{PoolSettings, SqliteOptions};
use crate::error::RelError;

/// A `rusqlite` connection shared between the pool and the blocking thread that runs work on it.
pub type SharedSqliteConnection = Arc<Mutex<rusqlite::Connection>>;

/// bb8 manager for `SQLite` connections.
///
/// Every connection is opened with foreign keys enforced so parent rows are checked by the
/// store, as on Postgres.
pub struct SqliteManager {
    pub(crate) db_path: String,
}

impl SqliteManager {
    #[must_use]
    pub fn new(options: &SqliteOptions) -> Self {
        Self {
            db_path: options.db_path.clone(),
        }
    }

    /// Build a pool from this manager.
    ///
    /// An in-memory database exists per connection, so its pool is capped at one
    /// connection that is never recycled.
    ///
    /// # Errors
    /// Returns `RelError::ConnectionError` if pool creation fails.
    pub async fn build_pool(
        self,
        settings: &PoolSettings,
    ) -> Result<Pool<SqliteManager>, RelError> {
        let in_memory = self.db_path == ":memory:";
        let builder = Pool::builder()
            .connection_timeout(settings.connection_timeout)
            .min_idle(settings.min_idle);
        let builder = if in_memory {
            builder
                .max_size(1)
                .max_lifetime(None)
                .idle_timeout(None)
                .min_idle(Some(1))
        } else {
            builder
                .max_size(settings.max_open)
                .max_lifetime(settings.max_lifetime)
        };
        builder
            .build(self)
            .await
            .map_err(|e| RelError::ConnectionError(format!("sqlite pool error: {e}")))
    }
}

impl ManageConnection for SqliteManager {
    type Connection = SharedSqliteConnection;
    type Error = RelError;

    #[allow(clippy::manual_async_fn)]
    fn connect(&self) -> impl Future<Output = Result<Self::Connection, Self::Error>> + Send {
        let path = self.db_path.clone();
        async move {
            tracing::debug!(path = %path, "sqlite connect");
            let conn = tokio::task::spawn_blocking(move || {
                let conn = rusqlite::Connection::open(&path)?;
                conn.pragma_update(None, "foreign_keys", true)?;
                Ok::<_, RelError>(conn)
            })
            .await
            .map_err(|e| RelError::ConnectionError(format!("sqlite open task failed: {e}")))??;
            Ok(Arc::new(Mutex::new(conn)))
        }
    }

    #[allow(clippy::manual_async_fn)]
    fn is_valid(
        &self,
        conn: &mut Self::Connection,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send {
        let conn = Arc::clone(conn);
        async move {
            run_blocking(conn, |c| {
                c.query_row("SELECT 1", [], |_| Ok(()))?;
                Ok(())
            })
            .await
        }
    }

    fn has_broken(&self, _conn: &mut Self::Connection) -> bool {
        false
    }
}

/// Run synchronous `rusqlite` work on the blocking thread pool.
///
/// The closure must finish its work before returning; it cannot hold the connection.
///
/// # Errors
/// Returns the closure's error, or `RelError::ExecutionError` if the blocking task panicked.
pub async fn run_blocking<F, R>(conn: SharedSqliteConnection, func: F) -> Result<R, RelError>
where
    F: FnOnce(&mut rusqlite::Connection) -> Result<R, RelError> + Send + 'static,
    R: Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut guard = conn.blocking_lock();
        func(&mut guard)
    })
    .await
    .map_err(|e| RelError::ExecutionError(format!("sqlite worker task failed: {e}")))?
}
