//! Pooled database handle.

mod stats;

pub use stats::PoolStats;

#[cfg(any(feature = "postgres", feature = "sqlite"))]
use bb8::Pool;

use crate::config::{ConnectionTarget, DbConfig, PoolSettings};
use crate::error::RelError;
use crate::executor::{Connection, Idle};
use crate::naming::NamingConvention;
#[cfg(feature = "postgres")]
use crate::postgres::PgManager;
#[cfg(feature = "sqlite")]
use crate::sqlite::SqliteManager;
use crate::types::{DatabaseType, Dialect};

/// Connection pool for one of the supported stores.
#[derive(Clone)]
pub enum BackendPool {
    /// `PostgreSQL` connection pool
    #[cfg(feature = "postgres")]
    Postgres(Pool<PgManager>),
    /// `SQLite` connection pool
    #[cfg(feature = "sqlite")]
    Sqlite(Pool<SqliteManager>),
}

// Managers hold driver configs that are not `Debug`.
impl std::fmt::Debug for BackendPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            #[cfg(feature = "postgres")]
            Self::Postgres(pool) => f.debug_tuple("Postgres").field(&pool.state()).finish(),
            #[cfg(feature = "sqlite")]
            Self::Sqlite(pool) => f.debug_tuple("Sqlite").field(&pool.state()).finish(),
        }
    }
}

/// One open database: the pool plus the settings the mapping layers need.
///
/// Cloning is cheap and shares the pool. Dropping the last clone (or calling
/// [`Database::close`]) closes every pooled connection.
#[derive(Clone, Debug)]
pub struct Database {
    pool: BackendPool,
    db_type: DatabaseType,
    settings: PoolSettings,
    naming: NamingConvention,
}

impl Database {
    /// Build the pool for `config` and check out one connection to prove the store is
    /// reachable.
    ///
    /// # Errors
    /// Returns `RelError::ConfigError` for unusable settings and
    /// `RelError::ConnectionError` (or a driver error) when the store cannot be reached.
    pub async fn open(config: &DbConfig) -> Result<Self, RelError> {
        config.pool.validate()?;
        let pool = match &config.target {
            #[cfg(feature = "postgres")]
            ConnectionTarget::Postgres(options) => {
                let pg_config = options.to_pg_config()?;
                BackendPool::Postgres(PgManager::new(pg_config).build_pool(&config.pool).await?)
            }
            #[cfg(feature = "sqlite")]
            ConnectionTarget::Sqlite(options) => BackendPool::Sqlite(
                SqliteManager::new(options).build_pool(&config.pool).await?,
            ),
        };

        let db = Database {
            pool,
            db_type: config.target.database_type(),
            settings: config.pool,
            naming: config.naming,
        };

        drop(db.connection().await?);
        tracing::debug!(db_type = ?db.db_type, "database opened");
        Ok(db)
    }

    #[must_use]
    pub fn database_type(&self) -> DatabaseType {
        self.db_type
    }

    #[must_use]
    pub fn dialect(&self) -> Dialect {
        self.db_type.dialect()
    }

    #[must_use]
    pub fn naming(&self) -> NamingConvention {
        self.naming
    }

    /// Configured limits together with the pool's live counts.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        let (connections, idle_connections) = match &self.pool {
            #[cfg(feature = "postgres")]
            BackendPool::Postgres(pool) => {
                let state = pool.state();
                (state.connections, state.idle_connections)
            }
            #[cfg(feature = "sqlite")]
            BackendPool::Sqlite(pool) => {
                let state = pool.state();
                (state.connections, state.idle_connections)
            }
        };
        PoolStats {
            max_open: self.settings.max_open,
            min_idle: self.settings.min_idle,
            max_lifetime: self.settings.max_lifetime,
            connections,
            idle_connections,
        }
    }

    /// Check out an idle connection.
    ///
    /// # Errors
    /// Returns `RelError::ConnectionError` if the pool cannot provide a connection.
    pub async fn connection(&self) -> Result<Connection<Idle>, RelError> {
        match &self.pool {
            #[cfg(feature = "postgres")]
            BackendPool::Postgres(pool) => {
                let conn = pool.get_owned().await?;
                Ok(Connection::postgres(conn, self.naming))
            }
            #[cfg(feature = "sqlite")]
            BackendPool::Sqlite(pool) => {
                let conn = pool.get_owned().await?;
                Ok(Connection::sqlite(conn, self.naming))
            }
        }
    }

    /// Close the pool. Connections still checked out are closed when they are dropped.
    pub fn close(self) {
        tracing::debug!(stats = %self.stats(), "closing database");
        drop(self);
    }
}
