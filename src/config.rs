//! Connection and pool configuration.
//!
//! Programs build a [`DbConfig`] from command-line flags; library users can build one
//! directly:
//! ```rust
//! use rel::prelude::*;
//!
//! let config = DbConfig::sqlite("rel.db")
//!     .with_pool(PoolSettings::default().max_open(1))
//!     .with_naming(NamingConvention::Snake);
//! # let _ = config;
//! ```

use std::time::Duration;

use serde::{Serialize, Serializer};

use crate::error::RelError;
use crate::naming::NamingConvention;
use crate::types::DatabaseType;

/// Options for a `PostgreSQL` target.
///
/// Either a libpq-style connection string (`dbname=rel sslmode=disable`, or a
/// `postgresql://` URL) or structured fields. Structured fields override whatever the
/// connection string sets.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PostgresOptions {
    pub dsn: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub dbname: Option<String>,
    pub user: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
}

impl PostgresOptions {
    #[must_use]
    pub fn from_dsn(dsn: impl Into<String>) -> Self {
        Self {
            dsn: Some(dsn.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    #[must_use]
    pub fn dbname(mut self, dbname: impl Into<String>) -> Self {
        self.dbname = Some(dbname.into());
        self
    }

    #[must_use]
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Resolve into a driver config, filling libpq's defaults for host and user.
    ///
    /// # Errors
    /// Returns `RelError::ConfigError` if the connection string does not parse, no
    /// database name is given, no user can be determined, or TLS is demanded.
    #[cfg(feature = "postgres")]
    pub fn to_pg_config(&self) -> Result<tokio_postgres::Config, RelError> {
        use tokio_postgres::config::SslMode;

        let mut cfg = match &self.dsn {
            Some(dsn) => dsn.parse::<tokio_postgres::Config>().map_err(|e| {
                RelError::ConfigError(format!("invalid postgres connection string: {e}"))
            })?,
            None => tokio_postgres::Config::new(),
        };

        if let Some(host) = &self.host {
            cfg.host(host);
        }
        if let Some(port) = self.port {
            cfg.port(port);
        }
        if let Some(dbname) = &self.dbname {
            cfg.dbname(dbname);
        }
        if let Some(user) = &self.user {
            cfg.user(user);
        }
        if let Some(password) = &self.password {
            cfg.password(password);
        }

        if cfg.get_dbname().is_none() {
            return Err(RelError::ConfigError("dbname is required".to_string()));
        }
        if cfg.get_hosts().is_empty() {
            cfg.host("localhost");
        }
        if cfg.get_user().is_none() {
            let user = std::env::var("USER").map_err(|_| {
                RelError::ConfigError("user is required (no USER in environment)".to_string())
            })?;
            cfg.user(&user);
        }
        if matches!(cfg.get_ssl_mode(), SslMode::Require) {
            return Err(RelError::ConfigError(
                "sslmode=require needs TLS support, which is not built in".to_string(),
            ));
        }

        Ok(cfg)
    }
}

/// Options for a `SQLite` target.
#[derive(Debug, Clone, Serialize)]
pub struct SqliteOptions {
    pub db_path: String,
}

impl SqliteOptions {
    #[must_use]
    pub fn new(db_path: impl Into<String>) -> Self {
        Self {
            db_path: db_path.into(),
        }
    }
}

/// Which store to connect to.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum ConnectionTarget {
    #[cfg(feature = "postgres")]
    Postgres(PostgresOptions),
    #[cfg(feature = "sqlite")]
    Sqlite(SqliteOptions),
}

impl ConnectionTarget {
    #[must_use]
    pub fn database_type(&self) -> DatabaseType {
        match self {
            #[cfg(feature = "postgres")]
            ConnectionTarget::Postgres(_) => DatabaseType::Postgres,
            #[cfg(feature = "sqlite")]
            ConnectionTarget::Sqlite(_) => DatabaseType::Sqlite,
        }
    }
}

/// Pool limits. Reported back verbatim by `Database::stats`.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PoolSettings {
    /// Upper bound on open connections.
    pub max_open: u32,
    /// Connections kept open while idle; `None` lets the pool close all of them.
    pub min_idle: Option<u32>,
    /// Connections older than this are closed instead of reused.
    #[serde(serialize_with = "serialize_opt_duration")]
    pub max_lifetime: Option<Duration>,
    /// How long a checkout waits before giving up.
    #[serde(serialize_with = "serialize_duration")]
    pub connection_timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_open: 4,
            min_idle: None,
            max_lifetime: Some(Duration::from_secs(30 * 60)),
            connection_timeout: Duration::from_secs(10),
        }
    }
}

impl PoolSettings {
    #[must_use]
    pub fn max_open(mut self, max_open: u32) -> Self {
        self.max_open = max_open.max(1);
        self
    }

    #[must_use]
    pub fn min_idle(mut self, min_idle: Option<u32>) -> Self {
        self.min_idle = min_idle;
        self
    }

    #[must_use]
    pub fn max_lifetime(mut self, max_lifetime: Option<Duration>) -> Self {
        self.max_lifetime = max_lifetime;
        self
    }

    #[must_use]
    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Check the limits the pool builder would otherwise assert on.
    ///
    /// # Errors
    /// Returns `RelError::ConfigError` when `max_open` is zero, `min_idle` exceeds
    /// `max_open`, or either duration is zero.
    pub fn validate(&self) -> Result<(), RelError> {
        if self.max_open == 0 {
            return Err(RelError::ConfigError("max_open must be at least 1".into()));
        }
        if let Some(min_idle) = self.min_idle
            && min_idle > self.max_open
        {
            return Err(RelError::ConfigError(format!(
                "min_idle ({min_idle}) must not exceed max_open ({})",
                self.max_open
            )));
        }
        if self.max_lifetime.is_some_and(|d| d.is_zero()) {
            return Err(RelError::ConfigError(
                "max_lifetime must be positive; leave it unset for no limit".into(),
            ));
        }
        if self.connection_timeout.is_zero() {
            return Err(RelError::ConfigError("connection_timeout must be positive".into()));
        }
        Ok(())
    }
}

/// Everything needed to open a [`Database`](crate::pool::Database).
#[derive(Debug, Clone, Serialize)]
pub struct DbConfig {
    pub target: ConnectionTarget,
    pub pool: PoolSettings,
    pub naming: NamingConvention,
}

impl DbConfig {
    #[must_use]
    pub fn new(target: ConnectionTarget) -> Self {
        Self {
            target,
            pool: PoolSettings::default(),
            naming: NamingConvention::default(),
        }
    }

    #[cfg(feature = "postgres")]
    #[must_use]
    pub fn postgres(options: PostgresOptions) -> Self {
        Self::new(ConnectionTarget::Postgres(options))
    }

    #[cfg(feature = "sqlite")]
    #[must_use]
    pub fn sqlite(db_path: impl Into<String>) -> Self {
        Self::new(ConnectionTarget::Sqlite(SqliteOptions::new(db_path)))
    }

    #[must_use]
    pub fn with_pool(mut self, pool: PoolSettings) -> Self {
        self.pool = pool;
        self
    }

    #[must_use]
    pub fn with_naming(mut self, naming: NamingConvention) -> Self {
        self.naming = naming;
        self
    }
}

fn serialize_duration<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&humantime::format_duration(*value))
}

#[allow(clippy::ref_option)]
fn serialize_opt_duration<S: Serializer>(
    value: &Option<Duration>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(d) => serializer.collect_str(&humantime::format_duration(*d)),
        None => serializer.serialize_none(),
    }
}
