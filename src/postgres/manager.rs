use std::future::Future;
use std::ops::Deref;

use bb8::{ManageConnection, Pool};
use tokio_postgres::{Client, NoTls};

use crate::config::PoolSettings;
use crate::error::RelError;

/// A pooled Postgres client.
///
/// A client marked with [`PgClient::discard`] is closed instead of going back to the pool.
pub struct PgClient {
    client: Client,
    discarded: bool,
}

impl PgClient {
    pub(crate) fn discard(&mut self) {
        self.discarded = true;
    }
}

impl Deref for PgClient {
    type Target = Client;

    fn deref(&self) -> &Client {
        &self.client
    }
}

/// bb8 manager for Postgres clients.
pub struct PgManager {
    pub(crate) config: tokio_postgres::Config,
}

impl PgManager {
    #[must_use]
    pub fn new(config: tokio_postgres::Config) -> Self {
        Self { config }
    }

    /// Build a pool from this manager.
    ///
    /// # Errors
    /// Returns `RelError::ConnectionError` if pool creation fails.
    pub async fn build_pool(self, settings: &PoolSettings) -> Result<Pool<PgManager>, RelError> {
        Pool::builder()
            .max_size(settings.max_open)
            .min_idle(settings.min_idle)
            .max_lifetime(settings.max_lifetime)
            .connection_timeout(settings.connection_timeout)
            .build(self)
            .await
            .map_err(|e| RelError::ConnectionError(format!("postgres pool error: {e}")))
    }
}

impl ManageConnection for PgManager {
    type Connection = PgClient;
    type Error = tokio_postgres::Error;

    #[allow(clippy::manual_async_fn)]
    fn connect(&self) -> impl Future<Output = Result<Self::Connection, Self::Error>> + Send {
        let cfg = self.config.clone();
        async move {
            tracing::debug!(
                hosts = ?cfg.get_hosts(),
                dbname = ?cfg.get_dbname(),
                user = ?cfg.get_user(),
                "postgres connect"
            );
            let (client, connection) = cfg.connect(NoTls).await?;
            tokio::spawn(async move {
                if let Err(e) = connection.await {
                    tracing::warn!("postgres connection closed with error: {e}");
                }
            });
            Ok(PgClient {
                client,
                discarded: false,
            })
        }
    }

    #[allow(clippy::manual_async_fn)]
    fn is_valid(
        &self,
        conn: &mut Self::Connection,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send {
        async move { conn.simple_query("SELECT 1").await.map(|_| ()) }
    }

    fn has_broken(&self, conn: &mut Self::Connection) -> bool {
        conn.discarded || conn.client.is_closed()
    }
}
