#[cfg(feature = "sqlite")]
use std::sync::Arc;

use tokio::runtime::Handle;

use super::connection::{Backend, Connection, Idle, InTx};
use crate::error::RelError;

impl Connection<Idle> {
    /// Begin an explicit transaction.
    ///
    /// # Errors
    /// Returns `RelError` if starting the transaction fails; the connection then goes back
    /// to the pool.
    pub async fn begin(mut self) -> Result<Connection<InTx>, RelError> {
        let mut backend = self.take_backend()?;
        backend.execute_batch("BEGIN").await?;
        tracing::debug!("transaction started");
        Ok(Connection::new(backend, self.naming, true))
    }
}

impl Connection<InTx> {
    /// Commit and return to idle.
    ///
    /// # Errors
    /// Returns `RelError` if the commit fails. The transaction is then rolled back when
    /// the failed handle is dropped.
    pub async fn commit(self) -> Result<Connection<Idle>, RelError> {
        self.finish_tx("COMMIT").await
    }

    /// Roll back and return to idle.
    ///
    /// # Errors
    /// Returns `RelError` if the rollback statement fails.
    pub async fn rollback(self) -> Result<Connection<Idle>, RelError> {
        self.finish_tx("ROLLBACK").await
    }

    async fn finish_tx(mut self, sql: &str) -> Result<Connection<Idle>, RelError> {
        self.backend_mut()?.execute_batch(sql).await?;
        self.needs_rollback = false;
        let backend = self.take_backend()?;
        tracing::debug!(action = sql, "transaction finished");
        Ok(Connection::new(backend, self.naming, false))
    }
}

impl<State> Drop for Connection<State> {
    fn drop(&mut self) {
        if self.needs_rollback
            && let Some(backend) = self.conn.take()
        {
            tracing::debug!("rolling back unfinished transaction");
            rollback_detached(backend);
        }
    }
}

/// Roll back without awaiting. The pooled connection is moved into the rollback work, so
/// it only returns to the pool once the rollback has run.
fn rollback_detached(backend: Backend) {
    match backend {
        #[cfg(feature = "postgres")]
        Backend::Postgres(mut client) => match Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = client.simple_query("ROLLBACK").await {
                        tracing::warn!("rollback of dropped transaction failed: {e}");
                        client.discard();
                    }
                });
            }
            Err(_) => {
                // Closing the session is the only way to end the transaction here.
                tracing::warn!("transaction dropped outside a runtime; discarding its connection");
                client.discard();
            }
        },
        #[cfg(feature = "sqlite")]
        Backend::Sqlite(conn) => {
            let shared = Arc::clone(&*conn);
            let work = move || {
                let guard = shared.blocking_lock();
                if let Err(e) = guard.execute_batch("ROLLBACK") {
                    tracing::warn!("rollback of dropped transaction failed: {e}");
                }
                drop(guard);
                drop(conn);
            };
            match Handle::try_current() {
                Ok(handle) => {
                    handle.spawn_blocking(work);
                }
                Err(_) => work(),
            }
        }
    }
}
