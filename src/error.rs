use std::fmt;

use thiserror::Error;

#[cfg(feature = "sqlite")]
use rusqlite;
#[cfg(feature = "postgres")]
use tokio_postgres;

/// Step of a program in which an error surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Open,
    Schema,
    Truncate,
    Insert,
    Select,
    Begin,
    Update,
    Commit,
    Join,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Stage::Open => "Open",
            Stage::Schema => "Schema",
            Stage::Truncate => "Truncate",
            Stage::Insert => "Insert",
            Stage::Select => "Select",
            Stage::Begin => "Begin",
            Stage::Update => "Update",
            Stage::Commit => "Commit",
            Stage::Join => "Join",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Error)]
pub enum RelError {
    #[cfg(feature = "postgres")]
    #[error(transparent)]
    PostgresError(#[from] tokio_postgres::Error),

    #[cfg(feature = "sqlite")]
    #[error(transparent)]
    SqliteError(#[from] rusqlite::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("SQL execution error: {0}")]
    ExecutionError(String),

    #[error("Invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    #[error("Entity {0} has no registered table")]
    UnmappedEntity(&'static str),

    #[error("Column {0:?} missing from result row")]
    MissingColumn(String),

    #[error("Column {column:?} holds {found}, expected {expected}")]
    TypeMismatch {
        column: String,
        expected: &'static str,
        found: String,
    },

    #[error("No row in {table} with key {key}")]
    NotFound { table: String, key: String },

    #[error("Named parameter error: {0}")]
    NamedParameter(String),

    #[error("{stage}: {source}")]
    During {
        stage: Stage,
        #[source]
        source: Box<RelError>,
    },
}

impl RelError {
    /// Tag the error with the step it happened in. Re-tagging keeps the innermost stage.
    #[must_use]
    pub fn during(self, stage: Stage) -> Self {
        match self {
            already @ RelError::During { .. } => already,
            other => RelError::During {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// Stage attached by [`RelError::during`], if any.
    #[must_use]
    pub fn stage(&self) -> Option<Stage> {
        match self {
            RelError::During { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Whether retrying the same operation could succeed.
    ///
    /// Only connection-level failures qualify; constraint violations, bad SQL and mapping
    /// errors are permanent.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            RelError::ConnectionError(_) => true,
            RelError::During { source, .. } => source.is_transient(),
            #[cfg(feature = "postgres")]
            RelError::PostgresError(err) => {
                err.is_closed()
                    || err.code().is_some_and(|code| {
                        code.code().starts_with("08") || matches!(code.code(), "40001" | "40P01")
                    })
            }
            #[cfg(feature = "sqlite")]
            RelError::SqliteError(rusqlite::Error::SqliteFailure(err, _)) => matches!(
                err.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            ),
            _ => false,
        }
    }
}

impl<E> From<bb8::RunError<E>> for RelError
where
    E: Into<RelError>,
{
    fn from(err: bb8::RunError<E>) -> Self {
        match err {
            bb8::RunError::User(inner) => {
                let inner: RelError = inner.into();
                RelError::ConnectionError(format!("pool checkout failed: {inner}"))
            }
            bb8::RunError::TimedOut => {
                RelError::ConnectionError("timed out waiting for a pooled connection".into())
            }
        }
    }
}
