//! Two styles of relational data access over one pooled core.
//!
//! * [`orm::DbMap`] maps whole records to tables: register a type, then insert, fetch,
//!   update and select typed rows.
//! * [`builder::Session`] addresses tables by name with fluent statements and runs
//!   transactions through a callback.
//!
//! Both sit on [`pool::Database`] (a `bb8` pool over `tokio-postgres` or `rusqlite`) and
//! the [`Executor`](executor::Executor) trait, implemented by idle connections and open
//! transactions alike.
//!
//! ```rust,no_run
//! use rel::prelude::*;
//!
//! # async fn demo() -> Result<(), RelError> {
//! let db = Database::open(&DbConfig::sqlite("rel.db")).await?;
//! let mut conn = db.connection().await?;
//! schema::create(&mut conn).await?;
//!
//! let products = Session::new(db.clone())
//!     .collection("product")
//!     .find()
//!     .order_by("-created_at")
//!     .all::<Product>()
//!     .await?;
//! # let _ = products;
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod cli;
pub mod config;
pub mod demo;
pub mod entity;
pub mod error;
pub mod executor;
pub mod models;
pub mod named;
pub mod naming;
pub mod orm;
pub mod pool;
pub mod prelude;
pub mod results;
pub mod schema;
pub mod types;

#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use error::RelError;
