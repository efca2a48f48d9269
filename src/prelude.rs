//! Convenient imports for common functionality.
//!
//! This module re-exports the most commonly used types and functions
//! to make it easier to get started with the library.

pub use crate::builder::{Collection, Find, InsertInto, Session, TxFuture, Update};
pub use crate::config::{ConnectionTarget, DbConfig, PoolSettings, PostgresOptions, SqliteOptions};
pub use crate::entity;
pub use crate::entity::{Entity, FromRowValue, JoinProjection, Joined, RowReader};
pub use crate::error::{RelError, Stage};
pub use crate::executor::{Connection, Executor, Idle, InTx, Transaction};
pub use crate::models::{Category, Image, Product, ProductCategory, ProductImage, ProductSpec, Spec};
pub use crate::named::NamedQuery;
pub use crate::naming::NamingConvention;
pub use crate::orm::{DbMap, TableMap};
pub use crate::pool::{Database, PoolStats};
pub use crate::results::{CustomDbRow, ResultSet};
pub use crate::schema;
pub use crate::types::{DatabaseType, Dialect, RowValues};
