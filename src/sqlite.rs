//! `SQLite` backend: bb8 manager, blocking-pool execution, value conversion.

mod manager;
mod params;
mod query;

pub use manager::{SharedSqliteConnection, SqliteManager, run_blocking};
pub use params::{Params, row_value_to_sqlite_value};
pub use query::{build_result_set, execute_batch, execute_dml, execute_select, sqlite_extract_value};
