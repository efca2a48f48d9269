//! `PostgreSQL` backend: bb8 manager, parameter binding and row extraction.

mod manager;
mod params;
mod query;

pub use manager::{PgClient, PgManager};
pub use params::Params;
pub use query::{build_result_set_from_rows, execute_batch, execute_dml, execute_select, postgres_extract_value};
