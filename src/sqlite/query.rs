use std::sync::Arc;

use rusqlite::types::Value;

use super::manager::{SharedSqliteConnection, run_blocking};
use super::params::Params;
use crate::error::RelError;
use crate::results::ResultSet;
use crate::types::RowValues;

/// Extract a `RowValues` from a `SQLite` row.
///
/// # Errors
/// Returns `RelError` if the value cannot be read.
pub fn sqlite_extract_value(row: &rusqlite::Row, idx: usize) -> Result<RowValues, RelError> {
    let value: Value = row.get(idx)?;
    match value {
        Value::Null => Ok(RowValues::Null),
        Value::Integer(i) => Ok(RowValues::Int(i)),
        Value::Real(f) => Ok(RowValues::Float(f)),
        Value::Text(s) => Ok(RowValues::Text(s)),
        Value::Blob(b) => Err(RelError::ExecutionError(format!(
            "unsupported blob column ({} bytes) at index {idx}",
            b.len()
        ))),
    }
}

/// Run a prepared statement and collect every row.
///
/// # Errors
/// Returns `RelError` if preparation, execution or extraction fails.
pub fn build_result_set(
    conn: &rusqlite::Connection,
    query: &str,
    params: &Params,
) -> Result<ResultSet, RelError> {
    let mut stmt = conn.prepare(query)?;
    let column_names: Vec<String> = stmt
        .column_names()
        .iter()
        .map(std::string::ToString::to_string)
        .collect();
    let col_count = column_names.len();

    let mut result_set = ResultSet::with_capacity(10);
    result_set.set_column_names(Arc::new(column_names));

    let mut rows_iter = stmt.query(&params.as_refs()[..])?;
    while let Some(row) = rows_iter.next()? {
        let mut row_values = Vec::with_capacity(col_count);
        for i in 0..col_count {
            row_values.push(sqlite_extract_value(row, i)?);
        }
        result_set.add_row_values(row_values);
    }

    Ok(result_set)
}

/// Execute a SELECT on the blocking pool.
///
/// # Errors
/// Returns `RelError` on preparation or execution failure.
pub async fn execute_select(
    conn: SharedSqliteConnection,
    query: &str,
    params: &[RowValues],
) -> Result<ResultSet, RelError> {
    let query = query.to_owned();
    let params = Params::convert(params);
    run_blocking(conn, move |c| build_result_set(c, &query, &params)).await
}

/// Execute a DML statement on the blocking pool and return the affected row count.
///
/// # Errors
/// Returns `RelError` on preparation or execution failure.
pub async fn execute_dml(
    conn: SharedSqliteConnection,
    query: &str,
    params: &[RowValues],
) -> Result<usize, RelError> {
    let query = query.to_owned();
    let params = Params::convert(params);
    run_blocking(conn, move |c| {
        let mut stmt = c.prepare(&query)?;
        Ok(stmt.execute(&params.as_refs()[..])?)
    })
    .await
}

/// Execute one or more statements without parameters.
///
/// # Errors
/// Returns `RelError` on execution failure.
pub async fn execute_batch(conn: SharedSqliteConnection, sql: &str) -> Result<(), RelError> {
    let sql = sql.to_owned();
    run_blocking(conn, move |c| Ok(c.execute_batch(&sql)?)).await
}
