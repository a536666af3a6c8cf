//! Statement execution boundary.
//!
//! [`SqlRunner`] is the only way the hydration engine and the data-access
//! objects reach storage. [`MayPostgresRunner`] is the production
//! implementation over a `may_postgres::Client`.

use crate::row::RawRow;
use crate::value_conversion::with_converted_params;
use may_postgres::{Client, Error as PostgresError, Row};
use sea_query::Value;
use std::time::Instant;
use thiserror::Error;

#[cfg(feature = "metrics")]
use crate::metrics::METRICS;
#[cfg(feature = "tracing")]
use crate::metrics::tracing_helpers;

/// The storage collaborator failed.
#[derive(Debug, Error)]
pub enum StorageError {
    /// `PostgreSQL` error from `may_postgres`
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] PostgresError),
    /// Query execution error
    #[error("Query error: {0}")]
    Query(String),
    /// A single-row query matched nothing
    #[error("Query returned no rows")]
    NoRows,
    /// A bound parameter has no `ToSql` mapping
    #[error("Unsupported parameter: {0}")]
    UnsupportedValue(String),
}

/// Trait for executing parameterized statements.
///
/// Parameters are `sea_query` values so that statements built with
/// `sea_query` can be passed straight through as `(sql, values.0)`.
///
/// ```no_run
/// use bookshelf::{RawRow, SqlRunner, StorageError};
/// use sea_query::Value;
///
/// fn titles<S: SqlRunner>(runner: &S, year: i32) -> Result<Vec<Option<String>>, StorageError> {
///     let sql = "SELECT title FROM book WHERE year = $1";
///     let rows = runner.query_all(sql, &[Value::Int(Some(year))])?;
///     Ok(rows.iter().filter_map(|r| r.get_string("title").ok()).collect())
/// }
/// ```
pub trait SqlRunner {
    /// Row type handed to the row mapper.
    type Row: RawRow;

    /// Execute a statement and return the number of rows affected.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the statement fails.
    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64, StorageError>;

    /// Run a query and return every row.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the query fails.
    fn query_all(&self, sql: &str, params: &[Value]) -> Result<Vec<Self::Row>, StorageError>;

    /// Run a query that must produce exactly one row.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NoRows` on an empty result and
    /// `StorageError::Query` when more than one row comes back.
    fn query_one(&self, sql: &str, params: &[Value]) -> Result<Self::Row, StorageError> {
        let mut rows = self.query_all(sql, params)?;
        match rows.len() {
            0 => Err(StorageError::NoRows),
            1 => Ok(rows.remove(0)),
            n => Err(StorageError::Query(format!("expected one row, got {n}"))),
        }
    }
}

impl<S: SqlRunner + ?Sized> SqlRunner for &S {
    type Row = S::Row;

    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64, StorageError> {
        (**self).execute(sql, params)
    }

    fn query_all(&self, sql: &str, params: &[Value]) -> Result<Vec<Self::Row>, StorageError> {
        (**self).query_all(sql, params)
    }
}

/// [`SqlRunner`] over a `may_postgres::Client`.
///
/// Each runner owns its client; concurrent hydration calls should each use
/// their own runner.
pub struct MayPostgresRunner {
    client: Client,
}

impl MayPostgresRunner {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl SqlRunner for MayPostgresRunner {
    type Row = Row;

    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64, StorageError> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::execute_query_span(sql).entered();

        let start = Instant::now();
        let result = with_converted_params(params, |bound| {
            self.client.execute(sql, bound).map_err(StorageError::Postgres)
        });
        finish(start, &result);
        result
    }

    fn query_all(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, StorageError> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::execute_query_span(sql).entered();

        let start = Instant::now();
        let result = with_converted_params(params, |bound| {
            self.client.query(sql, bound).map_err(StorageError::Postgres)
        });
        finish(start, &result);
        result
    }
}

#[allow(unused_variables)]
fn finish<T>(start: Instant, result: &Result<T, StorageError>) {
    let duration = start.elapsed();
    if let Err(e) = result {
        log::debug!("statement failed after {duration:?}: {e}");
        #[cfg(feature = "metrics")]
        METRICS.record_query_error();
    }
    #[cfg(feature = "metrics")]
    METRICS.record_query_duration(duration);
}
