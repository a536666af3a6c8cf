//! Row mapping: the boundary between raw storage rows and typed records.
//!
//! [`RawRow`] is the column contract every row source satisfies and
//! [`FromRow`] is the pure mapping from such a row to a record. Both
//! `may_postgres::Row` and the in-memory [`MemoryRow`] implement `RawRow`, so
//! the same mappers run against PostgreSQL and in tests.

use crate::error::MappingError;
use sea_query::Value;
use std::collections::BTreeMap;

/// Named-column access to a raw result row.
///
/// Each accessor returns `Ok(None)` for SQL `NULL`, `MappingError::MissingColumn`
/// when the row has no such column and `MappingError::TypeMismatch` when the
/// stored value cannot be represented as the requested type.
pub trait RawRow {
    fn get_i32(&self, column: &str) -> Result<Option<i32>, MappingError>;

    /// `INT` columns are widened.
    fn get_i64(&self, column: &str) -> Result<Option<i64>, MappingError>;

    fn get_string(&self, column: &str) -> Result<Option<String>, MappingError>;

    fn required_i32(&self, column: &str) -> Result<i32, MappingError> {
        self.get_i32(column)?.ok_or_else(|| MappingError::null(column))
    }

    fn required_i64(&self, column: &str) -> Result<i64, MappingError> {
        self.get_i64(column)?.ok_or_else(|| MappingError::null(column))
    }

    fn required_string(&self, column: &str) -> Result<String, MappingError> {
        self.get_string(column)?.ok_or_else(|| MappingError::null(column))
    }
}

/// Pure conversion from a raw row to a typed record.
pub trait FromRow: Sized {
    /// # Errors
    ///
    /// Returns `MappingError` if a required column is missing or malformed.
    fn from_row<R: RawRow + ?Sized>(row: &R) -> Result<Self, MappingError>;
}

impl RawRow for may_postgres::Row {
    fn get_i32(&self, column: &str) -> Result<Option<i32>, MappingError> {
        ensure_column(self, column)?;
        self.try_get::<&str, Option<i32>>(column)
            .map_err(|e| MappingError::mismatch(column, "INT", e.to_string()))
    }

    fn get_i64(&self, column: &str) -> Result<Option<i64>, MappingError> {
        ensure_column(self, column)?;
        match self.try_get::<&str, Option<i64>>(column) {
            Ok(v) => Ok(v),
            Err(wide) => self
                .try_get::<&str, Option<i32>>(column)
                .map(|v| v.map(i64::from))
                .map_err(|_| MappingError::mismatch(column, "BIGINT", wide.to_string())),
        }
    }

    fn get_string(&self, column: &str) -> Result<Option<String>, MappingError> {
        ensure_column(self, column)?;
        self.try_get::<&str, Option<String>>(column)
            .map_err(|e| MappingError::mismatch(column, "TEXT", e.to_string()))
    }
}

fn ensure_column(row: &may_postgres::Row, column: &str) -> Result<(), MappingError> {
    if row.columns().iter().any(|c| c.name() == column) {
        Ok(())
    } else {
        Err(MappingError::missing(column))
    }
}

/// A row held in memory as `sea_query` values keyed by column name.
///
/// ```
/// use bookshelf::{MemoryRow, RawRow};
///
/// let row = MemoryRow::new().with("id", 7i64).with("name", "Poetry");
/// assert_eq!(row.required_i64("id").unwrap(), 7);
/// assert!(row.get_i64("missing").is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryRow {
    columns: BTreeMap<String, Value>,
}

impl MemoryRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style column setter.
    #[must_use]
    pub fn with(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.set(column, value);
        self
    }

    pub fn set(&mut self, column: &str, value: impl Into<Value>) {
        self.columns.insert(column.to_string(), value.into());
    }

    fn lookup(&self, column: &str) -> Result<&Value, MappingError> {
        self.columns
            .get(column)
            .ok_or_else(|| MappingError::missing(column))
    }
}

impl RawRow for MemoryRow {
    fn get_i32(&self, column: &str) -> Result<Option<i32>, MappingError> {
        match self.lookup(column)? {
            Value::Int(v) => Ok(*v),
            Value::SmallInt(v) => Ok(v.map(i32::from)),
            Value::TinyInt(v) => Ok(v.map(i32::from)),
            Value::BigInt(None) => Ok(None),
            Value::BigInt(Some(v)) => i32::try_from(*v)
                .map(Some)
                .map_err(|_| {
                    MappingError::mismatch(column, "INT", format!("BigInt({v}) out of range"))
                }),
            other => Err(MappingError::mismatch(column, "INT", format!("{other:?}"))),
        }
    }

    fn get_i64(&self, column: &str) -> Result<Option<i64>, MappingError> {
        match self.lookup(column)? {
            Value::BigInt(v) => Ok(*v),
            Value::Int(v) => Ok(v.map(i64::from)),
            Value::SmallInt(v) => Ok(v.map(i64::from)),
            Value::TinyInt(v) => Ok(v.map(i64::from)),
            Value::Unsigned(v) => Ok(v.map(i64::from)),
            other => Err(MappingError::mismatch(column, "BIGINT", format!("{other:?}"))),
        }
    }

    fn get_string(&self, column: &str) -> Result<Option<String>, MappingError> {
        match self.lookup(column)? {
            Value::String(v) => Ok(v.as_ref().map(|s| s.to_string())),
            other => Err(MappingError::mismatch(column, "TEXT", format!("{other:?}"))),
        }
    }
}
