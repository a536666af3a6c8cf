//! Error taxonomy for row mapping, configuration and hydration.
//!
//! Storage failures are defined next to the runner in [`crate::executor`].

use crate::executor::StorageError;
use thiserror::Error;

/// A raw row could not be converted to the expected shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingError {
    #[error("column `{column}` is missing from the row")]
    MissingColumn { column: String },

    #[error("column `{column}`: expected {expected}, got {actual}")]
    TypeMismatch {
        column: String,
        expected: String,
        actual: String,
    },

    #[error("column `{column}` is unexpectedly NULL")]
    UnexpectedNull { column: String },
}

impl MappingError {
    pub(crate) fn missing(column: &str) -> Self {
        MappingError::MissingColumn {
            column: column.to_string(),
        }
    }

    pub(crate) fn null(column: &str) -> Self {
        MappingError::UnexpectedNull {
            column: column.to_string(),
        }
    }

    pub(crate) fn mismatch(column: &str, expected: &str, actual: impl Into<String>) -> Self {
        MappingError::TypeMismatch {
            column: column.to_string(),
            expected: expected.to_string(),
            actual: actual.into(),
        }
    }
}

/// Setup errors, raised before any statement is issued.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("chunk size must be a positive integer, got {0}")]
    InvalidChunkSize(usize),

    #[error("has-one relation requires a foreign key getter")]
    MissingForeignKey,

    #[error("relation requires a setter")]
    MissingSetter,

    #[error("many-to-many relation requires the {0} table name")]
    MissingTable(&'static str),

    #[error("many-to-many relation requires the {0} column name")]
    MissingColumn(&'static str),

    #[error("failed to load settings: {0}")]
    Load(#[from] config::ConfigError),
}

/// Failure of a hydration call. Any variant aborts the whole call.
#[derive(Debug, Error)]
pub enum HydrationError {
    #[error("mapping error: {0}")]
    Mapping(#[from] MappingError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
}
