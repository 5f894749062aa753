//! Error types shared by the store, catalog and record layers.
use crate::model::{Field, TypeTag};
use std::time::Duration;
use thiserror::Error;

/// Failure reported by the relational store adapter.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DbError {
    #[error("unable to connect to database: {0}")]
    ConnectionFailed(String),
    #[error("database error: {0}")]
    Query(String),
    #[error("statement timed out after {0:?}")]
    Timeout(Duration),
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        DbError::Query(err.to_string())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("column {column} has unsupported database type {db_type}")]
    UnknownType { column: String, db_type: String },
    #[error(transparent)]
    Store(#[from] DbError),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("invalid robot name: {0}")]
    InvalidRobotName(String),
    #[error("field not found: {0}")]
    FieldNotFound(String),
    #[error("invalid {field} typing: expected {expected}, got {actual}")]
    TypeMismatch {
        field: Field,
        expected: TypeTag,
        actual: &'static str,
    },
    #[error("no live data row for robot {0}")]
    NotFound(String),
    #[error(transparent)]
    Store(#[from] DbError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

impl RecordError {
    /// True when the underlying statement hit its deadline.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            RecordError::Store(DbError::Timeout(_))
                | RecordError::Catalog(CatalogError::Store(DbError::Timeout(_)))
        )
    }
}
