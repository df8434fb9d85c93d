//! Database Error Types
//!
//! Error cases for connection, schema initialization, and statement
//! execution. Business-level failures live in the service error type.

use std::path::PathBuf;
use thiserror::Error;

/// Database operation errors
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open or create the database file
    #[error("failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        source: libsql::Error,
    },

    /// Parent directory for the database file could not be created
    #[error("failed to create database directory: {0}")]
    DirectoryCreationFailed(#[from] std::io::Error),

    /// Schema bootstrap did not complete
    #[error("schema initialization failed: {context}")]
    InitializationFailed { context: String },

    /// libsql operation error
    #[error("database operation failed: {0}")]
    LibsqlError(#[from] libsql::Error),

    /// Statement execution error with context
    #[error("sql execution failed: {context}")]
    SqlExecutionError { context: String },
}

impl DatabaseError {
    pub fn open_failed(path: PathBuf, source: libsql::Error) -> Self {
        Self::OpenFailed { path, source }
    }

    pub fn initialization_failed(context: impl Into<String>) -> Self {
        Self::InitializationFailed {
            context: context.into(),
        }
    }

    pub fn sql_execution(context: impl Into<String>) -> Self {
        Self::SqlExecutionError {
            context: context.into(),
        }
    }
}
