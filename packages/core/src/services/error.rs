//! Service Layer Error Types
//!
//! High-level error cases for hierarchy operations, with context and
//! proper chaining from the database layer.

use crate::db::DatabaseError;
use thiserror::Error;

/// Hierarchy operation errors
#[derive(Error, Debug)]
pub enum PageServiceError {
    /// Page not found by id
    #[error("page not found: {id}")]
    PageNotFound { id: i64 },

    /// Referenced parent page does not exist
    #[error("parent page not found: {parent_id}")]
    ParentNotFound { parent_id: i64 },

    /// Move rejected because it would make a page its own ancestor
    #[error("cannot move page {id} under {parent_id}: the target is inside its own subtree")]
    CircularMove { id: i64, parent_id: i64 },

    /// Slug cannot participate in a materialized path
    #[error("invalid slug: {0}")]
    InvalidSlug(String),

    /// Database operation failed
    #[error("database operation failed: {0}")]
    DatabaseError(#[from] DatabaseError),

    /// Multi-statement transaction did not commit; none of its writes are
    /// visible
    #[error("transaction failed: {context}")]
    TransactionFailed { context: String },

    /// Query execution error
    #[error("query failed: {0}")]
    QueryFailed(String),
}

impl PageServiceError {
    pub fn page_not_found(id: i64) -> Self {
        Self::PageNotFound { id }
    }

    pub fn parent_not_found(parent_id: i64) -> Self {
        Self::ParentNotFound { parent_id }
    }

    pub fn circular_move(id: i64, parent_id: i64) -> Self {
        Self::CircularMove { id, parent_id }
    }

    pub fn invalid_slug(msg: impl Into<String>) -> Self {
        Self::InvalidSlug(msg.into())
    }

    pub fn transaction_failed(context: impl Into<String>) -> Self {
        Self::TransactionFailed {
            context: context.into(),
        }
    }

    pub fn query_failed(msg: impl Into<String>) -> Self {
        Self::QueryFailed(msg.into())
    }
}
