//! Business Services
//!
//! This module contains the hierarchy logic built on top of the database
//! layer:
//!
//! - `PageService` - create/update/delete/reparent operations, path
//!   rebuilds, descendant walks, and tree assembly orchestration
//!
//! Services own transaction boundaries and invariant enforcement; the
//! store underneath is limited to single-statement round trips.

pub mod error;
pub mod page_service;

pub use error::PageServiceError;
pub use page_service::PageService;
