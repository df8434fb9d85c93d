//! Pagetree Core
//!
//! Core page-hierarchy management: a flat relational table of pages with
//! parent pointers and materialized paths, plus the tree-consistency
//! logic that keeps the two in sync.
//!
//! # Architecture
//!
//! - **Flat storage, transient trees**: pages persist as rows with a
//!   `parent_id` pointer; the nested shape is rebuilt per request and
//!   never cached
//! - **Materialized paths**: each page's `uri` caches its slug chain and
//!   is recomputed inside the same transaction as any structural change
//! - **libsql/SQLite**: embedded database with WAL mode, accessed through
//!   a store trait so the hierarchy logic stays backend-agnostic
//!
//! # Modules
//!
//! - [`models`] - data structures (Page, PageTree, MoveNode)
//! - [`db`] - database layer: connection management, store traits, events
//! - [`services`] - PageService, the hierarchy mutator and query facade

pub mod db;
pub mod models;
pub mod services;

// Re-export commonly used types
pub use db::*;
pub use models::*;
pub use services::*;
