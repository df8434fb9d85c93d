//! Database Layer
//!
//! Persistence for the flat page table, using libsql (embedded SQLite):
//!
//! - `DatabaseService` - connection management and idempotent schema
//!   bootstrap
//! - `PageStore` / `PageTransaction` - the abstraction the service layer
//!   programs against
//! - `SqliteStore` - the libsql implementation
//! - `PageEvent` - domain events broadcast after successful mutations
//!
//! The store is deliberately dumb: single-statement round trips plus an
//! explicit transaction object. Tree invariants live in the service layer.

mod database;
mod error;
pub mod events;
mod page_store;
mod sqlite_store;

pub use database::DatabaseService;
pub use error::DatabaseError;
pub use events::{InvalidationScope, PageEvent};
pub use page_store::{PageStore, PageTransaction, PathStep};
pub use sqlite_store::{SqliteStore, SqliteTransaction};
