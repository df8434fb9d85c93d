//! Data Models
//!
//! This module contains the core data structures of the page hierarchy:
//!
//! - `Page` - one row of the flat `pages` table, plus the create/update
//!   field sets
//! - `PageTree` - the transient arena-based forest rebuilt from flat rows
//! - `MoveNode` - the nested subtree description accepted by
//!   reparent/reorder
//!
//! The hierarchy itself is never persisted in nested form; everything here
//! either mirrors a row or is assembled fresh per request.

mod page;
mod tree;

pub use page::{NewPage, Page, PageFields, PageStatus, PageUpdate, ROOT_PARENT};
pub use tree::{MoveNode, PageTree, Placement, TreeNode, TreeRow};
