//! PageStore Trait - Database Abstraction Layer
//!
//! Defines the `PageStore` and `PageTransaction` traits that abstract row
//! persistence for pages, so the hierarchy logic in `PageService` never
//! touches SQL directly.
//!
//! # Architecture
//!
//! - **Abstraction point**: between `PageService` (tree consistency,
//!   invariants, transaction boundaries) and the storage backend
//! - **No cross-row logic**: every method is a single round trip; anything
//!   that spans rows (path rebuilds, descendant walks, cascades) belongs to
//!   the service
//! - **Explicit transactions**: multi-statement atomicity flows through a
//!   `PageTransaction` object handed out by `begin()`, instead of ambient
//!   connection state. Dropping an uncommitted transaction aborts it.
//!
//! All methods are async; implementations must be `Send + Sync` so the
//! service can hold an `Arc<dyn PageStore>` across await points.

use crate::models::{Page, PageFields, TreeRow};
use anyhow::Result;
use async_trait::async_trait;

/// One step of a materialized-path walk: a page's own slug and the id of
/// its parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathStep {
    pub slug: String,
    pub parent_id: i64,
}

/// Read-side contract over the flat `pages` table.
///
/// Each call is one statement against its own connection; writes that must
/// be atomic together go through [`PageStore::begin`].
#[async_trait]
pub trait PageStore: Send + Sync {
    /// Look up a page by its materialized path. The uri is matched exactly
    /// as stored (no separator trimming here; the service normalizes).
    async fn fetch_by_uri(&self, uri: &str) -> Result<Option<Page>>;

    /// The page flagged as home, if any.
    async fn fetch_home(&self) -> Result<Option<Page>>;

    /// Fetch a single page row by id.
    async fn fetch_page(&self, id: i64) -> Result<Option<Page>>;

    /// All rows projected to `(id, parent_id, title)`, ordered by the
    /// sibling `order` column. Input for tree assembly.
    async fn fetch_tree_rows(&self) -> Result<Vec<TreeRow>>;

    /// Direct children of `parent_id` in sibling order.
    async fn fetch_children_of(&self, parent_id: i64) -> Result<Vec<Page>>;

    /// Direct child ids of `parent_id` in sibling order. One level only;
    /// the descendant walk in the service recurses.
    async fn fetch_child_ids(&self, parent_id: i64) -> Result<Vec<i64>>;

    /// Number of direct children of `parent_id`.
    async fn count_children(&self, parent_id: i64) -> Result<i64>;

    /// Insert a navigation link referencing a page. Links are externally
    /// owned; the store only needs enough surface for the cascade
    /// invariant to be enforced and tested.
    async fn insert_navigation_link(
        &self,
        title: &str,
        page_id: i64,
        position: i64,
    ) -> Result<i64>;

    /// Number of navigation links referencing any of `page_ids`.
    async fn count_navigation_links_for(&self, page_ids: &[i64]) -> Result<i64>;

    /// Start an explicit transaction. Every statement issued through the
    /// returned object shares one atomic unit of work.
    async fn begin(&self) -> Result<Box<dyn PageTransaction>>;
}

/// Write-side contract inside one open transaction.
///
/// Consuming `commit`/`rollback` end the transaction; if neither runs, the
/// underlying connection rolls back when the object is dropped.
#[async_trait]
pub trait PageTransaction: Send {
    /// Insert a page row with `uri = NULL` (the path is built afterwards,
    /// in the same transaction). Returns the store-assigned id.
    async fn insert(&mut self, fields: &PageFields) -> Result<i64>;

    /// Replace the written column set of an existing row, resetting `uri`
    /// for recomputation and stamping `updated_on`.
    async fn update_fields(&mut self, id: i64, fields: &PageFields) -> Result<()>;

    /// Fetch a single page row by id, seeing this transaction's writes.
    async fn fetch_page(&mut self, id: i64) -> Result<Option<Page>>;

    /// Clear `is_home` wherever it is set. Run before inserting/updating a
    /// row flagged as home, to keep the single-home invariant.
    async fn clear_home_flag(&mut self) -> Result<()>;

    /// `(slug, parent_id)` of one page, or `None` if the row is missing.
    async fn path_step(&mut self, id: i64) -> Result<Option<PathStep>>;

    /// Write a rebuilt materialized path.
    async fn update_uri(&mut self, id: i64, uri: &str) -> Result<()>;

    /// Set a row's parent and sibling order (reparent/reorder placement).
    async fn set_placement(&mut self, id: i64, parent_id: i64, order: i64) -> Result<()>;

    /// Direct child ids in sibling order, seeing this transaction's writes.
    async fn fetch_child_ids(&mut self, parent_id: i64) -> Result<Vec<i64>>;

    /// Delete the page rows with the given ids.
    async fn delete_pages(&mut self, ids: &[i64]) -> Result<()>;

    /// Delete every navigation link referencing any of `page_ids`.
    async fn delete_navigation_links(&mut self, page_ids: &[i64]) -> Result<()>;

    /// Commit the transaction. After a successful commit all statements are
    /// durable; after a failed one, none are.
    async fn commit(self: Box<Self>) -> Result<()>;

    /// Abort the transaction, discarding every statement issued through it.
    async fn rollback(self: Box<Self>) -> Result<()>;
}
