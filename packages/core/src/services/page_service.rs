//! Page Hierarchy Service
//!
//! `PageService` is the hierarchy mutator: it owns the transaction
//! boundaries and the tree invariants (single home page, derived `uri`,
//! cascading delete), orchestrating the page store, the path builder, the
//! tree assembler, and the descendant walker.
//!
//! # Invariants enforced here
//!
//! - at most one page carries `is_home` at any time
//! - `uri` is recomputed inside the same transaction as any write that can
//!   change `slug` or `parent_id`
//! - deleting a page removes its whole descendant closure plus every
//!   navigation link referencing it, atomically
//! - a reparent that would make a page its own ancestor is rejected before
//!   anything is written (the walkers assume acyclic data and would not
//!   terminate otherwise)
//!
//! Concurrency model: one transaction per mutation, no internal
//! parallelism, no coordination between writers racing on overlapping
//! subtrees beyond row-level isolation.

use crate::db::{InvalidationScope, PageEvent, PageStore, PageTransaction};
use crate::models::{MoveNode, NewPage, Page, PageFields, PageTree, PageUpdate, ROOT_PARENT};
use crate::services::error::PageServiceError;
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Broadcast capacity for domain events; slow subscribers start lagging
/// past this many undelivered events.
const PAGE_EVENT_CHANNEL_CAPACITY: usize = 128;

/// Hierarchy mutator and query facade over the flat page table.
///
/// # Examples
///
/// ```no_run
/// use pagetree_core::db::{DatabaseService, SqliteStore};
/// use pagetree_core::models::NewPage;
/// use pagetree_core::services::PageService;
/// use std::path::PathBuf;
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let db = Arc::new(DatabaseService::new(PathBuf::from("./data/pages.db")).await?);
///     let service = PageService::new(Arc::new(SqliteStore::new(db)));
///
///     let id = service.create(NewPage::new("about", "About")).await?;
///     let page = service.get_by_uri("/about/").await?.expect("just created");
///     assert_eq!(page.id, id);
///     Ok(())
/// }
/// ```
pub struct PageService {
    /// Persistence backend for all row operations
    store: Arc<dyn PageStore>,

    /// Broadcast channel for domain events (cache invalidation included)
    event_tx: broadcast::Sender<PageEvent>,
}

impl Clone for PageService {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            event_tx: self.event_tx.clone(),
        }
    }
}

impl PageService {
    /// Create a service over the given store.
    pub fn new(store: Arc<dyn PageStore>) -> Self {
        let (event_tx, _) = broadcast::channel(PAGE_EVENT_CHANNEL_CAPACITY);
        Self { store, event_tx }
    }

    /// Subscribe to domain events. Events are emitted after a mutation's
    /// transaction commits, never before.
    pub fn subscribe(&self) -> broadcast::Receiver<PageEvent> {
        self.event_tx.subscribe()
    }

    fn emit(&self, event: PageEvent) {
        // No receivers is fine; callers opt in to events.
        let _ = self.event_tx.send(event);
    }

    fn store_error(e: anyhow::Error) -> PageServiceError {
        PageServiceError::query_failed(e.to_string())
    }

    fn validate_slug(slug: &str) -> Result<(), PageServiceError> {
        if slug.is_empty() {
            return Err(PageServiceError::invalid_slug("slug must not be empty"));
        }
        if slug.contains('/') {
            return Err(PageServiceError::invalid_slug(format!(
                "slug '{}' must not contain '/'",
                slug
            )));
        }
        Ok(())
    }

    //
    // QUERIES
    //

    /// Look up a page by its materialized path. Leading and trailing
    /// separators are trimmed before the lookup, so `/about/team/` and
    /// `about/team` resolve the same page.
    pub async fn get_by_uri(&self, uri: &str) -> Result<Option<Page>, PageServiceError> {
        let trimmed = uri.trim_matches('/');
        self.store
            .fetch_by_uri(trimmed)
            .await
            .map_err(Self::store_error)
    }

    /// Look up a page by an ordered sequence of path segments.
    pub async fn get_by_segments<S: AsRef<str>>(
        &self,
        segments: &[S],
    ) -> Result<Option<Page>, PageServiceError> {
        let joined = segments
            .iter()
            .map(|s| s.as_ref())
            .collect::<Vec<_>>()
            .join("/");
        self.get_by_uri(&joined).await
    }

    /// The page flagged as home, if any.
    pub async fn get_home(&self) -> Result<Option<Page>, PageServiceError> {
        self.store.fetch_home().await.map_err(Self::store_error)
    }

    /// Fetch a single page by id.
    pub async fn get_page(&self, id: i64) -> Result<Option<Page>, PageServiceError> {
        self.store.fetch_page(id).await.map_err(Self::store_error)
    }

    /// Assemble the whole forest from flat rows, fresh on every call.
    ///
    /// One pass over `(id, parent_id, title)` rows in sibling order; rows
    /// pointing at a non-existent parent are silently absent from the
    /// result (orphan policy, not an error).
    pub async fn get_page_tree(&self) -> Result<PageTree, PageServiceError> {
        let rows = self
            .store
            .fetch_tree_rows()
            .await
            .map_err(Self::store_error)?;
        Ok(PageTree::assemble(rows))
    }

    /// Whether the page has at least one direct child.
    pub async fn has_children(&self, parent_id: i64) -> Result<bool, PageServiceError> {
        let count = self
            .store
            .count_children(parent_id)
            .await
            .map_err(Self::store_error)?;
        Ok(count > 0)
    }

    /// The descendant closure of `id`: the id itself followed by every
    /// transitive child, preorder in sibling order, one child fetch per
    /// visited node.
    ///
    /// Assumes the stored hierarchy is acyclic; the reparent guard is what
    /// keeps that true.
    pub async fn get_descendant_ids(&self, id: i64) -> Result<Vec<i64>, PageServiceError> {
        let mut ids = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            ids.push(current);
            let children = self
                .store
                .fetch_child_ids(current)
                .await
                .map_err(Self::store_error)?;
            for child in children.into_iter().rev() {
                stack.push(child);
            }
        }
        Ok(ids)
    }

    //
    // MUTATIONS
    //

    /// Create a page and build its materialized path, atomically.
    ///
    /// If the new page is flagged as home, whatever page currently holds
    /// the flag loses it first, inside the same transaction. The row is
    /// inserted with `uri = NULL` and the path builder fills it in before
    /// commit. Returns the store-assigned id.
    ///
    /// When the caller supplies no `order`, the creation timestamp is used
    /// so the new page sorts after its existing siblings.
    ///
    /// # Errors
    ///
    /// - `InvalidSlug` when the slug is empty or contains `/`
    /// - `ParentNotFound` when `parent_id` is neither the root sentinel nor
    ///   an existing page
    /// - `TransactionFailed` when the commit fails; no partial writes are
    ///   visible in that case
    pub async fn create(&self, input: NewPage) -> Result<i64, PageServiceError> {
        Self::validate_slug(&input.slug)?;
        let fields = input.into_fields(Utc::now().timestamp());

        let mut tx = self.store.begin().await.map_err(Self::store_error)?;
        match Self::create_in(&mut *tx, &fields).await {
            Ok(id) => {
                tx.commit()
                    .await
                    .map_err(|e| PageServiceError::transaction_failed(e.to_string()))?;
                tracing::debug!(page_id = id, slug = %fields.slug, "created page");
                self.emit(PageEvent::Created { id });
                Ok(id)
            }
            Err(e) => {
                Self::abort(tx, "create").await;
                Err(e)
            }
        }
    }

    async fn create_in(
        tx: &mut dyn PageTransaction,
        fields: &PageFields,
    ) -> Result<i64, PageServiceError> {
        if fields.parent_id != ROOT_PARENT
            && tx
                .fetch_page(fields.parent_id)
                .await
                .map_err(Self::store_error)?
                .is_none()
        {
            return Err(PageServiceError::parent_not_found(fields.parent_id));
        }

        if fields.is_home {
            tx.clear_home_flag().await.map_err(Self::store_error)?;
        }

        let id = tx.insert(fields).await.map_err(Self::store_error)?;
        Self::rebuild_path_in(tx, id).await?;
        Ok(id)
    }

    /// Apply a sparse update and rebuild the page's materialized path,
    /// atomically.
    ///
    /// Home exclusivity is enforced the same way as in [`create`]: setting
    /// the flag clears it everywhere else first. A parent change is guarded
    /// against cycles. After a successful commit, subscribers receive
    /// `Updated` and a cache invalidation event, in that order.
    ///
    /// Moving a page with this call leaves its descendants' `uri` values
    /// stale; follow with [`reindex_descendants`] over the page.
    ///
    /// [`create`]: Self::create
    /// [`reindex_descendants`]: Self::reindex_descendants
    pub async fn update(&self, id: i64, update: PageUpdate) -> Result<(), PageServiceError> {
        if let Some(slug) = &update.slug {
            Self::validate_slug(slug)?;
        }

        let mut tx = self.store.begin().await.map_err(Self::store_error)?;
        match Self::update_in(&mut *tx, id, &update).await {
            Ok(()) => {
                tx.commit()
                    .await
                    .map_err(|e| PageServiceError::transaction_failed(e.to_string()))?;
                tracing::debug!(page_id = id, "updated page");
                self.emit(PageEvent::Updated { id });
                self.emit(PageEvent::CacheInvalidated {
                    target: InvalidationScope::All,
                });
                Ok(())
            }
            Err(e) => {
                Self::abort(tx, "update").await;
                Err(e)
            }
        }
    }

    async fn update_in(
        tx: &mut dyn PageTransaction,
        id: i64,
        update: &PageUpdate,
    ) -> Result<(), PageServiceError> {
        let current = tx
            .fetch_page(id)
            .await
            .map_err(Self::store_error)?
            .ok_or_else(|| PageServiceError::page_not_found(id))?;

        let fields = update.apply(&current);

        if fields.parent_id != current.parent_id && fields.parent_id != ROOT_PARENT {
            if tx
                .fetch_page(fields.parent_id)
                .await
                .map_err(Self::store_error)?
                .is_none()
            {
                return Err(PageServiceError::parent_not_found(fields.parent_id));
            }
            // The closure includes the page itself, so parking a page under
            // itself is caught here too.
            let closure = Self::collect_descendants_in(tx, id).await?;
            if closure.contains(&fields.parent_id) {
                return Err(PageServiceError::circular_move(id, fields.parent_id));
            }
        }

        if update.is_home == Some(true) {
            tx.clear_home_flag().await.map_err(Self::store_error)?;
        }

        tx.update_fields(id, &fields)
            .await
            .map_err(Self::store_error)?;
        Self::rebuild_path_in(tx, id).await?;
        Ok(())
    }

    /// Delete a page, its whole descendant closure, and every navigation
    /// link referencing any of them, in one transaction.
    ///
    /// Returns the removed ids (the page first, then its descendants in
    /// preorder). If the transaction fails none of the deletions are
    /// visible.
    pub async fn delete(&self, id: i64) -> Result<Vec<i64>, PageServiceError> {
        let mut tx = self.store.begin().await.map_err(Self::store_error)?;
        match Self::delete_in(&mut *tx, id).await {
            Ok(ids) => {
                tx.commit()
                    .await
                    .map_err(|e| PageServiceError::transaction_failed(e.to_string()))?;
                tracing::debug!(page_id = id, removed = ids.len(), "deleted page subtree");
                self.emit(PageEvent::Deleted { ids: ids.clone() });
                Ok(ids)
            }
            Err(e) => {
                Self::abort(tx, "delete").await;
                Err(e)
            }
        }
    }

    async fn delete_in(
        tx: &mut dyn PageTransaction,
        id: i64,
    ) -> Result<Vec<i64>, PageServiceError> {
        if tx
            .fetch_page(id)
            .await
            .map_err(Self::store_error)?
            .is_none()
        {
            return Err(PageServiceError::page_not_found(id));
        }

        let ids = Self::collect_descendants_in(tx, id).await?;
        tx.delete_pages(&ids).await.map_err(Self::store_error)?;
        tx.delete_navigation_links(&ids)
            .await
            .map_err(Self::store_error)?;
        Ok(ids)
    }

    /// Reparent a subtree and renumber sibling orders from a nested move
    /// description, in one transaction.
    ///
    /// The described node lands under `new_parent_id` at `order`; each
    /// listed child lands under its describing node at its list position,
    /// recursively. The move is rejected up front when the target parent is
    /// the node itself or any of its current descendants.
    ///
    /// This call intentionally does **not** rebuild materialized paths: a
    /// [`reindex_descendants`] pass over the subtree root must follow for
    /// `uri` correctness.
    ///
    /// [`reindex_descendants`]: Self::reindex_descendants
    pub async fn reparent_and_reorder(
        &self,
        subtree: &MoveNode,
        new_parent_id: i64,
        order: i64,
    ) -> Result<(), PageServiceError> {
        let placements = subtree.placements(new_parent_id, order);

        let mut tx = self.store.begin().await.map_err(Self::store_error)?;
        match Self::reparent_in(&mut *tx, subtree, new_parent_id, &placements).await {
            Ok(()) => {
                tx.commit()
                    .await
                    .map_err(|e| PageServiceError::transaction_failed(e.to_string()))?;
                tracing::debug!(
                    page_id = subtree.id,
                    new_parent_id,
                    moved = placements.len(),
                    "reparented subtree"
                );
                Ok(())
            }
            Err(e) => {
                Self::abort(tx, "reparent").await;
                Err(e)
            }
        }
    }

    async fn reparent_in(
        tx: &mut dyn PageTransaction,
        subtree: &MoveNode,
        new_parent_id: i64,
        placements: &[crate::models::Placement],
    ) -> Result<(), PageServiceError> {
        if tx
            .fetch_page(subtree.id)
            .await
            .map_err(Self::store_error)?
            .is_none()
        {
            return Err(PageServiceError::page_not_found(subtree.id));
        }

        // The description itself can encode a cycle: a repeated id, or a
        // target parent that the description pulls inside the subtree.
        let mut described = HashSet::with_capacity(placements.len());
        for placement in placements {
            if !described.insert(placement.id) {
                return Err(PageServiceError::circular_move(
                    placement.id,
                    placement.parent_id,
                ));
            }
        }
        if described.contains(&new_parent_id) {
            return Err(PageServiceError::circular_move(subtree.id, new_parent_id));
        }

        if new_parent_id != ROOT_PARENT {
            if tx
                .fetch_page(new_parent_id)
                .await
                .map_err(Self::store_error)?
                .is_none()
            {
                return Err(PageServiceError::parent_not_found(new_parent_id));
            }
            let closure = Self::collect_descendants_in(tx, subtree.id).await?;
            if closure.contains(&new_parent_id) {
                return Err(PageServiceError::circular_move(subtree.id, new_parent_id));
            }
        }

        for placement in placements {
            tx.set_placement(placement.id, placement.parent_id, placement.order)
                .await
                .map_err(Self::store_error)?;
        }
        Ok(())
    }

    /// Recompute one page's materialized path in its own short transaction.
    ///
    /// Walks parent pointers up to a root, joins the slugs with `/`, and
    /// writes the result back into `uri`. Returns the rebuilt path.
    ///
    /// # Errors
    ///
    /// `PageNotFound` when `id` (or any ancestor encountered mid-walk) does
    /// not exist; the write is rolled back in that case.
    pub async fn rebuild_path(&self, id: i64) -> Result<String, PageServiceError> {
        let mut tx = self.store.begin().await.map_err(Self::store_error)?;
        match Self::rebuild_path_in(&mut *tx, id).await {
            Ok(uri) => {
                tx.commit()
                    .await
                    .map_err(|e| PageServiceError::transaction_failed(e.to_string()))?;
                Ok(uri)
            }
            Err(e) => {
                Self::abort(tx, "rebuild_path").await;
                Err(e)
            }
        }
    }

    /// Recompute the materialized path of a page and every descendant.
    ///
    /// Each id gets its own `rebuild_path` call, so ordering does not
    /// matter (every walk independently climbs to a root) and the pass is
    /// idempotent. A crash mid-pass leaves only the not-yet-visited ids
    /// stale; running the pass again heals them.
    pub async fn reindex_descendants(&self, id: i64) -> Result<(), PageServiceError> {
        let ids = self.get_descendant_ids(id).await?;
        let count = ids.len();
        for page_id in ids {
            self.rebuild_path(page_id).await?;
        }
        tracing::debug!(page_id = id, reindexed = count, "reindexed descendants");
        Ok(())
    }

    //
    // SHARED WALKS
    //

    /// Materialized-path walk inside an open transaction.
    ///
    /// Climbs from `id` to the root sentinel, prepending slugs; always
    /// executes at least one step, so a root page's path is its own slug.
    /// Termination relies on the stored chain being finite and acyclic.
    async fn rebuild_path_in(
        tx: &mut dyn PageTransaction,
        id: i64,
    ) -> Result<String, PageServiceError> {
        let mut segments = Vec::new();
        let mut current = id;
        loop {
            let step = tx
                .path_step(current)
                .await
                .map_err(Self::store_error)?
                .ok_or_else(|| PageServiceError::page_not_found(current))?;
            segments.push(step.slug);
            if step.parent_id <= ROOT_PARENT {
                break;
            }
            current = step.parent_id;
        }
        segments.reverse();

        let uri = segments.join("/");
        tx.update_uri(id, &uri).await.map_err(Self::store_error)?;
        Ok(uri)
    }

    /// Preorder descendant closure inside an open transaction, seeing the
    /// transaction's own writes.
    async fn collect_descendants_in(
        tx: &mut dyn PageTransaction,
        id: i64,
    ) -> Result<Vec<i64>, PageServiceError> {
        let mut ids = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            ids.push(current);
            let children = tx
                .fetch_child_ids(current)
                .await
                .map_err(Self::store_error)?;
            for child in children.into_iter().rev() {
                stack.push(child);
            }
        }
        Ok(ids)
    }

    async fn abort(tx: Box<dyn PageTransaction>, operation: &str) {
        if let Err(e) = tx.rollback().await {
            tracing::warn!("failed to roll back {} transaction: {}", operation, e);
        }
    }
}
