//! Domain Events for the Page Hierarchy
//!
//! Events emitted by `PageService` after successful mutations, following
//! the observer pattern: subscribers (cache layers, live views) react to
//! changes without coupling to the persistence layer.
//!
//! # Event Flow
//!
//! 1. `PageService` commits a mutation transaction
//! 2. The matching event is sent on a tokio broadcast channel
//! 3. All subscribers receive it asynchronously
//!
//! Cache invalidation is an explicit event rather than a hidden global
//! cache: callers that maintain a cache keyed by page data subscribe and
//! drop entries per [`InvalidationScope`]. It is emitted synchronously
//! right after a successful update commit, never before.

use serde::{Deserialize, Serialize};

/// What a subscriber should drop from its cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", content = "id", rename_all = "camelCase")]
pub enum InvalidationScope {
    /// A single page changed.
    Page(i64),
    /// Anything derived from page data may be stale.
    All,
}

/// Domain events emitted by the hierarchy mutator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PageEvent {
    /// A page row was inserted and its path built.
    Created { id: i64 },

    /// A page row was updated and its path rebuilt.
    Updated { id: i64 },

    /// A subtree was removed; `ids` is the full deleted closure.
    Deleted { ids: Vec<i64> },

    /// Externally cached page data must be invalidated.
    CacheInvalidated { target: InvalidationScope },
}

impl PageEvent {
    /// String tag for logging and debugging.
    pub fn event_type(&self) -> &str {
        match self {
            PageEvent::Created { .. } => "page:created",
            PageEvent::Updated { .. } => "page:updated",
            PageEvent::Deleted { .. } => "page:deleted",
            PageEvent::CacheInvalidated { .. } => "cache:invalidated",
        }
    }
}
