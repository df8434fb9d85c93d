//! Page Data Structures
//!
//! This module defines the `Page` row model and the field sets accepted by
//! the create/update operations.
//!
//! # Architecture
//!
//! - **Flat storage**: every page is one row in the `pages` table with a
//!   `parent_id` pointer; the hierarchy is reconstructed on demand
//! - **Materialized path**: `uri` caches the slash-joined slug chain from a
//!   root ancestor down to the page; it is derived, never hand-edited
//! - **Opaque payload**: presentation and SEO fields are carried through
//!   create/update untouched by the tree logic

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Reserved `parent_id` value meaning "no parent; this is a top-level page".
pub const ROOT_PARENT: i64 = 0;

/// Publication status of a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageStatus {
    #[default]
    Draft,
    Live,
}

impl PageStatus {
    /// Database text representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            PageStatus::Draft => "draft",
            PageStatus::Live => "live",
        }
    }
}

impl fmt::Display for PageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PageStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(PageStatus::Draft),
            "live" => Ok(PageStatus::Live),
            other => Err(format!("unknown page status '{}'", other)),
        }
    }
}

/// A content page: one node of the site hierarchy.
///
/// # Fields
///
/// - `id`: store-assigned identifier (SQLite rowid); immutable
/// - `slug`: short identifier, unique among siblings by convention
/// - `uri`: materialized path (slash-joined ancestor slugs including the
///   page's own slug); `None` until the first rebuild after insertion
/// - `parent_id`: owning parent, or [`ROOT_PARENT`] for top-level pages
/// - `order`: sibling ordering key, meaningful only among rows sharing the
///   same `parent_id`
/// - `is_home`: at most one page in the whole table carries this flag
/// - `revision_id`: reference into the external versioned content store;
///   carried, never dereferenced here
///
/// The remaining fields (title, layout, css/js blobs, SEO metadata, feature
/// flags, timestamps) are payload the tree subsystem does not interpret.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub uri: Option<String>,
    pub parent_id: i64,
    pub layout_id: i64,
    pub css: Option<String>,
    pub js: Option<String>,
    pub meta_title: Option<String>,
    pub meta_keywords: Option<String>,
    pub meta_description: Option<String>,
    pub rss_enabled: bool,
    pub comments_enabled: bool,
    pub is_home: bool,
    pub status: PageStatus,
    pub restricted_to: Option<i64>,
    pub revision_id: i64,
    pub order: i64,
    pub created_on: DateTime<Utc>,
    pub updated_on: Option<DateTime<Utc>>,
}

/// Complete column set written by an insert or a full-row update.
///
/// `uri` is deliberately absent: it is derived and only ever written by the
/// path rebuild.
#[derive(Debug, Clone, PartialEq)]
pub struct PageFields {
    pub slug: String,
    pub title: String,
    pub parent_id: i64,
    pub layout_id: i64,
    pub css: Option<String>,
    pub js: Option<String>,
    pub meta_title: Option<String>,
    pub meta_keywords: Option<String>,
    pub meta_description: Option<String>,
    pub rss_enabled: bool,
    pub comments_enabled: bool,
    pub is_home: bool,
    pub status: PageStatus,
    pub restricted_to: Option<i64>,
    pub revision_id: i64,
    pub order: i64,
}

/// Input accepted by [`create`](crate::services::PageService::create).
///
/// `order` is optional; when absent the service defaults it to the creation
/// timestamp so new pages sort after their existing siblings.
///
/// # Examples
///
/// ```rust
/// use pagetree_core::models::NewPage;
///
/// let page = NewPage {
///     parent_id: 0,
///     is_home: true,
///     ..NewPage::new("home", "Home")
/// };
/// assert_eq!(page.slug, "home");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct NewPage {
    pub slug: String,
    pub title: String,
    pub parent_id: i64,
    pub layout_id: i64,
    pub css: Option<String>,
    pub js: Option<String>,
    pub meta_title: Option<String>,
    pub meta_keywords: Option<String>,
    pub meta_description: Option<String>,
    pub rss_enabled: bool,
    pub comments_enabled: bool,
    pub is_home: bool,
    pub status: PageStatus,
    pub restricted_to: Option<i64>,
    pub revision_id: i64,
    pub order: Option<i64>,
}

impl NewPage {
    /// Create a root-level draft page with the given slug and title; all
    /// other fields take their defaults and can be overridden with struct
    /// update syntax.
    pub fn new(slug: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            title: title.into(),
            parent_id: ROOT_PARENT,
            layout_id: 0,
            css: None,
            js: None,
            meta_title: None,
            meta_keywords: None,
            meta_description: None,
            rss_enabled: false,
            comments_enabled: false,
            is_home: false,
            status: PageStatus::Draft,
            restricted_to: None,
            revision_id: 0,
            order: None,
        }
    }

    /// Resolve the optional ordering key and produce the full written
    /// column set.
    pub fn into_fields(self, default_order: i64) -> PageFields {
        PageFields {
            slug: self.slug,
            title: self.title,
            parent_id: self.parent_id,
            layout_id: self.layout_id,
            css: self.css,
            js: self.js,
            meta_title: self.meta_title,
            meta_keywords: self.meta_keywords,
            meta_description: self.meta_description,
            rss_enabled: self.rss_enabled,
            comments_enabled: self.comments_enabled,
            is_home: self.is_home,
            status: self.status,
            restricted_to: self.restricted_to,
            revision_id: self.revision_id,
            order: self.order.unwrap_or(default_order),
        }
    }
}

/// Sparse update accepted by [`update`](crate::services::PageService::update).
///
/// Outer `None` means "keep the current value". For nullable columns the
/// payload is itself an `Option`, so `Some(None)` clears the column.
#[derive(Debug, Clone, Default)]
pub struct PageUpdate {
    pub slug: Option<String>,
    pub title: Option<String>,
    pub parent_id: Option<i64>,
    pub layout_id: Option<i64>,
    pub css: Option<Option<String>>,
    pub js: Option<Option<String>>,
    pub meta_title: Option<Option<String>>,
    pub meta_keywords: Option<Option<String>>,
    pub meta_description: Option<Option<String>>,
    pub rss_enabled: Option<bool>,
    pub comments_enabled: Option<bool>,
    pub is_home: Option<bool>,
    pub status: Option<PageStatus>,
    pub restricted_to: Option<Option<i64>>,
    pub revision_id: Option<i64>,
    pub order: Option<i64>,
}

impl PageUpdate {
    /// Merge this update over the current row, yielding the full column set
    /// to write back.
    pub fn apply(&self, current: &Page) -> PageFields {
        PageFields {
            slug: self.slug.clone().unwrap_or_else(|| current.slug.clone()),
            title: self.title.clone().unwrap_or_else(|| current.title.clone()),
            parent_id: self.parent_id.unwrap_or(current.parent_id),
            layout_id: self.layout_id.unwrap_or(current.layout_id),
            css: match &self.css {
                None => current.css.clone(),
                Some(new_css) => new_css.clone(),
            },
            js: match &self.js {
                None => current.js.clone(),
                Some(new_js) => new_js.clone(),
            },
            meta_title: match &self.meta_title {
                None => current.meta_title.clone(),
                Some(new_meta) => new_meta.clone(),
            },
            meta_keywords: match &self.meta_keywords {
                None => current.meta_keywords.clone(),
                Some(new_meta) => new_meta.clone(),
            },
            meta_description: match &self.meta_description {
                None => current.meta_description.clone(),
                Some(new_meta) => new_meta.clone(),
            },
            rss_enabled: self.rss_enabled.unwrap_or(current.rss_enabled),
            comments_enabled: self.comments_enabled.unwrap_or(current.comments_enabled),
            is_home: self.is_home.unwrap_or(current.is_home),
            status: self.status.unwrap_or(current.status),
            restricted_to: match &self.restricted_to {
                None => current.restricted_to,
                Some(new_restriction) => *new_restriction,
            },
            revision_id: self.revision_id.unwrap_or(current.revision_id),
            order: self.order.unwrap_or(current.order),
        }
    }
}
