//! SqliteStore - PageStore Implementation for libsql
//!
//! Implements the `PageStore` and `PageTransaction` traits on top of
//! `DatabaseService`. All SQL for the pages table lives here;
//! `libsql::Row` to `Page` conversion happens at a single point.
//!
//! # Design
//!
//! - **One statement per method**: cross-row orchestration (path rebuilds,
//!   descendant walks, cascades) stays in the service layer
//! - **Connection per call**: read methods grab a fresh connection; a
//!   transaction pins one connection for its whole lifetime, so every
//!   statement issued through it shares the same atomic unit
//! - **Rollback on drop**: an uncommitted `SqliteTransaction` is aborted
//!   when its connection is dropped

use crate::db::database::DatabaseService;
use crate::db::page_store::{PageStore, PageTransaction, PathStep};
use crate::models::{Page, PageFields, TreeRow};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use libsql::{params, Connection, Row};
use std::sync::Arc;

/// Column list matching the field order expected by `row_to_page`.
const PAGE_COLUMNS: &str = "id, slug, title, uri, parent_id, layout_id, css, js, \
     meta_title, meta_keywords, meta_description, rss_enabled, comments_enabled, \
     is_home, status, restricted_to, revision_id, \"order\", created_on, updated_on";

/// PageStore over an embedded SQLite database.
pub struct SqliteStore {
    db: Arc<DatabaseService>,
}

impl SqliteStore {
    pub fn new(db: Arc<DatabaseService>) -> Self {
        Self { db }
    }

    async fn connection(&self) -> Result<Connection> {
        Ok(self.db.connect_with_timeout().await?)
    }
}

/// Parse a stored timestamp - handles the SQLite `CURRENT_TIMESTAMP` format
/// and RFC3339.
fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Ok(naive.and_utc());
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    Err(anyhow::anyhow!(
        "unable to parse timestamp '{}' as SQLite or RFC3339 format",
        s
    ))
}

/// Convert a `libsql::Row` (selected via [`PAGE_COLUMNS`]) into a `Page`.
fn row_to_page(row: &Row) -> Result<Page> {
    let id: i64 = row.get(0).context("failed to get id")?;
    let slug: String = row.get(1).context("failed to get slug")?;
    let title: String = row.get(2).context("failed to get title")?;
    let uri: Option<String> = row.get(3).context("failed to get uri")?;
    let parent_id: i64 = row.get(4).context("failed to get parent_id")?;
    let layout_id: i64 = row.get(5).context("failed to get layout_id")?;
    let css: Option<String> = row.get(6).context("failed to get css")?;
    let js: Option<String> = row.get(7).context("failed to get js")?;
    let meta_title: Option<String> = row.get(8).context("failed to get meta_title")?;
    let meta_keywords: Option<String> = row.get(9).context("failed to get meta_keywords")?;
    let meta_description: Option<String> =
        row.get(10).context("failed to get meta_description")?;
    let rss_enabled: i64 = row.get(11).context("failed to get rss_enabled")?;
    let comments_enabled: i64 = row.get(12).context("failed to get comments_enabled")?;
    let is_home: i64 = row.get(13).context("failed to get is_home")?;
    let status: String = row.get(14).context("failed to get status")?;
    let restricted_to: Option<i64> = row.get(15).context("failed to get restricted_to")?;
    let revision_id: i64 = row.get(16).context("failed to get revision_id")?;
    let order: i64 = row.get(17).context("failed to get order")?;
    let created_on_str: String = row.get(18).context("failed to get created_on")?;
    let updated_on_str: Option<String> = row.get(19).context("failed to get updated_on")?;

    let created_on = parse_timestamp(&created_on_str).context("failed to parse created_on")?;
    let updated_on = match updated_on_str {
        Some(s) => Some(parse_timestamp(&s).context("failed to parse updated_on")?),
        None => None,
    };

    let status = status
        .parse()
        .map_err(|e: String| anyhow::anyhow!("failed to parse status: {}", e))?;

    Ok(Page {
        id,
        slug,
        title,
        uri,
        parent_id,
        layout_id,
        css,
        js,
        meta_title,
        meta_keywords,
        meta_description,
        rss_enabled: rss_enabled != 0,
        comments_enabled: comments_enabled != 0,
        is_home: is_home != 0,
        status,
        restricted_to,
        revision_id,
        order,
        created_on,
        updated_on,
    })
}

/// Fetch one page by id on the given connection.
///
/// Shared between the store (fresh connection) and an open transaction
/// (pinned connection), so both sides decode rows identically.
async fn fetch_page_on(conn: &Connection, id: i64) -> Result<Option<Page>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {} FROM pages WHERE id = ? LIMIT 1",
            PAGE_COLUMNS
        ))
        .await
        .context("failed to prepare page query")?;

    let mut rows = stmt
        .query([id])
        .await
        .context("failed to execute page query")?;

    match rows.next().await.context("failed to read page row")? {
        Some(row) => Ok(Some(row_to_page(&row)?)),
        None => Ok(None),
    }
}

/// Direct child ids in sibling order on the given connection.
async fn fetch_child_ids_on(conn: &Connection, parent_id: i64) -> Result<Vec<i64>> {
    let mut stmt = conn
        .prepare("SELECT id FROM pages WHERE parent_id = ? ORDER BY \"order\"")
        .await
        .context("failed to prepare child id query")?;

    let mut rows = stmt
        .query([parent_id])
        .await
        .context("failed to execute child id query")?;

    let mut ids = Vec::new();
    while let Some(row) = rows.next().await.context("failed to read child id row")? {
        ids.push(row.get::<i64>(0).context("failed to get child id")?);
    }
    Ok(ids)
}

#[async_trait]
impl PageStore for SqliteStore {
    async fn fetch_by_uri(&self, uri: &str) -> Result<Option<Page>> {
        let conn = self.connection().await?;

        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM pages WHERE uri = ? LIMIT 1",
                PAGE_COLUMNS
            ))
            .await
            .context("failed to prepare uri query")?;

        let mut rows = stmt
            .query([uri])
            .await
            .context("failed to execute uri query")?;

        match rows.next().await.context("failed to read uri row")? {
            Some(row) => Ok(Some(row_to_page(&row)?)),
            None => Ok(None),
        }
    }

    async fn fetch_home(&self) -> Result<Option<Page>> {
        let conn = self.connection().await?;

        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM pages WHERE is_home = 1 LIMIT 1",
                PAGE_COLUMNS
            ))
            .await
            .context("failed to prepare home query")?;

        let mut rows = stmt
            .query(())
            .await
            .context("failed to execute home query")?;

        match rows.next().await.context("failed to read home row")? {
            Some(row) => Ok(Some(row_to_page(&row)?)),
            None => Ok(None),
        }
    }

    async fn fetch_page(&self, id: i64) -> Result<Option<Page>> {
        let conn = self.connection().await?;
        fetch_page_on(&conn, id).await
    }

    async fn fetch_tree_rows(&self) -> Result<Vec<TreeRow>> {
        let conn = self.connection().await?;

        let mut stmt = conn
            .prepare("SELECT id, parent_id, title FROM pages ORDER BY \"order\"")
            .await
            .context("failed to prepare tree row query")?;

        let mut rows = stmt
            .query(())
            .await
            .context("failed to execute tree row query")?;

        let mut out = Vec::new();
        while let Some(row) = rows.next().await.context("failed to read tree row")? {
            out.push(TreeRow {
                id: row.get(0).context("failed to get id")?,
                parent_id: row.get(1).context("failed to get parent_id")?,
                title: row.get(2).context("failed to get title")?,
            });
        }
        Ok(out)
    }

    async fn fetch_children_of(&self, parent_id: i64) -> Result<Vec<Page>> {
        let conn = self.connection().await?;

        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM pages WHERE parent_id = ? ORDER BY \"order\"",
                PAGE_COLUMNS
            ))
            .await
            .context("failed to prepare children query")?;

        let mut rows = stmt
            .query([parent_id])
            .await
            .context("failed to execute children query")?;

        let mut pages = Vec::new();
        while let Some(row) = rows.next().await.context("failed to read child row")? {
            pages.push(row_to_page(&row)?);
        }
        Ok(pages)
    }

    async fn fetch_child_ids(&self, parent_id: i64) -> Result<Vec<i64>> {
        let conn = self.connection().await?;
        fetch_child_ids_on(&conn, parent_id).await
    }

    async fn count_children(&self, parent_id: i64) -> Result<i64> {
        let conn = self.connection().await?;

        let mut stmt = conn
            .prepare("SELECT COUNT(*) FROM pages WHERE parent_id = ?")
            .await
            .context("failed to prepare child count query")?;

        let mut rows = stmt
            .query([parent_id])
            .await
            .context("failed to execute child count query")?;

        let row = rows
            .next()
            .await
            .context("failed to read child count")?
            .context("child count query returned no row")?;
        row.get(0).context("failed to get child count")
    }

    async fn insert_navigation_link(
        &self,
        title: &str,
        page_id: i64,
        position: i64,
    ) -> Result<i64> {
        let conn = self.connection().await?;

        conn.execute(
            "INSERT INTO navigation_links (title, page_id, position) VALUES (?, ?, ?)",
            (title, page_id, position),
        )
        .await
        .context("failed to insert navigation link")?;

        Ok(conn.last_insert_rowid())
    }

    async fn count_navigation_links_for(&self, page_ids: &[i64]) -> Result<i64> {
        let conn = self.connection().await?;

        let mut total = 0i64;
        for page_id in page_ids {
            let mut stmt = conn
                .prepare("SELECT COUNT(*) FROM navigation_links WHERE page_id = ?")
                .await
                .context("failed to prepare link count query")?;

            let mut rows = stmt
                .query([*page_id])
                .await
                .context("failed to execute link count query")?;

            let row = rows
                .next()
                .await
                .context("failed to read link count")?
                .context("link count query returned no row")?;
            total += row.get::<i64>(0).context("failed to get link count")?;
        }
        Ok(total)
    }

    async fn begin(&self) -> Result<Box<dyn PageTransaction>> {
        let conn = self.connection().await?;

        conn.execute("BEGIN TRANSACTION", ())
            .await
            .context("failed to begin transaction")?;

        Ok(Box::new(SqliteTransaction { conn }))
    }
}

/// One open transaction pinned to a single connection.
pub struct SqliteTransaction {
    conn: Connection,
}

#[async_trait]
impl PageTransaction for SqliteTransaction {
    async fn insert(&mut self, fields: &PageFields) -> Result<i64> {
        self.conn
            .execute(
                "INSERT INTO pages (slug, title, uri, parent_id, layout_id, css, js, \
                 meta_title, meta_keywords, meta_description, rss_enabled, comments_enabled, \
                 is_home, status, restricted_to, revision_id, \"order\", created_on) \
                 VALUES (?, ?, NULL, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP)",
                params![
                    fields.slug.as_str(),
                    fields.title.as_str(),
                    fields.parent_id,
                    fields.layout_id,
                    fields.css.as_deref(),
                    fields.js.as_deref(),
                    fields.meta_title.as_deref(),
                    fields.meta_keywords.as_deref(),
                    fields.meta_description.as_deref(),
                    fields.rss_enabled as i64,
                    fields.comments_enabled as i64,
                    fields.is_home as i64,
                    fields.status.as_str(),
                    fields.restricted_to,
                    fields.revision_id,
                    fields.order,
                ],
            )
            .await
            .context("failed to insert page")?;

        Ok(self.conn.last_insert_rowid())
    }

    async fn update_fields(&mut self, id: i64, fields: &PageFields) -> Result<()> {
        self.conn
            .execute(
                "UPDATE pages SET slug = ?, title = ?, uri = NULL, parent_id = ?, \
                 layout_id = ?, css = ?, js = ?, meta_title = ?, meta_keywords = ?, \
                 meta_description = ?, rss_enabled = ?, comments_enabled = ?, is_home = ?, \
                 status = ?, restricted_to = ?, revision_id = ?, \"order\" = ?, \
                 updated_on = CURRENT_TIMESTAMP WHERE id = ?",
                params![
                    fields.slug.as_str(),
                    fields.title.as_str(),
                    fields.parent_id,
                    fields.layout_id,
                    fields.css.as_deref(),
                    fields.js.as_deref(),
                    fields.meta_title.as_deref(),
                    fields.meta_keywords.as_deref(),
                    fields.meta_description.as_deref(),
                    fields.rss_enabled as i64,
                    fields.comments_enabled as i64,
                    fields.is_home as i64,
                    fields.status.as_str(),
                    fields.restricted_to,
                    fields.revision_id,
                    fields.order,
                    id,
                ],
            )
            .await
            .context("failed to update page")?;

        Ok(())
    }

    async fn fetch_page(&mut self, id: i64) -> Result<Option<Page>> {
        fetch_page_on(&self.conn, id).await
    }

    async fn clear_home_flag(&mut self) -> Result<()> {
        self.conn
            .execute("UPDATE pages SET is_home = 0 WHERE is_home = 1", ())
            .await
            .context("failed to clear home flag")?;
        Ok(())
    }

    async fn path_step(&mut self, id: i64) -> Result<Option<PathStep>> {
        let mut stmt = self
            .conn
            .prepare("SELECT slug, parent_id FROM pages WHERE id = ?")
            .await
            .context("failed to prepare path step query")?;

        let mut rows = stmt
            .query([id])
            .await
            .context("failed to execute path step query")?;

        match rows.next().await.context("failed to read path step")? {
            Some(row) => Ok(Some(PathStep {
                slug: row.get(0).context("failed to get slug")?,
                parent_id: row.get(1).context("failed to get parent_id")?,
            })),
            None => Ok(None),
        }
    }

    async fn update_uri(&mut self, id: i64, uri: &str) -> Result<()> {
        self.conn
            .execute("UPDATE pages SET uri = ? WHERE id = ?", (uri, id))
            .await
            .context("failed to update uri")?;
        Ok(())
    }

    async fn set_placement(&mut self, id: i64, parent_id: i64, order: i64) -> Result<()> {
        self.conn
            .execute(
                "UPDATE pages SET parent_id = ?, \"order\" = ? WHERE id = ?",
                (parent_id, order, id),
            )
            .await
            .context("failed to set placement")?;
        Ok(())
    }

    async fn fetch_child_ids(&mut self, parent_id: i64) -> Result<Vec<i64>> {
        fetch_child_ids_on(&self.conn, parent_id).await
    }

    async fn delete_pages(&mut self, ids: &[i64]) -> Result<()> {
        for id in ids {
            self.conn
                .execute("DELETE FROM pages WHERE id = ?", [*id])
                .await
                .context("failed to delete page")?;
        }
        Ok(())
    }

    async fn delete_navigation_links(&mut self, page_ids: &[i64]) -> Result<()> {
        for page_id in page_ids {
            self.conn
                .execute(
                    "DELETE FROM navigation_links WHERE page_id = ?",
                    [*page_id],
                )
                .await
                .context("failed to delete navigation links")?;
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.conn
            .execute("COMMIT", ())
            .await
            .context("failed to commit transaction")?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.conn
            .execute("ROLLBACK", ())
            .await
            .context("failed to roll back transaction")?;
        Ok(())
    }
}
