//! Database Connection Management
//!
//! Core connection and schema bootstrap for the page store, using
//! libsql (embedded SQLite).
//!
//! # Architecture
//!
//! - **Path-agnostic**: accepts any valid `PathBuf`
//! - **Idempotent schema**: `CREATE TABLE IF NOT EXISTS`, safe to run on
//!   every startup
//! - **WAL mode**: Write-Ahead Logging for concurrent readers
//! - **No enforced tree integrity**: `parent_id` is a plain integer column;
//!   acyclicity and cascade semantics are the service layer's job, not the
//!   store's
//!
//! # Connection Pattern
//!
//! Use `connect_with_timeout()` in async functions. The 5-second busy
//! timeout makes concurrent operations wait and retry instead of failing
//! immediately with `SQLITE_BUSY`.

use crate::db::error::DatabaseError;
use libsql::{Builder, Database};
use std::path::PathBuf;
use std::sync::Arc;

/// Database service managing the libsql connection and the pages schema
///
/// # Examples
///
/// ```no_run
/// use pagetree_core::db::DatabaseService;
/// use std::path::PathBuf;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let db = DatabaseService::new(PathBuf::from("./data/pages.db")).await?;
///     let conn = db.connect_with_timeout().await?;
///     # let _ = conn;
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct DatabaseService {
    /// libsql database handle (wrapped in Arc for sharing)
    pub db: Arc<Database>,

    /// Path to the database file
    pub db_path: PathBuf,
}

impl DatabaseService {
    /// Open (or create) the database at `db_path` and bootstrap the schema.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the parent directory cannot be created,
    /// the file cannot be opened, or schema initialization fails.
    pub async fn new(db_path: PathBuf) -> Result<Self, DatabaseError> {
        if let Some(parent) = db_path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let db = Builder::new_local(&db_path)
            .build()
            .await
            .map_err(|e| DatabaseError::open_failed(db_path.clone(), e))?;

        let service = Self {
            db: Arc::new(db),
            db_path,
        };

        service.initialize_schema().await?;

        Ok(service)
    }

    /// Execute a PRAGMA statement.
    ///
    /// PRAGMA statements return rows, so query() must be used instead of
    /// execute().
    async fn execute_pragma(
        &self,
        conn: &libsql::Connection,
        pragma: &str,
    ) -> Result<(), DatabaseError> {
        let mut stmt = conn.prepare(pragma).await.map_err(|e| {
            DatabaseError::sql_execution(format!("failed to prepare '{}': {}", pragma, e))
        })?;
        let _ = stmt.query(()).await.map_err(|e| {
            DatabaseError::sql_execution(format!("failed to execute '{}': {}", pragma, e))
        })?;
        Ok(())
    }

    /// Create tables and indexes; enable WAL, busy timeout, and foreign
    /// keys.
    ///
    /// The `pages` table is the flat hierarchy store: `parent_id` points at
    /// another row (0 = root sentinel) and `uri` is the materialized slug
    /// path, nullable because it is derived after insertion.
    ///
    /// `navigation_links` carries no foreign key on purpose: cascading
    /// delete of links is owned by the hierarchy mutator, inside its own
    /// transaction.
    async fn initialize_schema(&self) -> Result<(), DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        self.execute_pragma(&conn, "PRAGMA journal_mode = WAL")
            .await?;
        self.execute_pragma(&conn, "PRAGMA busy_timeout = 5000")
            .await?;
        self.execute_pragma(&conn, "PRAGMA foreign_keys = ON")
            .await?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS pages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                slug TEXT NOT NULL,
                title TEXT NOT NULL,
                uri TEXT,
                parent_id INTEGER NOT NULL DEFAULT 0,
                layout_id INTEGER NOT NULL DEFAULT 0,
                css TEXT,
                js TEXT,
                meta_title TEXT,
                meta_keywords TEXT,
                meta_description TEXT,
                rss_enabled INTEGER NOT NULL DEFAULT 0,
                comments_enabled INTEGER NOT NULL DEFAULT 0,
                is_home INTEGER NOT NULL DEFAULT 0,
                status TEXT NOT NULL DEFAULT 'draft',
                restricted_to INTEGER,
                revision_id INTEGER NOT NULL DEFAULT 0,
                \"order\" INTEGER NOT NULL DEFAULT 0,
                created_on DATETIME DEFAULT CURRENT_TIMESTAMP,
                updated_on DATETIME
            )",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::sql_execution(format!("failed to create pages table: {}", e))
        })?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS navigation_links (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                page_id INTEGER NOT NULL,
                position INTEGER NOT NULL DEFAULT 0
            )",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::sql_execution(format!(
                "failed to create navigation_links table: {}",
                e
            ))
        })?;

        self.create_indexes(&conn).await?;

        Ok(())
    }

    /// Indexes backing the hot lookups: uri resolution, hierarchy walks,
    /// home-page fetch, and sibling ordering.
    async fn create_indexes(&self, conn: &libsql::Connection) -> Result<(), DatabaseError> {
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_pages_uri ON pages(uri)",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::sql_execution(format!("failed to create index 'idx_pages_uri': {}", e))
        })?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_pages_parent ON pages(parent_id)",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::sql_execution(format!(
                "failed to create index 'idx_pages_parent': {}",
                e
            ))
        })?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_pages_home ON pages(is_home)",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::sql_execution(format!("failed to create index 'idx_pages_home': {}", e))
        })?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_pages_sibling ON pages(parent_id, \"order\")",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::sql_execution(format!(
                "failed to create index 'idx_pages_sibling': {}",
                e
            ))
        })?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_links_page ON navigation_links(page_id)",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::sql_execution(format!("failed to create index 'idx_links_page': {}", e))
        })?;

        Ok(())
    }

    /// Get a synchronous connection handle.
    ///
    /// Prefer `connect_with_timeout()` in async contexts; this is for
    /// single-threaded code where the connection never crosses an await
    /// point.
    pub fn connect(&self) -> Result<libsql::Connection, DatabaseError> {
        self.db.connect().map_err(DatabaseError::LibsqlError)
    }

    /// Get a connection with the 5s busy timeout applied.
    ///
    /// The default choice for async code: the timeout makes concurrent
    /// operations wait on a locked database instead of failing with
    /// `SQLITE_BUSY`.
    pub async fn connect_with_timeout(&self) -> Result<libsql::Connection, DatabaseError> {
        let conn = self.connect()?;
        self.execute_pragma(&conn, "PRAGMA busy_timeout = 5000")
            .await?;
        Ok(conn)
    }
}
