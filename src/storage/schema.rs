use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

/// Sequence for naming in-memory databases; a plain `:memory:` would give
/// every pooled connection its own empty database.
static MEMORY_DB_SEQ: AtomicU64 = AtomicU64::new(0);

// ============================================================================
// Database
// ============================================================================

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Invalid database path: {0}")]
    InvalidPath(String),
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

#[derive(Clone)]
pub struct Database {
    pub(crate) pool: SqlitePool,
}

impl Database {
    /// Open a database connection and run migrations.
    ///
    /// `":memory:"` opens a process-private in-memory database (used by the
    /// test suite); anything else is a file path.
    pub async fn open(path: &str) -> Result<Self, DatabaseError> {
        let url = if path == ":memory:" {
            // Named shared-cache database so the whole pool sees one schema.
            let seq = MEMORY_DB_SEQ.fetch_add(1, Ordering::Relaxed);
            format!("sqlite:file:memdb{}?mode=memory&cache=shared", seq)
        } else {
            format!("sqlite:{}", path)
        };
        let options = SqliteConnectOptions::from_str(&url)
            .map_err(|e| DatabaseError::InvalidPath(e.to_string()))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .min_connections(1)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Create the schema. Idempotent; runs on every open.
    async fn migrate(&self) -> Result<(), DatabaseError> {
        sqlx::query("PRAGMA foreign_keys = ON")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS categories (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL,
                title TEXT NOT NULL,
                UNIQUE(user_id, title)
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS feeds (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL,
                category_id INTEGER NOT NULL REFERENCES categories(id),
                feed_url TEXT NOT NULL,
                site_url TEXT NOT NULL DEFAULT '',
                title TEXT NOT NULL DEFAULT '',
                icon_url TEXT NOT NULL DEFAULT '',
                ttl INTEGER NOT NULL DEFAULT 0,
                etag_header TEXT NOT NULL DEFAULT '',
                last_modified_header TEXT NOT NULL DEFAULT '',
                checked_at INTEGER,
                next_check_at INTEGER,
                parsing_error_count INTEGER NOT NULL DEFAULT 0,
                parsing_error_message TEXT NOT NULL DEFAULT '',
                disabled INTEGER NOT NULL DEFAULT 0,
                ignore_http_cache INTEGER NOT NULL DEFAULT 0,
                crawler INTEGER NOT NULL DEFAULT 0,
                fetch_via_proxy INTEGER NOT NULL DEFAULT 0,
                allow_self_signed_certificates INTEGER NOT NULL DEFAULT 0,
                username TEXT NOT NULL DEFAULT '',
                password TEXT NOT NULL DEFAULT '',
                user_agent TEXT NOT NULL DEFAULT '',
                cookie TEXT NOT NULL DEFAULT '',
                blocklist_rules TEXT NOT NULL DEFAULT '',
                keeplist_rules TEXT NOT NULL DEFAULT '',
                rewrite_rules TEXT NOT NULL DEFAULT '',
                UNIQUE(user_id, feed_url)
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS entries (
                id INTEGER PRIMARY KEY,
                feed_id INTEGER NOT NULL REFERENCES feeds(id) ON DELETE CASCADE,
                hash TEXT NOT NULL,
                title TEXT NOT NULL DEFAULT '',
                url TEXT NOT NULL DEFAULT '',
                comments_url TEXT NOT NULL DEFAULT '',
                author TEXT NOT NULL DEFAULT '',
                content TEXT NOT NULL DEFAULT '',
                published_at INTEGER NOT NULL,
                status TEXT NOT NULL DEFAULT 'unread',
                starred INTEGER NOT NULL DEFAULT 0,
                tags TEXT NOT NULL DEFAULT '[]',
                created_at INTEGER NOT NULL,
                changed_at INTEGER NOT NULL,
                UNIQUE(feed_id, hash)
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS enclosures (
                id INTEGER PRIMARY KEY,
                entry_id INTEGER NOT NULL REFERENCES entries(id) ON DELETE CASCADE,
                url TEXT NOT NULL,
                mime_type TEXT NOT NULL DEFAULT '',
                size INTEGER NOT NULL DEFAULT 0,
                media_progression INTEGER NOT NULL DEFAULT 0,
                UNIQUE(entry_id, url)
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS feed_icons (
                feed_id INTEGER PRIMARY KEY REFERENCES feeds(id) ON DELETE CASCADE,
                data BLOB NOT NULL,
                mime_type TEXT NOT NULL DEFAULT ''
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_entries_feed ON entries(feed_id)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_entries_status ON entries(status)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_feeds_next_check ON feeds(next_check_at)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
