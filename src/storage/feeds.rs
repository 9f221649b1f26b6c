use anyhow::Result;
use chrono::DateTime;
use sqlx::FromRow;

use super::schema::Database;
use crate::model::Feed;

/// Flat row shape for the feeds table; converted to [`Feed`] at the boundary
/// (timestamps live as Unix seconds in SQLite).
#[derive(FromRow)]
struct FeedRow {
    id: i64,
    user_id: i64,
    category_id: i64,
    feed_url: String,
    site_url: String,
    title: String,
    icon_url: String,
    ttl: i64,
    etag_header: String,
    last_modified_header: String,
    checked_at: Option<i64>,
    next_check_at: Option<i64>,
    parsing_error_count: i64,
    parsing_error_message: String,
    disabled: bool,
    ignore_http_cache: bool,
    crawler: bool,
    fetch_via_proxy: bool,
    allow_self_signed_certificates: bool,
    username: String,
    password: String,
    user_agent: String,
    cookie: String,
    blocklist_rules: String,
    keeplist_rules: String,
    rewrite_rules: String,
}

impl FeedRow {
    fn into_feed(self) -> Feed {
        Feed {
            id: self.id,
            user_id: self.user_id,
            category_id: self.category_id,
            feed_url: self.feed_url,
            site_url: self.site_url,
            title: self.title,
            icon_url: self.icon_url,
            ttl: self.ttl,
            etag_header: self.etag_header,
            last_modified_header: self.last_modified_header,
            checked_at: self.checked_at.and_then(|t| DateTime::from_timestamp(t, 0)),
            next_check_at: self
                .next_check_at
                .and_then(|t| DateTime::from_timestamp(t, 0)),
            parsing_error_count: self.parsing_error_count,
            parsing_error_message: self.parsing_error_message,
            disabled: self.disabled,
            ignore_http_cache: self.ignore_http_cache,
            crawler: self.crawler,
            fetch_via_proxy: self.fetch_via_proxy,
            allow_self_signed_certificates: self.allow_self_signed_certificates,
            username: self.username,
            password: self.password,
            user_agent: self.user_agent,
            cookie: self.cookie,
            blocklist_rules: self.blocklist_rules,
            keeplist_rules: self.keeplist_rules,
            rewrite_rules: self.rewrite_rules,
            entries: Vec::new(),
        }
    }
}

const FEED_COLUMNS: &str = r#"
    id, user_id, category_id, feed_url, site_url, title, icon_url, ttl,
    etag_header, last_modified_header, checked_at, next_check_at,
    parsing_error_count, parsing_error_message, disabled, ignore_http_cache,
    crawler, fetch_via_proxy, allow_self_signed_certificates,
    username, password, user_agent, cookie,
    blocklist_rules, keeplist_rules, rewrite_rules
"#;

impl Database {
    // ========================================================================
    // Feed Operations
    // ========================================================================

    /// Insert a new feed and its parsed entries; sets `feed.id` on success.
    pub async fn create_feed(&self, feed: &mut Feed) -> Result<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO feeds (
                user_id, category_id, feed_url, site_url, title, icon_url, ttl,
                etag_header, last_modified_header, checked_at, next_check_at,
                disabled, ignore_http_cache, crawler, fetch_via_proxy,
                allow_self_signed_certificates, username, password, user_agent,
                cookie, blocklist_rules, keeplist_rules, rewrite_rules
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
        )
        .bind(feed.user_id)
        .bind(feed.category_id)
        .bind(&feed.feed_url)
        .bind(&feed.site_url)
        .bind(&feed.title)
        .bind(&feed.icon_url)
        .bind(feed.ttl)
        .bind(&feed.etag_header)
        .bind(&feed.last_modified_header)
        .bind(feed.checked_at.map(|t| t.timestamp()))
        .bind(feed.next_check_at.map(|t| t.timestamp()))
        .bind(feed.disabled)
        .bind(feed.ignore_http_cache)
        .bind(feed.crawler)
        .bind(feed.fetch_via_proxy)
        .bind(feed.allow_self_signed_certificates)
        .bind(&feed.username)
        .bind(&feed.password)
        .bind(&feed.user_agent)
        .bind(&feed.cookie)
        .bind(&feed.blocklist_rules)
        .bind(&feed.keeplist_rules)
        .bind(&feed.rewrite_rules)
        .execute(&self.pool)
        .await?;

        feed.id = result.last_insert_rowid();

        let entries = std::mem::take(&mut feed.entries);
        self.refresh_feed_entries(feed.user_id, feed.id, &entries, true)
            .await?;
        feed.entries = entries;

        Ok(())
    }

    /// Whether this user already subscribes to the URL.
    pub async fn feed_url_exists(&self, user_id: i64, feed_url: &str) -> Result<bool> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT id FROM feeds WHERE user_id = ? AND feed_url = ?")
                .bind(user_id)
                .bind(feed_url)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.is_some())
    }

    /// Whether a different feed of this user already uses the URL; guards
    /// against redirect-induced duplicates during refresh.
    pub async fn another_feed_url_exists(
        &self,
        user_id: i64,
        feed_id: i64,
        feed_url: &str,
    ) -> Result<bool> {
        let row: Option<(i64,)> = sqlx::query_as(
            "SELECT id FROM feeds WHERE user_id = ? AND feed_url = ? AND id != ?",
        )
        .bind(user_id)
        .bind(feed_url)
        .bind(feed_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.is_some())
    }

    pub async fn feed_by_id(&self, user_id: i64, feed_id: i64) -> Result<Option<Feed>> {
        let row: Option<FeedRow> = sqlx::query_as(&format!(
            "SELECT {} FROM feeds WHERE user_id = ? AND id = ?",
            FEED_COLUMNS
        ))
        .bind(user_id)
        .bind(feed_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(FeedRow::into_feed))
    }

    /// Persist every mutable field after a successful refresh.
    pub async fn update_feed(&self, feed: &Feed) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE feeds SET
                feed_url = ?, site_url = ?, title = ?, icon_url = ?, ttl = ?,
                etag_header = ?, last_modified_header = ?,
                checked_at = ?, next_check_at = ?,
                parsing_error_count = ?, parsing_error_message = ?
            WHERE id = ? AND user_id = ?
        "#,
        )
        .bind(&feed.feed_url)
        .bind(&feed.site_url)
        .bind(&feed.title)
        .bind(&feed.icon_url)
        .bind(feed.ttl)
        .bind(&feed.etag_header)
        .bind(&feed.last_modified_header)
        .bind(feed.checked_at.map(|t| t.timestamp()))
        .bind(feed.next_check_at.map(|t| t.timestamp()))
        .bind(feed.parsing_error_count)
        .bind(&feed.parsing_error_message)
        .bind(feed.id)
        .bind(feed.user_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Persist only the error bookkeeping and schedule; called on failed
    /// refreshes so a broken parse cannot clobber feed metadata.
    pub async fn update_feed_error(&self, feed: &Feed) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE feeds SET
                parsing_error_count = ?, parsing_error_message = ?,
                checked_at = ?, next_check_at = ?
            WHERE id = ? AND user_id = ?
        "#,
        )
        .bind(feed.parsing_error_count)
        .bind(&feed.parsing_error_message)
        .bind(feed.checked_at.map(|t| t.timestamp()))
        .bind(feed.next_check_at.map(|t| t.timestamp()))
        .bind(feed.id)
        .bind(feed.user_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
