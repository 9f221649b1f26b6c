use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

use super::schema::Database;
use crate::model::{Enclosure, Entry, EntryStatus};

#[derive(FromRow)]
struct EntryRow {
    id: i64,
    feed_id: i64,
    hash: String,
    title: String,
    url: String,
    comments_url: String,
    author: String,
    content: String,
    published_at: i64,
    status: String,
    starred: bool,
    tags: String,
}

impl EntryRow {
    fn into_entry(self) -> Entry {
        Entry {
            id: self.id,
            feed_id: self.feed_id,
            hash: self.hash,
            title: self.title,
            url: self.url,
            comments_url: self.comments_url,
            author: self.author,
            content: self.content,
            date: DateTime::from_timestamp(self.published_at, 0).unwrap_or_else(Utc::now),
            status: match self.status.as_str() {
                "read" => EntryStatus::Read,
                "removed" => EntryStatus::Removed,
                _ => EntryStatus::Unread,
            },
            starred: self.starred,
            tags: serde_json::from_str(&self.tags).unwrap_or_default(),
            enclosures: Vec::new(),
        }
    }
}

impl Database {
    // ========================================================================
    // Entry Operations
    // ========================================================================

    /// Merge a parsed entry list into the feed.
    ///
    /// New hashes are inserted as unread. Known hashes are either refreshed
    /// (`update_existing = true`) or left completely untouched; the crawler
    /// path passes `false` so full-page extractions are never clobbered by
    /// the feed's own summaries. Entries are never re-inserted.
    ///
    /// Returns the number of newly inserted entries.
    pub async fn refresh_feed_entries(
        &self,
        _user_id: i64,
        feed_id: i64,
        entries: &[Entry],
        update_existing: bool,
    ) -> Result<usize> {
        let now = Utc::now().timestamp();
        let mut inserted = 0;
        let mut tx = self.pool.begin().await?;

        for entry in entries {
            let tags = serde_json::to_string(&entry.tags)?;
            let existing: Option<(i64,)> =
                sqlx::query_as("SELECT id FROM entries WHERE feed_id = ? AND hash = ?")
                    .bind(feed_id)
                    .bind(&entry.hash)
                    .fetch_optional(&mut *tx)
                    .await?;

            let entry_id = match existing {
                None => {
                    let result = sqlx::query(
                        r#"
                        INSERT INTO entries (
                            feed_id, hash, title, url, comments_url, author,
                            content, published_at, status, tags, created_at, changed_at
                        )
                        VALUES (?, ?, ?, ?, ?, ?, ?, ?, 'unread', ?, ?, ?)
                    "#,
                    )
                    .bind(feed_id)
                    .bind(&entry.hash)
                    .bind(&entry.title)
                    .bind(&entry.url)
                    .bind(&entry.comments_url)
                    .bind(&entry.author)
                    .bind(&entry.content)
                    .bind(entry.date.timestamp())
                    .bind(&tags)
                    .bind(now)
                    .bind(now)
                    .execute(&mut *tx)
                    .await?;
                    inserted += 1;
                    result.last_insert_rowid()
                }
                Some((id,)) => {
                    if !update_existing {
                        continue;
                    }
                    sqlx::query(
                        r#"
                        UPDATE entries SET
                            title = ?, url = ?, comments_url = ?, author = ?,
                            content = ?, published_at = ?, tags = ?, changed_at = ?
                        WHERE id = ?
                    "#,
                    )
                    .bind(&entry.title)
                    .bind(&entry.url)
                    .bind(&entry.comments_url)
                    .bind(&entry.author)
                    .bind(&entry.content)
                    .bind(entry.date.timestamp())
                    .bind(&tags)
                    .bind(now)
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
                    id
                }
            };

            for enclosure in &entry.enclosures {
                sqlx::query(
                    r#"
                    INSERT INTO enclosures (entry_id, url, mime_type, size)
                    VALUES (?, ?, ?, ?)
                    ON CONFLICT(entry_id, url) DO UPDATE SET
                        mime_type = excluded.mime_type,
                        size = excluded.size
                "#,
                )
                .bind(entry_id)
                .bind(&enclosure.url)
                .bind(&enclosure.mime_type)
                .bind(enclosure.size)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        Ok(inserted)
    }

    /// All entries of a feed, newest first, with enclosures attached.
    pub async fn entries_for_feed(&self, feed_id: i64) -> Result<Vec<Entry>> {
        let rows: Vec<EntryRow> = sqlx::query_as(
            r#"
            SELECT id, feed_id, hash, title, url, comments_url, author,
                   content, published_at, status, starred, tags
            FROM entries
            WHERE feed_id = ?
            ORDER BY published_at DESC, id DESC
        "#,
        )
        .bind(feed_id)
        .fetch_all(&self.pool)
        .await?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let mut entry = row.into_entry();
            let enclosures: Vec<(String, String, i64, i64)> = sqlx::query_as(
                "SELECT url, mime_type, size, media_progression FROM enclosures WHERE entry_id = ? ORDER BY id",
            )
            .bind(entry.id)
            .fetch_all(&self.pool)
            .await?;
            entry.enclosures = enclosures
                .into_iter()
                .map(|(url, mime_type, size, media_progression)| Enclosure {
                    url,
                    mime_type,
                    size,
                    media_progression,
                })
                .collect();
            entries.push(entry);
        }

        Ok(entries)
    }

    /// Entries published for this feed during the last seven days; drives the
    /// entry-frequency scheduling policy.
    pub async fn weekly_entry_count(&self, user_id: i64, feed_id: i64) -> Result<i64> {
        let week_ago = Utc::now().timestamp() - 7 * 24 * 60 * 60;
        let row: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*)
            FROM entries e
            JOIN feeds f ON f.id = e.feed_id
            WHERE f.user_id = ? AND e.feed_id = ? AND e.published_at >= ?
        "#,
        )
        .bind(user_id)
        .bind(feed_id)
        .bind(week_ago)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.0)
    }

    /// Housekeeping: flag up to `limit` old entries of the given status as
    /// removed. Returns the number of archived rows.
    pub async fn archive_entries(
        &self,
        status: EntryStatus,
        days: i64,
        limit: i64,
    ) -> Result<u64> {
        let cutoff = Utc::now().timestamp() - days * 24 * 60 * 60;
        let result = sqlx::query(
            r#"
            UPDATE entries SET status = 'removed'
            WHERE id IN (
                SELECT id FROM entries
                WHERE status = ? AND created_at < ?
                ORDER BY created_at
                LIMIT ?
            )
        "#,
        )
        .bind(status.as_str())
        .bind(cutoff)
        .bind(limit)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
