use anyhow::Result;
use chrono::Utc;

use super::schema::Database;
use crate::model::Job;

impl Database {
    // ========================================================================
    // Scheduler Operations
    // ========================================================================

    /// A bounded batch of due feeds: enabled, with `next_check_at` elapsed or
    /// never scheduled. Oldest checks first so starved feeds catch up.
    pub async fn next_batch(&self, batch_size: i64) -> Result<Vec<Job>> {
        let now = Utc::now().timestamp();
        let rows: Vec<(i64, i64)> = sqlx::query_as(
            r#"
            SELECT user_id, id
            FROM feeds
            WHERE disabled = 0
              AND (next_check_at IS NULL OR next_check_at <= ?)
            ORDER BY checked_at ASC
            LIMIT ?
        "#,
        )
        .bind(now)
        .bind(batch_size)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(user_id, feed_id)| Job { user_id, feed_id })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use crate::model::Feed;
    use crate::storage::Database;
    use chrono::{Duration, Utc};

    async fn create_feed(db: &Database, category_id: i64, url: &str) -> Feed {
        let mut feed = Feed {
            user_id: 1,
            category_id,
            feed_url: url.to_string(),
            ..Default::default()
        };
        db.create_feed(&mut feed).await.unwrap();
        feed
    }

    #[tokio::test]
    async fn test_batch_only_contains_due_feeds() {
        let db = Database::open(":memory:").await.unwrap();
        let category_id = db.create_category(1, "News").await.unwrap();

        // Never checked: due.
        let due = create_feed(&db, category_id, "https://example.org/a").await;

        // Scheduled in the future: not due.
        let mut scheduled = create_feed(&db, category_id, "https://example.org/b").await;
        scheduled.next_check_at = Some(Utc::now() + Duration::hours(1));
        db.update_feed(&scheduled).await.unwrap();

        let jobs = db.next_batch(10).await.unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].feed_id, due.id);
        assert_eq!(jobs[0].user_id, 1);
    }

    #[tokio::test]
    async fn test_batch_is_bounded() {
        let db = Database::open(":memory:").await.unwrap();
        let category_id = db.create_category(1, "News").await.unwrap();
        for i in 0..5 {
            create_feed(&db, category_id, &format!("https://example.org/{}", i)).await;
        }

        let jobs = db.next_batch(3).await.unwrap();
        assert_eq!(jobs.len(), 3);
    }
}
