use anyhow::Result;

use super::schema::Database;

impl Database {
    // ========================================================================
    // Icon Operations
    // ========================================================================

    pub async fn has_icon(&self, feed_id: i64) -> Result<bool> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT feed_id FROM feed_icons WHERE feed_id = ?")
                .bind(feed_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.is_some())
    }

    pub async fn create_feed_icon(
        &self,
        feed_id: i64,
        mime_type: &str,
        data: &[u8],
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO feed_icons (feed_id, data, mime_type)
            VALUES (?, ?, ?)
            ON CONFLICT(feed_id) DO UPDATE SET
                data = excluded.data,
                mime_type = excluded.mime_type
        "#,
        )
        .bind(feed_id)
        .bind(data)
        .bind(mime_type)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
