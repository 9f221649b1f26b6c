use anyhow::Result;

use super::schema::Database;

impl Database {
    // ========================================================================
    // Category Operations
    // ========================================================================

    /// Create a category for a user, returning its id.
    pub async fn create_category(&self, user_id: i64, title: &str) -> Result<i64> {
        let result = sqlx::query("INSERT INTO categories (user_id, title) VALUES (?, ?)")
            .bind(user_id)
            .bind(title)
            .execute(&self.pool)
            .await?;
        Ok(result.last_insert_rowid())
    }

    /// Whether the category exists and belongs to the user. Subscription
    /// requests are validated against this before any network I/O.
    pub async fn category_exists(&self, user_id: i64, category_id: i64) -> Result<bool> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT id FROM categories WHERE user_id = ? AND id = ?")
                .bind(user_id)
                .bind(category_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.is_some())
    }
}

#[cfg(test)]
mod tests {
    use crate::storage::Database;

    #[tokio::test]
    async fn test_category_ownership() {
        let db = Database::open(":memory:").await.unwrap();
        let id = db.create_category(1, "News").await.unwrap();

        assert!(db.category_exists(1, id).await.unwrap());
        assert!(!db.category_exists(2, id).await.unwrap());
        assert!(!db.category_exists(1, id + 1).await.unwrap());
    }
}
