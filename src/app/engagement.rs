use anyhow::Result;
use sqlx::{PgExecutor, Row};

use crate::domain::engagement::{Comment, LikeState};
use crate::infra::db::Db;

#[derive(Clone)]
pub struct EngagementService {
    db: Db,
}

impl EngagementService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn like_post(&self, account_id: i64, post_id: i64) -> Result<bool> {
        let result = sqlx::query(
            "INSERT INTO post_likes (account_id, post_id) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(account_id)
        .bind(post_id)
        .execute(self.db.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn unlike_post(&self, account_id: i64, post_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM post_likes WHERE account_id = $1 AND post_id = $2")
            .bind(account_id)
            .bind(post_id)
            .execute(self.db.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Flips the (account, post) like row: removes it if present, inserts it
    /// otherwise. Returns `None` when the post does not exist.
    pub async fn toggle_like(&self, account_id: i64, post_id: i64) -> Result<Option<LikeState>> {
        let mut tx = self.db.begin().await?;

        if !post_exists(&mut *tx, post_id).await? {
            return Ok(None);
        }

        let removed = sqlx::query("DELETE FROM post_likes WHERE account_id = $1 AND post_id = $2")
            .bind(account_id)
            .bind(post_id)
            .execute(&mut *tx)
            .await?
            .rows_affected()
            > 0;

        if !removed {
            sqlx::query(
                "INSERT INTO post_likes (account_id, post_id) VALUES ($1, $2) \
                 ON CONFLICT DO NOTHING",
            )
            .bind(account_id)
            .bind(post_id)
            .execute(&mut *tx)
            .await?;
        }

        let like_count = count_likes(&mut *tx, post_id).await?;
        tx.commit().await?;

        Ok(Some(LikeState {
            liked: !removed,
            like_count,
        }))
    }

    /// Puts the like row into the requested state. Repeating the same request
    /// leaves the count unchanged.
    pub async fn set_like(
        &self,
        account_id: i64,
        post_id: i64,
        liked: bool,
    ) -> Result<Option<LikeState>> {
        if !post_exists(self.db.pool(), post_id).await? {
            return Ok(None);
        }

        if liked {
            self.like_post(account_id, post_id).await?;
        } else {
            self.unlike_post(account_id, post_id).await?;
        }

        let like_count = count_likes(self.db.pool(), post_id).await?;
        Ok(Some(LikeState { liked, like_count }))
    }

    /// Returns `None` when the post does not exist.
    pub async fn comment_post(
        &self,
        account_id: i64,
        post_id: i64,
        body: String,
    ) -> Result<Option<Comment>> {
        // INSERT ... SELECT yields no row for a missing post instead of an FK error.
        let row = sqlx::query(
            "INSERT INTO comments (account_id, post_id, body) \
             SELECT $1, p.id, $3 FROM posts p WHERE p.id = $2 \
             RETURNING id, account_id, post_id, body, created_at",
        )
        .bind(account_id)
        .bind(post_id)
        .bind(body)
        .fetch_optional(self.db.pool())
        .await?;

        let comment = row.map(|row| Comment {
            id: row.get("id"),
            account_id: row.get("account_id"),
            post_id: row.get("post_id"),
            body: row.get("body"),
            created_at: row.get("created_at"),
        });
        if let Some(comment) = &comment {
            tracing::info!(comment_id = comment.id, post_id = post_id, "comment created");
        }
        Ok(comment)
    }
}

async fn post_exists<'e, E: PgExecutor<'e>>(executor: E, post_id: i64) -> Result<bool> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM posts WHERE id = $1)")
        .bind(post_id)
        .fetch_one(executor)
        .await?;
    Ok(exists)
}

async fn count_likes<'e, E: PgExecutor<'e>>(executor: E, post_id: i64) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM post_likes WHERE post_id = $1")
        .bind(post_id)
        .fetch_one(executor)
        .await?;
    Ok(count)
}
