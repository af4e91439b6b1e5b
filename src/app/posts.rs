use anyhow::Result;
use sqlx::postgres::PgRow;
use sqlx::Row;

use crate::domain::account::Actor;
use crate::domain::post::Post;
use crate::infra::db::Db;

#[derive(Clone)]
pub struct PostService {
    db: Db,
}

impl PostService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn create_post(
        &self,
        account_id: i64,
        body: String,
        image: Option<String>,
    ) -> Result<Post> {
        let row = sqlx::query(
            "INSERT INTO posts (account_id, body, image) \
             VALUES ($1, $2, $3) \
             RETURNING id, account_id, body, image, edited, created_at, updated_at",
        )
        .bind(account_id)
        .bind(body)
        .bind(image)
        .fetch_one(self.db.pool())
        .await?;

        let post = post_from_row(&row);
        tracing::info!(post_id = post.id, account_id = account_id, "post created");
        Ok(post)
    }

    pub async fn get_post(&self, post_id: i64) -> Result<Option<Post>> {
        let row = sqlx::query(
            "SELECT id, account_id, body, image, edited, created_at, updated_at \
             FROM posts WHERE id = $1",
        )
        .bind(post_id)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.as_ref().map(post_from_row))
    }

    /// Replaces the body of a post owned by `owner_id` and marks it edited.
    /// Returns `None` when the post does not exist or belongs to someone else.
    pub async fn update_body(
        &self,
        post_id: i64,
        owner_id: i64,
        body: String,
    ) -> Result<Option<Post>> {
        let row = sqlx::query(
            "UPDATE posts \
             SET body = $3, edited = true, updated_at = now() \
             WHERE id = $1 AND account_id = $2 \
             RETURNING id, account_id, body, image, edited, created_at, updated_at",
        )
        .bind(post_id)
        .bind(owner_id)
        .bind(body)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.as_ref().map(post_from_row))
    }

    /// Admins may delete any post; everyone else only their own. Likes and
    /// comments go with the post through `ON DELETE CASCADE`.
    pub async fn delete_post(&self, post_id: i64, actor: Actor) -> Result<bool> {
        let result = if actor.role.is_admin() {
            sqlx::query("DELETE FROM posts WHERE id = $1")
                .bind(post_id)
                .execute(self.db.pool())
                .await?
        } else {
            sqlx::query("DELETE FROM posts WHERE id = $1 AND account_id = $2")
                .bind(post_id)
                .bind(actor.account_id)
                .execute(self.db.pool())
                .await?
        };

        let deleted = result.rows_affected() > 0;
        if deleted {
            tracing::info!(
                post_id = post_id,
                actor_id = actor.account_id,
                as_admin = actor.role.is_admin(),
                "post deleted"
            );
        }
        Ok(deleted)
    }
}

fn post_from_row(row: &PgRow) -> Post {
    Post {
        id: row.get("id"),
        account_id: row.get("account_id"),
        body: row.get("body"),
        image: row.get("image"),
        edited: row.get("edited"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}
