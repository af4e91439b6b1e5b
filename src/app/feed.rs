//! Feed aggregation.
//!
//! A feed page is built from a fixed number of queries regardless of page
//! size: one count, one page of posts (with like and comment counts), then the
//! viewer's likes and the comments for every post on the page, fetched
//! concurrently and stitched onto the posts in memory.

use anyhow::Result;
use sqlx::postgres::PgRow;
use sqlx::{Postgres, QueryBuilder, Row};
use std::collections::{BTreeMap, HashSet};

use crate::app::media::ImageResolver;
use crate::app::pagination::{PageRequest, PageWindow};
use crate::app::search::escape_like_pattern;
use crate::domain::account::{full_name, short_name, Actor};
use crate::domain::feed::{DashboardInfo, FeedComment, FeedPost, FeedResults, FeedScope};
use crate::infra::db::Db;

#[derive(Clone)]
pub struct FeedService {
    db: Db,
    images: ImageResolver,
}

/// Named WHERE-clause filters shared by the count and page queries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct FeedFilters {
    account_id: Option<i64>,
    body_pattern: Option<String>,
}

impl FeedFilters {
    fn new(scope: FeedScope, search: Option<&str>) -> Self {
        let body_pattern = search
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(|text| format!("%{}%", escape_like_pattern(text)));
        Self {
            account_id: scope.account_id(),
            body_pattern,
        }
    }

    fn push_where(&self, builder: &mut QueryBuilder<'_, Postgres>) {
        let mut separator = " WHERE ";
        if let Some(account_id) = self.account_id {
            builder
                .push(separator)
                .push("p.account_id = ")
                .push_bind(account_id);
            separator = " AND ";
        }
        if let Some(pattern) = &self.body_pattern {
            builder
                .push(separator)
                .push("p.body ILIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\'");
        }
    }
}

impl FeedService {
    pub fn new(db: Db, images: ImageResolver) -> Self {
        Self { db, images }
    }

    pub async fn fetch_page(
        &self,
        viewer: Actor,
        scope: FeedScope,
        search: Option<&str>,
        page: PageRequest,
    ) -> Result<(PageWindow, FeedResults)> {
        let filters = FeedFilters::new(scope, search);
        let can_delete = scope.permits_delete(viewer.role);

        let mut count_query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM posts p");
        filters.push_where(&mut count_query);
        let count: i64 = count_query
            .build_query_scalar::<i64>()
            .fetch_one(self.db.pool())
            .await?;

        let window = page.window(count);
        let Some(offset) = window.offset() else {
            return Ok((window, FeedResults::empty(can_delete)));
        };

        let mut page_query = QueryBuilder::<Postgres>::new(
            "SELECT p.id, p.account_id, p.body, p.image, p.edited, p.created_at, \
                    a.username, a.first_name, a.last_name, a.profile_image, \
                    (SELECT COUNT(*) FROM post_likes l WHERE l.post_id = p.id) AS like_count, \
                    (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id) AS comment_count \
             FROM posts p \
             JOIN accounts a ON a.id = p.account_id",
        );
        filters.push_where(&mut page_query);
        page_query
            .push(" ORDER BY p.created_at DESC, p.id DESC LIMIT ")
            .push_bind(window.limit())
            .push(" OFFSET ")
            .push_bind(offset);

        let rows = page_query.build().fetch_all(self.db.pool()).await?;
        let mut posts: Vec<FeedPost> = rows
            .iter()
            .map(|row| self.post_from_row(row, viewer.account_id))
            .collect();
        let post_ids: Vec<i64> = posts.iter().map(|post| post.id).collect();

        let (liked, comments) = futures::try_join!(
            self.liked_post_ids(viewer.account_id, &post_ids),
            self.comments_for_posts(&post_ids)
        )?;

        let comments_by_post = group_comments(comments);
        for post in &mut posts {
            post.is_liked_by_viewer = liked.contains(&post.id);
            if let Some(comments) = comments_by_post.get(&post.id) {
                post.comments = comments.clone();
            }
        }
        let liked_post_ids = post_ids
            .iter()
            .copied()
            .filter(|id| liked.contains(id))
            .collect();

        tracing::debug!(
            viewer_id = viewer.account_id,
            count = window.count,
            page = window.current_page,
            returned = posts.len(),
            "feed page assembled"
        );

        Ok((
            window,
            FeedResults {
                posts,
                liked_post_ids,
                comments_by_post,
                can_delete,
                dashboard: None,
            },
        ))
    }

    /// Header details for a dashboard owner, or `None` for an unknown account.
    pub async fn dashboard_information(&self, account_id: i64) -> Result<Option<DashboardInfo>> {
        let row = sqlx::query(
            "SELECT id, username, first_name, last_name, profile_image \
             FROM accounts WHERE id = $1",
        )
        .bind(account_id)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.map(|row| {
            let first_name: String = row.get("first_name");
            let last_name: String = row.get("last_name");
            let profile_image: Option<String> = row.get("profile_image");
            DashboardInfo {
                user_id: row.get("id"),
                full_name: short_name(&first_name, &last_name),
                username: row.get("username"),
                user_image: self.images.profile_image(profile_image.as_deref()),
            }
        }))
    }

    async fn liked_post_ids(&self, account_id: i64, post_ids: &[i64]) -> Result<HashSet<i64>> {
        if post_ids.is_empty() {
            return Ok(HashSet::new());
        }
        let ids: Vec<i64> = sqlx::query_scalar(
            "SELECT post_id FROM post_likes WHERE account_id = $1 AND post_id = ANY($2)",
        )
        .bind(account_id)
        .bind(post_ids)
        .fetch_all(self.db.pool())
        .await?;
        Ok(ids.into_iter().collect())
    }

    async fn comments_for_posts(&self, post_ids: &[i64]) -> Result<Vec<FeedComment>> {
        if post_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query(
            "SELECT c.id, c.post_id, c.body, c.created_at, \
                    a.username, a.first_name, a.last_name, a.profile_image \
             FROM comments c \
             JOIN accounts a ON a.id = c.account_id \
             WHERE c.post_id = ANY($1) \
             ORDER BY c.created_at DESC, c.id DESC",
        )
        .bind(post_ids)
        .fetch_all(self.db.pool())
        .await?;

        let mut comments = Vec::with_capacity(rows.len());
        for row in rows {
            let first_name: String = row.get("first_name");
            let last_name: String = row.get("last_name");
            let profile_image: Option<String> = row.get("profile_image");
            comments.push(FeedComment {
                id: row.get("id"),
                author_name: full_name(&first_name, &last_name),
                username: row.get("username"),
                user_image: self.images.profile_image(profile_image.as_deref()),
                post_id: row.get("post_id"),
                body: row.get("body"),
                created_at: row.get("created_at"),
            });
        }
        Ok(comments)
    }

    fn post_from_row(&self, row: &PgRow, viewer_id: i64) -> FeedPost {
        let account_id: i64 = row.get("account_id");
        let image: Option<String> = row.get("image");
        let profile_image: Option<String> = row.get("profile_image");
        FeedPost {
            id: row.get("id"),
            image_url: self.images.resolve(image.as_deref()),
            user_id: account_id,
            username: row.get("username"),
            user_profile_image: self.images.profile_image(profile_image.as_deref()),
            first_name: row.get("first_name"),
            last_name: row.get("last_name"),
            body: row.get("body"),
            edited: row.get("edited"),
            created_at: row.get("created_at"),
            like_count: row.get("like_count"),
            comment_count: row.get("comment_count"),
            is_owned_by_viewer: account_id == viewer_id,
            is_liked_by_viewer: false,
            comments: Vec::new(),
        }
    }
}

/// Groups comments by post, keeping the incoming (newest-first) order within
/// each group.
pub fn group_comments(comments: Vec<FeedComment>) -> BTreeMap<i64, Vec<FeedComment>> {
    let mut grouped: BTreeMap<i64, Vec<FeedComment>> = BTreeMap::new();
    for comment in comments {
        grouped.entry(comment.post_id).or_default().push(comment);
    }
    grouped
}
