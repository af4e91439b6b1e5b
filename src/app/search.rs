use anyhow::Result;
use sqlx::Row;

use crate::app::feed::FeedService;
use crate::app::pagination::{PageRequest, PageWindow};
use crate::domain::account::{AccountSummary, Actor};
use crate::domain::feed::{FeedResults, FeedScope};
use crate::infra::db::Db;

const MAX_ACCOUNT_MATCHES: i64 = 50;

#[derive(Clone)]
pub struct SearchService {
    db: Db,
    feed: FeedService,
}

pub struct SearchResults {
    pub accounts: Vec<AccountSummary>,
    pub window: PageWindow,
    pub posts: FeedResults,
}

impl SearchService {
    pub fn new(db: Db, feed: FeedService) -> Self {
        Self { db, feed }
    }

    /// Runs the account lookup and the public feed search concurrently.
    /// Blank text matches nothing on either side.
    pub async fn search(
        &self,
        viewer: Actor,
        text: &str,
        page: PageRequest,
    ) -> Result<SearchResults> {
        if text.trim().is_empty() {
            let can_delete = FeedScope::AllPublic.permits_delete(viewer.role);
            return Ok(SearchResults {
                accounts: Vec::new(),
                window: page.window(0),
                posts: FeedResults::empty(can_delete),
            });
        }

        let (accounts, (window, posts)) = futures::try_join!(
            self.search_accounts(text),
            self.feed
                .fetch_page(viewer, FeedScope::AllPublic, Some(text), page)
        )?;

        Ok(SearchResults {
            accounts,
            window,
            posts,
        })
    }

    pub async fn search_accounts(&self, text: &str) -> Result<Vec<AccountSummary>> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(Vec::new());
        }
        let pattern = format!("%{}%", escape_like_pattern(text));
        let rows = sqlx::query(
            "SELECT id, username, first_name, last_name, profile_image \
             FROM accounts \
             WHERE username ILIKE $1 ESCAPE '\\' \
                OR first_name ILIKE $1 ESCAPE '\\' \
                OR last_name ILIKE $1 ESCAPE '\\' \
             ORDER BY created_at DESC, id DESC \
             LIMIT $2",
        )
        .bind(&pattern)
        .bind(MAX_ACCOUNT_MATCHES)
        .fetch_all(self.db.pool())
        .await?;

        let mut accounts = Vec::with_capacity(rows.len());
        for row in rows {
            accounts.push(AccountSummary {
                id: row.get("id"),
                username: row.get("username"),
                first_name: row.get("first_name"),
                last_name: row.get("last_name"),
                profile_image: row.get("profile_image"),
            });
        }

        Ok(accounts)
    }
}

pub(crate) fn escape_like_pattern(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '%' | '_' | '\\' => {
                escaped.push('\\');
                escaped.push(ch);
            }
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::escape_like_pattern;

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like_pattern("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like_pattern("plain"), "plain");
    }
}
