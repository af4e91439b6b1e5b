use anyhow::{anyhow, Result};
use sqlx::postgres::PgRow;
use sqlx::Row;

use crate::domain::account::{Account, Role};
use crate::infra::db::Db;

#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub profile_image: Option<String>,
}

#[derive(Clone)]
pub struct AccountService {
    db: Db,
}

impl AccountService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn get_account(&self, account_id: i64) -> Result<Option<Account>> {
        let row = sqlx::query(
            "SELECT id, username, email, first_name, last_name, role, profile_image, created_at \
             FROM accounts WHERE id = $1",
        )
        .bind(account_id)
        .fetch_optional(self.db.pool())
        .await?;

        row.map(account_from_row).transpose()
    }

    /// Applies the non-empty fields of `update`; absent fields keep their value.
    pub async fn update_profile(
        &self,
        account_id: i64,
        update: ProfileUpdate,
    ) -> Result<Option<Account>> {
        let row = sqlx::query(
            "UPDATE accounts \
             SET first_name = COALESCE($2, first_name), \
                 last_name = COALESCE($3, last_name), \
                 email = COALESCE($4, email), \
                 profile_image = COALESCE($5, profile_image) \
             WHERE id = $1 \
             RETURNING id, username, email, first_name, last_name, role, profile_image, created_at",
        )
        .bind(account_id)
        .bind(update.first_name)
        .bind(update.last_name)
        .bind(update.email)
        .bind(update.profile_image)
        .fetch_optional(self.db.pool())
        .await?;

        let account = row.map(account_from_row).transpose()?;
        if account.is_some() {
            tracing::info!(account_id = account_id, "profile updated");
        }
        Ok(account)
    }
}

pub(crate) fn account_from_row(row: PgRow) -> Result<Account> {
    let role: String = row.get("role");
    Ok(Account {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        role: Role::from_db(&role).ok_or_else(|| anyhow!("unknown role: {}", role))?,
        profile_image: row.get("profile_image"),
        created_at: row.get("created_at"),
    })
}
