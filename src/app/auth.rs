use anyhow::{anyhow, Result};
use argon2::password_hash::{PasswordHasher, SaltString};
use argon2::Argon2;
use pasetors::claims::{Claims, ClaimsValidationRules};
use pasetors::keys::SymmetricKey;
use pasetors::token::UntrustedToken;
use pasetors::{local, version4::V4, Local};
use time::{Duration, OffsetDateTime};

use crate::app::accounts::account_from_row;
use crate::domain::account::{Account, Actor, Role};
use crate::infra::db::Db;

const TOKEN_ISSUER: &str = "socialstack";

#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: String,
    pub expires_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

#[derive(Clone)]
pub struct AuthService {
    db: Db,
    access_key: [u8; 32],
    access_ttl_minutes: u64,
}

impl AuthService {
    pub fn new(db: Db, access_key: [u8; 32], access_ttl_minutes: u64) -> Self {
        Self {
            db,
            access_key,
            access_ttl_minutes,
        }
    }

    /// Creates an account. The role is explicit at every call site; the
    /// public registration path always passes `Role::default()`.
    pub async fn register(&self, account: NewAccount, role: Role) -> Result<Account> {
        let password_hash = hash_password(&account.password)?;
        let row = sqlx::query(
            "INSERT INTO accounts (username, email, first_name, last_name, role, password_hash) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING id, username, email, first_name, last_name, role, profile_image, created_at",
        )
        .bind(account.username)
        .bind(account.email)
        .bind(account.first_name)
        .bind(account.last_name)
        .bind(role.as_db())
        .bind(password_hash)
        .fetch_one(self.db.pool())
        .await?;

        account_from_row(row)
    }

    pub async fn username_exists(&self, username: &str) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM accounts WHERE username = $1)")
                .bind(username)
                .fetch_one(self.db.pool())
                .await?;
        Ok(exists)
    }

    /// Validates a bearer token and resolves the account's current role.
    /// Tokens for accounts that no longer exist are rejected.
    pub async fn authenticate_access_token(&self, token: &str) -> Result<Option<Actor>> {
        let claims = match self.decrypt_claims(token)? {
            Some(claims) => claims,
            None => return Ok(None),
        };
        if !has_token_type(&claims, "access") {
            return Ok(None);
        }
        let Ok(account_id) = claim_account_id(&claims) else {
            return Ok(None);
        };

        let role: Option<String> = sqlx::query_scalar("SELECT role FROM accounts WHERE id = $1")
            .bind(account_id)
            .fetch_optional(self.db.pool())
            .await?;

        let actor = match role {
            Some(role) => Some(Actor {
                account_id,
                role: Role::from_db(&role).ok_or_else(|| anyhow!("unknown role: {}", role))?,
            }),
            None => None,
        };
        Ok(actor)
    }

    /// Mints an access token. Used by the identity provider that shares the
    /// signing key, and by tests.
    pub fn issue_access_token(&self, account_id: i64) -> Result<AccessToken> {
        let duration = std::time::Duration::from_secs(self.access_ttl_minutes * 60);
        let mut claims = Claims::new_expires_in(&duration)?;
        claims.issuer(TOKEN_ISSUER)?;
        claims.audience(TOKEN_ISSUER)?;
        claims.subject(&account_id.to_string())?;
        claims.add_additional("typ", "access")?;

        let key = SymmetricKey::<V4>::from(&self.access_key)?;
        let token = local::encrypt(&key, &claims, None, None)?;
        let expires_at =
            OffsetDateTime::now_utc() + Duration::minutes(self.access_ttl_minutes as i64);

        Ok(AccessToken { token, expires_at })
    }

    fn decrypt_claims(&self, token: &str) -> Result<Option<Claims>> {
        let key = SymmetricKey::<V4>::from(&self.access_key)?;
        let mut rules = ClaimsValidationRules::new();
        rules.validate_issuer_with(TOKEN_ISSUER);
        rules.validate_audience_with(TOKEN_ISSUER);

        let untrusted = match UntrustedToken::<Local, V4>::try_from(token) {
            Ok(token) => token,
            Err(_) => return Ok(None),
        };
        let trusted = match local::decrypt(&key, &untrusted, &rules, None, None) {
            Ok(token) => token,
            Err(_) => return Ok(None),
        };
        Ok(trusted.payload_claims().cloned())
    }
}

fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut argon2::password_hash::rand_core::OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|err| anyhow!("failed to hash password: {}", err))?;
    Ok(hash.to_string())
}

fn claim_account_id(claims: &Claims) -> Result<i64> {
    let value = claims
        .get_claim("sub")
        .and_then(|value| value.as_str())
        .ok_or_else(|| anyhow!("missing sub claim"))?;
    value
        .parse::<i64>()
        .map_err(|err| anyhow!("invalid sub claim: {}", err))
}

fn has_token_type(claims: &Claims, expected: &str) -> bool {
    claims
        .get_claim("typ")
        .and_then(|value| value.as_str())
        .map(|value| value == expected)
        .unwrap_or(false)
}
