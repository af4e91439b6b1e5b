use anyhow::Result;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;

use crate::config::rate_limits::{current_window, RateAction, RateLimits, RateWindow};
use crate::domain::account::Role;
use crate::infra::cache::RedisCache;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitInfo {
    pub limited: bool,
    pub limit: u32,
    pub remaining: u32,
}

/// Fixed-window counters in Redis, keyed by subject, action and window index.
#[derive(Clone)]
pub struct RateLimiter {
    cache: RedisCache,
}

impl RateLimiter {
    pub fn new(cache: RedisCache) -> Self {
        Self { cache }
    }

    /// Checks every window that applies to `action`; the tightest one decides.
    pub async fn check(
        &self,
        account_id: i64,
        action: RateAction,
        role: Role,
    ) -> Result<RateLimitInfo> {
        let limits = RateLimits::for_role(role);
        let mut conn = self.cache.connection().await?;

        let mut min_remaining = u32::MAX;
        let mut effective_limit: u32 = 0;

        for (limit, window) in limits.windows_for(action) {
            let key = account_key(account_id, action, window);
            let count: u32 = conn.get::<_, Option<u32>>(&key).await?.unwrap_or(0);
            let remaining = limit.saturating_sub(count);

            if remaining < min_remaining {
                min_remaining = remaining;
                effective_limit = limit;
            }

            if count >= limit {
                tracing::debug!(
                    account_id = account_id,
                    action = action.as_str(),
                    window = ?window,
                    count = count,
                    limit = limit,
                    "rate limit exceeded"
                );
                return Ok(RateLimitInfo {
                    limited: true,
                    limit,
                    remaining: 0,
                });
            }
        }

        Ok(RateLimitInfo {
            limited: false,
            limit: effective_limit,
            remaining: min_remaining,
        })
    }

    pub async fn increment(&self, account_id: i64, action: RateAction, role: Role) -> Result<()> {
        let mut conn = self.cache.connection().await?;
        for (_, window) in RateLimits::for_role(role).windows_for(action) {
            bump(&mut conn, &account_key(account_id, action, window), window).await?;
        }
        Ok(())
    }

    /// Returns true when `ip` has already used its quota for `action`.
    pub async fn check_ip(
        &self,
        ip: &str,
        action: &str,
        limit: u32,
        window: RateWindow,
    ) -> Result<bool> {
        let key = ip_key(ip, action, window);
        let mut conn = self.cache.connection().await?;
        let count: u32 = conn.get::<_, Option<u32>>(&key).await?.unwrap_or(0);

        if count >= limit {
            tracing::debug!(ip = ip, action = action, count = count, limit = limit, "ip rate limit exceeded");
            return Ok(true);
        }
        Ok(false)
    }

    pub async fn increment_ip(&self, ip: &str, action: &str, window: RateWindow) -> Result<()> {
        let mut conn = self.cache.connection().await?;
        bump(&mut conn, &ip_key(ip, action, window), window).await
    }
}

async fn bump(conn: &mut MultiplexedConnection, key: &str, window: RateWindow) -> Result<()> {
    let count: u32 = conn.incr(key, 1).await?;
    if count == 1 {
        let _: () = conn.expire(key, window.seconds() as i64).await?;
    }
    Ok(())
}

fn account_key(account_id: i64, action: RateAction, window: RateWindow) -> String {
    format!(
        "ratelimit:{}:{}:{}",
        account_id,
        action.as_str(),
        current_window(window.seconds())
    )
}

fn ip_key(ip: &str, action: &str, window: RateWindow) -> String {
    format!(
        "ratelimit:ip:{}:{}:{}",
        ip,
        action,
        current_window(window.seconds())
    )
}
