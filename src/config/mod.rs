pub mod rate_limits;

use anyhow::{anyhow, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::net::SocketAddr;
use std::str::FromStr;
use url::Url;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub http_addr: String,
    pub app_mode: String,
    pub database_url: String,
    pub redis_url: String,
    pub db_max_connections: u32,
    pub db_connect_timeout_seconds: u64,
    pub db_idle_timeout_seconds: u64,
    pub db_max_lifetime_seconds: u64,
    pub paseto_access_key: [u8; 32],
    pub access_ttl_minutes: u64,
    pub public_base_url: Url,
    pub media_base_url: Url,
    pub default_profile_image_url: String,
    pub posts_per_page: u32,
    pub max_posts_per_page: u32,
    pub dashboard_posts_per_page: u32,
    pub cors_allowed_origins: Vec<String>,
    pub signup_limit_per_ip_per_day: u32,
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
    pub admin_email: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let http_addr = env_or("HTTP_ADDR", "0.0.0.0:8080");
        let _parsed_http_addr = SocketAddr::from_str(&http_addr)
            .map_err(|err| anyhow!("invalid HTTP_ADDR: {}", err))?;
        let app_mode = env_or("APP_MODE", "api");

        let public_base_url = env_url("PUBLIC_BASE_URL", "http://localhost:8080/")?;
        let media_base_url = match std::env::var("MEDIA_BASE_URL") {
            Ok(value) => parse_base_url("MEDIA_BASE_URL", &value)?,
            Err(_) => public_base_url
                .join("media/")
                .map_err(|err| anyhow!("invalid PUBLIC_BASE_URL: {}", err))?,
        };
        let default_profile_image_url = match std::env::var("DEFAULT_PROFILE_IMAGE_URL") {
            Ok(value) => parse_absolute_url("DEFAULT_PROFILE_IMAGE_URL", &value)?.to_string(),
            Err(_) => public_base_url
                .join("static/user_profile_images/default-user-image.png")
                .map_err(|err| anyhow!("invalid PUBLIC_BASE_URL: {}", err))?
                .to_string(),
        };

        let posts_per_page: u32 = env_or_parse("POSTS_PER_PAGE", "10")?;
        let max_posts_per_page: u32 = env_or_parse("MAX_POSTS_PER_PAGE", "50")?;
        let dashboard_posts_per_page: u32 = env_or_parse("DASHBOARD_POSTS_PER_PAGE", "45")?;
        if posts_per_page == 0 || posts_per_page > max_posts_per_page {
            return Err(anyhow!(
                "invalid POSTS_PER_PAGE: must be between 1 and MAX_POSTS_PER_PAGE ({})",
                max_posts_per_page
            ));
        }
        if dashboard_posts_per_page == 0 || dashboard_posts_per_page > max_posts_per_page {
            return Err(anyhow!(
                "invalid DASHBOARD_POSTS_PER_PAGE: must be between 1 and MAX_POSTS_PER_PAGE ({})",
                max_posts_per_page
            ));
        }

        let cors_allowed_origins = env_or("CORS_ALLOWED_ORIGINS", "")
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect();

        Ok(Self {
            http_addr,
            app_mode,
            database_url: env_or_err("DATABASE_URL")?,
            redis_url: env_or("REDIS_URL", "redis://127.0.0.1/"),
            db_max_connections: env_or_parse("DB_MAX_CONNECTIONS", "25")?,
            db_connect_timeout_seconds: env_or_parse("DB_CONNECT_TIMEOUT_SECONDS", "5")?,
            db_idle_timeout_seconds: env_or_parse("DB_IDLE_TIMEOUT_SECONDS", "300")?,
            db_max_lifetime_seconds: env_or_parse("DB_MAX_LIFETIME_SECONDS", "1800")?,
            paseto_access_key: env_key_32("PASETO_ACCESS_KEY")?,
            access_ttl_minutes: env_or_parse("ACCESS_TTL_MINUTES", "60")?,
            public_base_url,
            media_base_url,
            default_profile_image_url,
            posts_per_page,
            max_posts_per_page,
            dashboard_posts_per_page,
            cors_allowed_origins,
            signup_limit_per_ip_per_day: env_or_parse("SIGNUP_LIMIT_PER_IP_PER_DAY", "20")?,
            admin_username: non_empty_env("ADMIN_USERNAME"),
            admin_password: non_empty_env("ADMIN_PASSWORD"),
            admin_email: non_empty_env("ADMIN_EMAIL"),
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_or_err(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| anyhow!("missing required env var: {}", key))
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_or_parse<T>(key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    <T as FromStr>::Err: std::fmt::Display,
{
    let value = std::env::var(key).unwrap_or_else(|_| default.to_string());
    value
        .parse::<T>()
        .map_err(|err| anyhow!("invalid {}: {}", key, err))
}

fn env_url(key: &str, default: &str) -> Result<Url> {
    let value = env_or(key, default);
    parse_base_url(key, &value)
}

/// Parses a base URL and guarantees a trailing slash so `Url::join` appends
/// instead of replacing the last path segment.
fn parse_base_url(key: &str, value: &str) -> Result<Url> {
    let normalized = if value.ends_with('/') {
        value.to_string()
    } else {
        format!("{}/", value)
    };
    Url::parse(&normalized).map_err(|err| anyhow!("invalid {}: {}", key, err))
}

fn parse_absolute_url(key: &str, value: &str) -> Result<Url> {
    Url::parse(value.trim()).map_err(|err| anyhow!("invalid {}: {}", key, err))
}

fn env_key_32(key: &str) -> Result<[u8; 32]> {
    let value = env_or_err(key)?;
    let decoded = STANDARD
        .decode(value.as_bytes())
        .map_err(|err| anyhow!("invalid {}: {}", key, err))?;
    if decoded.len() != 32 {
        return Err(anyhow!("invalid {}: expected 32 bytes", key));
    }
    let mut key_bytes = [0u8; 32];
    key_bytes.copy_from_slice(&decoded);
    Ok(key_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gains_trailing_slash() {
        let url = parse_base_url("PUBLIC_BASE_URL", "https://social.example.com/api").unwrap();
        assert_eq!(url.as_str(), "https://social.example.com/api/");
        assert_eq!(
            url.join("media/").unwrap().as_str(),
            "https://social.example.com/api/media/"
        );
    }

    #[test]
    fn base_url_rejects_garbage() {
        assert!(parse_base_url("MEDIA_BASE_URL", "not a url").is_err());
    }

    #[test]
    fn default_profile_image_must_be_absolute() {
        let url = parse_absolute_url(
            "DEFAULT_PROFILE_IMAGE_URL",
            "https://cdn.example.com/static/default-user-image.png",
        )
        .unwrap();
        assert_eq!(
            url.as_str(),
            "https://cdn.example.com/static/default-user-image.png"
        );
        assert!(parse_absolute_url("DEFAULT_PROFILE_IMAGE_URL", "static/default.png").is_err());
        assert!(parse_absolute_url("DEFAULT_PROFILE_IMAGE_URL", "").is_err());
    }
}
