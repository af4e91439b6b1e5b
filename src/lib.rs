pub mod app;
pub mod config;
pub mod domain;
pub mod http;
pub mod infra;

use url::Url;

use crate::app::media::ImageResolver;
use crate::config::AppConfig;
use crate::infra::{cache::RedisCache, db::Db};

#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub cache: RedisCache,
    pub images: ImageResolver,
    pub paseto_access_key: [u8; 32],
    pub access_ttl_minutes: u64,
    pub public_base_url: Url,
    pub posts_per_page: u32,
    pub max_posts_per_page: u32,
    pub dashboard_posts_per_page: u32,
    pub signup_limit_per_ip_per_day: u32,
}

impl AppState {
    pub fn new(config: &AppConfig, db: Db, cache: RedisCache) -> Self {
        Self {
            db,
            cache,
            images: ImageResolver::new(
                config.media_base_url.clone(),
                config.default_profile_image_url.clone(),
            ),
            paseto_access_key: config.paseto_access_key,
            access_ttl_minutes: config.access_ttl_minutes,
            public_base_url: config.public_base_url.clone(),
            posts_per_page: config.posts_per_page,
            max_posts_per_page: config.max_posts_per_page,
            dashboard_posts_per_page: config.dashboard_posts_per_page,
            signup_limit_per_ip_per_day: config.signup_limit_per_ip_per_day,
        }
    }
}
