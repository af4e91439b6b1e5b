pub mod accounts;
pub mod auth;
pub mod engagement;
pub mod feed;
pub mod media;
pub mod pagination;
pub mod posts;
pub mod rate_limiter;
pub mod search;
