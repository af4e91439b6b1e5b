use axum::{routing::get, routing::post, Router};

use crate::http::handlers;
use crate::AppState;

pub fn health() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health))
}

pub fn accounts() -> Router<AppState> {
    Router::new()
        .route("/accounts/register", post(handlers::register))
        .route(
            "/accounts/me",
            get(handlers::get_profile).patch(handlers::update_profile),
        )
        .route("/header", get(handlers::header))
}

pub fn posts() -> Router<AppState> {
    Router::new()
        .route(
            "/posts",
            get(handlers::list_feed)
                .post(handlers::create_post)
                .patch(handlers::edit_post)
                .delete(handlers::delete_post),
        )
        .route("/dashboard/:id", get(handlers::dashboard))
}

pub fn engagement() -> Router<AppState> {
    Router::new()
        .route("/like/:id", post(handlers::like_post))
        .route("/comment/:id", post(handlers::comment_post))
}

pub fn search() -> Router<AppState> {
    Router::new().route("/search/:text", get(handlers::search))
}
