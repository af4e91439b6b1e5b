use axum::middleware::from_fn_with_state;
use axum::Router;

use crate::AppState;

mod auth;
mod error;
mod handlers;
mod middleware;
mod pagination;
mod routes;

pub use auth::AuthUser;
pub use error::{AppError, FieldErrors};
pub use pagination::{PageLink, PageLinks, Paginated};

pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(routes::health())
        .merge(routes::accounts())
        .merge(routes::posts())
        .merge(routes::engagement())
        .merge(routes::search())
        .layer(from_fn_with_state(
            state.clone(),
            middleware::rate_limit::rate_limit_middleware,
        ))
        .layer(from_fn_with_state(
            state.clone(),
            middleware::rate_limit::ip_rate_limit_middleware,
        ))
        .with_state(state)
}
