use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderName, HeaderValue, Method};
use axum::middleware::Next;
use axum::response::Response;
use std::net::SocketAddr;

use crate::app::rate_limiter::RateLimiter;
use crate::config::rate_limits::{RateAction, RateWindow};
use crate::http::{AppError, AuthUser};
use crate::AppState;

fn action_for(path: &str, method: &Method) -> Option<RateAction> {
    match *method {
        Method::POST if path == "/posts" => Some(RateAction::Post),
        Method::POST if path.starts_with("/like/") => Some(RateAction::Like),
        Method::POST if path.starts_with("/comment/") => Some(RateAction::Comment),
        Method::GET if path.starts_with("/search/") => Some(RateAction::Search),
        _ => None,
    }
}

/// Per-account limits for write and search endpoints. Unauthenticated
/// requests pass through; the handler's extractor rejects them.
///
/// An authenticated caller is stored in the request extensions so the
/// handler's `AuthUser` extractor does not verify the token a second time.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    auth: Option<AuthUser>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if let Some(auth_user) = auth {
        request.extensions_mut().insert(auth_user);
    }
    let action = action_for(request.uri().path(), request.method());

    if let (Some(action), Some(auth_user)) = (action, auth) {
        let rate_limiter = RateLimiter::new(state.cache.clone());
        let info = rate_limiter
            .check(auth_user.account_id, action, auth_user.role)
            .await
            .map_err(|err| {
                tracing::error!(error = ?err, "failed to check rate limit");
                AppError::internal("failed to check rate limit")
            })?;

        if info.limited {
            return Err(AppError::rate_limited(format!(
                "Rate limit exceeded for action: {}. Please try again later.",
                action.as_str()
            )));
        }

        if let Err(err) = rate_limiter
            .increment(auth_user.account_id, action, auth_user.role)
            .await
        {
            tracing::warn!(error = ?err, "failed to increment rate limit counter");
        }

        let mut response = next.run(request).await;
        let headers = response.headers_mut();
        headers.insert(
            HeaderName::from_static("x-ratelimit-limit"),
            HeaderValue::from(info.limit),
        );
        headers.insert(
            HeaderName::from_static("x-ratelimit-remaining"),
            HeaderValue::from(info.remaining.saturating_sub(1)),
        );
        return Ok(response);
    }

    Ok(next.run(request).await)
}

/// Per-IP limit on account registration.
pub async fn ip_rate_limit_middleware(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if !(request.method() == Method::POST && request.uri().path() == "/accounts/register") {
        return Ok(next.run(request).await);
    }

    let (action, limit, window) = ("signup", state.signup_limit_per_ip_per_day, RateWindow::Day);
    let ip = addr.ip().to_string();
    let rate_limiter = RateLimiter::new(state.cache.clone());

    let is_limited = rate_limiter
        .check_ip(&ip, action, limit, window)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to check IP rate limit");
            AppError::internal("failed to check rate limit")
        })?;

    if is_limited {
        tracing::warn!(ip = ip, action = action, "IP rate limit exceeded");
        return Err(AppError::rate_limited(
            "Too many attempts from your IP address. Please try again later.",
        ));
    }

    if let Err(err) = rate_limiter.increment_ip(&ip, action, window).await {
        tracing::warn!(error = ?err, "failed to increment IP rate limit counter");
    }

    Ok(next.run(request).await)
}
