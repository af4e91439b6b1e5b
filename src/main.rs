use anyhow::anyhow;
use axum::http::{header, HeaderValue, Method};
use axum::Router;
use std::net::SocketAddr;
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use socialstack::app::auth::{AuthService, NewAccount};
use socialstack::config::AppConfig;
use socialstack::domain::account::Role;
use socialstack::http;
use socialstack::infra::{cache::RedisCache, db::Db};
use socialstack::AppState;

const MAX_REQUEST_BODY_BYTES: usize = 1024 * 1024;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    let db = Db::connect(&config).await?;

    match config.app_mode.as_str() {
        "api" => {
            let cache = RedisCache::connect(&config.redis_url).await?;
            let state = AppState::new(&config, db, cache);

            let app: Router = http::router(state).layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(cors_layer(&config.cors_allowed_origins)?)
                    .map_response(|res: axum::http::Response<_>| res.map(axum::body::Body::new))
                    .layer(CompressionLayer::new())
                    .layer(RequestBodyLimitLayer::new(MAX_REQUEST_BODY_BYTES)),
            );
            let listener = tokio::net::TcpListener::bind(&config.http_addr).await?;
            tracing::info!("listening on {}", config.http_addr);

            let app = app.into_make_service_with_connect_info::<SocketAddr>();
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await?;
        }
        "seed" => seed_admin(&config, db).await?,
        other => return Err(anyhow!("unknown APP_MODE: {}", other)),
    }

    Ok(())
}

fn cors_layer(origins: &[String]) -> anyhow::Result<CorsLayer> {
    let origins = origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin)
                .map_err(|err| anyhow!("invalid CORS_ALLOWED_ORIGINS entry {}: {}", origin, err))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]))
}

/// Creates the admin account named by `ADMIN_USERNAME` unless it already exists.
async fn seed_admin(config: &AppConfig, db: Db) -> anyhow::Result<()> {
    let Some(username) = config.admin_username.clone() else {
        tracing::info!("ADMIN_USERNAME not set; nothing to seed");
        return Ok(());
    };
    let password = config
        .admin_password
        .clone()
        .ok_or_else(|| anyhow!("missing required env var: ADMIN_PASSWORD"))?;
    let email = config
        .admin_email
        .clone()
        .ok_or_else(|| anyhow!("missing required env var: ADMIN_EMAIL"))?;

    let service = AuthService::new(db, config.paseto_access_key, config.access_ttl_minutes);
    if service.username_exists(&username).await? {
        tracing::info!(username = %username, "admin account already exists");
        return Ok(());
    }

    let account = service
        .register(
            NewAccount {
                username,
                email,
                first_name: "Admin".to_string(),
                last_name: String::new(),
                password,
            },
            Role::Admin,
        )
        .await?;
    tracing::info!(account_id = account.id, "admin account created");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
