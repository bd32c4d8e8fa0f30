//! 路由配置

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{delete, get, post, put},
};
use lightcommit_shared::config::SecurityConfig;
use lightcommit_shared::observability::middleware as obs_middleware;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::middleware::{require_session, security_headers};
use crate::{handlers, state::AppState};

/// 无需会话的路由
fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/github", get(handlers::auth::github_login))
        .route("/auth/github/callback", get(handlers::auth::github_callback))
        .route("/auth/logout", post(handlers::auth::logout))
        // HMAC 签名校验
        .route("/github/webhook", post(handlers::github::webhook))
        // cron 密钥校验
        .route(
            "/contributions/mint-ready",
            post(handlers::contributions::mint_ready),
        )
        .route("/nft/metadata/{id}", get(handlers::nft::metadata))
}

fn session_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/auth/me", get(handlers::auth::me))
        .route("/users/me/wallet", put(handlers::users::update_wallet))
        .route("/github/repos", get(handlers::github::list_repos))
        .route("/github/repos/tracked", get(handlers::github::list_tracked))
        .route("/github/repos/track", post(handlers::github::track))
        .route("/github/repos/{id}/track", delete(handlers::github::untrack))
        .route("/contributions", get(handlers::contributions::list))
        .route("/contributions/stats", get(handlers::contributions::stats))
        .route("/contributions/{id}", get(handlers::contributions::get))
        .route(
            "/contributions/{id}/retry",
            post(handlers::contributions::retry),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_session))
}

pub fn api_routes(state: &AppState) -> Router<AppState> {
    public_routes().merge(session_routes(state))
}

/// 完整应用：API、探针与通用中间件（CORS 除外）
pub fn app(state: AppState) -> Router {
    Router::new()
        .nest("/api", api_routes(&state))
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(obs_middleware::http_tracing))
        .layer(middleware::from_fn(obs_middleware::request_id))
        .with_state(state)
}

/// `*` 允许任意来源；具体来源列表时允许携带 cookie
pub fn cors_layer(config: &SecurityConfig) -> CorsLayer {
    let origins = config.cors_origins.trim();
    if origins == "*" {
        info!("CORS allowed_origins: *");
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    info!(allowed_origins = origins, "CORS configured");
    let origins: Vec<HeaderValue> = origins
        .split(',')
        .filter_map(|s| s.trim().parse::<HeaderValue>().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}
