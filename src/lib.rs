pub mod analytics;
pub mod auth;
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod followups;
pub mod membership;
pub mod middleware;
pub mod models;
pub mod rate_limit;
pub mod routes;
pub mod state;
pub mod stores;
pub mod views;

use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderName, HeaderValue};
use axum::Router;
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::cache::Caches;
use crate::config::Config;
use crate::middleware::auth_redirect::redirect_unauthorized;
use crate::rate_limit::LoginRateLimiter;
use crate::state::{AppState, SharedState};
use crate::stores::Stores;

pub fn build_app(stores: Stores, config: Config) -> Router {
    let caches = Caches::new(Duration::from_secs(config.cache_ttl_secs));

    let state: SharedState = Arc::new(AppState {
        stores,
        config,
        caches,
        login_limiter: LoginRateLimiter::new(),
    });

    let pages = views::view_routes()
        .merge(routes::form_routes())
        .layer(axum::middleware::from_fn(redirect_unauthorized));

    Router::new()
        .merge(pages)
        .nest_service("/static", ServeDir::new("static"))
        .route("/health", axum::routing::get(health))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-content-type-options"),
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-frame-options"),
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("referrer-policy"),
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}
