pub mod admin;
pub mod auth;
pub mod authorizations;
pub mod followups;
pub mod members;
pub mod profile;
pub mod teams;

use axum::routing::post;
use axum::Router;

use crate::state::SharedState;

/// Form submissions. Pages for the same paths live in `views::view_routes`.
pub fn form_routes() -> Router<SharedState> {
    Router::new()
        // Auth
        .route("/", post(auth::login))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        // Profile
        .route("/profile", post(profile::update))
        // Agents
        .route("/agentes/new", post(members::create))
        .route("/agentes/{id}/edit", post(members::update))
        // Teams
        .route("/teams/new", post(teams::create))
        .route("/teams/{id}/edit", post(teams::update))
        .route("/teams/{id}/delete", post(teams::delete))
        // Follow-ups
        .route("/followups/links", post(followups::create_link))
        // Admin
        .route("/admin-panel/organizations/new", post(admin::create_organization))
        .route("/admin-panel/caches/refresh", post(admin::refresh_caches))
        .route("/admin-panel/authorizations/new", post(authorizations::create))
        .route(
            "/admin-panel/authorizations/{uuid}/delete",
            post(authorizations::delete),
        )
}
