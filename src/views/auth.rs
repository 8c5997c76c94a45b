use askama::Template;
use axum::extract::{Query, State};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum_extra::extract::CookieJar;
use serde::Deserialize;

use crate::auth::extractor::SESSION_COOKIE;
use crate::auth::jwt;
use crate::state::SharedState;

#[derive(Template)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub username: String,
    pub next: String,
    pub error: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginQuery {
    pub next: Option<String>,
}

/// Only same-site absolute paths are followed after login.
pub fn safe_next(next: Option<&str>) -> String {
    match next {
        Some(path)
            if path.starts_with('/') && !path.starts_with("//") && !path.starts_with("/\\") =>
        {
            path.to_string()
        }
        _ => "/workspace".to_string(),
    }
}

pub async fn login_page(
    State(state): State<SharedState>,
    Query(q): Query<LoginQuery>,
    jar: CookieJar,
) -> Response {
    let next = safe_next(q.next.as_deref());

    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        if jwt::decode_token(cookie.value(), &state.config.jwt_secret).is_ok() {
            return Redirect::to(&next).into_response();
        }
    }

    let template = LoginTemplate {
        username: String::new(),
        next,
        error: None,
    };
    Html(template.render().unwrap_or_default()).into_response()
}
