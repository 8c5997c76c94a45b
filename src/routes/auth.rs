use askama::Template;
use axum::extract::State;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Form;
use axum_extra::extract::cookie::{Cookie, SameSite};
use axum_extra::extract::CookieJar;
use serde::Deserialize;

use crate::auth::extractor::SESSION_COOKIE;
use crate::auth::jwt::{self, Claims, SESSION_HOURS};
use crate::auth::policy::Actor;
use crate::auth::{admin_backend, password};
use crate::db;
use crate::error::AppError;
use crate::middleware::audit;
use crate::models::{Role, User};
use crate::state::SharedState;
use crate::views::auth::{safe_next, LoginTemplate};

#[derive(Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub next: Option<String>,
}

fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::hours(SESSION_HOURS))
        .build()
}

fn login_error(username: &str, next: &str, message: &str) -> Response {
    let template = LoginTemplate {
        username: username.to_string(),
        next: next.to_string(),
        error: Some(message.to_string()),
    };
    Html(template.render().unwrap_or_default()).into_response()
}

/// The built-in admin account, checked against the configured hash.
async fn authenticate_admin(state: &SharedState, password: &str) -> Result<Option<User>, AppError> {
    if !admin_backend::authenticate(
        admin_backend::ADMIN_USERNAME,
        password,
        state.config.admin_password_hash.as_deref(),
    ) {
        return Ok(None);
    }

    let pool = &state.stores.main;
    let user = db::users::get_or_create_admin(pool, admin_backend::ADMIN_USERNAME).await?;
    db::profiles::set_role_for_user(pool, user.id, Role::Admin).await?;
    Ok(Some(user))
}

async fn authenticate_user(
    state: &SharedState,
    username: &str,
    password: &str,
) -> Result<Option<User>, AppError> {
    let Some(user) = db::users::find_by_username(&state.stores.main, username).await? else {
        return Ok(None);
    };
    if !user.is_active {
        return Ok(None);
    }
    let valid =
        password::verify(password, user.password_hash.as_deref()).map_err(AppError::Internal)?;
    Ok(valid.then_some(user))
}

pub async fn login(
    State(state): State<SharedState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let username = form.username.trim();
    let next = safe_next(form.next.as_deref());

    if state.login_limiter.check(username).is_err() {
        tracing::warn!("Login rate limit hit for {username}");
        return Ok(login_error(
            username,
            &next,
            "Too many login attempts. Please try again later.",
        ));
    }

    let user = if username == admin_backend::ADMIN_USERNAME {
        authenticate_admin(&state, &form.password).await?
    } else {
        authenticate_user(&state, username, &form.password).await?
    };

    let Some(user) = user else {
        state.login_limiter.record_failure(username);
        return Ok(login_error(username, &next, "Invalid username or password."));
    };
    state.login_limiter.reset(username);

    let token = jwt::encode_token(&Claims::new(user.id), &state.config.jwt_secret)
        .map_err(AppError::Internal)?;

    db::profiles::ensure_for_user(&state.stores.main, user.id).await?;
    if let Some(member) = db::profiles::find_member_by_user(&state.stores.main, user.id).await? {
        let actor = Actor::from(member);
        audit::log_event(&state.stores.main, &actor, "user.login", "user", Some(user.id), None)
            .await;
    }
    tracing::info!("User {} logged in", user.username);

    let jar = jar.add(session_cookie(token, state.config.secure_cookies));
    Ok((jar, Redirect::to(&next)).into_response())
}

pub async fn logout(jar: CookieJar) -> impl IntoResponse {
    let removal = Cookie::build((SESSION_COOKIE, "")).path("/").build();
    (jar.remove(removal), Redirect::to("/auth/login"))
}
