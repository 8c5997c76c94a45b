use askama::Template;
use axum::extract::State;
use axum::response::{Html, IntoResponse, Response};
use axum::Form;
use axum_extra::extract::CookieJar;
use serde_json::json;

use crate::auth::policy::Actor;
use crate::db;
use crate::error::AppError;
use crate::middleware::audit;
use crate::state::SharedState;
use crate::views::profile::{ProfileForm, ProfileTemplate};
use crate::views::{flash, non_empty, Nav};

pub async fn update(
    actor: Actor,
    State(state): State<SharedState>,
    jar: CookieJar,
    Form(form): Form<ProfileForm>,
) -> Result<Response, AppError> {
    let errors = form.validate();
    if !errors.is_empty() {
        let team_name = db::profiles::find_member(&state.stores.main, actor.profile_id)
            .await?
            .and_then(|m| m.team_name)
            .unwrap_or_default();
        let template = ProfileTemplate {
            nav: Nav::new(&actor, "profile"),
            username: actor.username.clone(),
            role: actor.role.to_string(),
            team_name,
            form,
            errors,
        };
        return Ok(Html(template.render().unwrap_or_default()).into_response());
    }

    let mut tx = state.stores.main.begin().await?;
    db::users::update_details(
        &mut *tx,
        actor.user_id,
        form.first_name.trim(),
        form.last_name.trim(),
        form.email.trim(),
    )
    .await?;
    db::profiles::update_details(
        &mut *tx,
        actor.profile_id,
        non_empty(&form.external_uuid),
        non_empty(&form.cell_phone),
    )
    .await?;
    tx.commit().await?;

    state.caches.emails.clear();

    audit::log_event(
        &state.stores.main,
        &actor,
        "profile.updated",
        "user_profile",
        Some(actor.profile_id),
        Some(json!({ "email": form.email.trim() })),
    )
    .await;

    Ok(flash::redirect(jar, "/profile", "Profile updated.").into_response())
}
