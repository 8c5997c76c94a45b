use askama::Template;
use axum::extract::State;
use axum::response::{Html, IntoResponse, Response};
use axum::Form;
use axum_extra::extract::CookieJar;
use serde_json::json;
use uuid::Uuid;

use crate::auth::password;
use crate::auth::policy::{Action, Actor};
use crate::db;
use crate::db::profiles::NewProfile;
use crate::error::{conflict_on_unique, AppError};
use crate::middleware::audit;
use crate::models::Role;
use crate::state::{AppState, SharedState};
use crate::views::admin::{OrganizationForm, OrganizationFormTemplate};
use crate::views::{flash, non_empty, Nav};

fn render_form(actor: &Actor, form: OrganizationForm, error: &str) -> Response {
    let template = OrganizationFormTemplate {
        nav: Nav::new(actor, "admin"),
        form,
        error: Some(error.to_string()),
    };
    Html(template.render().unwrap_or_default()).into_response()
}

/// Main team and director of a new organization, in one transaction.
async fn create_director(
    state: &AppState,
    form: &OrganizationForm,
    organization: Uuid,
) -> Result<Uuid, AppError> {
    let name = form.org_name.trim();
    let org_key = organization.to_string();
    let password_hash = password::hash(&form.director_password).map_err(AppError::Internal)?;

    let team_name = format!("{name} - Main Team");
    let team_description = format!("Main team for {name}");

    let mut tx = state.stores.main.begin().await?;
    let team = db::teams::create(
        &mut *tx,
        &team_name,
        Some(team_description.as_str()),
        Some(org_key.as_str()),
    )
    .await
    .map_err(|e| conflict_on_unique(e, "A team with this organization name already exists."))?;

    let user = db::users::create(
        &mut *tx,
        form.director_username.trim(),
        form.director_email.trim(),
        form.director_first_name.trim(),
        form.director_last_name.trim(),
        Some(password_hash.as_str()),
    )
    .await
    .map_err(|e| conflict_on_unique(e, "Username already exists."))?;

    db::profiles::create(
        &mut *tx,
        &NewProfile {
            user_id: user.id,
            role: Role::Director,
            team_id: Some(team.id),
            organization: Some(org_key.as_str()),
            external_uuid: None,
            cell_phone: non_empty(&form.director_phone),
        },
    )
    .await?;
    tx.commit().await?;
    Ok(user.id)
}

pub async fn create_organization(
    actor: Actor,
    State(state): State<SharedState>,
    jar: CookieJar,
    Form(form): Form<OrganizationForm>,
) -> Result<Response, AppError> {
    actor.require(Action::AccessAdminPanel)?;

    if let Some(error) = form.validate() {
        return Ok(render_form(&actor, form, error));
    }
    if db::users::username_exists(&state.stores.main, form.director_username.trim()).await? {
        return Ok(render_form(&actor, form, "Username already exists."));
    }

    let orgs = state.stores.organizations()?;
    let organization = db::organizations::create(
        orgs,
        form.org_name.trim(),
        json!({ "created_by_admin": actor.username }),
    )
    .await?;

    let director_id = match create_director(&state, &form, organization.uuid).await {
        Ok(id) => id,
        Err(err) => {
            if let Err(e) = db::organizations::delete(orgs, organization.uuid).await {
                tracing::error!(
                    "Failed to remove organization {} after a failed setup: {e}",
                    organization.uuid
                );
            }
            return match err {
                AppError::Conflict(msg) => Ok(render_form(&actor, form, &msg)),
                other => Err(other),
            };
        }
    };

    state.caches.clear();
    audit::log_event(
        &state.stores.main,
        &actor,
        "organization.created",
        "organization",
        Some(organization.uuid),
        Some(json!({
            "name": organization.name,
            "director_user_id": director_id,
        })),
    )
    .await;
    tracing::info!("Organization {} created by {}", organization.uuid, actor.username);

    let message = format!(
        "Organization {} created. UUID: {}",
        organization.name, organization.uuid
    );
    let to = format!("/admin-panel/organizations/{}", organization.uuid);
    Ok(flash::redirect(jar, &to, &message).into_response())
}

pub async fn refresh_caches(
    actor: Actor,
    State(state): State<SharedState>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    actor.require(Action::RefreshCaches)?;
    state.caches.clear();
    audit::log_event(&state.stores.main, &actor, "caches.refreshed", "cache", None, None).await;
    Ok(flash::redirect(jar, "/admin-panel", "Caches refreshed.").into_response())
}
