use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Form;
use axum_extra::extract::CookieJar;
use serde_json::json;
use uuid::Uuid;

use crate::auth::policy::{Action, Actor};
use crate::db;
use crate::error::{conflict_on_unique, AppError};
use crate::middleware::audit;
use crate::state::{AppState, SharedState};
use crate::views::teams::{managed_team, render_form, TeamForm};
use crate::views::{flash, non_empty};

const NAME_TAKEN: &str = "A team with this name already exists.";
const MEMBERS_STRANDED: &str =
    "Move this team's members out before changing its organization.";

/// Organization for a team saved by `actor`: Admins choose, Directors get their own.
fn target_organization(actor: &Actor, form: &TeamForm) -> Option<String> {
    if actor.is_admin() {
        non_empty(&form.organization).map(str::to_string)
    } else {
        actor.organization.clone()
    }
}

async fn organization_error(
    state: &AppState,
    organization: Option<&str>,
) -> Result<Option<String>, AppError> {
    let (Some(organization), Some(pool)) = (organization, &state.stores.organizations) else {
        return Ok(None);
    };
    if db::organizations::exists(pool, organization).await? {
        Ok(None)
    } else {
        Ok(Some("Organization does not exist.".to_string()))
    }
}

pub async fn create(
    actor: Actor,
    State(state): State<SharedState>,
    jar: CookieJar,
    Form(form): Form<TeamForm>,
) -> Result<Response, AppError> {
    let organization = target_organization(&actor, &form);
    actor.require(Action::ManageTeams {
        organization: organization.as_deref(),
    })?;

    let mut errors = form.validate();
    errors.extend(organization_error(&state, organization.as_deref()).await?);
    if !errors.is_empty() {
        return render_form(&state, &actor, None, form, errors).await;
    }

    let created = db::teams::create(
        &state.stores.main,
        form.name.trim(),
        non_empty(&form.description),
        organization.as_deref(),
    )
    .await
    .map_err(|e| conflict_on_unique(e, NAME_TAKEN));

    let team = match created {
        Ok(team) => team,
        Err(AppError::Conflict(msg)) => {
            return render_form(&state, &actor, None, form, vec![msg]).await;
        }
        Err(e) => return Err(e),
    };

    audit::log_event(
        &state.stores.main,
        &actor,
        "team.created",
        "team",
        Some(team.id),
        Some(json!({ "name": team.name })),
    )
    .await;

    let message = format!("Team {} created.", team.name);
    Ok(flash::redirect(jar, &format!("/teams/{}", team.id), &message).into_response())
}

pub async fn update(
    actor: Actor,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    jar: CookieJar,
    Form(form): Form<TeamForm>,
) -> Result<Response, AppError> {
    let team = managed_team(&state, &actor, id).await?;
    let organization = if actor.is_admin() {
        non_empty(&form.organization).map(str::to_string)
    } else {
        team.alma_internal_organization.clone()
    };

    let mut errors = form.validate();
    errors.extend(organization_error(&state, organization.as_deref()).await?);
    if organization != team.alma_internal_organization
        && !db::profiles::list_by_team(&state.stores.main, team.id).await?.is_empty()
    {
        errors.push(MEMBERS_STRANDED.to_string());
    }
    if !errors.is_empty() {
        return render_form(&state, &actor, Some(&team), form, errors).await;
    }

    let updated = db::teams::update(
        &state.stores.main,
        team.id,
        form.name.trim(),
        non_empty(&form.description),
        organization.as_deref(),
    )
    .await
    .map_err(|e| conflict_on_unique(e, NAME_TAKEN));

    let updated = match updated {
        Ok(updated) => updated,
        Err(AppError::Conflict(msg)) => {
            return render_form(&state, &actor, Some(&team), form, vec![msg]).await;
        }
        Err(e) => return Err(e),
    };

    audit::log_event(
        &state.stores.main,
        &actor,
        "team.updated",
        "team",
        Some(updated.id),
        Some(json!({ "name": updated.name, "previous_name": team.name })),
    )
    .await;

    let message = format!("Team {} updated.", updated.name);
    Ok(flash::redirect(jar, &format!("/teams/{}", updated.id), &message).into_response())
}

pub async fn delete(
    actor: Actor,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let team = managed_team(&state, &actor, id).await?;
    db::teams::delete(&state.stores.main, team.id).await?;

    audit::log_event(
        &state.stores.main,
        &actor,
        "team.deleted",
        "team",
        Some(team.id),
        Some(json!({ "name": team.name })),
    )
    .await;
    tracing::info!("Team {} deleted by {}", team.name, actor.username);

    let message = format!("Team {} deleted.", team.name);
    Ok(flash::redirect(jar, "/teams", &message).into_response())
}
