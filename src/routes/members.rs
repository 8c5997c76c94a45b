use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Form;
use axum_extra::extract::CookieJar;
use serde_json::json;
use uuid::Uuid;

use crate::auth::password;
use crate::auth::policy::{Action, Actor, Subject};
use crate::db;
use crate::db::profiles::NewProfile;
use crate::error::{conflict_on_unique, AppError};
use crate::membership;
use crate::middleware::audit;
use crate::models::Member;
use crate::state::{AppState, SharedState};
use crate::views::members::{managed_member, render_form, MemberForm};
use crate::views::{flash, non_empty};

/// Turn user-correctable failures into form errors; everything else propagates.
fn form_error(err: AppError) -> Result<String, AppError> {
    match err {
        AppError::BadRequest(msg) | AppError::Conflict(msg) => Ok(msg),
        other => Err(other),
    }
}

/// The team must belong to the organization the member ends up in.
async fn check_team(
    state: &AppState,
    team_id: Option<Uuid>,
    organization: Option<&str>,
) -> Result<(), AppError> {
    let Some(team_id) = team_id else {
        return Ok(());
    };
    let team = db::teams::find_by_id(&state.stores.main, team_id)
        .await?
        .ok_or_else(|| AppError::BadRequest("Select a valid team.".to_string()))?;
    if team.alma_internal_organization.as_deref() != organization {
        return Err(AppError::BadRequest(
            "The team belongs to a different organization.".to_string(),
        ));
    }
    Ok(())
}

async fn check_organization(state: &AppState, organization: Option<&str>) -> Result<(), AppError> {
    let (Some(organization), Some(pool)) = (organization, &state.stores.organizations) else {
        return Ok(());
    };
    if db::organizations::exists(pool, organization).await? {
        Ok(())
    } else {
        Err(AppError::BadRequest("Organization does not exist.".to_string()))
    }
}

pub async fn create(
    actor: Actor,
    State(state): State<SharedState>,
    jar: CookieJar,
    Form(form): Form<MemberForm>,
) -> Result<Response, AppError> {
    let errors = form.validate(true);
    if !errors.is_empty() {
        return render_form(&state, &actor, None, form, errors).await;
    }
    let (Ok(role), Ok(team_id)) = (form.parsed_role(), form.parsed_team()) else {
        return Err(AppError::BadRequest("Invalid form".to_string()));
    };

    let organization = if actor.is_admin() {
        non_empty(&form.organization).map(str::to_string)
    } else {
        actor.organization.clone()
    };
    actor.require(Action::CreateUser {
        organization: organization.as_deref(),
        role,
    })?;

    match insert_member(&state, &actor, &form, role, team_id, organization.as_deref()).await {
        Ok(profile_id) => {
            state.caches.emails.clear();
            audit::log_event(
                &state.stores.main,
                &actor,
                "user.created",
                "user_profile",
                Some(profile_id),
                Some(json!({ "username": form.username.trim(), "role": role.as_str() })),
            )
            .await;
            let message = format!("Agent {} created.", form.username.trim());
            Ok(flash::redirect(jar, "/agentes", &message).into_response())
        }
        Err(err) => {
            let message = form_error(err)?;
            render_form(&state, &actor, None, form, vec![message]).await
        }
    }
}

async fn insert_member(
    state: &AppState,
    actor: &Actor,
    form: &MemberForm,
    role: crate::models::Role,
    team_id: Option<Uuid>,
    organization: Option<&str>,
) -> Result<Uuid, AppError> {
    check_organization(state, organization).await?;
    check_team(state, team_id, organization).await?;

    let password_hash = password::hash(&form.password).map_err(AppError::Internal)?;

    let mut tx = state.stores.main.begin().await?;
    let user = db::users::create(
        &mut *tx,
        form.username.trim(),
        form.email.trim(),
        form.first_name.trim(),
        form.last_name.trim(),
        Some(password_hash.as_str()),
    )
    .await
    .map_err(|e| conflict_on_unique(e, "Username already exists."))?;

    let profile = db::profiles::create(
        &mut *tx,
        &NewProfile {
            user_id: user.id,
            role,
            team_id: None,
            organization,
            external_uuid: non_empty(&form.external_uuid),
            cell_phone: non_empty(&form.cell_phone),
        },
    )
    .await?;

    if actor.is_admin() {
        db::profiles::update_internal_fields(
            &mut *tx,
            profile.id,
            non_empty(&form.alma_internal_uuid),
            organization,
        )
        .await?;
    }

    membership::assign(&mut tx, profile.id, team_id, role).await?;
    tx.commit().await?;
    Ok(profile.id)
}

pub async fn update(
    actor: Actor,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    jar: CookieJar,
    Form(form): Form<MemberForm>,
) -> Result<Response, AppError> {
    let member = managed_member(&state, &actor, id).await?;

    let errors = form.validate(false);
    if !errors.is_empty() {
        return render_form(&state, &actor, Some(&member), form, errors).await;
    }
    let (Ok(requested_role), Ok(requested_team)) = (form.parsed_role(), form.parsed_team()) else {
        return Err(AppError::BadRequest("Invalid form".to_string()));
    };

    let role = if actor.can_change_role(&Subject::from(&member)) {
        requested_role
    } else {
        member.role
    };
    actor.require(Action::ChangeRole {
        subject: Subject::from(&member),
        new_role: role,
    })?;

    let team_id = if actor.is_admin() || actor.is_director() {
        requested_team
    } else {
        member.team_id
    };

    match save_member(&state, &actor, &member, &form, role, team_id).await {
        Ok(()) => {
            state.caches.emails.clear();
            audit::log_event(
                &state.stores.main,
                &actor,
                "user.updated",
                "user_profile",
                Some(member.id),
                Some(json!({
                    "role": role.as_str(),
                    "team_id": team_id,
                })),
            )
            .await;
            let message = format!("Agent {} updated.", member.username);
            Ok(flash::redirect(jar, "/agentes", &message).into_response())
        }
        Err(err) => {
            let message = form_error(err)?;
            render_form(&state, &actor, Some(&member), form, vec![message]).await
        }
    }
}

async fn save_member(
    state: &AppState,
    actor: &Actor,
    member: &Member,
    form: &MemberForm,
    role: crate::models::Role,
    team_id: Option<Uuid>,
) -> Result<(), AppError> {
    let organization = if actor.is_admin() {
        non_empty(&form.organization)
    } else {
        member.alma_internal_organization.as_deref()
    };
    if actor.is_admin() {
        check_organization(state, organization).await?;
    }
    let organization_changed = organization != member.alma_internal_organization.as_deref();
    if team_id != member.team_id || organization_changed {
        check_team(state, team_id, organization).await?;
    }

    let mut tx = state.stores.main.begin().await?;
    db::users::update_details(
        &mut *tx,
        member.user_id,
        form.first_name.trim(),
        form.last_name.trim(),
        form.email.trim(),
    )
    .await?;
    db::profiles::update_details(
        &mut *tx,
        member.id,
        non_empty(&form.external_uuid),
        non_empty(&form.cell_phone),
    )
    .await?;
    if actor.is_admin() {
        db::profiles::update_internal_fields(
            &mut *tx,
            member.id,
            non_empty(&form.alma_internal_uuid),
            organization,
        )
        .await?;
    }
    if team_id != member.team_id || role != member.role {
        membership::assign(&mut tx, member.id, team_id, role).await?;
    }
    tx.commit().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correctable_errors_become_messages() {
        assert_eq!(
            form_error(AppError::Conflict("Username already exists.".to_string())).unwrap(),
            "Username already exists."
        );
        assert!(form_error(AppError::Internal("boom".to_string())).is_err());
    }
}
