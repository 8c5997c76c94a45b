use askama::Template;
use axum::extract::{Path, State};
use axum::response::{Html, IntoResponse, Response};
use axum_extra::extract::CookieJar;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::policy::{Action, Actor};
use crate::db;
use crate::error::AppError;
use crate::models::Team;
use crate::state::{AppState, SharedState};
use crate::stores::degrade;
use crate::views::{flash, format_datetime, Nav, SelectOption};

pub struct TeamRow {
    pub id: String,
    pub name: String,
    pub description: String,
    pub organization: String,
    pub member_count: i64,
}

#[derive(Template)]
#[template(path = "teams/list.html")]
#[allow(dead_code)]
struct ListTemplate {
    nav: Nav,
    rows: Vec<TeamRow>,
    can_manage: bool,
}

pub async fn list(
    actor: Actor,
    State(state): State<SharedState>,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    let (jar, message) = flash::take(jar);
    let sees_all_teams = actor.is_admin() || actor.is_director();

    let teams = match actor.tenant_scope().organization_filter() {
        Some(_) if !sees_all_teams && actor.team_id.is_none() => Vec::new(),
        Some(organization) => {
            let only = if sees_all_teams { None } else { actor.team_id };
            db::teams::list_with_counts(&state.stores.main, organization, only).await?
        }
        None => Vec::new(),
    };

    let rows = teams
        .into_iter()
        .map(|t| TeamRow {
            id: t.team.id.to_string(),
            name: t.team.name,
            description: t.team.description.unwrap_or_default(),
            organization: t.team.alma_internal_organization.unwrap_or_default(),
            member_count: t.member_count,
        })
        .collect();

    let template = ListTemplate {
        nav: Nav::new(&actor, "teams").with_flash(message),
        rows,
        can_manage: sees_all_teams,
    };
    Ok((jar, Html(template.render().unwrap_or_default())))
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TeamForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub organization: String,
}

impl TeamForm {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.name.trim().is_empty() {
            errors.push("Team name is required.".to_string());
        }
        errors
    }
}

#[derive(Template)]
#[template(path = "teams/form.html")]
#[allow(dead_code)]
pub struct FormTemplate {
    pub nav: Nav,
    pub title: String,
    pub action: String,
    pub form: TeamForm,
    pub is_admin: bool,
    pub organizations: Vec<SelectOption>,
    pub errors: Vec<String>,
}

/// Render the create form (`team == None`) or the edit form.
pub async fn render_form(
    state: &AppState,
    actor: &Actor,
    team: Option<&Team>,
    form: TeamForm,
    errors: Vec<String>,
) -> Result<Response, AppError> {
    let mut organizations = Vec::new();
    if actor.is_admin() {
        organizations.push(SelectOption::new("", "No organization", &form.organization));
        if let Some(pool) = &state.stores.organizations {
            let orgs = degrade("organizations", db::organizations::list(pool).await);
            organizations.extend(orgs.iter().map(|o| {
                SelectOption::new(o.uuid.to_string(), o.name.as_str(), &form.organization)
            }));
        }
    }

    let (title, action) = match team {
        None => ("New team".to_string(), "/teams/new".to_string()),
        Some(team) => (format!("Edit {}", team.name), format!("/teams/{}/edit", team.id)),
    };

    let template = FormTemplate {
        nav: Nav::new(actor, "teams"),
        title,
        action,
        form,
        is_admin: actor.is_admin(),
        organizations,
        errors,
    };
    Ok(Html(template.render().unwrap_or_default()).into_response())
}

pub async fn new_page(
    actor: Actor,
    State(state): State<SharedState>,
) -> Result<Response, AppError> {
    actor.require(Action::ManageTeams {
        organization: actor.organization.as_deref(),
    })?;
    let form = TeamForm {
        organization: actor.organization.clone().unwrap_or_default(),
        ..TeamForm::default()
    };
    render_form(&state, &actor, None, form, Vec::new()).await
}

pub async fn find_team(state: &AppState, id: Uuid) -> Result<Team, AppError> {
    db::teams::find_by_id(&state.stores.main, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Team not found".to_string()))
}

/// Load a team the actor may manage.
pub async fn managed_team(state: &AppState, actor: &Actor, id: Uuid) -> Result<Team, AppError> {
    let team = find_team(state, id).await?;
    actor.require(Action::ManageTeams {
        organization: team.alma_internal_organization.as_deref(),
    })?;
    Ok(team)
}

pub async fn edit_page(
    actor: Actor,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let team = managed_team(&state, &actor, id).await?;
    let form = TeamForm {
        name: team.name.clone(),
        description: team.description.clone().unwrap_or_default(),
        organization: team.alma_internal_organization.clone().unwrap_or_default(),
    };
    render_form(&state, &actor, Some(&team), form, Vec::new()).await
}

pub struct TeamMemberRow {
    pub id: String,
    pub display_name: String,
    pub email: String,
    pub role: String,
    pub is_leader: bool,
}

#[derive(Template)]
#[template(path = "teams/detail.html")]
#[allow(dead_code)]
struct DetailTemplate {
    nav: Nav,
    team: Team,
    created_at: String,
    members: Vec<TeamMemberRow>,
    has_leader: bool,
    can_manage: bool,
}

pub async fn show(
    actor: Actor,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    let team = find_team(&state, id).await?;
    actor.require(Action::ViewTeam {
        team_id: team.id,
        organization: team.alma_internal_organization.as_deref(),
    })?;
    let (jar, message) = flash::take(jar);

    let members: Vec<TeamMemberRow> = db::profiles::list_by_team(&state.stores.main, team.id)
        .await?
        .iter()
        .map(|m| TeamMemberRow {
            id: m.id.to_string(),
            display_name: m.display_name(),
            email: m.email.clone(),
            role: m.role.to_string(),
            is_leader: m.role.is_leader(),
        })
        .collect();

    let template = DetailTemplate {
        nav: Nav::new(&actor, "teams").with_flash(message),
        created_at: format_datetime(&team.created_at),
        has_leader: members.iter().any(|m| m.is_leader),
        can_manage: actor.can(Action::ManageTeams {
            organization: team.alma_internal_organization.as_deref(),
        }),
        members,
        team,
    };
    Ok((jar, Html(template.render().unwrap_or_default())))
}

#[derive(Template)]
#[template(path = "teams/delete.html")]
#[allow(dead_code)]
struct DeleteTemplate {
    nav: Nav,
    team: Team,
    member_count: usize,
}

pub async fn delete_page(
    actor: Actor,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let team = managed_team(&state, &actor, id).await?;
    let member_count = db::profiles::list_by_team(&state.stores.main, team.id).await?.len();

    let template = DeleteTemplate {
        nav: Nav::new(&actor, "teams"),
        team,
        member_count,
    };
    Ok(Html(template.render().unwrap_or_default()))
}
