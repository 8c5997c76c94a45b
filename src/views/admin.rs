use askama::Template;
use axum::extract::{Path, State};
use axum::response::{Html, IntoResponse};
use axum_extra::extract::CookieJar;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::policy::{Action, Actor};
use crate::db;
use crate::error::AppError;
use crate::models::Organization;
use crate::state::SharedState;
use crate::views::{flash, format_datetime, Nav};

const RECENT_EVENTS: i64 = 25;

pub struct OrganizationRow {
    pub uuid: String,
    pub name: String,
    pub active: bool,
    pub created_at: String,
    pub user_count: i64,
    pub team_count: i64,
}

pub struct AuditRow {
    pub when: String,
    pub action: String,
    pub resource_type: String,
    pub organization: String,
}

#[derive(Template)]
#[template(path = "admin/panel.html")]
#[allow(dead_code)]
struct PanelTemplate {
    nav: Nav,
    organizations: Vec<OrganizationRow>,
    organizations_available: bool,
    events: Vec<AuditRow>,
}

pub async fn panel(
    actor: Actor,
    State(state): State<SharedState>,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    actor.require(Action::AccessAdminPanel)?;
    let (jar, message) = flash::take(jar);
    let pool = &state.stores.main;

    let (organizations, organizations_available) = match &state.stores.organizations {
        Some(orgs) => match db::organizations::list(orgs).await {
            Ok(list) => (list, true),
            Err(e) => {
                tracing::warn!("Error reading from 'organizations' database: {e}");
                (Vec::new(), false)
            }
        },
        None => (Vec::new(), false),
    };

    let mut rows = Vec::with_capacity(organizations.len());
    for org in organizations {
        let key = org.uuid.to_string();
        rows.push(OrganizationRow {
            user_count: db::profiles::count_by_organization(pool, &key).await?,
            team_count: db::teams::count_by_organization(pool, &key).await?,
            uuid: key,
            name: org.name,
            active: org.active,
            created_at: format_datetime(&org.created_at),
        });
    }

    let events = db::audit::list(pool, None, RECENT_EVENTS)
        .await?
        .into_iter()
        .map(|e| AuditRow {
            when: format_datetime(&e.created_at),
            action: e.action,
            resource_type: e.resource_type,
            organization: e.alma_internal_organization.unwrap_or_default(),
        })
        .collect();

    let template = PanelTemplate {
        nav: Nav::new(&actor, "admin").with_flash(message),
        organizations: rows,
        organizations_available,
        events,
    };
    Ok((jar, Html(template.render().unwrap_or_default())))
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrganizationForm {
    #[serde(default)]
    pub org_name: String,
    #[serde(default)]
    pub director_username: String,
    #[serde(default)]
    pub director_email: String,
    #[serde(default)]
    pub director_password: String,
    #[serde(default)]
    pub director_first_name: String,
    #[serde(default)]
    pub director_last_name: String,
    #[serde(default)]
    pub director_phone: String,
}

impl OrganizationForm {
    /// First failing check, in form order.
    pub fn validate(&self) -> Option<&'static str> {
        if self.org_name.trim().is_empty() {
            return Some("Organization name is required.");
        }
        if self.director_username.trim().is_empty() {
            return Some("Director username is required.");
        }
        if self.director_password.is_empty() {
            return Some("Director password is required.");
        }
        if self.director_password.chars().count() < crate::views::members::PASSWORD_MIN {
            return Some("Director password must be at least 8 characters.");
        }
        None
    }
}

#[derive(Template)]
#[template(path = "admin/organization_form.html")]
#[allow(dead_code)]
pub struct OrganizationFormTemplate {
    pub nav: Nav,
    pub form: OrganizationForm,
    pub error: Option<String>,
}

pub async fn new_organization_page(actor: Actor) -> Result<impl IntoResponse, AppError> {
    actor.require(Action::AccessAdminPanel)?;
    let template = OrganizationFormTemplate {
        nav: Nav::new(&actor, "admin"),
        form: OrganizationForm::default(),
        error: None,
    };
    Ok(Html(template.render().unwrap_or_default()))
}

pub struct OrgTeamRow {
    pub id: String,
    pub name: String,
    pub description: String,
}

pub struct OrgUserRow {
    pub id: String,
    pub username: String,
    pub display_name: String,
    pub email: String,
    pub role: String,
    pub team_name: String,
}

#[derive(Template)]
#[template(path = "admin/organization.html")]
#[allow(dead_code)]
struct OrganizationTemplate {
    nav: Nav,
    organization: Organization,
    created_at: String,
    api_key: Option<String>,
    teams: Vec<OrgTeamRow>,
    users: Vec<OrgUserRow>,
}

pub async fn organization(
    actor: Actor,
    State(state): State<SharedState>,
    Path(uuid): Path<Uuid>,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    actor.require(Action::AccessAdminPanel)?;
    let (jar, message) = flash::take(jar);

    let orgs = state.stores.organizations()?;
    let organization = db::organizations::find(orgs, uuid)
        .await?
        .ok_or_else(|| AppError::NotFound("Organization not found".to_string()))?;
    let api_key = db::api_keys::first_for_organization(orgs, uuid)
        .await?
        .map(|k| k.masked());

    let key = uuid.to_string();
    let teams = db::teams::list(&state.stores.main, Some(key.as_str()))
        .await?
        .into_iter()
        .map(|t| OrgTeamRow {
            id: t.id.to_string(),
            name: t.name,
            description: t.description.unwrap_or_default(),
        })
        .collect();
    let users = db::profiles::list_by_organization(&state.stores.main, &key)
        .await?
        .iter()
        .map(|m| OrgUserRow {
            id: m.id.to_string(),
            username: m.username.clone(),
            display_name: m.display_name(),
            email: m.email.clone(),
            role: m.role.to_string(),
            team_name: m.team_name.clone().unwrap_or_default(),
        })
        .collect();

    let template = OrganizationTemplate {
        nav: Nav::new(&actor, "admin").with_flash(message),
        created_at: format_datetime(&organization.created_at),
        organization,
        api_key,
        teams,
        users,
    };
    Ok((jar, Html(template.render().unwrap_or_default())))
}
