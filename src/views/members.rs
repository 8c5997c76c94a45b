use askama::Template;
use axum::extract::{Path, State};
use axum::response::{Html, IntoResponse, Response};
use axum_extra::extract::CookieJar;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::policy::{self, Action, Actor, Subject};
use crate::db;
use crate::error::AppError;
use crate::models::{Member, Organization, Role};
use crate::state::{AppState, SharedState};
use crate::stores::degrade;
use crate::views::profile::CELL_PHONE_MAX;
use crate::views::{flash, Nav, SelectOption};

pub const PASSWORD_MIN: usize = 8;

pub struct MemberRow {
    pub id: String,
    pub username: String,
    pub display_name: String,
    pub email: String,
    pub role: String,
    pub team_name: String,
    pub organization: String,
    pub external_uuid: String,
    pub alma_internal_uuid: String,
    pub can_edit: bool,
    pub can_view_analytics: bool,
}

#[derive(Template)]
#[template(path = "members/list.html")]
#[allow(dead_code)]
struct ListTemplate {
    nav: Nav,
    rows: Vec<MemberRow>,
    can_create: bool,
    show_internal: bool,
}

pub async fn list(
    actor: Actor,
    State(state): State<SharedState>,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    let members =
        db::profiles::list_visible(&state.stores.main, &policy::visible_members(&actor)).await?;
    let (jar, message) = flash::take(jar);

    let rows = members
        .iter()
        .map(|m| {
            let subject = Subject::from(m);
            MemberRow {
                id: m.id.to_string(),
                username: m.username.clone(),
                display_name: m.display_name(),
                email: m.email.clone(),
                role: m.role.to_string(),
                team_name: m.team_name.clone().unwrap_or_default(),
                organization: m.alma_internal_organization.clone().unwrap_or_default(),
                external_uuid: m.external_uuid.clone().unwrap_or_default(),
                alma_internal_uuid: m.alma_internal_uuid.clone().unwrap_or_default(),
                can_edit: actor.can(Action::ManageUser(subject)),
                can_view_analytics: actor.can(Action::ViewAgent(subject)),
            }
        })
        .collect();

    let template = ListTemplate {
        nav: Nav::new(&actor, "agentes").with_flash(message),
        rows,
        can_create: actor.is_admin() || actor.is_director(),
        show_internal: actor.can(Action::ViewAlmaUuid),
    };
    Ok((jar, Html(template.render().unwrap_or_default())))
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MemberForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub team_id: String,
    #[serde(default)]
    pub organization: String,
    #[serde(default)]
    pub external_uuid: String,
    #[serde(default)]
    pub cell_phone: String,
    #[serde(default)]
    pub alma_internal_uuid: String,
}

impl MemberForm {
    fn from_member(member: &Member) -> Self {
        Self {
            username: member.username.clone(),
            password: String::new(),
            email: member.email.clone(),
            first_name: member.first_name.clone(),
            last_name: member.last_name.clone(),
            role: member.role.to_string(),
            team_id: member.team_id.map(|t| t.to_string()).unwrap_or_default(),
            organization: member.alma_internal_organization.clone().unwrap_or_default(),
            external_uuid: member.external_uuid.clone().unwrap_or_default(),
            cell_phone: member.cell_phone.clone().unwrap_or_default(),
            alma_internal_uuid: member.alma_internal_uuid.clone().unwrap_or_default(),
        }
    }

    pub fn parsed_role(&self) -> Result<Role, String> {
        self.role.trim().parse::<Role>().map_err(|_| "Select a valid role.".to_string())
    }

    pub fn parsed_team(&self) -> Result<Option<Uuid>, String> {
        match self.team_id.trim() {
            "" => Ok(None),
            raw => raw
                .parse::<Uuid>()
                .map(Some)
                .map_err(|_| "Select a valid team.".to_string()),
        }
    }

    /// Checks shared by create and edit; `creating` adds the credential fields.
    pub fn validate(&self, creating: bool) -> Vec<String> {
        let mut errors = Vec::new();
        if creating {
            if self.username.trim().is_empty() {
                errors.push("Username is required.".to_string());
            } else if self.username.trim().chars().any(char::is_whitespace) {
                errors.push("Username cannot contain spaces.".to_string());
            }
            if self.password.chars().count() < PASSWORD_MIN {
                errors.push(format!("Password must be at least {PASSWORD_MIN} characters."));
            }
        }
        let email = self.email.trim();
        if !email.is_empty() && !super::is_valid_email(email) {
            errors.push("Enter a valid e-mail address.".to_string());
        }
        let phone = self.cell_phone.trim();
        if phone.chars().count() > CELL_PHONE_MAX {
            errors.push(format!("Cell phone must have at most {CELL_PHONE_MAX} characters."));
        } else if !phone.is_empty() && !super::is_valid_phone(phone) {
            errors.push("Enter a valid cell phone number.".to_string());
        }
        if let Err(e) = self.parsed_role() {
            errors.push(e);
        }
        if let Err(e) = self.parsed_team() {
            errors.push(e);
        }
        errors
    }
}

#[derive(Template)]
#[template(path = "members/form.html")]
#[allow(dead_code)]
pub struct FormTemplate {
    pub nav: Nav,
    pub title: String,
    pub action: String,
    pub creating: bool,
    pub form: MemberForm,
    pub roles: Vec<SelectOption>,
    pub can_change_role: bool,
    pub teams: Vec<SelectOption>,
    pub can_change_team: bool,
    pub is_admin: bool,
    pub organizations: Vec<SelectOption>,
    pub errors: Vec<String>,
}

async fn organizations(state: &AppState) -> Vec<Organization> {
    match &state.stores.organizations {
        Some(pool) => degrade("organizations", db::organizations::list(pool).await),
        None => Vec::new(),
    }
}

/// Render the create form (`target == None`) or the edit form for `target`.
pub async fn render_form(
    state: &AppState,
    actor: &Actor,
    target: Option<&Member>,
    form: MemberForm,
    errors: Vec<String>,
) -> Result<Response, AppError> {
    let roles: Vec<Role> = match target {
        None => Role::ALL
            .into_iter()
            .filter(|r| actor.is_admin() || r.is_director_assignable())
            .collect(),
        Some(member) => {
            let subject = Subject::from(member);
            Role::ALL
                .into_iter()
                .filter(|r| *r == member.role || actor.can_assign_role(&subject, *r))
                .collect()
        }
    };
    let can_change_role = match target {
        None => true,
        Some(member) => actor.can_change_role(&Subject::from(member)),
    };

    let team_scope = actor.tenant_scope();
    let teams = match team_scope.organization_filter() {
        Some(organization) => db::teams::list(&state.stores.main, organization).await?,
        None => Vec::new(),
    };
    let mut team_options = vec![SelectOption::new("", "No team", &form.team_id)];
    team_options.extend(
        teams
            .iter()
            .map(|t| SelectOption::new(t.id.to_string(), t.name.as_str(), &form.team_id)),
    );

    let mut organization_options = Vec::new();
    if actor.is_admin() {
        organization_options.push(SelectOption::new("", "No organization", &form.organization));
        organization_options.extend(organizations(state).await.iter().map(|o| {
            SelectOption::new(o.uuid.to_string(), o.name.as_str(), &form.organization)
        }));
    }

    let (title, action) = match target {
        None => ("New agent".to_string(), "/agentes/new".to_string()),
        Some(member) => (
            format!("Edit {}", member.display_name()),
            format!("/agentes/{}/edit", member.id),
        ),
    };

    let template = FormTemplate {
        nav: Nav::new(actor, "agentes"),
        title,
        action,
        creating: target.is_none(),
        roles: roles
            .iter()
            .map(|r| SelectOption::new(r.as_str(), r.as_str(), form.role.trim()))
            .collect(),
        can_change_role,
        teams: team_options,
        can_change_team: actor.is_admin() || actor.is_director(),
        is_admin: actor.is_admin(),
        organizations: organization_options,
        form,
        errors,
    };
    Ok(Html(template.render().unwrap_or_default()).into_response())
}

pub async fn new_page(
    actor: Actor,
    State(state): State<SharedState>,
) -> Result<Response, AppError> {
    actor.require(Action::CreateUser {
        organization: actor.organization.as_deref(),
        role: Role::User,
    })?;

    let form = MemberForm {
        role: Role::User.to_string(),
        organization: actor.organization.clone().unwrap_or_default(),
        ..MemberForm::default()
    };
    render_form(&state, &actor, None, form, Vec::new()).await
}

/// Load a profile the actor may manage.
pub async fn managed_member(state: &AppState, actor: &Actor, id: Uuid) -> Result<Member, AppError> {
    let member = db::profiles::find_member(&state.stores.main, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Agent not found".to_string()))?;
    actor.require(Action::ManageUser(Subject::from(&member)))?;
    Ok(member)
}

pub async fn edit_page(
    actor: Actor,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let member = managed_member(&state, &actor, id).await?;
    let form = MemberForm::from_member(&member);
    render_form(&state, &actor, Some(&member), form, Vec::new()).await
}
