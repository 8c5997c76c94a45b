use askama::Template;
use axum::extract::{Path, Query, State};
use axum::response::{Html, IntoResponse, Response};
use axum_extra::extract::CookieJar;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::policy::{Action, Actor};
use crate::db;
use crate::error::AppError;
use crate::models::{ApiKey, Organization};
use crate::state::{AppState, SharedState};
use crate::views::{flash, format_datetime, Nav, SelectOption};

pub const NO_ORGANIZATION: &str = "Your profile does not have an organization assigned.";

#[derive(Debug, Default, Deserialize)]
pub struct OrganizationQuery {
    #[serde(default)]
    pub org_uuid: Option<Uuid>,
}

/// The organization whose keys are managed. Admins pick one (defaulting to
/// their own, then the first); Directors always get their own.
pub async fn resolve_organization(
    state: &AppState,
    actor: &Actor,
    requested: Option<Uuid>,
) -> Result<Option<Organization>, AppError> {
    if !actor.is_admin() && !actor.is_director() {
        actor.require(Action::ManageApiKeys {
            organization: actor.organization.as_deref(),
        })?;
    }

    let orgs = state.stores.organizations()?;
    let own = actor
        .organization
        .as_deref()
        .and_then(|o| o.parse::<Uuid>().ok());

    if actor.is_admin() {
        if let Some(uuid) = requested.or(own) {
            if let Some(org) = db::organizations::find(orgs, uuid).await? {
                return Ok(Some(org));
            }
        }
        return Ok(db::organizations::list(orgs).await?.into_iter().next());
    }

    let uuid = own.ok_or_else(|| AppError::Forbidden(NO_ORGANIZATION.to_string()))?;
    actor.require(Action::ManageApiKeys {
        organization: actor.organization.as_deref(),
    })?;
    db::organizations::find(orgs, uuid)
        .await?
        .map(Some)
        .ok_or_else(|| AppError::NotFound("Organization not found".to_string()))
}

pub fn list_href(actor: &Actor, organization: Uuid) -> String {
    if actor.is_admin() {
        format!("/admin-panel/authorizations?org_uuid={organization}")
    } else {
        "/admin-panel/authorizations".to_string()
    }
}

async fn organization_options(
    state: &AppState,
    actor: &Actor,
    current: &Organization,
) -> Result<Vec<SelectOption>, AppError> {
    if !actor.is_admin() {
        return Ok(Vec::new());
    }
    let selected = current.uuid.to_string();
    Ok(db::organizations::list(state.stores.organizations()?)
        .await?
        .iter()
        .map(|o| SelectOption::new(o.uuid.to_string(), o.name.as_str(), &selected))
        .collect())
}

pub struct KeyRow {
    pub uuid: String,
    pub name: String,
    pub masked: String,
    pub created_at: String,
    pub last_used: String,
}

impl From<&ApiKey> for KeyRow {
    fn from(key: &ApiKey) -> Self {
        Self {
            uuid: key.uuid.to_string(),
            name: key.name.clone(),
            masked: key.masked(),
            created_at: format_datetime(&key.created_at),
            last_used: key.last_used.as_ref().map(format_datetime).unwrap_or_default(),
        }
    }
}

#[derive(Template)]
#[template(path = "authorizations/list.html")]
#[allow(dead_code)]
struct ListTemplate {
    nav: Nav,
    organization: Organization,
    organizations: Vec<SelectOption>,
    keys: Vec<KeyRow>,
}

pub async fn list(
    actor: Actor,
    State(state): State<SharedState>,
    Query(query): Query<OrganizationQuery>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let Some(organization) = resolve_organization(&state, &actor, query.org_uuid).await? else {
        return Ok(flash::redirect(jar, "/workspace", "No organizations found.").into_response());
    };
    let (jar, message) = flash::take(jar);

    let keys = db::api_keys::list_by_organization(state.stores.organizations()?, organization.uuid)
        .await?
        .iter()
        .map(KeyRow::from)
        .collect();

    let template = ListTemplate {
        nav: Nav::new(&actor, "authorizations").with_flash(message),
        organizations: organization_options(&state, &actor, &organization).await?,
        organization,
        keys,
    };
    Ok((jar, Html(template.render().unwrap_or_default())).into_response())
}

#[derive(Debug, Default, Deserialize)]
pub struct KeyForm {
    #[serde(default)]
    pub key_name: String,
    #[serde(default)]
    pub org_uuid: Option<Uuid>,
}

#[derive(Template)]
#[template(path = "authorizations/form.html")]
#[allow(dead_code)]
pub struct FormTemplate {
    pub nav: Nav,
    pub organization: Organization,
    pub key_name: String,
    pub error: Option<String>,
}

pub async fn new_page(
    actor: Actor,
    State(state): State<SharedState>,
    Query(query): Query<OrganizationQuery>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let Some(organization) = resolve_organization(&state, &actor, query.org_uuid).await? else {
        return Ok(flash::redirect(jar, "/workspace", "No organizations found.").into_response());
    };

    let template = FormTemplate {
        nav: Nav::new(&actor, "authorizations"),
        organization,
        key_name: String::new(),
        error: None,
    };
    Ok(Html(template.render().unwrap_or_default()).into_response())
}

#[derive(Template)]
#[template(path = "authorizations/created.html")]
#[allow(dead_code)]
pub struct CreatedTemplate {
    pub nav: Nav,
    pub organization: Organization,
    pub name: String,
    pub apikey: String,
    pub back_href: String,
}

/// A key the actor may delete.
pub async fn managed_key(state: &AppState, actor: &Actor, uuid: Uuid) -> Result<ApiKey, AppError> {
    let key = db::api_keys::find(state.stores.organizations()?, uuid)
        .await?
        .ok_or_else(|| AppError::NotFound("API key not found".to_string()))?;
    let organization = key.organization_uuid.to_string();
    actor.require(Action::ManageApiKeys {
        organization: Some(&organization),
    })?;
    Ok(key)
}

#[derive(Template)]
#[template(path = "authorizations/delete.html")]
#[allow(dead_code)]
struct DeleteTemplate {
    nav: Nav,
    key: KeyRow,
    back_href: String,
}

pub async fn delete_page(
    actor: Actor,
    State(state): State<SharedState>,
    Path(uuid): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let key = managed_key(&state, &actor, uuid).await?;
    let template = DeleteTemplate {
        nav: Nav::new(&actor, "authorizations"),
        back_href: list_href(&actor, key.organization_uuid),
        key: KeyRow::from(&key),
    };
    Ok(Html(template.render().unwrap_or_default()))
}
