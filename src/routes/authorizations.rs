use askama::Template;
use axum::extract::{Path, State};
use axum::response::{Html, IntoResponse, Response};
use axum::Form;
use axum_extra::extract::CookieJar;
use serde_json::json;
use uuid::Uuid;

use crate::auth::policy::Actor;
use crate::db;
use crate::error::AppError;
use crate::middleware::audit;
use crate::state::SharedState;
use crate::views::authorizations::{
    list_href, managed_key, resolve_organization, CreatedTemplate, FormTemplate, KeyForm,
};
use crate::views::{flash, Nav};

pub async fn create(
    actor: Actor,
    State(state): State<SharedState>,
    jar: CookieJar,
    Form(form): Form<KeyForm>,
) -> Result<Response, AppError> {
    let Some(organization) = resolve_organization(&state, &actor, form.org_uuid).await? else {
        return Ok(flash::redirect(jar, "/workspace", "No organizations found.").into_response());
    };

    let name = form.key_name.trim();
    if name.is_empty() {
        let template = FormTemplate {
            nav: Nav::new(&actor, "authorizations"),
            organization,
            key_name: form.key_name.clone(),
            error: Some("Key name is required.".to_string()),
        };
        return Ok(Html(template.render().unwrap_or_default()).into_response());
    }

    let apikey = db::api_keys::generate_key();
    let key = db::api_keys::create(state.stores.organizations()?, organization.uuid, name, &apikey)
        .await?;

    audit::log_event(
        &state.stores.main,
        &actor,
        "api_key.created",
        "authorization",
        Some(key.uuid),
        Some(json!({ "name": key.name, "organization": organization.uuid })),
    )
    .await;
    tracing::info!("API key {} created for organization {}", key.uuid, organization.uuid);

    let template = CreatedTemplate {
        nav: Nav::new(&actor, "authorizations"),
        back_href: list_href(&actor, organization.uuid),
        organization,
        name: key.name,
        apikey,
    };
    Ok(Html(template.render().unwrap_or_default()).into_response())
}

pub async fn delete(
    actor: Actor,
    State(state): State<SharedState>,
    Path(uuid): Path<Uuid>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let key = managed_key(&state, &actor, uuid).await?;
    db::api_keys::delete(state.stores.organizations()?, key.uuid).await?;

    audit::log_event(
        &state.stores.main,
        &actor,
        "api_key.deleted",
        "authorization",
        Some(key.uuid),
        Some(json!({ "name": key.name, "organization": key.organization_uuid })),
    )
    .await;

    let message = format!("API key {} deleted.", key.name);
    let to = list_href(&actor, key.organization_uuid);
    Ok(flash::redirect(jar, &to, &message).into_response())
}
