use askama::Template;
use axum::extract::State;
use axum::response::{Html, IntoResponse};
use axum::Form;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::policy::Actor;
use crate::error::AppError;
use crate::followups::links;
use crate::state::SharedState;
use crate::views::followups::target_agent;
use crate::views::Nav;

#[derive(Debug, Deserialize)]
pub struct LinkForm {
    pub url: String,
    #[serde(default)]
    pub agent: Option<Uuid>,
}

#[derive(Template)]
#[template(path = "followups/link.html")]
#[allow(dead_code)]
struct LinkTemplate {
    nav: Nav,
    agent_id: String,
    original_url: String,
    short_link: String,
}

pub fn is_http_url(url: &str) -> bool {
    let Some((scheme, rest)) = url.split_once("://") else {
        return false;
    };
    matches!(scheme.to_ascii_lowercase().as_str(), "http" | "https")
        && !rest.is_empty()
        && !url.chars().any(char::is_whitespace)
}

/// Create (or reuse) a tracked short link for a conversation URL.
pub async fn create_link(
    actor: Actor,
    State(state): State<SharedState>,
    Form(form): Form<LinkForm>,
) -> Result<impl IntoResponse, AppError> {
    let url = form.url.trim();
    if !is_http_url(url) {
        return Err(AppError::BadRequest("Enter a valid http(s) URL.".to_string()));
    }

    let member = target_agent(&state, &actor, form.agent).await?;
    let seller_id = member
        .agent_uuid()
        .ok_or_else(|| AppError::BadRequest("This agent has no external UUID.".to_string()))?;
    let pool = state.stores.followups.as_ref().ok_or_else(|| {
        AppError::Internal("Follow-ups database is not configured".to_string())
    })?;

    let short_link =
        links::create_tracked_link(pool, &state.config.short_link_base_url, url, seller_id).await;

    let template = LinkTemplate {
        nav: Nav::new(&actor, "followups"),
        agent_id: member.id.to_string(),
        original_url: url.to_string(),
        short_link,
    };
    Ok(Html(template.render().unwrap_or_default()))
}

#[cfg(test)]
mod tests {
    use super::is_http_url;

    #[test]
    fn accepts_only_http_urls() {
        assert!(is_http_url("https://portal.example/c?conversationId=abc"));
        assert!(is_http_url("HTTP://example.com"));
        assert!(!is_http_url("javascript:alert(1)"));
        assert!(!is_http_url("ftp://example.com/file"));
        assert!(!is_http_url("https://"));
        assert!(!is_http_url("https://exa mple.com"));
    }
}
