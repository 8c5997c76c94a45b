pub mod admin;
pub mod analytics;
pub mod auth;
pub mod authorizations;
pub mod conversations;
pub mod flash;
pub mod followups;
pub mod members;
pub mod profile;
pub mod teams;
pub mod workspace;

use std::sync::LazyLock;

use axum::routing::get;
use axum::Router;
use chrono::{DateTime, Utc};
use regex::Regex;

use crate::auth::policy::{Action, Actor};
use crate::state::SharedState;

pub fn view_routes() -> Router<SharedState> {
    Router::new()
        // Auth
        .route("/", get(auth::login_page))
        .route("/auth/login", get(auth::login_page))
        // Workspace & profile
        .route("/workspace", get(workspace::index))
        .route("/profile", get(profile::edit_page))
        // Conversations
        .route("/conversations", get(conversations::list))
        .route("/conversations/{id}", get(conversations::detail))
        // Agents
        .route("/agentes", get(members::list))
        .route("/agentes/new", get(members::new_page))
        .route("/agentes/{id}/edit", get(members::edit_page))
        // Teams
        .route("/teams", get(teams::list))
        .route("/teams/new", get(teams::new_page))
        .route("/teams/{id}", get(teams::show))
        .route("/teams/{id}/edit", get(teams::edit_page))
        .route("/teams/{id}/delete", get(teams::delete_page))
        // Analytics
        .route("/analytics", get(analytics::index))
        .route("/analytics/agents/{id}", get(analytics::agent))
        .route("/analytics/gold/{dataset}", get(analytics::gold))
        // Follow-ups
        .route("/followups", get(followups::index))
        // Admin
        .route("/admin-panel", get(admin::panel))
        .route("/admin-panel/organizations/new", get(admin::new_organization_page))
        .route("/admin-panel/organizations/{uuid}", get(admin::organization))
        .route("/admin-panel/authorizations", get(authorizations::list))
        .route("/admin-panel/authorizations/new", get(authorizations::new_page))
        .route(
            "/admin-panel/authorizations/{uuid}/delete",
            get(authorizations::delete_page),
        )
}

/// Navigation data shared by every page layout.
pub struct Nav {
    pub user_name: String,
    pub role: String,
    pub is_admin: bool,
    pub can_manage_keys: bool,
    pub active: &'static str,
    pub flash: Option<String>,
}

impl Nav {
    pub fn new(actor: &Actor, active: &'static str) -> Self {
        Self {
            user_name: actor.display_name.clone(),
            role: actor.role.to_string(),
            is_admin: actor.can(Action::AccessAdminPanel),
            can_manage_keys: actor.is_admin() || actor.is_director(),
            active,
            flash: None,
        }
    }

    pub fn with_flash(mut self, flash: Option<String>) -> Self {
        self.flash = flash;
        self
    }
}

/// One `<option>` of a `<select>`.
pub struct SelectOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

impl SelectOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>, current: &str) -> Self {
        let value = value.into();
        let selected = value == current;
        Self {
            value,
            label: label.into(),
            selected,
        }
    }
}

pub fn format_datetime(value: &DateTime<Utc>) -> String {
    value.format("%d/%m/%Y %H:%M").to_string()
}

/// Trimmed form value, `None` when blank.
pub fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+$").unwrap());

static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[0-9][0-9 ()\-]*$").unwrap());

pub fn is_valid_email(value: &str) -> bool {
    EMAIL_RE.is_match(value)
}

/// Digits with optional leading `+` and the usual separators.
pub fn is_valid_phone(value: &str) -> bool {
    PHONE_RE.is_match(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shape() {
        assert!(is_valid_email("ana@example.com"));
        assert!(!is_valid_email("ana.example.com"));
        assert!(!is_valid_email("ana@"));
        assert!(!is_valid_email("a na@example.com"));
    }

    #[test]
    fn phone_shape() {
        assert!(is_valid_phone("+55 11 99999-0000"));
        assert!(is_valid_phone("(11) 4002-8922"));
        assert!(!is_valid_phone("call me"));
        assert!(!is_valid_phone("-123"));
    }

    #[test]
    fn blank_values_are_none() {
        assert_eq!(non_empty("  "), None);
        assert_eq!(non_empty(" x "), Some("x"));
    }

    #[test]
    fn marks_current_option() {
        assert!(SelectOption::new("a", "A", "a").selected);
        assert!(!SelectOption::new("a", "A", "b").selected);
    }
}
