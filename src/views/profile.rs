use askama::Template;
use axum::extract::State;
use axum::response::{Html, IntoResponse};
use axum_extra::extract::CookieJar;
use serde::Deserialize;

use crate::auth::policy::Actor;
use crate::db;
use crate::error::AppError;
use crate::state::SharedState;
use crate::views::{flash, is_valid_email, is_valid_phone, Nav};

pub const CELL_PHONE_MAX: usize = 20;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileForm {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub external_uuid: String,
    #[serde(default)]
    pub cell_phone: String,
}

impl ProfileForm {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let email = self.email.trim();
        if email.is_empty() {
            errors.push("E-mail is required.".to_string());
        } else if !is_valid_email(email) {
            errors.push("Enter a valid e-mail address.".to_string());
        }
        let phone = self.cell_phone.trim();
        if phone.chars().count() > CELL_PHONE_MAX {
            errors.push(format!("Cell phone must have at most {CELL_PHONE_MAX} characters."));
        } else if !phone.is_empty() && !is_valid_phone(phone) {
            errors.push("Enter a valid cell phone number.".to_string());
        }
        errors
    }
}

#[derive(Template)]
#[template(path = "profile.html")]
#[allow(dead_code)]
pub struct ProfileTemplate {
    pub nav: Nav,
    pub username: String,
    pub role: String,
    pub team_name: String,
    pub form: ProfileForm,
    pub errors: Vec<String>,
}

pub async fn edit_page(
    actor: Actor,
    State(state): State<SharedState>,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    let member = db::profiles::find_member(&state.stores.main, actor.profile_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Profile not found".to_string()))?;
    let (jar, message) = flash::take(jar);

    let template = ProfileTemplate {
        nav: Nav::new(&actor, "profile").with_flash(message),
        username: member.username.clone(),
        role: member.role.to_string(),
        team_name: member.team_name.clone().unwrap_or_default(),
        form: ProfileForm {
            first_name: member.first_name.clone(),
            last_name: member.last_name.clone(),
            email: member.email.clone(),
            external_uuid: member.external_uuid.clone().unwrap_or_default(),
            cell_phone: member.cell_phone.clone().unwrap_or_default(),
        },
        errors: Vec::new(),
    };
    Ok((jar, Html(template.render().unwrap_or_default())))
}
