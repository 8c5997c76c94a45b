use chrono::Utc;
use serde::Serialize;

use crate::auth::jwt;
use crate::auth::policy::Actor;

/// Identity token for the embedded chat widget.
#[derive(Debug, Serialize)]
pub struct WidgetClaims {
    pub user_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phonenumber: Option<String>,
    pub exp: i64,
}

impl WidgetClaims {
    pub fn for_actor(actor: &Actor) -> Self {
        let user_id = actor
            .external_uuid
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| actor.user_id.to_string());

        Self {
            user_id,
            name: actor.display_name.clone(),
            phonenumber: actor.cell_phone.clone(),
            exp: Utc::now().timestamp() + 60 * 60,
        }
    }
}

/// HS256 widget token, or `None` when no secret is configured.
pub fn widget_token(actor: &Actor, secret: Option<&str>) -> Option<String> {
    let secret = secret?;
    match jwt::encode_token(&WidgetClaims::for_actor(actor), secret) {
        Ok(token) => Some(token),
        Err(e) => {
            tracing::error!("Failed to generate chat widget token: {e}");
            None
        }
    }
}
