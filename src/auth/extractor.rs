use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::CookieJar;

use crate::auth::jwt;
use crate::auth::policy::Actor;
use crate::db;
use crate::error::AppError;
use crate::models::Member;
use crate::state::SharedState;

pub const SESSION_COOKIE: &str = "access_token";

impl From<Member> for Actor {
    fn from(member: Member) -> Self {
        let display_name = member.display_name();
        Actor {
            user_id: member.user_id,
            profile_id: member.id,
            role: member.role,
            team_id: member.team_id,
            organization: member.alma_internal_organization,
            username: member.username,
            display_name,
            email: member.email,
            external_uuid: member.external_uuid,
            cell_phone: member.cell_phone,
        }
    }
}

fn session_token(parts: &Parts) -> Result<Option<String>, AppError> {
    if let Some(auth_header) = parts.headers.get("authorization") {
        let auth_str = auth_header
            .to_str()
            .map_err(|_| AppError::Unauthorized("Invalid authorization header".to_string()))?;
        if let Some(token) = auth_str.strip_prefix("Bearer ") {
            return Ok(Some(token.to_string()));
        }
    }

    let jar = CookieJar::from_headers(&parts.headers);
    Ok(jar.get(SESSION_COOKIE).map(|c| c.value().to_string()))
}

/// Resolves the session to the caller's user and profile. A user without a
/// profile gets a default one.
impl FromRequestParts<SharedState> for Actor {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let token = session_token(parts)?
            .ok_or_else(|| AppError::Unauthorized("Missing authentication token".to_string()))?;

        let claims = jwt::decode_token(&token, &state.config.jwt_secret)
            .map_err(|_| AppError::Unauthorized("Invalid or expired token".to_string()))?;

        let pool = &state.stores.main;
        let user = db::users::find_by_id(pool, claims.sub)
            .await?
            .filter(|u| u.is_active)
            .ok_or_else(|| AppError::Unauthorized("Account not found or disabled".to_string()))?;

        db::profiles::ensure_for_user(pool, user.id).await?;
        let member = db::profiles::find_member_by_user(pool, user.id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("Profile missing for user {}", user.id)))?;

        Ok(Actor::from(member))
    }
}
