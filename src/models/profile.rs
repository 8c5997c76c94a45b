use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Role;

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    #[sqlx(try_from = "String")]
    pub role: Role,
    pub team_id: Option<Uuid>,
    pub external_uuid: Option<String>,
    pub alma_internal_uuid: Option<String>,
    pub alma_internal_organization: Option<String>,
    pub cell_phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A profile joined with its user record and team name.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Member {
    pub id: Uuid,
    pub user_id: Uuid,
    #[sqlx(try_from = "String")]
    pub role: Role,
    pub team_id: Option<Uuid>,
    pub team_name: Option<String>,
    pub external_uuid: Option<String>,
    pub alma_internal_uuid: Option<String>,
    pub alma_internal_organization: Option<String>,
    pub cell_phone: Option<String>,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Member {
    pub fn display_name(&self) -> String {
        crate::models::user::display_name(&self.username, &self.first_name, &self.last_name)
    }

    /// The trimmed external UUID, if one is set.
    pub fn agent_uuid(&self) -> Option<&str> {
        self.external_uuid
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
    }
}
