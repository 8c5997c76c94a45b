use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct FollowUpTask {
    pub event_uuid: Uuid,
    pub conversation_uuid: Option<String>,
    pub agent_uuid: String,
    pub score: i32,
    pub follow_up_date: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct TrackedLink {
    pub slug: String,
    pub original_url: String,
    pub seller_id: String,
}
