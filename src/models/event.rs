use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A row of the external events store.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Event {
    pub id: i64,
    pub event_type: String,
    pub event_subtype: Option<String>,
    pub datetime: DateTime<Utc>,
    pub dialogue: Option<String>,
    pub agent_infobip_uuid: Option<String>,
    pub json: Option<serde_json::Value>,
}

impl Event {
    /// Who produced the event: the dialogue when present, otherwise the agent.
    pub fn origin(&self) -> &str {
        self.dialogue
            .as_deref()
            .or(self.agent_infobip_uuid.as_deref())
            .unwrap_or("")
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SalesStageMetrics {
    pub total_conversations: i64,
    pub total_sales: i64,
    pub raw_stages: BTreeMap<String, i64>,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct FollowUpDetection {
    pub agent_uuid: String,
    pub count: i64,
}
