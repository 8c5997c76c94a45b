use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    pub chat_id: String,
    pub alma_internal_organization: Option<String>,
    pub agents: Vec<String>,
    pub metadata: Value,
    pub last_update: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    fn meta_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(Value::as_str)
    }

    pub fn client_name(&self) -> &str {
        self.meta_str("client_name").unwrap_or("")
    }

    pub fn client_email(&self) -> &str {
        self.meta_str("client_email").unwrap_or("")
    }

    pub fn sales_stage(&self) -> &str {
        self.meta_str("sales_stage").unwrap_or("")
    }

    /// Tags are stored either as a JSON array or a comma-separated string.
    pub fn tags(&self) -> Vec<String> {
        normalize_tags(self.metadata.get("tags"))
    }
}

pub fn normalize_tags(raw: Option<&Value>) -> Vec<String> {
    match raw {
        Some(Value::String(s)) => s
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_uuid: Option<String>,
    pub content: String,
    pub channel: Option<String>,
    pub sent_at: DateTime<Utc>,
}
