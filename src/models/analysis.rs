use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

pub const SENTIMENT_ANALYSIS: &str = "SENTIMENT_ANALYSIS";
pub const BEST_PRACTICES: &str = "BEST_PRACTICES";
pub const SALES_PERFORMANCE: &str = "SALES_PERFORMANCE";
pub const STAGE_SCORE: &str = "STAGE_SCORE";

/// One analysis produced by the external pipeline for a conversation.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub uuid: Uuid,
    pub conversation_uuid: Option<String>,
    pub analysis_type: String,
    pub result: Value,
    pub alma_internal_organization: Option<String>,
    pub created_at: DateTime<Utc>,
    pub agent_uuid: Option<String>,
}

impl AnalysisRecord {
    pub fn is(&self, analysis_type: &str) -> bool {
        self.analysis_type == analysis_type
    }
}
