use std::collections::BTreeMap;

use sqlx::PgPool;

use crate::models::{Event, FollowUpDetection, SalesStageMetrics};

pub const SALES_STAGE_CHANGE: &str = "SALES_STAGE_CHANGE";
pub const FOLLOW_UP_DETECTED: &str = "FOLLOW_UP_DETECTED";
pub const CLOSED_WON: &str = "closed_won";

/// Latest sales stage per conversation the agent took part in.
pub async fn sales_stage_metrics(
    pool: &PgPool,
    agent_uuid: &str,
) -> Result<SalesStageMetrics, sqlx::Error> {
    let rows: Vec<(String, i64)> = sqlx::query_as(
        "SELECT stage, COUNT(*) FROM (
             SELECT DISTINCT ON (conversation_infobip_uuid)
                    COALESCE(event_subtype, 'unknown') AS stage
             FROM events
             WHERE event_type = $1 AND agent_infobip_uuid = $2
             ORDER BY conversation_infobip_uuid, datetime DESC, id DESC
         ) latest
         GROUP BY stage",
    )
    .bind(SALES_STAGE_CHANGE)
    .bind(agent_uuid)
    .fetch_all(pool)
    .await?;

    Ok(stage_metrics_from_counts(rows))
}

pub fn stage_metrics_from_counts(rows: Vec<(String, i64)>) -> SalesStageMetrics {
    let raw_stages: BTreeMap<String, i64> = rows.into_iter().collect();
    SalesStageMetrics {
        total_conversations: raw_stages.values().sum(),
        total_sales: raw_stages.get(CLOSED_WON).copied().unwrap_or(0),
        raw_stages,
    }
}

pub async fn followup_detections(
    pool: &PgPool,
    agent_uuid: &str,
) -> Result<Vec<FollowUpDetection>, sqlx::Error> {
    sqlx::query_as::<_, FollowUpDetection>(
        "SELECT agent_infobip_uuid AS agent_uuid, COUNT(*) AS count FROM events
         WHERE event_type = $1 AND agent_infobip_uuid = $2
         GROUP BY agent_infobip_uuid",
    )
    .bind(FOLLOW_UP_DETECTED)
    .bind(agent_uuid)
    .fetch_all(pool)
    .await
}

/// Events of one conversation, newest first.
pub async fn for_conversation(
    pool: &PgPool,
    conversation: &str,
) -> Result<Vec<Event>, sqlx::Error> {
    sqlx::query_as::<_, Event>(
        "SELECT id, event_type, event_subtype, datetime, dialogue, agent_infobip_uuid, json
         FROM events WHERE conversation_infobip_uuid = $1
         ORDER BY datetime DESC, id DESC",
    )
    .bind(conversation)
    .fetch_all(pool)
    .await
}
