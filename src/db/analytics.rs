use sqlx::PgPool;

use crate::models::AnalysisRecord;

/// Every analysis of one agent, oldest first.
pub async fn for_agent(
    pool: &PgPool,
    agent_uuid: &str,
) -> Result<Vec<AnalysisRecord>, sqlx::Error> {
    sqlx::query_as::<_, AnalysisRecord>(
        "SELECT uuid, conversation_uuid, analysis_type, result, alma_internal_organization, created_at, agent_uuid
         FROM analytics WHERE agent_uuid = $1 ORDER BY created_at",
    )
    .bind(agent_uuid)
    .fetch_all(pool)
    .await
}

/// Analyses of one type for a set of agents, oldest first.
pub async fn by_type_for_agents(
    pool: &PgPool,
    analysis_type: &str,
    agent_uuids: &[String],
) -> Result<Vec<AnalysisRecord>, sqlx::Error> {
    if agent_uuids.is_empty() {
        return Ok(Vec::new());
    }
    sqlx::query_as::<_, AnalysisRecord>(
        "SELECT uuid, conversation_uuid, analysis_type, result, alma_internal_organization, created_at, agent_uuid
         FROM analytics WHERE analysis_type = $1 AND agent_uuid = ANY($2)
         ORDER BY created_at",
    )
    .bind(analysis_type)
    .bind(agent_uuids)
    .fetch_all(pool)
    .await
}
