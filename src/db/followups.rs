use sqlx::PgPool;

use crate::models::{FollowUpTask, TrackedLink};

pub async fn tasks_for_agent(
    pool: &PgPool,
    agent_uuid: &str,
) -> Result<Vec<FollowUpTask>, sqlx::Error> {
    sqlx::query_as::<_, FollowUpTask>(
        "SELECT event_uuid, conversation_uuid, agent_uuid, score, follow_up_date::timestamptz AS follow_up_date
         FROM follow_up WHERE agent_uuid = $1
         ORDER BY follow_up_date, score DESC",
    )
    .bind(agent_uuid)
    .fetch_all(pool)
    .await
}

pub async fn links_for_seller(
    pool: &PgPool,
    seller_id: &str,
) -> Result<Vec<TrackedLink>, sqlx::Error> {
    sqlx::query_as::<_, TrackedLink>(
        "SELECT slug, original_url, seller_id FROM link_tracking WHERE seller_id = $1",
    )
    .bind(seller_id)
    .fetch_all(pool)
    .await
}

pub async fn find_link(
    pool: &PgPool,
    original_url: &str,
    seller_id: &str,
) -> Result<Option<TrackedLink>, sqlx::Error> {
    sqlx::query_as::<_, TrackedLink>(
        "SELECT slug, original_url, seller_id FROM link_tracking
         WHERE original_url = $1 AND seller_id = $2 LIMIT 1",
    )
    .bind(original_url)
    .bind(seller_id)
    .fetch_optional(pool)
    .await
}

pub async fn insert_link(
    pool: &PgPool,
    slug: &str,
    original_url: &str,
    seller_id: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO link_tracking (slug, original_url, seller_id) VALUES ($1, $2, $3)")
        .bind(slug)
        .bind(original_url)
        .bind(seller_id)
        .execute(pool)
        .await?;
    Ok(())
}
