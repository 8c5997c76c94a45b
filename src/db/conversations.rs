use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{Conversation, Message};

pub const PAGE_SIZE: i64 = 20;

/// Conversation list filters. Empty strings are ignored.
#[derive(Debug, Clone, Default)]
pub struct ConversationFilter {
    pub seller_id: Option<String>,
    pub sales_stage: Option<String>,
    pub tag: Option<String>,
    pub search: Option<String>,
}

impl ConversationFilter {
    fn normalized(value: &Option<String>) -> Option<&str> {
        value.as_deref().map(str::trim).filter(|v| !v.is_empty())
    }
}

const FILTER_WHERE: &str = "($1::text IS NULL OR alma_internal_organization = $1)
       AND ($2::text IS NULL OR $2 = ANY(agents))
       AND ($3::text IS NULL OR metadata->>'sales_stage' ILIKE '%' || $3 || '%')
       AND ($4::text IS NULL
            OR EXISTS (
                SELECT 1 FROM jsonb_array_elements_text(
                    CASE WHEN jsonb_typeof(metadata->'tags') = 'array'
                         THEN metadata->'tags' ELSE '[]'::jsonb END) AS t(tag)
                WHERE t.tag ILIKE '%' || $4 || '%')
            OR (jsonb_typeof(metadata->'tags') = 'string' AND metadata->>'tags' ILIKE '%' || $4 || '%'))
       AND ($5::text IS NULL
            OR metadata->>'client_name' ILIKE '%' || $5 || '%'
            OR metadata->>'client_email' ILIKE '%' || $5 || '%'
            OR chat_id ILIKE '%' || $5 || '%')";

/// Row offset of a 1-based page. Pages past the end saturate instead of overflowing.
pub fn page_offset(page: i64) -> i64 {
    page.max(1).saturating_sub(1).saturating_mul(PAGE_SIZE)
}

/// One page of conversations (1-based), newest first, plus the total match count.
pub async fn list(
    pool: &PgPool,
    organization: Option<&str>,
    filter: &ConversationFilter,
    page: i64,
) -> Result<(Vec<Conversation>, i64), sqlx::Error> {
    let seller = ConversationFilter::normalized(&filter.seller_id);
    let stage = ConversationFilter::normalized(&filter.sales_stage);
    let tag = ConversationFilter::normalized(&filter.tag);
    let search = ConversationFilter::normalized(&filter.search);

    let count_sql = format!("SELECT COUNT(*) FROM conversations WHERE {FILTER_WHERE}");
    let total: (i64,) = sqlx::query_as(&count_sql)
        .bind(organization)
        .bind(seller)
        .bind(stage)
        .bind(tag)
        .bind(search)
        .fetch_one(pool)
        .await?;

    let offset = page_offset(page);
    let list_sql = format!(
        "SELECT * FROM conversations WHERE {FILTER_WHERE}
         ORDER BY last_update DESC LIMIT $6 OFFSET $7"
    );
    let rows = sqlx::query_as::<_, Conversation>(&list_sql)
        .bind(organization)
        .bind(seller)
        .bind(stage)
        .bind(tag)
        .bind(search)
        .bind(PAGE_SIZE)
        .bind(offset)
        .fetch_all(pool)
        .await?;

    Ok((rows, total.0))
}

/// Conversation by UUID, or by chat id when `key` is not a UUID.
pub async fn find(pool: &PgPool, key: &str) -> Result<Option<Conversation>, sqlx::Error> {
    match key.parse::<Uuid>() {
        Ok(id) => {
            sqlx::query_as::<_, Conversation>(
                "SELECT * FROM conversations WHERE id = $1 OR chat_id = $2",
            )
            .bind(id)
            .bind(key)
            .fetch_optional(pool)
            .await
        }
        Err(_) => {
            sqlx::query_as::<_, Conversation>("SELECT * FROM conversations WHERE chat_id = $1")
                .bind(key)
                .fetch_optional(pool)
                .await
        }
    }
}

pub async fn messages(pool: &PgPool, conversation_id: Uuid) -> Result<Vec<Message>, sqlx::Error> {
    sqlx::query_as::<_, Message>(
        "SELECT * FROM messages WHERE conversation_id = $1 ORDER BY sent_at",
    )
    .bind(conversation_id)
    .fetch_all(pool)
    .await
}

/// Distinct sellers, tags and sales stages across the tenant's conversations.
#[derive(Debug, Clone, Default)]
pub struct FilterOptions {
    pub sellers: Vec<String>,
    pub tags: Vec<String>,
    pub sales_stages: Vec<String>,
}

pub async fn filter_options(
    pool: &PgPool,
    organization: Option<&str>,
) -> Result<FilterOptions, sqlx::Error> {
    let sellers: Vec<(String,)> = sqlx::query_as(
        "SELECT DISTINCT agent FROM conversations, unnest(agents) AS agent
         WHERE ($1::text IS NULL OR alma_internal_organization = $1) AND agent <> ''
         ORDER BY agent",
    )
    .bind(organization)
    .fetch_all(pool)
    .await?;

    let raw_tags: Vec<(serde_json::Value,)> = sqlx::query_as(
        "SELECT metadata->'tags' FROM conversations
         WHERE ($1::text IS NULL OR alma_internal_organization = $1) AND metadata->'tags' IS NOT NULL",
    )
    .bind(organization)
    .fetch_all(pool)
    .await?;

    let stages: Vec<(String,)> = sqlx::query_as(
        "SELECT DISTINCT metadata->>'sales_stage' AS stage FROM conversations
         WHERE ($1::text IS NULL OR alma_internal_organization = $1)
           AND COALESCE(metadata->>'sales_stage', '') <> ''
         ORDER BY stage",
    )
    .bind(organization)
    .fetch_all(pool)
    .await?;

    let mut tags: Vec<String> = raw_tags
        .iter()
        .flat_map(|(value,)| crate::models::conversation::normalize_tags(Some(value)))
        .collect();
    tags.sort();
    tags.dedup();

    Ok(FilterOptions {
        sellers: sellers.into_iter().map(|(s,)| s).collect(),
        tags,
        sales_stages: stages.into_iter().map(|(s,)| s).collect(),
    })
}
