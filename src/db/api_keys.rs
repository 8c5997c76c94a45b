use sqlx::PgPool;
use uuid::Uuid;

use crate::models::ApiKey;

pub async fn list_by_organization(
    pool: &PgPool,
    organization: Uuid,
) -> Result<Vec<ApiKey>, sqlx::Error> {
    sqlx::query_as::<_, ApiKey>(
        r#"SELECT * FROM "authorization" WHERE organization_uuid = $1 ORDER BY created_at DESC"#,
    )
    .bind(organization)
    .fetch_all(pool)
    .await
}

pub async fn first_for_organization(
    pool: &PgPool,
    organization: Uuid,
) -> Result<Option<ApiKey>, sqlx::Error> {
    sqlx::query_as::<_, ApiKey>(
        r#"SELECT * FROM "authorization" WHERE organization_uuid = $1 ORDER BY created_at LIMIT 1"#,
    )
    .bind(organization)
    .fetch_optional(pool)
    .await
}

pub async fn find(pool: &PgPool, uuid: Uuid) -> Result<Option<ApiKey>, sqlx::Error> {
    sqlx::query_as::<_, ApiKey>(r#"SELECT * FROM "authorization" WHERE uuid = $1"#)
        .bind(uuid)
        .fetch_optional(pool)
        .await
}

pub async fn create(
    pool: &PgPool,
    organization: Uuid,
    name: &str,
    apikey: &str,
) -> Result<ApiKey, sqlx::Error> {
    sqlx::query_as::<_, ApiKey>(
        r#"INSERT INTO "authorization" (uuid, apikey, organization_uuid, name, created_at)
           VALUES ($1, $2, $3, $4, now()) RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(apikey)
    .bind(organization)
    .bind(name)
    .fetch_one(pool)
    .await
}

pub async fn delete(pool: &PgPool, uuid: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query(r#"DELETE FROM "authorization" WHERE uuid = $1"#)
        .bind(uuid)
        .execute(pool)
        .await?;
    Ok(())
}

/// Random 32-byte key, hex encoded.
pub fn generate_key() -> String {
    let bytes: [u8; 32] = rand::random();
    hex::encode(bytes)
}
