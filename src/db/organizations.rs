use sqlx::PgPool;
use uuid::Uuid;

use crate::models::Organization;

pub async fn list(pool: &PgPool) -> Result<Vec<Organization>, sqlx::Error> {
    sqlx::query_as::<_, Organization>("SELECT * FROM organizations ORDER BY name")
        .fetch_all(pool)
        .await
}

pub async fn find(pool: &PgPool, uuid: Uuid) -> Result<Option<Organization>, sqlx::Error> {
    sqlx::query_as::<_, Organization>("SELECT * FROM organizations WHERE uuid = $1")
        .bind(uuid)
        .fetch_optional(pool)
        .await
}

/// Whether `organization` names an existing organization. Non-UUID strings never do.
pub async fn exists(pool: &PgPool, organization: &str) -> Result<bool, sqlx::Error> {
    let Ok(uuid) = organization.parse::<Uuid>() else {
        return Ok(false);
    };
    let row: (bool,) = sqlx::query_as("SELECT EXISTS (SELECT 1 FROM organizations WHERE uuid = $1)")
        .bind(uuid)
        .fetch_one(pool)
        .await?;
    Ok(row.0)
}

pub async fn create(
    pool: &PgPool,
    name: &str,
    meta_data: serde_json::Value,
) -> Result<Organization, sqlx::Error> {
    sqlx::query_as::<_, Organization>(
        "INSERT INTO organizations (uuid, name, active, meta_data, created_at, updated_at)
         VALUES ($1, $2, TRUE, $3, now(), now()) RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .bind(meta_data)
    .fetch_one(pool)
    .await
}

pub async fn delete(pool: &PgPool, uuid: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM organizations WHERE uuid = $1")
        .bind(uuid)
        .execute(pool)
        .await?;
    Ok(())
}
