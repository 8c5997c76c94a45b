use sqlx::PgPool;
use uuid::Uuid;

use crate::models::Team;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TeamWithCount {
    #[sqlx(flatten)]
    pub team: Team,
    pub member_count: i64,
}

pub async fn create<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    name: &str,
    description: Option<&str>,
    organization: Option<&str>,
) -> Result<Team, sqlx::Error> {
    sqlx::query_as::<_, Team>(
        "INSERT INTO teams (name, description, alma_internal_organization)
         VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(name)
    .bind(description)
    .bind(organization)
    .fetch_one(executor)
    .await
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Team>, sqlx::Error> {
    sqlx::query_as::<_, Team>("SELECT * FROM teams WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Teams of one organization, or all teams when `organization` is `None`.
pub async fn list(pool: &PgPool, organization: Option<&str>) -> Result<Vec<Team>, sqlx::Error> {
    sqlx::query_as::<_, Team>(
        "SELECT * FROM teams WHERE ($1::text IS NULL OR alma_internal_organization = $1)
         ORDER BY name",
    )
    .bind(organization)
    .fetch_all(pool)
    .await
}

/// Like [`list`], with the number of members per team. `only` narrows the
/// result to a single team.
pub async fn list_with_counts(
    pool: &PgPool,
    organization: Option<&str>,
    only: Option<Uuid>,
) -> Result<Vec<TeamWithCount>, sqlx::Error> {
    sqlx::query_as::<_, TeamWithCount>(
        "SELECT t.*, (SELECT COUNT(*) FROM user_profiles p WHERE p.team_id = t.id) AS member_count
         FROM teams t
         WHERE ($1::text IS NULL OR t.alma_internal_organization = $1)
           AND ($2::uuid IS NULL OR t.id = $2)
         ORDER BY t.name",
    )
    .bind(organization)
    .bind(only)
    .fetch_all(pool)
    .await
}

pub async fn count_by_organization(pool: &PgPool, organization: &str) -> Result<i64, sqlx::Error> {
    let row: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM teams WHERE alma_internal_organization = $1")
            .bind(organization)
            .fetch_one(pool)
            .await?;
    Ok(row.0)
}

pub async fn update(
    pool: &PgPool,
    id: Uuid,
    name: &str,
    description: Option<&str>,
    organization: Option<&str>,
) -> Result<Team, sqlx::Error> {
    sqlx::query_as::<_, Team>(
        "UPDATE teams SET name = $2, description = $3, alma_internal_organization = $4, updated_at = now()
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(name)
    .bind(description)
    .bind(organization)
    .fetch_one(pool)
    .await
}

/// Members are detached by the `ON DELETE SET NULL` foreign key.
pub async fn delete(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM teams WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Lock team rows for the rest of the transaction, in id order.
pub async fn lock<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    ids: &[Uuid],
) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT id FROM teams WHERE id = ANY($1) ORDER BY id FOR UPDATE")
        .bind(ids)
        .fetch_all(executor)
        .await?;
    Ok(())
}
