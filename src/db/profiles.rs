use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::policy::Visibility;
use crate::models::{Member, Role, UserProfile};

const MEMBER_SELECT: &str = "SELECT p.id, p.user_id, p.role, p.team_id, t.name AS team_name,
        p.external_uuid, p.alma_internal_uuid, p.alma_internal_organization, p.cell_phone,
        u.username, u.email, u.first_name, u.last_name, u.is_active, p.created_at
    FROM user_profiles p
    JOIN users u ON u.id = p.user_id
    LEFT JOIN teams t ON t.id = p.team_id";

pub struct NewProfile<'a> {
    pub user_id: Uuid,
    pub role: Role,
    pub team_id: Option<Uuid>,
    pub organization: Option<&'a str>,
    pub external_uuid: Option<&'a str>,
    pub cell_phone: Option<&'a str>,
}

pub async fn create<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    profile: &NewProfile<'_>,
) -> Result<UserProfile, sqlx::Error> {
    sqlx::query_as::<_, UserProfile>(
        "INSERT INTO user_profiles (user_id, role, team_id, alma_internal_organization, external_uuid, cell_phone)
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
    )
    .bind(profile.user_id)
    .bind(profile.role.as_str())
    .bind(profile.team_id)
    .bind(profile.organization)
    .bind(profile.external_uuid)
    .bind(profile.cell_phone)
    .fetch_one(executor)
    .await
}

/// Profile for `user_id`, created with the default role when missing.
pub async fn ensure_for_user(pool: &PgPool, user_id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO user_profiles (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING")
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn set_role_for_user(
    pool: &PgPool,
    user_id: Uuid,
    role: Role,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO user_profiles (user_id, role) VALUES ($1, $2)
         ON CONFLICT (user_id) DO UPDATE SET role = EXCLUDED.role, updated_at = now()",
    )
    .bind(user_id)
    .bind(role.as_str())
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn find_member_by_user(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Option<Member>, sqlx::Error> {
    let sql = format!("{MEMBER_SELECT} WHERE p.user_id = $1");
    sqlx::query_as::<_, Member>(&sql)
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

pub async fn find_member(pool: &PgPool, id: Uuid) -> Result<Option<Member>, sqlx::Error> {
    let sql = format!("{MEMBER_SELECT} WHERE p.id = $1");
    sqlx::query_as::<_, Member>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn list_visible(
    pool: &PgPool,
    visibility: &Visibility,
) -> Result<Vec<Member>, sqlx::Error> {
    let (organization, team_id, profile_id): (Option<&str>, Option<Uuid>, Option<Uuid>) =
        match visibility {
            Visibility::Everyone => (None, None, None),
            Visibility::Tenant(org) => (Some(org), None, None),
            Visibility::Team(team) => (None, Some(*team), None),
            Visibility::OnlySelf(id) => (None, None, Some(*id)),
        };

    let sql = format!(
        "{MEMBER_SELECT}
         WHERE ($1::text IS NULL OR p.alma_internal_organization = $1)
           AND ($2::uuid IS NULL OR p.team_id = $2)
           AND ($3::uuid IS NULL OR p.id = $3)
         ORDER BY u.username"
    );
    sqlx::query_as::<_, Member>(&sql)
        .bind(organization)
        .bind(team_id)
        .bind(profile_id)
        .fetch_all(pool)
        .await
}

pub async fn list_by_team(pool: &PgPool, team_id: Uuid) -> Result<Vec<Member>, sqlx::Error> {
    let sql = format!("{MEMBER_SELECT} WHERE p.team_id = $1 ORDER BY u.username");
    sqlx::query_as::<_, Member>(&sql)
        .bind(team_id)
        .fetch_all(pool)
        .await
}

pub async fn list_by_organization(
    pool: &PgPool,
    organization: &str,
) -> Result<Vec<Member>, sqlx::Error> {
    let sql =
        format!("{MEMBER_SELECT} WHERE p.alma_internal_organization = $1 ORDER BY u.username");
    sqlx::query_as::<_, Member>(&sql)
        .bind(organization)
        .fetch_all(pool)
        .await
}

pub async fn count_by_organization(pool: &PgPool, organization: &str) -> Result<i64, sqlx::Error> {
    let row: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM user_profiles WHERE alma_internal_organization = $1")
            .bind(organization)
            .fetch_one(pool)
            .await?;
    Ok(row.0)
}

/// Roles of a team's members, excluding one profile.
pub async fn other_member_roles<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    team_id: Uuid,
    excluding: Uuid,
) -> Result<Vec<Role>, sqlx::Error> {
    let rows: Vec<(String,)> =
        sqlx::query_as("SELECT role FROM user_profiles WHERE team_id = $1 AND id <> $2")
            .bind(team_id)
            .bind(excluding)
            .fetch_all(executor)
            .await?;

    rows.into_iter()
        .map(|(role,)| role.parse::<Role>().map_err(|e| sqlx::Error::Decode(e.into())))
        .collect()
}

pub async fn update_assignment<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    id: Uuid,
    team_id: Option<Uuid>,
    role: Role,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE user_profiles SET team_id = $2, role = $3, updated_at = now() WHERE id = $1",
    )
    .bind(id)
    .bind(team_id)
    .bind(role.as_str())
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn update_details<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    id: Uuid,
    external_uuid: Option<&str>,
    cell_phone: Option<&str>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE user_profiles SET external_uuid = $2, cell_phone = $3, updated_at = now() WHERE id = $1",
    )
    .bind(id)
    .bind(external_uuid)
    .bind(cell_phone)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn update_internal_fields<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    id: Uuid,
    alma_internal_uuid: Option<&str>,
    organization: Option<&str>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE user_profiles SET alma_internal_uuid = $2, alma_internal_organization = $3, updated_at = now()
         WHERE id = $1",
    )
    .bind(id)
    .bind(alma_internal_uuid)
    .bind(organization)
    .execute(executor)
    .await?;
    Ok(())
}

/// (external UUID, e-mail) pairs for every profile with an external UUID.
pub async fn external_uuid_emails(pool: &PgPool) -> Result<Vec<(String, String)>, sqlx::Error> {
    sqlx::query_as(
        "SELECT p.external_uuid, u.email FROM user_profiles p JOIN users u ON u.id = p.user_id
         WHERE p.external_uuid IS NOT NULL AND p.external_uuid <> ''",
    )
    .fetch_all(pool)
    .await
}
