use sqlx::PgPool;
use uuid::Uuid;

use crate::models::User;

pub async fn create<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    username: &str,
    email: &str,
    first_name: &str,
    last_name: &str,
    password_hash: Option<&str>,
) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "INSERT INTO users (username, email, first_name, last_name, password_hash)
         VALUES ($1, $2, $3, $4, $5) RETURNING *",
    )
    .bind(username)
    .bind(email)
    .bind(first_name)
    .bind(last_name)
    .bind(password_hash)
    .fetch_one(executor)
    .await
}

pub async fn find_by_username(pool: &PgPool, username: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
        .bind(username)
        .fetch_optional(pool)
        .await
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn username_exists(pool: &PgPool, username: &str) -> Result<bool, sqlx::Error> {
    let row: (bool,) = sqlx::query_as("SELECT EXISTS (SELECT 1 FROM users WHERE username = $1)")
        .bind(username)
        .fetch_one(pool)
        .await?;
    Ok(row.0)
}

/// Get or create the built-in admin user. Its password lives in configuration,
/// so the stored hash is always NULL.
pub async fn get_or_create_admin(pool: &PgPool, username: &str) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "INSERT INTO users (username, password_hash) VALUES ($1, NULL)
         ON CONFLICT (username) DO UPDATE SET is_active = TRUE
         RETURNING *",
    )
    .bind(username)
    .fetch_one(pool)
    .await
}

pub async fn update_details<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    id: Uuid,
    first_name: &str,
    last_name: &str,
    email: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET first_name = $2, last_name = $3, email = $4 WHERE id = $1")
        .bind(id)
        .bind(first_name)
        .bind(last_name)
        .bind(email)
        .execute(executor)
        .await?;
    Ok(())
}
