use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::db::models::TempRole;

/// Grant or extend a temporary role
pub async fn upsert(
    pool: &SqlitePool,
    guild_id: i64,
    user_id: i64,
    role_id: i64,
    expires_at: DateTime<Utc>,
) -> Result<TempRole, sqlx::Error> {
    sqlx::query_as::<_, TempRole>(
        r#"
        INSERT INTO temp_roles (user_id, guild_id, role_id, expires_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT (user_id, guild_id, role_id)
        DO UPDATE SET expires_at = excluded.expires_at
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(guild_id)
    .bind(role_id)
    .bind(expires_at)
    .fetch_one(pool)
    .await
}

pub async fn list_expired(
    pool: &SqlitePool,
    now: DateTime<Utc>,
) -> Result<Vec<TempRole>, sqlx::Error> {
    sqlx::query_as::<_, TempRole>(
        "SELECT * FROM temp_roles WHERE expires_at <= ? ORDER BY expires_at ASC",
    )
    .bind(now)
    .fetch_all(pool)
    .await
}

pub async fn list_for_user(
    pool: &SqlitePool,
    guild_id: i64,
    user_id: i64,
) -> Result<Vec<TempRole>, sqlx::Error> {
    sqlx::query_as::<_, TempRole>(
        "SELECT * FROM temp_roles WHERE guild_id = ? AND user_id = ? ORDER BY expires_at ASC",
    )
    .bind(guild_id)
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub async fn delete(
    pool: &SqlitePool,
    guild_id: i64,
    user_id: i64,
    role_id: i64,
) -> Result<bool, sqlx::Error> {
    let result =
        sqlx::query("DELETE FROM temp_roles WHERE guild_id = ? AND user_id = ? AND role_id = ?")
            .bind(guild_id)
            .bind(user_id)
            .bind(role_id)
            .execute(pool)
            .await?;

    Ok(result.rows_affected() > 0)
}
