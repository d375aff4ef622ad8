use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::db::models::{ActiveMute, PunishmentKind};

/// Save a timed sanction, replacing the end time of an existing one of the same kind
pub async fn upsert(
    pool: &SqlitePool,
    guild_id: i64,
    user_id: i64,
    kind: PunishmentKind,
    ends_at: DateTime<Utc>,
) -> Result<ActiveMute, sqlx::Error> {
    sqlx::query_as::<_, ActiveMute>(
        r#"
        INSERT INTO active_mutes (user_id, guild_id, kind, ends_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT (user_id, guild_id, kind)
        DO UPDATE SET ends_at = excluded.ends_at
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(guild_id)
    .bind(kind)
    .bind(ends_at)
    .fetch_one(pool)
    .await
}

pub async fn get(
    pool: &SqlitePool,
    guild_id: i64,
    user_id: i64,
    kind: PunishmentKind,
) -> Result<Option<ActiveMute>, sqlx::Error> {
    sqlx::query_as::<_, ActiveMute>(
        "SELECT * FROM active_mutes WHERE guild_id = ? AND user_id = ? AND kind = ?",
    )
    .bind(guild_id)
    .bind(user_id)
    .bind(kind)
    .fetch_optional(pool)
    .await
}

pub async fn list_for_user(
    pool: &SqlitePool,
    guild_id: i64,
    user_id: i64,
) -> Result<Vec<ActiveMute>, sqlx::Error> {
    sqlx::query_as::<_, ActiveMute>(
        "SELECT * FROM active_mutes WHERE guild_id = ? AND user_id = ? ORDER BY ends_at ASC",
    )
    .bind(guild_id)
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub async fn list_expired(
    pool: &SqlitePool,
    now: DateTime<Utc>,
) -> Result<Vec<ActiveMute>, sqlx::Error> {
    sqlx::query_as::<_, ActiveMute>(
        "SELECT * FROM active_mutes WHERE ends_at <= ? ORDER BY ends_at ASC",
    )
    .bind(now)
    .fetch_all(pool)
    .await
}

pub async fn delete(
    pool: &SqlitePool,
    guild_id: i64,
    user_id: i64,
    kind: PunishmentKind,
) -> Result<bool, sqlx::Error> {
    let result =
        sqlx::query("DELETE FROM active_mutes WHERE guild_id = ? AND user_id = ? AND kind = ?")
            .bind(guild_id)
            .bind(user_id)
            .bind(kind)
            .execute(pool)
            .await?;

    Ok(result.rows_affected() > 0)
}
