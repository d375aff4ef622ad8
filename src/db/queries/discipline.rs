use chrono::{DateTime, Utc};
use sqlx::SqliteExecutor;

use crate::db::models::{PunishmentKind, PunishmentRecord};

#[allow(clippy::too_many_arguments)]
pub async fn insert<'e, E: SqliteExecutor<'e>>(
    executor: E,
    guild_id: i64,
    user_id: i64,
    moderator_id: i64,
    kind: PunishmentKind,
    reason: &str,
    issued_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
) -> Result<PunishmentRecord, sqlx::Error> {
    sqlx::query_as::<_, PunishmentRecord>(
        r#"
        INSERT INTO punishments (user_id, guild_id, moderator_id, kind, reason, issued_at, expires_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(guild_id)
    .bind(moderator_id)
    .bind(kind)
    .bind(reason)
    .bind(issued_at)
    .bind(expires_at)
    .fetch_one(executor)
    .await
}

/// Count records of `kind` that have not expired as of `now`
pub async fn count_active<'e, E: SqliteExecutor<'e>>(
    executor: E,
    guild_id: i64,
    user_id: i64,
    kind: PunishmentKind,
    now: DateTime<Utc>,
) -> Result<i64, sqlx::Error> {
    let row: (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*) FROM punishments
        WHERE guild_id = ? AND user_id = ? AND kind = ?
        AND (expires_at IS NULL OR expires_at > ?)
        "#,
    )
    .bind(guild_id)
    .bind(user_id)
    .bind(kind)
    .bind(now)
    .fetch_one(executor)
    .await?;

    Ok(row.0)
}

/// Delete up to `limit` of the oldest active records of `kind`.
/// Oldest is the earliest `issued_at`, ties broken by id.
pub async fn delete_oldest_active<'e, E: SqliteExecutor<'e>>(
    executor: E,
    guild_id: i64,
    user_id: i64,
    kind: PunishmentKind,
    limit: i64,
    now: DateTime<Utc>,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        DELETE FROM punishments
        WHERE id IN (
            SELECT id FROM punishments
            WHERE guild_id = ? AND user_id = ? AND kind = ?
            AND (expires_at IS NULL OR expires_at > ?)
            ORDER BY issued_at ASC, id ASC
            LIMIT ?
        )
        "#,
    )
    .bind(guild_id)
    .bind(user_id)
    .bind(kind)
    .bind(now)
    .bind(limit)
    .execute(executor)
    .await?;

    Ok(result.rows_affected())
}

/// Delete every warning and strike whose expiry is at or before `now`
pub async fn delete_expired<'e, E: SqliteExecutor<'e>>(
    executor: E,
    now: DateTime<Utc>,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        DELETE FROM punishments
        WHERE kind IN ('warning', 'strike')
        AND expires_at IS NOT NULL
        AND expires_at <= ?
        "#,
    )
    .bind(now)
    .execute(executor)
    .await?;

    Ok(result.rows_affected())
}

/// Number of mutes and bans ever recorded for a member
pub async fn count_timed<'e, E: SqliteExecutor<'e>>(
    executor: E,
    guild_id: i64,
    user_id: i64,
) -> Result<i64, sqlx::Error> {
    let row: (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*) FROM punishments
        WHERE guild_id = ? AND user_id = ?
        AND kind IN ('text_mute', 'voice_mute', 'ban')
        "#,
    )
    .bind(guild_id)
    .bind(user_id)
    .fetch_one(executor)
    .await?;

    Ok(row.0)
}

/// One page of a member's history, newest first
pub async fn history<'e, E: SqliteExecutor<'e>>(
    executor: E,
    guild_id: i64,
    user_id: i64,
    limit: i64,
    offset: i64,
) -> Result<Vec<PunishmentRecord>, sqlx::Error> {
    sqlx::query_as::<_, PunishmentRecord>(
        r#"
        SELECT * FROM punishments
        WHERE guild_id = ? AND user_id = ?
        ORDER BY issued_at DESC, id DESC
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(guild_id)
    .bind(user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(executor)
    .await
}

pub async fn count_history<'e, E: SqliteExecutor<'e>>(
    executor: E,
    guild_id: i64,
    user_id: i64,
) -> Result<i64, sqlx::Error> {
    let row: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM punishments WHERE guild_id = ? AND user_id = ?")
            .bind(guild_id)
            .bind(user_id)
            .fetch_one(executor)
            .await?;

    Ok(row.0)
}
