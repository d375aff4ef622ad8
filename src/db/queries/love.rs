use chrono::{DateTime, Utc};
use sqlx::{SqliteExecutor, SqlitePool};

use crate::db::models::{ActiveSession, Couple, LoveRoomAccess, VoiceSessionLog};

pub async fn insert_couple<'e, E: SqliteExecutor<'e>>(
    executor: E,
    guild_id: i64,
    user1_id: i64,
    user2_id: i64,
    now: DateTime<Utc>,
) -> Result<Couple, sqlx::Error> {
    sqlx::query_as::<_, Couple>(
        r#"
        INSERT INTO couples (guild_id, user1_id, user2_id, created_at)
        VALUES (?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(guild_id)
    .bind(user1_id)
    .bind(user2_id)
    .bind(now)
    .fetch_one(executor)
    .await
}

/// The couple a user belongs to, on either side
pub async fn couple_of<'e, E: SqliteExecutor<'e>>(
    executor: E,
    user_id: i64,
) -> Result<Option<Couple>, sqlx::Error> {
    sqlx::query_as::<_, Couple>("SELECT * FROM couples WHERE user1_id = ? OR user2_id = ?")
        .bind(user_id)
        .bind(user_id)
        .fetch_optional(executor)
        .await
}

pub async fn get_couple(pool: &SqlitePool, couple_id: i64) -> Result<Option<Couple>, sqlx::Error> {
    sqlx::query_as::<_, Couple>("SELECT * FROM couples WHERE id = ?")
        .bind(couple_id)
        .fetch_optional(pool)
        .await
}

pub async fn delete_couple(pool: &SqlitePool, couple_id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM couples WHERE id = ?")
        .bind(couple_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn set_description(
    pool: &SqlitePool,
    couple_id: i64,
    description: &str,
) -> Result<Option<Couple>, sqlx::Error> {
    sqlx::query_as::<_, Couple>("UPDATE couples SET description = ? WHERE id = ? RETURNING *")
        .bind(description)
        .bind(couple_id)
        .fetch_optional(pool)
        .await
}

pub async fn get_access<'e, E: SqliteExecutor<'e>>(
    executor: E,
    user_id: i64,
) -> Result<Option<LoveRoomAccess>, sqlx::Error> {
    sqlx::query_as::<_, LoveRoomAccess>("SELECT * FROM love_room_access WHERE user_id = ?")
        .bind(user_id)
        .fetch_optional(executor)
        .await
}

pub async fn upsert_access<'e, E: SqliteExecutor<'e>>(
    executor: E,
    guild_id: i64,
    user_id: i64,
    expires_at: DateTime<Utc>,
    last_payment: DateTime<Utc>,
) -> Result<LoveRoomAccess, sqlx::Error> {
    sqlx::query_as::<_, LoveRoomAccess>(
        r#"
        INSERT INTO love_room_access (user_id, guild_id, expires_at, last_payment)
        VALUES (?, ?, ?, ?)
        ON CONFLICT (user_id) DO UPDATE SET
            expires_at = excluded.expires_at,
            last_payment = excluded.last_payment
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(guild_id)
    .bind(expires_at)
    .bind(last_payment)
    .fetch_one(executor)
    .await
}

pub async fn delete_expired_access(
    pool: &SqlitePool,
    now: DateTime<Utc>,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM love_room_access WHERE expires_at <= ?")
        .bind(now)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

pub async fn delete_access(pool: &SqlitePool, user_id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM love_room_access WHERE user_id = ?")
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Access rows last paid at or before `paid_before` that run out by `expiring_before`
pub async fn list_access_due(
    pool: &SqlitePool,
    paid_before: DateTime<Utc>,
    expiring_before: DateTime<Utc>,
) -> Result<Vec<LoveRoomAccess>, sqlx::Error> {
    sqlx::query_as::<_, LoveRoomAccess>(
        r#"
        SELECT * FROM love_room_access
        WHERE last_payment <= ? AND expires_at <= ?
        ORDER BY last_payment ASC
        "#,
    )
    .bind(paid_before)
    .bind(expiring_before)
    .fetch_all(pool)
    .await
}

/// Start a session. False when the couple already has one running.
pub async fn start_session<'e, E: SqliteExecutor<'e>>(
    executor: E,
    couple_id: i64,
    channel_id: i64,
    now: DateTime<Utc>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO active_sessions (couple_id, channel_id, started_at)
        VALUES (?, ?, ?)
        ON CONFLICT (couple_id) DO NOTHING
        "#,
    )
    .bind(couple_id)
    .bind(channel_id)
    .bind(now)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn get_session(
    pool: &SqlitePool,
    couple_id: i64,
) -> Result<Option<ActiveSession>, sqlx::Error> {
    sqlx::query_as::<_, ActiveSession>("SELECT * FROM active_sessions WHERE couple_id = ?")
        .bind(couple_id)
        .fetch_optional(pool)
        .await
}

/// Remove and return the running session of a couple
pub async fn take_session<'e, E: SqliteExecutor<'e>>(
    executor: E,
    couple_id: i64,
) -> Result<Option<ActiveSession>, sqlx::Error> {
    sqlx::query_as::<_, ActiveSession>(
        "DELETE FROM active_sessions WHERE couple_id = ? RETURNING *",
    )
    .bind(couple_id)
    .fetch_optional(executor)
    .await
}

pub async fn list_sessions_started_before(
    pool: &SqlitePool,
    cutoff: DateTime<Utc>,
) -> Result<Vec<ActiveSession>, sqlx::Error> {
    sqlx::query_as::<_, ActiveSession>("SELECT * FROM active_sessions WHERE started_at <= ?")
        .bind(cutoff)
        .fetch_all(pool)
        .await
}

pub async fn restart_session<'e, E: SqliteExecutor<'e>>(
    executor: E,
    couple_id: i64,
    now: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE active_sessions SET started_at = ? WHERE couple_id = ?")
        .bind(now)
        .bind(couple_id)
        .execute(executor)
        .await?;

    Ok(())
}

pub async fn delete_sessions_started_before(
    pool: &SqlitePool,
    cutoff: DateTime<Utc>,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM active_sessions WHERE started_at < ?")
        .bind(cutoff)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

/// Forget every running session without logging it
pub async fn clear_sessions(pool: &SqlitePool) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM active_sessions")
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

pub async fn log_session<'e, E: SqliteExecutor<'e>>(
    executor: E,
    couple_id: i64,
    channel_id: i64,
    started_at: DateTime<Utc>,
    ended_at: DateTime<Utc>,
    duration_seconds: i64,
) -> Result<VoiceSessionLog, sqlx::Error> {
    sqlx::query_as::<_, VoiceSessionLog>(
        r#"
        INSERT INTO voice_sessions (couple_id, channel_id, started_at, ended_at, duration_seconds)
        VALUES (?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(couple_id)
    .bind(channel_id)
    .bind(started_at)
    .bind(ended_at)
    .bind(duration_seconds)
    .fetch_one(executor)
    .await
}

pub async fn total_seconds(pool: &SqlitePool, couple_id: i64) -> Result<i64, sqlx::Error> {
    let row: (i64,) = sqlx::query_as(
        "SELECT COALESCE(SUM(duration_seconds), 0) FROM voice_sessions WHERE couple_id = ?",
    )
    .bind(couple_id)
    .fetch_one(pool)
    .await?;

    Ok(row.0)
}
