use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::db::models::VoicePresence;

/// Remember when a member entered voice, replacing any stale entry
pub async fn start(
    pool: &SqlitePool,
    guild_id: i64,
    user_id: i64,
    channel_id: i64,
    joined_at: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO voice_presence (user_id, guild_id, channel_id, joined_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT (user_id, guild_id)
        DO UPDATE SET channel_id = excluded.channel_id, joined_at = excluded.joined_at
        "#,
    )
    .bind(user_id)
    .bind(guild_id)
    .bind(channel_id)
    .bind(joined_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Remove and return the presence entry of a member
pub async fn take(
    pool: &SqlitePool,
    guild_id: i64,
    user_id: i64,
) -> Result<Option<VoicePresence>, sqlx::Error> {
    sqlx::query_as::<_, VoicePresence>(
        "DELETE FROM voice_presence WHERE guild_id = ? AND user_id = ? RETURNING *",
    )
    .bind(guild_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

/// Drop everything, used at startup when nobody's join time can be trusted
pub async fn clear(pool: &SqlitePool) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM voice_presence").execute(pool).await?;
    Ok(result.rows_affected())
}
