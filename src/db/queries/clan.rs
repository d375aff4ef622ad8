use chrono::{DateTime, Utc};
use sqlx::{SqliteExecutor, SqlitePool};

use crate::db::models::{Clan, ClanMember, ClanRole};

/// Clan name with its member count, for the clan leaderboard
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ClanStanding {
    pub id: i64,
    pub name: String,
    pub emoji: String,
    pub owner_id: i64,
    pub member_count: i64,
}

pub async fn insert<'e, E: SqliteExecutor<'e>>(
    executor: E,
    guild_id: i64,
    name: &str,
    owner_id: i64,
    max_members: i64,
    now: DateTime<Utc>,
) -> Result<Clan, sqlx::Error> {
    sqlx::query_as::<_, Clan>(
        r#"
        INSERT INTO clans (guild_id, name, owner_id, max_members, created_at, last_payment)
        VALUES (?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(guild_id)
    .bind(name)
    .bind(owner_id)
    .bind(max_members)
    .bind(now)
    .bind(now)
    .fetch_one(executor)
    .await
}

/// Whether any clan, active or not, already uses this name (case-insensitive)
pub async fn name_taken<'e, E: SqliteExecutor<'e>>(
    executor: E,
    name: &str,
) -> Result<bool, sqlx::Error> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM clans WHERE name = ? COLLATE NOCASE")
        .bind(name)
        .fetch_one(executor)
        .await?;

    Ok(row.0 > 0)
}

pub async fn get_by_id<'e, E: SqliteExecutor<'e>>(
    executor: E,
    clan_id: i64,
) -> Result<Option<Clan>, sqlx::Error> {
    sqlx::query_as::<_, Clan>("SELECT * FROM clans WHERE id = ? AND is_active = 1")
        .bind(clan_id)
        .fetch_optional(executor)
        .await
}

pub async fn get_by_name(pool: &SqlitePool, name: &str) -> Result<Option<Clan>, sqlx::Error> {
    sqlx::query_as::<_, Clan>(
        "SELECT * FROM clans WHERE name = ? COLLATE NOCASE AND is_active = 1",
    )
    .bind(name)
    .fetch_optional(pool)
    .await
}

/// The active clan a user belongs to
pub async fn clan_of<'e, E: SqliteExecutor<'e>>(
    executor: E,
    user_id: i64,
) -> Result<Option<Clan>, sqlx::Error> {
    sqlx::query_as::<_, Clan>(
        r#"
        SELECT c.* FROM clans c
        JOIN clan_members m ON m.clan_id = c.id
        WHERE m.user_id = ? AND c.is_active = 1
        LIMIT 1
        "#,
    )
    .bind(user_id)
    .fetch_optional(executor)
    .await
}

pub async fn members(pool: &SqlitePool, clan_id: i64) -> Result<Vec<ClanMember>, sqlx::Error> {
    sqlx::query_as::<_, ClanMember>(
        r#"
        SELECT * FROM clan_members WHERE clan_id = ?
        ORDER BY CASE role WHEN 'owner' THEN 0 WHEN 'officer' THEN 1 ELSE 2 END, joined_at ASC
        "#,
    )
    .bind(clan_id)
    .fetch_all(pool)
    .await
}

pub async fn member_count<'e, E: SqliteExecutor<'e>>(
    executor: E,
    clan_id: i64,
) -> Result<i64, sqlx::Error> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM clan_members WHERE clan_id = ?")
        .bind(clan_id)
        .fetch_one(executor)
        .await?;

    Ok(row.0)
}

pub async fn member_role<'e, E: SqliteExecutor<'e>>(
    executor: E,
    clan_id: i64,
    user_id: i64,
) -> Result<Option<ClanRole>, sqlx::Error> {
    let row: Option<(ClanRole,)> =
        sqlx::query_as("SELECT role FROM clan_members WHERE clan_id = ? AND user_id = ?")
            .bind(clan_id)
            .bind(user_id)
            .fetch_optional(executor)
            .await?;

    Ok(row.map(|r| r.0))
}

/// Insert a membership. False when the user is already a member.
pub async fn add_member<'e, E: SqliteExecutor<'e>>(
    executor: E,
    clan_id: i64,
    user_id: i64,
    role: ClanRole,
    now: DateTime<Utc>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO clan_members (clan_id, user_id, role, joined_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT (clan_id, user_id) DO NOTHING
        "#,
    )
    .bind(clan_id)
    .bind(user_id)
    .bind(role)
    .bind(now)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn remove_member(
    pool: &SqlitePool,
    clan_id: i64,
    user_id: i64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM clan_members WHERE clan_id = ? AND user_id = ?")
        .bind(clan_id)
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn set_member_role(
    pool: &SqlitePool,
    clan_id: i64,
    user_id: i64,
    role: ClanRole,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE clan_members SET role = ? WHERE clan_id = ? AND user_id = ?")
        .bind(role)
        .bind(clan_id)
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Update whichever presentation fields are given
pub async fn update_info(
    pool: &SqlitePool,
    clan_id: i64,
    description: Option<&str>,
    color: Option<&str>,
    emoji: Option<&str>,
) -> Result<Option<Clan>, sqlx::Error> {
    sqlx::query_as::<_, Clan>(
        r#"
        UPDATE clans SET
            description = COALESCE(?, description),
            color = COALESCE(?, color),
            emoji = COALESCE(?, emoji)
        WHERE id = ? AND is_active = 1
        RETURNING *
        "#,
    )
    .bind(description)
    .bind(color)
    .bind(emoji)
    .bind(clan_id)
    .fetch_optional(pool)
    .await
}

pub async fn set_max_members<'e, E: SqliteExecutor<'e>>(
    executor: E,
    clan_id: i64,
    max_members: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE clans SET max_members = ? WHERE id = ?")
        .bind(max_members)
        .bind(clan_id)
        .execute(executor)
        .await?;

    Ok(())
}

pub async fn increment_voice_channels<'e, E: SqliteExecutor<'e>>(
    executor: E,
    clan_id: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE clans SET voice_channels_count = voice_channels_count + 1 WHERE id = ?")
        .bind(clan_id)
        .execute(executor)
        .await?;

    Ok(())
}

pub async fn set_last_payment<'e, E: SqliteExecutor<'e>>(
    executor: E,
    clan_id: i64,
    at: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE clans SET last_payment = ? WHERE id = ?")
        .bind(at)
        .bind(clan_id)
        .execute(executor)
        .await?;

    Ok(())
}

pub async fn deactivate(pool: &SqlitePool, clan_id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE clans SET is_active = 0 WHERE id = ? AND is_active = 1")
        .bind(clan_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn list_active(pool: &SqlitePool) -> Result<Vec<Clan>, sqlx::Error> {
    sqlx::query_as::<_, Clan>("SELECT * FROM clans WHERE is_active = 1 ORDER BY id ASC")
        .fetch_all(pool)
        .await
}

pub async fn top_by_members(
    pool: &SqlitePool,
    guild_id: i64,
    limit: i64,
) -> Result<Vec<ClanStanding>, sqlx::Error> {
    sqlx::query_as::<_, ClanStanding>(
        r#"
        SELECT c.id, c.name, c.emoji, c.owner_id, COUNT(m.user_id) AS member_count
        FROM clans c
        LEFT JOIN clan_members m ON m.clan_id = c.id
        WHERE c.guild_id = ? AND c.is_active = 1
        GROUP BY c.id
        ORDER BY member_count DESC, c.created_at ASC
        LIMIT ?
        "#,
    )
    .bind(guild_id)
    .bind(limit)
    .fetch_all(pool)
    .await
}
