use chrono::{DateTime, Utc};
use sqlx::{SqliteExecutor, SqlitePool};

use crate::db::models::Ticket;

/// Bump the shared counter and return the new value
pub async fn next_number<'e, E: SqliteExecutor<'e>>(executor: E) -> Result<i64, sqlx::Error> {
    let row: (i64,) = sqlx::query_as(
        "UPDATE ticket_counter SET last_number = last_number + 1 WHERE id = 1 RETURNING last_number",
    )
    .fetch_one(executor)
    .await?;

    Ok(row.0)
}

/// Insert a ticket. `None` when the number is already used.
#[allow(clippy::too_many_arguments)]
pub async fn insert<'e, E: SqliteExecutor<'e>>(
    executor: E,
    ticket_number: &str,
    guild_id: i64,
    user_id: i64,
    ticket_type: &str,
    description: &str,
    position: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Option<Ticket>, sqlx::Error> {
    sqlx::query_as::<_, Ticket>(
        r#"
        INSERT INTO tickets (ticket_number, guild_id, user_id, ticket_type, description, position, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT (ticket_number) DO NOTHING
        RETURNING *
        "#,
    )
    .bind(ticket_number)
    .bind(guild_id)
    .bind(user_id)
    .bind(ticket_type)
    .bind(description)
    .bind(position)
    .bind(now)
    .fetch_optional(executor)
    .await
}

pub async fn get(pool: &SqlitePool, ticket_number: &str) -> Result<Option<Ticket>, sqlx::Error> {
    sqlx::query_as::<_, Ticket>("SELECT * FROM tickets WHERE ticket_number = ?")
        .bind(ticket_number)
        .fetch_optional(pool)
        .await
}

/// Close an open ticket. False when it is unknown or already closed.
pub async fn close(pool: &SqlitePool, ticket_number: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE tickets SET status = 'closed' WHERE ticket_number = ? AND status = 'open'",
    )
    .bind(ticket_number)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn count_open_for_user(
    pool: &SqlitePool,
    guild_id: i64,
    user_id: i64,
) -> Result<i64, sqlx::Error> {
    let row: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM tickets WHERE guild_id = ? AND user_id = ? AND status = 'open'",
    )
    .bind(guild_id)
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    Ok(row.0)
}
