use chrono::{DateTime, Utc};
use sqlx::{SqliteExecutor, SqlitePool};

use crate::db::models::{Account, Cooldown};

/// Metric used for leaderboards and ranks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Leaderboard {
    Balance,
    Level,
    Voice,
    Messages,
    Robberies,
}

impl Leaderboard {
    fn order_by(&self) -> &'static str {
        match self {
            Leaderboard::Balance => "(cash + bank) DESC",
            Leaderboard::Level => "level DESC, xp DESC",
            Leaderboard::Voice => "voice_seconds DESC",
            Leaderboard::Messages => "messages_sent DESC",
            Leaderboard::Robberies => "robberies_success DESC",
        }
    }

    /// Condition selecting accounts ranked strictly above the bound account
    fn ahead_of(&self) -> &'static str {
        match self {
            Leaderboard::Balance => "(a.cash + a.bank) > (me.cash + me.bank)",
            Leaderboard::Level => "a.level > me.level OR (a.level = me.level AND a.xp > me.xp)",
            Leaderboard::Voice => "a.voice_seconds > me.voice_seconds",
            Leaderboard::Messages => "a.messages_sent > me.messages_sent",
            Leaderboard::Robberies => "a.robberies_success > me.robberies_success",
        }
    }
}

/// Create the account row if it does not exist yet
pub async fn ensure<'e, E: SqliteExecutor<'e>>(
    executor: E,
    guild_id: i64,
    user_id: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO accounts (user_id, guild_id) VALUES (?, ?) ON CONFLICT DO NOTHING")
        .bind(user_id)
        .bind(guild_id)
        .execute(executor)
        .await?;

    Ok(())
}

pub async fn get<'e, E: SqliteExecutor<'e>>(
    executor: E,
    guild_id: i64,
    user_id: i64,
) -> Result<Option<Account>, sqlx::Error> {
    sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE guild_id = ? AND user_id = ?")
        .bind(guild_id)
        .bind(user_id)
        .fetch_optional(executor)
        .await
}

pub async fn get_or_create(
    pool: &SqlitePool,
    guild_id: i64,
    user_id: i64,
) -> Result<Account, sqlx::Error> {
    ensure(pool, guild_id, user_id).await?;
    get(pool, guild_id, user_id)
        .await?
        .ok_or(sqlx::Error::RowNotFound)
}

/// Add to cash, clamping the result at zero
pub async fn add_cash<'e, E: SqliteExecutor<'e>>(
    executor: E,
    guild_id: i64,
    user_id: i64,
    amount: i64,
) -> Result<Option<Account>, sqlx::Error> {
    sqlx::query_as::<_, Account>(
        r#"
        UPDATE accounts SET cash = MAX(0, cash + ?)
        WHERE guild_id = ? AND user_id = ?
        RETURNING *
        "#,
    )
    .bind(amount)
    .bind(guild_id)
    .bind(user_id)
    .fetch_optional(executor)
    .await
}

/// Add to bank, clamping the result at zero
pub async fn add_bank<'e, E: SqliteExecutor<'e>>(
    executor: E,
    guild_id: i64,
    user_id: i64,
    amount: i64,
) -> Result<Option<Account>, sqlx::Error> {
    sqlx::query_as::<_, Account>(
        r#"
        UPDATE accounts SET bank = MAX(0, bank + ?)
        WHERE guild_id = ? AND user_id = ?
        RETURNING *
        "#,
    )
    .bind(amount)
    .bind(guild_id)
    .bind(user_id)
    .fetch_optional(executor)
    .await
}

/// Overwrite cash and/or bank; negative values are stored as zero
pub async fn set_money<'e, E: SqliteExecutor<'e>>(
    executor: E,
    guild_id: i64,
    user_id: i64,
    cash: Option<i64>,
    bank: Option<i64>,
) -> Result<Option<Account>, sqlx::Error> {
    sqlx::query_as::<_, Account>(
        r#"
        UPDATE accounts
        SET cash = MAX(0, COALESCE(?, cash)), bank = MAX(0, COALESCE(?, bank))
        WHERE guild_id = ? AND user_id = ?
        RETURNING *
        "#,
    )
    .bind(cash)
    .bind(bank)
    .bind(guild_id)
    .bind(user_id)
    .fetch_optional(executor)
    .await
}

/// Take `amount` from cash only if it is all there
pub async fn try_spend_cash<'e, E: SqliteExecutor<'e>>(
    executor: E,
    guild_id: i64,
    user_id: i64,
    amount: i64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE accounts SET cash = cash - ? WHERE guild_id = ? AND user_id = ? AND cash >= ?",
    )
    .bind(amount)
    .bind(guild_id)
    .bind(user_id)
    .bind(amount)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Take `amount` from the bank only if it is all there
pub async fn try_spend_bank<'e, E: SqliteExecutor<'e>>(
    executor: E,
    guild_id: i64,
    user_id: i64,
    amount: i64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE accounts SET bank = bank - ? WHERE guild_id = ? AND user_id = ? AND bank >= ?",
    )
    .bind(amount)
    .bind(guild_id)
    .bind(user_id)
    .bind(amount)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Move cash into the bank. False when cash is short.
pub async fn deposit<'e, E: SqliteExecutor<'e>>(
    executor: E,
    guild_id: i64,
    user_id: i64,
    amount: i64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE accounts SET cash = cash - ?, bank = bank + ?
        WHERE guild_id = ? AND user_id = ? AND cash >= ?
        "#,
    )
    .bind(amount)
    .bind(amount)
    .bind(guild_id)
    .bind(user_id)
    .bind(amount)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Move bank funds into cash. False when the bank is short.
pub async fn withdraw<'e, E: SqliteExecutor<'e>>(
    executor: E,
    guild_id: i64,
    user_id: i64,
    amount: i64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE accounts SET bank = bank - ?, cash = cash + ?
        WHERE guild_id = ? AND user_id = ? AND bank >= ?
        "#,
    )
    .bind(amount)
    .bind(amount)
    .bind(guild_id)
    .bind(user_id)
    .bind(amount)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn set_cooldown<'e, E: SqliteExecutor<'e>>(
    executor: E,
    guild_id: i64,
    user_id: i64,
    kind: Cooldown,
    until: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    let sql = match kind {
        Cooldown::Daily => "UPDATE accounts SET daily_cd = ? WHERE guild_id = ? AND user_id = ?",
        Cooldown::Work => "UPDATE accounts SET work_cd = ? WHERE guild_id = ? AND user_id = ?",
        Cooldown::Weekly => "UPDATE accounts SET weekly_cd = ? WHERE guild_id = ? AND user_id = ?",
        Cooldown::Rob => "UPDATE accounts SET rob_cd = ? WHERE guild_id = ? AND user_id = ?",
    };

    sqlx::query(sql)
        .bind(until)
        .bind(guild_id)
        .bind(user_id)
        .execute(executor)
        .await?;

    Ok(())
}

/// Make a cooldown available again. False when the member has no account.
pub async fn clear_cooldown<'e, E: SqliteExecutor<'e>>(
    executor: E,
    guild_id: i64,
    user_id: i64,
    kind: Cooldown,
) -> Result<bool, sqlx::Error> {
    let sql = match kind {
        Cooldown::Daily => "UPDATE accounts SET daily_cd = NULL WHERE guild_id = ? AND user_id = ?",
        Cooldown::Work => "UPDATE accounts SET work_cd = NULL WHERE guild_id = ? AND user_id = ?",
        Cooldown::Weekly => "UPDATE accounts SET weekly_cd = NULL WHERE guild_id = ? AND user_id = ?",
        Cooldown::Rob => "UPDATE accounts SET rob_cd = NULL WHERE guild_id = ? AND user_id = ?",
    };

    let result = sqlx::query(sql)
        .bind(guild_id)
        .bind(user_id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Set or clear (`None`) the arrest end time
pub async fn set_arrest<'e, E: SqliteExecutor<'e>>(
    executor: E,
    guild_id: i64,
    user_id: i64,
    until: Option<DateTime<Utc>>,
) -> Result<bool, sqlx::Error> {
    let result =
        sqlx::query("UPDATE accounts SET arrest_until = ? WHERE guild_id = ? AND user_id = ?")
            .bind(until)
            .bind(guild_id)
            .bind(user_id)
            .execute(executor)
            .await?;

    Ok(result.rows_affected() > 0)
}

/// Bump robbery statistics by the given deltas
pub async fn record_robbery<'e, E: SqliteExecutor<'e>>(
    executor: E,
    guild_id: i64,
    user_id: i64,
    success: bool,
    arrested: bool,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE accounts SET
            robberies_total = robberies_total + 1,
            robberies_success = robberies_success + ?,
            robberies_fail = robberies_fail + ?,
            robberies_arrest = robberies_arrest + ?
        WHERE guild_id = ? AND user_id = ?
        "#,
    )
    .bind(success as i64)
    .bind(!success as i64)
    .bind(arrested as i64)
    .bind(guild_id)
    .bind(user_id)
    .execute(executor)
    .await?;

    Ok(())
}

pub async fn set_progress<'e, E: SqliteExecutor<'e>>(
    executor: E,
    guild_id: i64,
    user_id: i64,
    level: i64,
    xp: f64,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE accounts SET level = ?, xp = ? WHERE guild_id = ? AND user_id = ?")
        .bind(level)
        .bind(xp)
        .bind(guild_id)
        .bind(user_id)
        .execute(executor)
        .await?;

    Ok(())
}

pub async fn add_activity<'e, E: SqliteExecutor<'e>>(
    executor: E,
    guild_id: i64,
    user_id: i64,
    voice_seconds: i64,
    messages: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE accounts
        SET voice_seconds = voice_seconds + ?, messages_sent = messages_sent + ?
        WHERE guild_id = ? AND user_id = ?
        "#,
    )
    .bind(voice_seconds)
    .bind(messages)
    .bind(guild_id)
    .bind(user_id)
    .execute(executor)
    .await?;

    Ok(())
}

pub async fn set_notifications(
    pool: &SqlitePool,
    guild_id: i64,
    user_id: i64,
    enabled: bool,
) -> Result<(), sqlx::Error> {
    ensure(pool, guild_id, user_id).await?;
    sqlx::query(
        "UPDATE accounts SET notifications_enabled = ? WHERE guild_id = ? AND user_id = ?",
    )
    .bind(enabled)
    .bind(guild_id)
    .bind(user_id)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn top(
    pool: &SqlitePool,
    guild_id: i64,
    board: Leaderboard,
    limit: i64,
) -> Result<Vec<Account>, sqlx::Error> {
    let sql = format!(
        "SELECT * FROM accounts WHERE guild_id = ? ORDER BY {}, user_id ASC LIMIT ?",
        board.order_by()
    );

    sqlx::query_as::<_, Account>(&sql)
        .bind(guild_id)
        .bind(limit)
        .fetch_all(pool)
        .await
}

/// 1-based position of a member on a leaderboard, `None` without an account
pub async fn rank(
    pool: &SqlitePool,
    guild_id: i64,
    user_id: i64,
    board: Leaderboard,
) -> Result<Option<i64>, sqlx::Error> {
    let sql = format!(
        r#"
        SELECT COUNT(a.user_id) + 1
        FROM accounts me
        LEFT JOIN accounts a ON a.guild_id = me.guild_id AND ({})
        WHERE me.guild_id = ? AND me.user_id = ?
        GROUP BY me.user_id
        "#,
        board.ahead_of()
    );

    let row: Option<(i64,)> = sqlx::query_as(&sql)
        .bind(guild_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|r| r.0))
}

/// Accounts with notifications on whose `kind` cooldown ended in `(after, until]`
pub async fn cooldowns_ending(
    pool: &SqlitePool,
    kind: Cooldown,
    after: DateTime<Utc>,
    until: DateTime<Utc>,
) -> Result<Vec<Account>, sqlx::Error> {
    let sql = match kind {
        Cooldown::Daily => {
            "SELECT * FROM accounts WHERE notifications_enabled = 1 AND daily_cd > ? AND daily_cd <= ?"
        }
        Cooldown::Work => {
            "SELECT * FROM accounts WHERE notifications_enabled = 1 AND work_cd > ? AND work_cd <= ?"
        }
        Cooldown::Weekly => {
            "SELECT * FROM accounts WHERE notifications_enabled = 1 AND weekly_cd > ? AND weekly_cd <= ?"
        }
        Cooldown::Rob => {
            "SELECT * FROM accounts WHERE notifications_enabled = 1 AND rob_cd > ? AND rob_cd <= ?"
        }
    };

    sqlx::query_as::<_, Account>(sql)
        .bind(after)
        .bind(until)
        .fetch_all(pool)
        .await
}
