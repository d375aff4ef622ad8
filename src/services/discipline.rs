//! Warnings, strikes and praises with automatic conversion.
//!
//! Three active warnings collapse into one strike. Three praises buy back one
//! warning, but only while the member has a warning to lose.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tokio::time::interval;
use tracing::{debug, error, info};

use crate::bot::data::Data;
use crate::bot::error::Error;
use crate::constants::timeouts::{DISCIPLINE_SWEEP_INTERVAL, STRIKE_TTL_DAYS, WARNING_TTL_DAYS};
use crate::db::models::{DisciplineSummary, PunishmentKind, PunishmentRecord};
use crate::db::queries::discipline;

pub const WARNINGS_PER_STRIKE: i64 = 3;
pub const PRAISES_PER_WARNING: i64 = 3;
pub const STRIKE_LIMIT: i64 = 2;
pub const AUTO_STRIKE_REASON: &str = "auto: 3 warnings → strike";

/// What a normalization pass changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Normalization {
    pub strikes_issued: u32,
    pub warnings_forgiven: u32,
}

impl Normalization {
    pub fn is_empty(&self) -> bool {
        self.strikes_issued == 0 && self.warnings_forgiven == 0
    }
}

pub async fn add_warning(
    pool: &SqlitePool,
    guild_id: i64,
    user_id: i64,
    moderator_id: i64,
    reason: &str,
    now: DateTime<Utc>,
) -> Result<(PunishmentRecord, Normalization), Error> {
    let mut tx = pool.begin().await?;
    let record = discipline::insert(
        &mut *tx,
        guild_id,
        user_id,
        moderator_id,
        PunishmentKind::Warning,
        reason,
        now,
        Some(now + Duration::days(WARNING_TTL_DAYS)),
    )
    .await?;
    let outcome = normalize_in(&mut tx, guild_id, user_id, moderator_id, now).await?;
    tx.commit().await?;

    info!(
        "Warning issued to {} in {} by {} (strikes issued: {})",
        user_id, guild_id, moderator_id, outcome.strikes_issued
    );

    Ok((record, outcome))
}

pub async fn add_strike(
    pool: &SqlitePool,
    guild_id: i64,
    user_id: i64,
    moderator_id: i64,
    reason: &str,
    now: DateTime<Utc>,
) -> Result<PunishmentRecord, Error> {
    let record = discipline::insert(
        pool,
        guild_id,
        user_id,
        moderator_id,
        PunishmentKind::Strike,
        reason,
        now,
        Some(now + Duration::days(STRIKE_TTL_DAYS)),
    )
    .await?;

    info!("Strike issued to {} in {} by {}", user_id, guild_id, moderator_id);

    Ok(record)
}

pub async fn add_praise(
    pool: &SqlitePool,
    guild_id: i64,
    user_id: i64,
    moderator_id: i64,
    reason: &str,
    now: DateTime<Utc>,
) -> Result<(PunishmentRecord, Normalization), Error> {
    let mut tx = pool.begin().await?;
    let record = discipline::insert(
        &mut *tx,
        guild_id,
        user_id,
        moderator_id,
        PunishmentKind::Praise,
        reason,
        now,
        None,
    )
    .await?;
    let outcome = normalize_in(&mut tx, guild_id, user_id, moderator_id, now).await?;
    tx.commit().await?;

    info!(
        "Praise given to {} in {} by {} (warnings forgiven: {})",
        user_id, guild_id, moderator_id, outcome.warnings_forgiven
    );

    Ok((record, outcome))
}

/// Remove the oldest active warning. Returns false when there was none.
pub async fn remove_one_warning(
    pool: &SqlitePool,
    guild_id: i64,
    user_id: i64,
    now: DateTime<Utc>,
) -> Result<bool, Error> {
    let removed =
        discipline::delete_oldest_active(pool, guild_id, user_id, PunishmentKind::Warning, 1, now)
            .await?;
    Ok(removed > 0)
}

/// Remove the oldest active strike. Returns false when there was none.
pub async fn remove_one_strike(
    pool: &SqlitePool,
    guild_id: i64,
    user_id: i64,
    now: DateTime<Utc>,
) -> Result<bool, Error> {
    let removed =
        discipline::delete_oldest_active(pool, guild_id, user_id, PunishmentKind::Strike, 1, now)
            .await?;
    Ok(removed > 0)
}

pub async fn count_warnings(
    pool: &SqlitePool,
    guild_id: i64,
    user_id: i64,
    now: DateTime<Utc>,
) -> Result<i64, Error> {
    Ok(discipline::count_active(pool, guild_id, user_id, PunishmentKind::Warning, now).await?)
}

pub async fn count_strikes(
    pool: &SqlitePool,
    guild_id: i64,
    user_id: i64,
    now: DateTime<Utc>,
) -> Result<i64, Error> {
    Ok(discipline::count_active(pool, guild_id, user_id, PunishmentKind::Strike, now).await?)
}

pub async fn count_praises(
    pool: &SqlitePool,
    guild_id: i64,
    user_id: i64,
    now: DateTime<Utc>,
) -> Result<i64, Error> {
    Ok(discipline::count_active(pool, guild_id, user_id, PunishmentKind::Praise, now).await?)
}

pub async fn summary(
    pool: &SqlitePool,
    guild_id: i64,
    user_id: i64,
    now: DateTime<Utc>,
) -> Result<DisciplineSummary, Error> {
    Ok(DisciplineSummary {
        warnings: count_warnings(pool, guild_id, user_id, now).await?,
        strikes: count_strikes(pool, guild_id, user_id, now).await?,
        praises: count_praises(pool, guild_id, user_id, now).await?,
    })
}

/// Delete every warning and strike that expired at or before `now`
pub async fn cleanup_expired(pool: &SqlitePool, now: DateTime<Utc>) -> Result<u64, Error> {
    let removed = discipline::delete_expired(pool, now).await?;
    if removed > 0 {
        info!("Removed {} expired warnings and strikes", removed);
    }
    Ok(removed)
}

/// Re-establish the ledger invariants for one member
pub async fn normalize(
    pool: &SqlitePool,
    guild_id: i64,
    user_id: i64,
    moderator_id: i64,
    now: DateTime<Utc>,
) -> Result<Normalization, Error> {
    let mut tx = pool.begin().await?;
    let outcome = normalize_in(&mut tx, guild_id, user_id, moderator_id, now).await?;
    tx.commit().await?;
    Ok(outcome)
}

async fn normalize_in(
    conn: &mut SqliteConnection,
    guild_id: i64,
    user_id: i64,
    moderator_id: i64,
    now: DateTime<Utc>,
) -> Result<Normalization, sqlx::Error> {
    use PunishmentKind::{Praise, Strike, Warning};

    let mut outcome = Normalization::default();

    while discipline::count_active(&mut *conn, guild_id, user_id, Warning, now).await?
        >= WARNINGS_PER_STRIKE
    {
        let removed = discipline::delete_oldest_active(
            &mut *conn,
            guild_id,
            user_id,
            Warning,
            WARNINGS_PER_STRIKE,
            now,
        )
        .await?;
        if removed < WARNINGS_PER_STRIKE as u64 {
            break;
        }

        discipline::insert(
            &mut *conn,
            guild_id,
            user_id,
            moderator_id,
            Strike,
            AUTO_STRIKE_REASON,
            now,
            Some(now + Duration::days(STRIKE_TTL_DAYS)),
        )
        .await?;
        outcome.strikes_issued += 1;
        debug!("Converted {} warnings of {} into a strike", WARNINGS_PER_STRIKE, user_id);
    }

    loop {
        let praises = discipline::count_active(&mut *conn, guild_id, user_id, Praise, now).await?;
        if praises < PRAISES_PER_WARNING {
            break;
        }
        let warnings =
            discipline::count_active(&mut *conn, guild_id, user_id, Warning, now).await?;
        if warnings == 0 {
            break;
        }

        discipline::delete_oldest_active(
            &mut *conn,
            guild_id,
            user_id,
            Praise,
            PRAISES_PER_WARNING,
            now,
        )
        .await?;
        discipline::delete_oldest_active(&mut *conn, guild_id, user_id, Warning, 1, now).await?;
        outcome.warnings_forgiven += 1;
        debug!("Traded {} praises of {} for a warning", PRAISES_PER_WARNING, user_id);
    }

    Ok(outcome)
}

/// Append a text mute, voice mute or ban to the member's history
pub async fn record_punishment(
    pool: &SqlitePool,
    guild_id: i64,
    user_id: i64,
    moderator_id: i64,
    kind: PunishmentKind,
    reason: &str,
    at: DateTime<Utc>,
) -> Result<PunishmentRecord, Error> {
    if !kind.is_timed() {
        return Err(Error::invalid(format!("{} is not a punishment", kind.label())));
    }

    Ok(discipline::insert(pool, guild_id, user_id, moderator_id, kind, reason, at, None).await?)
}

/// One page of the member's history, newest first, with the total entry count
pub async fn history(
    pool: &SqlitePool,
    guild_id: i64,
    user_id: i64,
    limit: i64,
    offset: i64,
) -> Result<(Vec<PunishmentRecord>, i64), Error> {
    let page = discipline::history(pool, guild_id, user_id, limit, offset).await?;
    let total = discipline::count_history(pool, guild_id, user_id).await?;
    Ok((page, total))
}

/// Start the background task that purges expired ledger marks
pub fn spawn_cleanup_task(data: Arc<Data>) {
    tokio::spawn(async move {
        let mut ticker = interval(DISCIPLINE_SWEEP_INTERVAL);

        loop {
            ticker.tick().await;

            if let Err(e) = cleanup_expired(&data.pool, Utc::now()).await {
                error!("Error cleaning up expired discipline records: {:?}", e);
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::db::pool::test_pool;

    const GUILD: i64 = 10;
    const USER: i64 = 20;
    const MOD: i64 = 30;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_three_warnings_become_strike() {
        let pool = test_pool().await;
        let now = t0();

        for reason in ["spam", "caps", "insult"] {
            add_warning(&pool, GUILD, USER, MOD, reason, now).await.unwrap();
        }

        assert_eq!(count_warnings(&pool, GUILD, USER, now).await.unwrap(), 0);
        assert_eq!(count_strikes(&pool, GUILD, USER, now).await.unwrap(), 1);

        let history = discipline::history(&pool, GUILD, USER, 10, 0).await.unwrap();
        let strike = history
            .iter()
            .find(|r| r.kind == PunishmentKind::Strike)
            .unwrap();
        assert!(strike.reason.contains("auto"));
        assert_eq!(strike.moderator_id, MOD);
        assert_eq!(strike.expires_at, Some(now + Duration::days(90)));
    }

    #[tokio::test]
    async fn test_warning_count_stays_below_three() {
        let pool = test_pool().await;
        let mut now = t0();

        for i in 0..8 {
            add_warning(&pool, GUILD, USER, MOD, "noise", now).await.unwrap();
            let warnings = count_warnings(&pool, GUILD, USER, now).await.unwrap();
            assert!(warnings < 3, "warning {} left {} active", i, warnings);
            now += Duration::minutes(1);
        }

        assert_eq!(count_warnings(&pool, GUILD, USER, now).await.unwrap(), 2);
        assert_eq!(count_strikes(&pool, GUILD, USER, now).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_praises_forgive_a_warning() {
        let pool = test_pool().await;
        let now = t0();

        add_warning(&pool, GUILD, USER, MOD, "late", now).await.unwrap();
        add_praise(&pool, GUILD, USER, MOD, "helped", now).await.unwrap();
        add_praise(&pool, GUILD, USER, MOD, "helped", now).await.unwrap();
        let (_, outcome) = add_praise(&pool, GUILD, USER, MOD, "helped", now).await.unwrap();

        assert_eq!(outcome.warnings_forgiven, 1);
        let summary = summary(&pool, GUILD, USER, now).await.unwrap();
        assert_eq!(
            summary,
            DisciplineSummary {
                warnings: 0,
                strikes: 0,
                praises: 0
            }
        );
    }

    #[tokio::test]
    async fn test_praises_accumulate_without_warnings() {
        let pool = test_pool().await;
        let now = t0();

        for _ in 0..3 {
            let (_, outcome) = add_praise(&pool, GUILD, USER, MOD, "kind", now).await.unwrap();
            assert!(outcome.is_empty());
        }

        assert_eq!(count_praises(&pool, GUILD, USER, now).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_remove_warning_when_none() {
        let pool = test_pool().await;
        let now = t0();

        add_praise(&pool, GUILD, USER, MOD, "kind", now).await.unwrap();
        add_strike(&pool, GUILD, USER, MOD, "raid", now).await.unwrap();

        assert!(!remove_one_warning(&pool, GUILD, USER, now).await.unwrap());
        assert_eq!(count_praises(&pool, GUILD, USER, now).await.unwrap(), 1);
        assert_eq!(count_strikes(&pool, GUILD, USER, now).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_remove_removes_oldest() {
        let pool = test_pool().await;
        let first = t0();
        let second = first + Duration::hours(1);

        add_warning(&pool, GUILD, USER, MOD, "first", first).await.unwrap();
        add_warning(&pool, GUILD, USER, MOD, "second", second).await.unwrap();

        assert!(remove_one_warning(&pool, GUILD, USER, second).await.unwrap());

        let remaining = discipline::history(&pool, GUILD, USER, 10, 0).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].reason, "second");

        add_strike(&pool, GUILD, USER, MOD, "raid", second).await.unwrap();
        assert!(remove_one_strike(&pool, GUILD, USER, second).await.unwrap());
        assert!(!remove_one_strike(&pool, GUILD, USER, second).await.unwrap());
    }

    #[tokio::test]
    async fn test_expired_marks_not_counted() {
        let pool = test_pool().await;
        let now = t0();

        add_warning(&pool, GUILD, USER, MOD, "old", now).await.unwrap();
        let later = now + Duration::days(31);

        assert_eq!(count_warnings(&pool, GUILD, USER, now).await.unwrap(), 1);
        assert_eq!(count_warnings(&pool, GUILD, USER, later).await.unwrap(), 0);
        // Still stored until the sweep runs
        assert_eq!(discipline::count_history(&pool, GUILD, USER).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_cleanup_removes_only_expired() {
        let pool = test_pool().await;
        let now = t0();
        let other_user = USER + 1;

        add_warning(&pool, GUILD, USER, MOD, "w", now).await.unwrap();
        add_strike(&pool, GUILD, other_user, MOD, "s", now).await.unwrap();
        add_praise(&pool, GUILD, USER, MOD, "p", now).await.unwrap();

        // Exactly at the warning expiry
        let cutoff = now + Duration::days(30);
        assert_eq!(cleanup_expired(&pool, cutoff).await.unwrap(), 1);
        assert_eq!(discipline::count_history(&pool, GUILD, USER).await.unwrap(), 1);
        assert_eq!(
            discipline::count_history(&pool, GUILD, other_user).await.unwrap(),
            1
        );

        let cutoff = now + Duration::days(90);
        assert_eq!(cleanup_expired(&pool, cutoff).await.unwrap(), 1);
        assert_eq!(count_praises(&pool, GUILD, USER, cutoff).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_ledgers_are_per_guild() {
        let pool = test_pool().await;
        let now = t0();

        add_warning(&pool, GUILD, USER, MOD, "a", now).await.unwrap();
        add_warning(&pool, GUILD, USER, MOD, "b", now).await.unwrap();
        add_warning(&pool, GUILD + 1, USER, MOD, "c", now).await.unwrap();

        assert_eq!(count_warnings(&pool, GUILD, USER, now).await.unwrap(), 2);
        assert_eq!(count_warnings(&pool, GUILD + 1, USER, now).await.unwrap(), 1);
        assert_eq!(count_strikes(&pool, GUILD, USER, now).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_history_is_unified_and_paged() {
        let pool = test_pool().await;
        let now = t0();

        add_warning(&pool, GUILD, USER, MOD, "spam", now).await.unwrap();
        add_praise(&pool, GUILD, USER, MOD, "helped", now + Duration::minutes(1))
            .await
            .unwrap();
        record_punishment(
            &pool,
            GUILD,
            USER,
            MOD,
            PunishmentKind::Ban,
            "raid",
            now + Duration::minutes(2),
        )
        .await
        .unwrap();
        assert!(record_punishment(&pool, GUILD, USER, MOD, PunishmentKind::Warning, "x", now)
            .await
            .is_err());

        let (page, total) = history(&pool, GUILD, USER, 2, 0).await.unwrap();
        assert_eq!(total, 3);
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].kind, PunishmentKind::Ban);
        assert_eq!(page[1].kind, PunishmentKind::Praise);

        let (rest, _) = history(&pool, GUILD, USER, 2, 2).await.unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].kind, PunishmentKind::Warning);
    }
}
