//! Voice time couples spend together.
//!
//! A session runs while both partners sit in the same voice channel. Long
//! sessions are checkpointed into the log so a crash loses at most a few minutes.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;
use tokio::time::interval;
use tracing::{debug, error, info};

use crate::bot::data::Data;
use crate::bot::error::Error;
use crate::constants::timeouts::{
    LOVE_CHECKPOINT_INTERVAL, LOVE_CHECKPOINT_MIN_SECONDS, LOVE_CLEANUP_INTERVAL,
    LOVE_STALE_SESSION_HOURS,
};
use crate::db::models::{ActiveSession, Couple};
use crate::db::queries::love;
use crate::services::love::billing;

/// What a voice state change means for a couple's session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionAction {
    Start(u64),
    /// Both partners moved together to another channel
    Move(u64),
    End,
    Keep,
}

pub fn session_action(
    active: Option<&ActiveSession>,
    user_channel: Option<u64>,
    partner_channel: Option<u64>,
) -> SessionAction {
    let together = match (user_channel, partner_channel) {
        (Some(a), Some(b)) if a == b => Some(a),
        _ => None,
    };

    match (active, together) {
        (None, Some(channel)) => SessionAction::Start(channel),
        (Some(session), Some(channel)) if session.channel_id as u64 != channel => {
            SessionAction::Move(channel)
        }
        (Some(_), None) => SessionAction::End,
        _ => SessionAction::Keep,
    }
}

pub async fn start_session(
    pool: &SqlitePool,
    couple_id: i64,
    channel_id: i64,
    now: DateTime<Utc>,
) -> Result<bool, Error> {
    let started = love::start_session(pool, couple_id, channel_id, now).await?;
    if started {
        debug!("Couple {} started a session in {}", couple_id, channel_id);
    }
    Ok(started)
}

/// Stop the couple's session, logging its duration when positive.
/// Returns `None` when no session was running.
pub async fn end_session(
    pool: &SqlitePool,
    couple_id: i64,
    now: DateTime<Utc>,
) -> Result<Option<i64>, Error> {
    let mut tx = pool.begin().await?;
    let Some(session) = love::take_session(&mut *tx, couple_id).await? else {
        return Ok(None);
    };

    let seconds = (now - session.started_at).num_seconds().max(0);
    if seconds > 0 {
        love::log_session(
            &mut *tx,
            couple_id,
            session.channel_id,
            session.started_at,
            now,
            seconds,
        )
        .await?;
    }
    tx.commit().await?;

    debug!("Couple {} ended a {}s session", couple_id, seconds);
    Ok(Some(seconds))
}

/// Bring the couple's session in line with where both partners are
pub async fn sync_couple(
    pool: &SqlitePool,
    couple: &Couple,
    user_channel: Option<u64>,
    partner_channel: Option<u64>,
    now: DateTime<Utc>,
) -> Result<SessionAction, Error> {
    let active = love::get_session(pool, couple.id).await?;
    let action = session_action(active.as_ref(), user_channel, partner_channel);

    match action {
        SessionAction::Start(channel) => {
            start_session(pool, couple.id, channel as i64, now).await?;
        }
        SessionAction::Move(channel) => {
            end_session(pool, couple.id, now).await?;
            start_session(pool, couple.id, channel as i64, now).await?;
        }
        SessionAction::End => {
            end_session(pool, couple.id, now).await?;
        }
        SessionAction::Keep => {}
    }

    Ok(action)
}

/// Log every session running for at least the checkpoint length and restart it at `now`
pub async fn checkpoint_sessions(pool: &SqlitePool, now: DateTime<Utc>) -> Result<usize, Error> {
    let cutoff = now - Duration::seconds(LOVE_CHECKPOINT_MIN_SECONDS);
    let sessions = love::list_sessions_started_before(pool, cutoff).await?;
    let count = sessions.len();

    for session in sessions {
        let seconds = (now - session.started_at).num_seconds();
        let mut tx = pool.begin().await?;
        love::log_session(
            &mut *tx,
            session.couple_id,
            session.channel_id,
            session.started_at,
            now,
            seconds,
        )
        .await?;
        love::restart_session(&mut *tx, session.couple_id, now).await?;
        tx.commit().await?;
    }

    if count > 0 {
        debug!("Checkpointed {} love sessions", count);
    }
    Ok(count)
}

/// Drop sessions that have been open too long to be real
pub async fn cleanup_stale_sessions(pool: &SqlitePool, now: DateTime<Utc>) -> Result<u64, Error> {
    let cutoff = now - Duration::hours(LOVE_STALE_SESSION_HOURS);
    let removed = love::delete_sessions_started_before(pool, cutoff).await?;
    if removed > 0 {
        info!("Removed {} stale love sessions", removed);
    }
    Ok(removed)
}

/// Drop sessions left over from a previous run. Offline time is never credited,
/// couples still together are restarted from the gateway snapshot.
pub async fn reset_active_sessions(pool: &SqlitePool) -> Result<u64, Error> {
    let cleared = love::clear_sessions(pool).await?;
    if cleared > 0 {
        info!("Dropped {} love sessions from the previous run", cleared);
    }
    Ok(cleared)
}

pub async fn total_time(pool: &SqlitePool, couple_id: i64) -> Result<i64, Error> {
    Ok(love::total_seconds(pool, couple_id).await?)
}

/// Start the checkpoint task and the hourly cleanup of stale sessions and
/// expired room access
pub fn spawn_session_tasks(data: Arc<Data>) {
    let checkpoint_data = data.clone();
    tokio::spawn(async move {
        let mut ticker = interval(LOVE_CHECKPOINT_INTERVAL);

        loop {
            ticker.tick().await;

            if let Err(e) = checkpoint_sessions(&checkpoint_data.pool, Utc::now()).await {
                error!("Error checkpointing love sessions: {:?}", e);
            }
        }
    });

    tokio::spawn(async move {
        let mut ticker = interval(LOVE_CLEANUP_INTERVAL);

        loop {
            ticker.tick().await;

            let now = Utc::now();
            if let Err(e) = cleanup_stale_sessions(&data.pool, now).await {
                error!("Error cleaning up love sessions: {:?}", e);
            }
            if let Err(e) = billing::remove_expired_access(&data.pool, now).await {
                error!("Error removing expired love room access: {:?}", e);
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::db::pool::test_pool;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 20, 0, 0).unwrap()
    }

    async fn couple(pool: &SqlitePool) -> Couple {
        love::insert_couple(pool, 1, 10, 20, t0()).await.unwrap()
    }

    fn session(channel_id: i64) -> ActiveSession {
        ActiveSession {
            couple_id: 1,
            channel_id,
            started_at: t0(),
        }
    }

    #[test]
    fn test_session_action() {
        assert_eq!(session_action(None, Some(5), Some(5)), SessionAction::Start(5));
        assert_eq!(session_action(None, Some(5), Some(6)), SessionAction::Keep);
        assert_eq!(session_action(None, None, Some(5)), SessionAction::Keep);

        let running = session(5);
        assert_eq!(session_action(Some(&running), Some(5), Some(5)), SessionAction::Keep);
        assert_eq!(session_action(Some(&running), None, Some(5)), SessionAction::End);
        assert_eq!(session_action(Some(&running), Some(6), Some(5)), SessionAction::End);
        assert_eq!(
            session_action(Some(&running), Some(7), Some(7)),
            SessionAction::Move(7)
        );
    }

    #[tokio::test]
    async fn test_one_session_per_couple() {
        let pool = test_pool().await;
        let c = couple(&pool).await;

        assert!(start_session(&pool, c.id, 5, t0()).await.unwrap());
        assert!(!start_session(&pool, c.id, 6, t0()).await.unwrap());

        let seconds = end_session(&pool, c.id, t0() + Duration::seconds(90)).await.unwrap();
        assert_eq!(seconds, Some(90));
        assert_eq!(end_session(&pool, c.id, t0()).await.unwrap(), None);
        assert_eq!(total_time(&pool, c.id).await.unwrap(), 90);
    }

    #[tokio::test]
    async fn test_zero_length_session_not_logged() {
        let pool = test_pool().await;
        let c = couple(&pool).await;

        start_session(&pool, c.id, 5, t0()).await.unwrap();
        assert_eq!(end_session(&pool, c.id, t0()).await.unwrap(), Some(0));
        assert_eq!(total_time(&pool, c.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_checkpoint() {
        let pool = test_pool().await;
        let c = couple(&pool).await;
        start_session(&pool, c.id, 5, t0()).await.unwrap();

        // Too short to checkpoint
        let early = t0() + Duration::seconds(200);
        assert_eq!(checkpoint_sessions(&pool, early).await.unwrap(), 0);

        let later = t0() + Duration::seconds(400);
        assert_eq!(checkpoint_sessions(&pool, later).await.unwrap(), 1);
        assert_eq!(total_time(&pool, c.id).await.unwrap(), 400);

        let restarted = love::get_session(&pool, c.id).await.unwrap().unwrap();
        assert_eq!(restarted.started_at, later);

        end_session(&pool, c.id, later + Duration::seconds(50)).await.unwrap();
        assert_eq!(total_time(&pool, c.id).await.unwrap(), 450);
    }

    #[tokio::test]
    async fn test_cleanup_stale() {
        let pool = test_pool().await;
        let c = couple(&pool).await;
        start_session(&pool, c.id, 5, t0()).await.unwrap();

        assert_eq!(cleanup_stale_sessions(&pool, t0() + Duration::hours(23)).await.unwrap(), 0);
        assert_eq!(cleanup_stale_sessions(&pool, t0() + Duration::hours(25)).await.unwrap(), 1);
        assert!(love::get_session(&pool, c.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sync_couple() {
        let pool = test_pool().await;
        let c = couple(&pool).await;

        let action = sync_couple(&pool, &c, Some(5), Some(5), t0()).await.unwrap();
        assert_eq!(action, SessionAction::Start(5));

        let moved_at = t0() + Duration::seconds(60);
        let action = sync_couple(&pool, &c, Some(8), Some(8), moved_at).await.unwrap();
        assert_eq!(action, SessionAction::Move(8));
        assert_eq!(total_time(&pool, c.id).await.unwrap(), 60);

        let left_at = moved_at + Duration::seconds(30);
        let action = sync_couple(&pool, &c, None, Some(8), left_at).await.unwrap();
        assert_eq!(action, SessionAction::End);
        assert_eq!(total_time(&pool, c.id).await.unwrap(), 90);
    }

    #[tokio::test]
    async fn test_sessions_from_previous_run_are_not_credited() {
        let pool = test_pool().await;
        let c = couple(&pool).await;
        start_session(&pool, c.id, 5, t0()).await.unwrap();

        // The partners left while the bot was down; startup forgets the session
        assert_eq!(reset_active_sessions(&pool).await.unwrap(), 1);

        let mut now = t0() + Duration::hours(2);
        let end = now + Duration::hours(26);
        while now < end {
            checkpoint_sessions(&pool, now).await.unwrap();
            now += Duration::minutes(5);
        }
        cleanup_stale_sessions(&pool, now).await.unwrap();

        assert!(love::get_session(&pool, c.id).await.unwrap().is_none());
        assert_eq!(total_time(&pool, c.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_reseed_restarts_couples_still_together() {
        let pool = test_pool().await;
        let c = couple(&pool).await;
        start_session(&pool, c.id, 5, t0()).await.unwrap();

        let restart = t0() + Duration::hours(3);
        reset_active_sessions(&pool).await.unwrap();
        let action = sync_couple(&pool, &c, Some(5), Some(5), restart).await.unwrap();
        assert_eq!(action, SessionAction::Start(5));

        end_session(&pool, c.id, restart + Duration::seconds(120)).await.unwrap();
        assert_eq!(total_time(&pool, c.id).await.unwrap(), 120);
    }
}
