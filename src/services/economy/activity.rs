use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::bot::error::Error;
use crate::config::EconomySettings;
use crate::db::queries::{account, voice_presence};
use crate::services::economy::levels::{self, LevelChange};

/// Credit one message: counter plus message XP
pub async fn record_message(
    pool: &SqlitePool,
    settings: &EconomySettings,
    guild_id: i64,
    user_id: i64,
) -> Result<LevelChange, Error> {
    account::ensure(pool, guild_id, user_id).await?;
    account::add_activity(pool, guild_id, user_id, 0, 1).await?;
    levels::grant_xp(pool, guild_id, user_id, settings.message_xp, &settings.xp_per_level).await
}

pub async fn voice_joined(
    pool: &SqlitePool,
    guild_id: i64,
    user_id: i64,
    channel_id: i64,
    now: DateTime<Utc>,
) -> Result<(), Error> {
    voice_presence::start(pool, guild_id, user_id, channel_id, now).await?;
    debug!("Tracking voice time of {} in {}", user_id, channel_id);
    Ok(())
}

/// Forget every recorded voice join. Run at startup, before presence is re-seeded
/// from the gateway, so time spent while the bot was offline is not credited.
pub async fn reset_voice_tracking(pool: &SqlitePool) -> Result<u64, Error> {
    let cleared = voice_presence::clear(pool).await?;
    if cleared > 0 {
        debug!("Dropped {} stale voice presence rows", cleared);
    }
    Ok(cleared)
}

/// Credit the time since the member joined voice.
/// Returns `None` when no join was recorded.
pub async fn voice_left(
    pool: &SqlitePool,
    settings: &EconomySettings,
    guild_id: i64,
    user_id: i64,
    now: DateTime<Utc>,
) -> Result<Option<(i64, LevelChange)>, Error> {
    let Some(presence) = voice_presence::take(pool, guild_id, user_id).await? else {
        return Ok(None);
    };

    let seconds = (now - presence.joined_at).num_seconds().max(0);
    account::ensure(pool, guild_id, user_id).await?;
    account::add_activity(pool, guild_id, user_id, seconds, 0).await?;

    let xp = seconds as f64 / 60.0 * settings.voice_minute_xp;
    let change = levels::grant_xp(pool, guild_id, user_id, xp, &settings.xp_per_level).await?;

    debug!("Credited {}s of voice to {} in {}", seconds, user_id, guild_id);
    Ok(Some((seconds, change)))
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    use crate::db::pool::test_pool;

    #[tokio::test]
    async fn test_messages_count_and_give_xp() {
        let pool = test_pool().await;
        let settings = EconomySettings::default();

        for _ in 0..4 {
            record_message(&pool, &settings, 1, 2).await.unwrap();
        }

        let acc = account::get(&pool, 1, 2).await.unwrap().unwrap();
        assert_eq!(acc.messages_sent, 4);
        assert!((acc.xp - 2.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_voice_time_credited_on_leave() {
        let pool = test_pool().await;
        let settings = EconomySettings::default();
        let joined = Utc.with_ymd_and_hms(2025, 6, 2, 18, 0, 0).unwrap();

        voice_joined(&pool, 1, 2, 99, joined).await.unwrap();
        let (seconds, _) = voice_left(&pool, &settings, 1, 2, joined + Duration::minutes(30))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(seconds, 1800);

        let acc = account::get(&pool, 1, 2).await.unwrap().unwrap();
        assert_eq!(acc.voice_seconds, 1800);
        assert!((acc.xp - 15.0).abs() < 1e-9);

        // A second leave without a join credits nothing
        assert!(voice_left(&pool, &settings, 1, 2, joined + Duration::hours(2))
            .await
            .unwrap()
            .is_none());
    }
}
