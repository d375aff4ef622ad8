use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serenity::all::{Context, GuildId, Http, RoleId, UserId};
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use crate::bot::data::Data;
use crate::bot::error::Error;
use crate::config::Settings;
use crate::db::models::{ActiveMute, PunishmentKind};
use crate::db::queries::{active_mute, discipline as discipline_queries};
use crate::services::discipline;
use crate::services::moderation::duration::format_duration;
use crate::services::moderation::mod_log::{self, LogEntry};

/// Persist a timed sanction: history entry plus the row the expiry sweep watches
#[allow(clippy::too_many_arguments)]
pub async fn record_timed(
    pool: &SqlitePool,
    guild_id: i64,
    user_id: i64,
    moderator_id: i64,
    kind: PunishmentKind,
    reason: &str,
    duration: Duration,
    now: DateTime<Utc>,
) -> Result<ActiveMute, Error> {
    if !kind.is_timed() {
        return Err(Error::invalid(format!("{} is not a timed punishment", kind.label())));
    }

    discipline::record_punishment(pool, guild_id, user_id, moderator_id, kind, reason, now).await?;
    let mute = active_mute::upsert(pool, guild_id, user_id, kind, now + duration).await?;

    Ok(mute)
}

/// Number of mutes and bans a member has received
pub async fn count_total_punishments(
    pool: &SqlitePool,
    guild_id: i64,
    user_id: i64,
) -> Result<i64, Error> {
    Ok(discipline_queries::count_timed(pool, guild_id, user_id).await?)
}

/// Apply a text mute, voice mute or ban on Discord and track it until it expires
#[allow(clippy::too_many_arguments)]
pub async fn apply_punishment(
    ctx: &Context,
    data: &Arc<Data>,
    guild_id: GuildId,
    target_id: UserId,
    moderator_id: UserId,
    kind: PunishmentKind,
    reason: &str,
    duration: Duration,
) -> Result<ActiveMute, Error> {
    match kind {
        PunishmentKind::TextMute | PunishmentKind::VoiceMute => {
            let role_id = mute_role(&data.settings, kind)?;
            ctx.http
                .add_member_role(guild_id, target_id, role_id, Some(reason))
                .await?;
        }
        PunishmentKind::Ban => {
            guild_id.ban_with_reason(ctx, target_id, 0, reason).await?;
        }
        other => {
            return Err(Error::invalid(format!("{} is not a timed punishment", other.label())));
        }
    }

    let mute = record_timed(
        &data.pool,
        guild_id.get() as i64,
        target_id.get() as i64,
        moderator_id.get() as i64,
        kind,
        reason,
        duration,
        Utc::now(),
    )
    .await?;

    info!(
        "{} applied {} to {} in {} until {}",
        moderator_id, kind, target_id, guild_id, mute.ends_at
    );

    mod_log::log_action(
        &ctx.http,
        &data.settings,
        LogEntry {
            moderator_id,
            target_id,
            action: kind.label(),
            reason,
            duration: Some(format_duration(duration)),
        },
    )
    .await;

    Ok(mute)
}

/// Lift a sanction before it expires. Returns false when it was not active.
pub async fn pardon(
    ctx: &Context,
    data: &Arc<Data>,
    guild_id: GuildId,
    target_id: UserId,
    moderator_id: UserId,
    kind: PunishmentKind,
) -> Result<bool, Error> {
    let Some(mute) =
        active_mute::get(&data.pool, guild_id.get() as i64, target_id.get() as i64, kind).await?
    else {
        return Ok(false);
    };

    remove_effect(&ctx.http, &data.settings, &mute, "Lifted by a moderator").await?;
    active_mute::delete(&data.pool, mute.guild_id, mute.user_id, mute.kind).await?;

    info!("{} lifted {} from {} in {}", moderator_id, kind, target_id, guild_id);

    let action = format!("{} lifted", kind.label());
    mod_log::log_action(
        &ctx.http,
        &data.settings,
        LogEntry {
            moderator_id,
            target_id,
            action: &action,
            reason: "Lifted by a moderator",
            duration: None,
        },
    )
    .await;

    Ok(true)
}

/// Undo the Discord side of a sanction
pub async fn remove_effect(
    http: &Http,
    settings: &Settings,
    mute: &ActiveMute,
    reason: &str,
) -> Result<(), Error> {
    let guild_id = GuildId::new(mute.guild_id as u64);
    let user_id = UserId::new(mute.user_id as u64);

    match mute.kind {
        PunishmentKind::TextMute | PunishmentKind::VoiceMute => {
            let role_id = mute_role(settings, mute.kind)?;
            http.remove_member_role(guild_id, user_id, role_id, Some(reason))
                .await?;
        }
        PunishmentKind::Ban => {
            guild_id.unban(http, user_id).await?;
        }
        other => {
            warn!("Ignoring non-timed {} in active mutes for {}", other, user_id);
        }
    }

    debug!("Removed {} from {} in {}", mute.kind, user_id, guild_id);
    Ok(())
}

fn mute_role(settings: &Settings, kind: PunishmentKind) -> Result<RoleId, Error> {
    let role = match kind {
        PunishmentKind::TextMute => settings.text_mute_role_id,
        PunishmentKind::VoiceMute => settings.voice_mute_role_id,
        _ => None,
    };

    role.map(RoleId::new)
        .ok_or_else(|| Error::invalid(format!("{} role is not configured", kind.label())))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::db::pool::test_pool;

    #[tokio::test]
    async fn test_record_timed_tracks_and_logs() {
        let pool = test_pool().await;
        let now = Utc.with_ymd_and_hms(2025, 5, 1, 8, 0, 0).unwrap();

        let mute = record_timed(
            &pool,
            1,
            2,
            3,
            PunishmentKind::TextMute,
            "flood",
            Duration::minutes(30),
            now,
        )
        .await
        .unwrap();
        assert_eq!(mute.ends_at, now + Duration::minutes(30));

        // Re-muting replaces the end time instead of stacking rows
        record_timed(
            &pool,
            1,
            2,
            3,
            PunishmentKind::TextMute,
            "flood again",
            Duration::hours(2),
            now,
        )
        .await
        .unwrap();

        let active = active_mute::list_for_user(&pool, 1, 2).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].ends_at, now + Duration::hours(2));
        assert_eq!(count_total_punishments(&pool, 1, 2).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_record_timed_rejects_ledger_kinds() {
        let pool = test_pool().await;
        let err = record_timed(
            &pool,
            1,
            2,
            3,
            PunishmentKind::Warning,
            "",
            Duration::minutes(5),
            Utc::now(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::InvalidOperation(_)));
    }

    #[tokio::test]
    async fn test_expired_listing() {
        let pool = test_pool().await;
        let now = Utc.with_ymd_and_hms(2025, 5, 1, 8, 0, 0).unwrap();

        record_timed(&pool, 1, 2, 3, PunishmentKind::VoiceMute, "", Duration::minutes(10), now)
            .await
            .unwrap();
        record_timed(&pool, 1, 4, 3, PunishmentKind::Ban, "", Duration::days(1), now)
            .await
            .unwrap();

        let later = now + Duration::minutes(10);
        let expired = active_mute::list_expired(&pool, later).await.unwrap();
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].user_id, 2);
        assert_eq!(expired[0].kind, PunishmentKind::VoiceMute);

        assert!(active_mute::delete(&pool, 1, 2, PunishmentKind::VoiceMute).await.unwrap());
        assert!(!active_mute::delete(&pool, 1, 2, PunishmentKind::VoiceMute).await.unwrap());
    }
}
