use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serenity::all::{Context, Guild, GuildId, UserId, VoiceState};
use tracing::{debug, error, info};

use crate::bot::data::Data;
use crate::bot::error::Error;
use crate::constants::embeds;
use crate::services::economy::activity;
use crate::services::love::{couple_service, sessions};
use crate::utils::notify;

pub async fn handle_voice_state_update(
    ctx: &Context,
    data: &Arc<Data>,
    old: Option<&VoiceState>,
    new: &VoiceState,
) -> Result<(), Error> {
    let guild_id = match new.guild_id {
        Some(id) => id,
        None => return Ok(()),
    };

    if new.member.as_ref().map(|m| m.user.bot).unwrap_or(false) {
        return Ok(());
    }

    let user_id = new.user_id;
    let old_channel = old.and_then(|o| o.channel_id);
    let new_channel = new.channel_id;

    // Mute and deafen toggles arrive as voice state updates too
    if old_channel == new_channel {
        return Ok(());
    }

    let now = Utc::now();
    let gid = guild_id.get() as i64;
    let uid = user_id.get() as i64;

    if old_channel.is_some() {
        if let Some((seconds, change)) =
            activity::voice_left(&data.pool, &data.settings.economy, gid, uid, now).await?
        {
            debug!("{} spent {}s in voice", user_id, seconds);
            if change.leveled_up() {
                info!("{} reached level {} in {} through voice", user_id, change.to, guild_id);
            }
        }
    }

    if let Some(channel_id) = new_channel {
        if Some(channel_id.get()) == data.settings.love.lobby_channel_id
            && !lobby_allowed(data, uid).await?
        {
            info!("Disconnecting {} from the love lobby", user_id);
            guild_id.disconnect_member(ctx, user_id).await?;
            let embed = embeds::warning_embed()
                .title("Love Lobby")
                .description("The love lobby is for couples with room access. See `/love_access`.");
            notify::dm(&ctx.http, user_id, embed).await;
            return sync_love(ctx, data, guild_id, user_id, None).await;
        }

        activity::voice_joined(&data.pool, gid, uid, channel_id.get() as i64, now).await?;
    }

    sync_love(ctx, data, guild_id, user_id, new_channel.map(|c| c.get())).await
}

async fn lobby_allowed(data: &Arc<Data>, user_id: i64) -> Result<bool, Error> {
    if couple_service::couple_of(&data.pool, user_id).await?.is_none() {
        return Ok(false);
    }
    couple_service::has_access(&data.pool, user_id, Utc::now()).await
}

/// Start, move or end the session of the member's couple
async fn sync_love(
    ctx: &Context,
    data: &Arc<Data>,
    guild_id: GuildId,
    user_id: UserId,
    user_channel: Option<u64>,
) -> Result<(), Error> {
    let Some(couple) = couple_service::couple_of(&data.pool, user_id.get() as i64).await? else {
        return Ok(());
    };
    let Some(partner_id) = couple.partner_of(user_id.get() as i64) else {
        return Ok(());
    };

    let partner_channel = {
        let Some(guild) = ctx.cache.guild(guild_id) else {
            debug!("Guild {} not cached, skipping love sync", guild_id);
            return Ok(());
        };
        guild
            .voice_states
            .get(&UserId::new(partner_id as u64))
            .and_then(|vs| vs.channel_id)
            .map(|c| c.get())
    };

    let action =
        sessions::sync_couple(&data.pool, &couple, user_channel, partner_channel, Utc::now()).await?;
    debug!("Couple {} session: {:?}", couple.id, action);

    Ok(())
}

/// Re-seed voice tracking from a guild snapshot after (re)connecting
pub async fn seed_guild(data: &Arc<Data>, guild: &Guild) {
    let now = Utc::now();
    let gid = guild.id.get() as i64;

    let channels: HashMap<UserId, u64> = guild
        .voice_states
        .iter()
        .filter_map(|(user_id, vs)| vs.channel_id.map(|c| (*user_id, c.get())))
        .filter(|(user_id, _)| {
            guild
                .members
                .get(user_id)
                .map(|m| !m.user.bot)
                .unwrap_or(true)
        })
        .collect();

    for (user_id, channel_id) in &channels {
        let uid = user_id.get() as i64;
        if let Err(e) =
            activity::voice_joined(&data.pool, gid, uid, *channel_id as i64, now).await
        {
            error!("Failed to seed voice presence of {}: {:?}", user_id, e);
            continue;
        }

        let couple = match couple_service::couple_of(&data.pool, uid).await {
            Ok(Some(couple)) => couple,
            Ok(None) => continue,
            Err(e) => {
                error!("Failed to look up couple of {}: {:?}", user_id, e);
                continue;
            }
        };
        let partner_channel = couple
            .partner_of(uid)
            .and_then(|p| channels.get(&UserId::new(p as u64)).copied());

        if let Err(e) =
            sessions::sync_couple(&data.pool, &couple, Some(*channel_id), partner_channel, now).await
        {
            error!("Failed to sync couple {}: {:?}", couple.id, e);
        }
    }

    if !channels.is_empty() {
        info!("Seeded {} voice members in {}", channels.len(), guild.id);
    }
}
