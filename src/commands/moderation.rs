use chrono::Utc;
use poise::serenity_prelude::{GetMessages, MessageId, User};

use crate::bot::data::Context;
use crate::bot::error::Error;
use crate::constants::embeds;
use crate::db::models::PunishmentKind;
use crate::db::queries::active_mute;
use crate::services::discipline;
use crate::services::moderation::duration::{format_duration, parse_duration};
use crate::services::moderation::mod_log::{self, LogEntry};
use crate::services::moderation::punishment_service;
use crate::utils::permissions::ensure_access;

const MAX_CLEAR: u8 = 100;

/// Timed punishments a moderator can hand out
#[derive(Debug, Clone, Copy, poise::ChoiceParameter)]
pub enum PunishmentChoice {
    #[name = "Text mute"]
    TextMute,
    #[name = "Voice mute"]
    VoiceMute,
    Ban,
}

impl From<PunishmentChoice> for PunishmentKind {
    fn from(choice: PunishmentChoice) -> Self {
        match choice {
            PunishmentChoice::TextMute => PunishmentKind::TextMute,
            PunishmentChoice::VoiceMute => PunishmentKind::VoiceMute,
            PunishmentChoice::Ban => PunishmentKind::Ban,
        }
    }
}

/// Mute or ban a member for a while
#[poise::command(slash_command, guild_only)]
pub async fn punish(
    ctx: Context<'_>,
    #[description = "Member to punish"] user: User,
    #[description = "Punishment"] kind: PunishmentChoice,
    #[description = "Duration such as 30m, 2h or 7d"] duration: String,
    #[description = "Reason"] reason: String,
) -> Result<(), Error> {
    ensure_access(ctx, &ctx.data().settings.roles.moderate).await?;
    let guild_id = ctx.guild_id().ok_or(Error::custom("Not in a guild"))?;
    if user.id == ctx.author().id {
        return Err(Error::invalid("You cannot punish yourself"));
    }
    if user.bot {
        return Err(Error::invalid("Bots cannot be punished"));
    }

    let kind = PunishmentKind::from(kind);
    let length = parse_duration(&duration);
    let mute = punishment_service::apply_punishment(
        ctx.serenity_context(),
        ctx.data(),
        guild_id,
        user.id,
        ctx.author().id,
        kind,
        &reason,
        length,
    )
    .await?;

    let embed = embeds::success_embed()
        .title(format!("{} Applied", kind.label()))
        .description(format!(
            "<@{}> for {} (until <t:{}:f>)",
            user.id,
            format_duration(length),
            mute.ends_at.timestamp()
        ))
        .field("Reason", reason, false);

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Lift a mute or ban early
#[poise::command(slash_command, guild_only)]
pub async fn pardon(
    ctx: Context<'_>,
    #[description = "Member"] user: User,
    #[description = "Punishment to lift"] kind: PunishmentChoice,
) -> Result<(), Error> {
    ensure_access(ctx, &ctx.data().settings.roles.moderate).await?;
    let guild_id = ctx.guild_id().ok_or(Error::custom("Not in a guild"))?;

    let kind = PunishmentKind::from(kind);
    let lifted = punishment_service::pardon(
        ctx.serenity_context(),
        ctx.data(),
        guild_id,
        user.id,
        ctx.author().id,
        kind,
    )
    .await?;
    if !lifted {
        return Err(Error::invalid(format!(
            "<@{}> has no active {}",
            user.id,
            kind.label().to_lowercase()
        )));
    }

    let embed = embeds::success_embed()
        .title("Punishment Lifted")
        .description(format!("{} lifted for <@{}>", kind.label(), user.id));

    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}

/// Moderation overview for a member
#[poise::command(slash_command, guild_only)]
pub async fn moderate(
    ctx: Context<'_>,
    #[description = "Member"] user: User,
) -> Result<(), Error> {
    ensure_access(ctx, &ctx.data().settings.roles.moderate).await?;
    let guild_id = ctx.guild_id().ok_or(Error::custom("Not in a guild"))?;
    let pool = &ctx.data().pool;
    let (guild, member) = (guild_id.get() as i64, user.id.get() as i64);

    let active = active_mute::list_for_user(pool, guild, member).await?;
    let total = punishment_service::count_total_punishments(pool, guild, member).await?;
    let summary = discipline::summary(pool, guild, member, Utc::now()).await?;

    let active_text = if active.is_empty() {
        "None".to_string()
    } else {
        let lines: Vec<String> = active
            .iter()
            .map(|m| format!("{} until <t:{}:f>", m.kind.label(), m.ends_at.timestamp()))
            .collect();
        embeds::bullet_list(&lines)
    };

    let embed = embeds::standard_embed()
        .title(format!("Moderation: {}", user.name))
        .field("Active", active_text, false)
        .field("Mutes and bans", total.to_string(), true)
        .field("Warnings", summary.warnings.to_string(), true)
        .field("Strikes", summary.strikes.to_string(), true)
        .field("Praises", summary.praises.to_string(), true);

    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}

/// Delete recent messages in this channel
#[poise::command(slash_command, guild_only)]
pub async fn clear(
    ctx: Context<'_>,
    #[description = "Number of messages"]
    #[min = 1]
    #[max = 100]
    amount: u8,
) -> Result<(), Error> {
    ensure_access(ctx, &ctx.data().settings.roles.clear).await?;
    ctx.defer_ephemeral().await?;

    let channel_id = ctx.channel_id();
    let messages = channel_id
        .messages(ctx, GetMessages::new().limit(amount.min(MAX_CLEAR)))
        .await?;
    let ids: Vec<MessageId> = messages.iter().map(|m| m.id).collect();

    match ids.as_slice() {
        [] => {}
        [single] => channel_id.delete_message(ctx, *single).await?,
        many => channel_id.delete_messages(ctx, many).await?,
    }

    mod_log::log_action(
        &ctx.serenity_context().http,
        &ctx.data().settings,
        LogEntry {
            moderator_id: ctx.author().id,
            target_id: ctx.author().id,
            action: "Messages cleared",
            reason: &format!("{} messages in <#{}>", ids.len(), channel_id),
            duration: None,
        },
    )
    .await;

    let embed = embeds::success_embed().description(format!("Deleted {} messages", ids.len()));
    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}
