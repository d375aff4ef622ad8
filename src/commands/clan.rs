use chrono::Utc;
use poise::serenity_prelude::{CreateEmbedFooter, User};

use crate::bot::data::Context;
use crate::bot::error::Error;
use crate::components::clan_invite;
use crate::constants::embeds;
use crate::db::models::{Clan, ClanRole};
use crate::services::clans::clan_service;
use crate::utils::formatting::{format_coins, mention_id, rank_label, truncate};

const TOP_LIMIT: i64 = 10;
const MEMBER_LIST_LIMIT: usize = 25;

/// Clan commands
#[poise::command(
    slash_command,
    subcommands("create", "info", "invite", "kick", "leave", "promote", "edit", "slots", "voice", "top"),
    guild_only
)]
pub async fn clan(ctx: Context<'_>) -> Result<(), Error> {
    ctx.say("Use one of the subcommands, for example `/clan info`").await?;
    Ok(())
}

async fn own_clan(ctx: Context<'_>) -> Result<Clan, Error> {
    clan_service::clan_of(&ctx.data().pool, ctx.author().id.get() as i64)
        .await?
        .ok_or_else(|| Error::invalid("You are not in a clan"))
}

/// Found a new clan
#[poise::command(slash_command, guild_only)]
pub async fn create(
    ctx: Context<'_>,
    #[description = "Clan name"]
    #[max_length = 32]
    name: String,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or(Error::custom("Not in a guild"))?;
    let data = ctx.data();

    let created = clan_service::create(
        &data.pool,
        &data.settings.clans,
        guild_id.get() as i64,
        ctx.author().id.get() as i64,
        &name,
        Utc::now(),
    )
    .await?;

    let embed = embeds::clan_embed(&created.color)
        .title(format!("{} Founded", created.display_name()))
        .description(format!(
            "You paid {}. Upkeep is {} per month from your cash.",
            format_coins(data.settings.clans.create_cost),
            format_coins(data.settings.clans.monthly_cost)
        ));

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Show a clan
#[poise::command(slash_command, guild_only)]
pub async fn info(
    ctx: Context<'_>,
    #[description = "Clan name (defaults to yours)"] name: Option<String>,
) -> Result<(), Error> {
    let pool = &ctx.data().pool;
    let found = match name {
        Some(name) => clan_service::by_name(pool, &name)
            .await?
            .ok_or_else(|| Error::not_found(format!("clan \"{}\"", name)))?,
        None => own_clan(ctx).await?,
    };

    let members = clan_service::members(pool, found.id).await?;
    let roster: Vec<String> = members
        .iter()
        .take(MEMBER_LIST_LIMIT)
        .map(|m| match m.role {
            ClanRole::Owner => format!("👑 {}", mention_id(m.user_id)),
            ClanRole::Officer => format!("⭐ {}", mention_id(m.user_id)),
            ClanRole::Member => mention_id(m.user_id),
        })
        .collect();

    let embed = embeds::clan_embed(&found.color)
        .title(found.display_name())
        .description(truncate(&found.description, 300))
        .field("Owner", mention_id(found.owner_id), true)
        .field(
            "Members",
            format!("{}/{}", members.len(), found.max_members),
            true,
        )
        .field("Voice channels", found.voice_channels_count.to_string(), true)
        .field("Roster", embeds::bullet_list(&roster), false)
        .footer(CreateEmbedFooter::new(format!(
            "Founded {}",
            found.created_at.format("%Y-%m-%d")
        )));

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Invite a member to your clan
#[poise::command(slash_command, guild_only)]
pub async fn invite(
    ctx: Context<'_>,
    #[description = "Member to invite"] user: User,
) -> Result<(), Error> {
    if user.bot {
        return Err(Error::invalid("Bots cannot join clans"));
    }
    let current = own_clan(ctx).await?;
    let target = clan_service::check_invite(
        &ctx.data().pool,
        current.id,
        ctx.author().id.get() as i64,
        user.id.get() as i64,
    )
    .await?;

    let embed = embeds::clan_embed(&target.color)
        .title("Clan Invitation")
        .description(format!(
            "<@{}>, <@{}> invites you to join {}",
            user.id,
            ctx.author().id,
            target.display_name()
        ));

    ctx.send(
        poise::CreateReply::default()
            .content(format!("<@{}>", user.id))
            .embed(embed)
            .components(vec![clan_invite::buttons(target.id, user.id)]),
    )
    .await?;
    Ok(())
}

/// Remove a member from your clan
#[poise::command(slash_command, guild_only)]
pub async fn kick(
    ctx: Context<'_>,
    #[description = "Member to remove"] user: User,
) -> Result<(), Error> {
    let current = own_clan(ctx).await?;
    clan_service::kick(
        &ctx.data().pool,
        current.id,
        ctx.author().id.get() as i64,
        user.id.get() as i64,
    )
    .await?;

    let embed = embeds::success_embed()
        .description(format!("<@{}> was removed from {}", user.id, current.display_name()));
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Leave your clan
#[poise::command(slash_command, guild_only)]
pub async fn leave(ctx: Context<'_>) -> Result<(), Error> {
    let left = clan_service::leave(&ctx.data().pool, ctx.author().id.get() as i64).await?;

    let embed = embeds::success_embed().description(format!("You left {}", left.display_name()));
    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}

#[derive(Debug, Clone, Copy, poise::ChoiceParameter)]
pub enum RankChoice {
    Officer,
    Member,
}

/// Change a member's rank in your clan
#[poise::command(slash_command, guild_only)]
pub async fn promote(
    ctx: Context<'_>,
    #[description = "Member"] user: User,
    #[description = "New rank"] rank: RankChoice,
) -> Result<(), Error> {
    let current = own_clan(ctx).await?;
    let role = match rank {
        RankChoice::Officer => ClanRole::Officer,
        RankChoice::Member => ClanRole::Member,
    };

    clan_service::set_member_role(
        &ctx.data().pool,
        current.id,
        ctx.author().id.get() as i64,
        user.id.get() as i64,
        role,
    )
    .await?;

    let embed = embeds::success_embed().description(format!("<@{}> is now {}", user.id, role));
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Change your clan's description, color or emoji
#[poise::command(slash_command, guild_only)]
pub async fn edit(
    ctx: Context<'_>,
    #[description = "Description"]
    #[max_length = 300]
    description: Option<String>,
    #[description = "Color such as #5865F2"] color: Option<String>,
    #[description = "Emoji"] emoji: Option<String>,
) -> Result<(), Error> {
    let current = own_clan(ctx).await?;
    let updated = clan_service::update_info(
        &ctx.data().pool,
        current.id,
        ctx.author().id.get() as i64,
        description.as_deref(),
        color.as_deref(),
        emoji.as_deref(),
    )
    .await?;

    let embed = embeds::clan_embed(&updated.color)
        .title(updated.display_name())
        .description(updated.description);
    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}

/// Buy more member slots for your clan
#[poise::command(slash_command, guild_only)]
pub async fn slots(ctx: Context<'_>) -> Result<(), Error> {
    let current = own_clan(ctx).await?;
    let settings = &ctx.data().settings.clans;
    let updated = clan_service::buy_member_slots(
        &ctx.data().pool,
        settings,
        current.id,
        ctx.author().id.get() as i64,
    )
    .await?;

    let embed = embeds::success_embed().description(format!(
        "{} now holds {} members (paid {})",
        updated.display_name(),
        updated.max_members,
        format_coins(settings.member_slot_cost)
    ));
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Buy another voice channel for your clan
#[poise::command(slash_command, guild_only)]
pub async fn voice(ctx: Context<'_>) -> Result<(), Error> {
    let current = own_clan(ctx).await?;
    let settings = &ctx.data().settings.clans;
    let updated = clan_service::buy_voice_channel(
        &ctx.data().pool,
        settings,
        current.id,
        ctx.author().id.get() as i64,
    )
    .await?;

    let embed = embeds::success_embed().description(format!(
        "{} now has {}/{} voice channels (paid {})",
        updated.display_name(),
        updated.voice_channels_count,
        settings.max_voice_channels,
        format_coins(settings.voice_channel_cost)
    ));
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Largest clans on the server
#[poise::command(slash_command, guild_only)]
pub async fn top(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or(Error::custom("Not in a guild"))?;
    let standings =
        clan_service::top_by_members(&ctx.data().pool, guild_id.get() as i64, TOP_LIMIT).await?;

    let description = if standings.is_empty() {
        "No clans yet. Found one with `/clan create`.".to_string()
    } else {
        standings
            .iter()
            .enumerate()
            .map(|(i, s)| {
                format!(
                    "{} {} {} ({} members)",
                    rank_label(i + 1),
                    s.emoji,
                    s.name,
                    s.member_count
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    let embed = embeds::standard_embed()
        .title("Top Clans")
        .description(description);
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}
