use chrono::Utc;
use poise::serenity_prelude::User;

use crate::bot::data::Context;
use crate::bot::error::Error;
use crate::components::marriage_prompt;
use crate::constants::embeds;
use crate::constants::timeouts::{format_seconds, PROPOSAL_TIMEOUT_SECONDS};
use crate::db::queries::love as love_queries;
use crate::services::love::{couple_service, sessions};
use crate::utils::formatting::{format_coins, mention_id};

/// Show your couple, or update its description
#[poise::command(slash_command, guild_only)]
pub async fn love(
    ctx: Context<'_>,
    #[description = "New couple description"]
    #[max_length = 100]
    description: Option<String>,
) -> Result<(), Error> {
    let pool = &ctx.data().pool;
    let author = ctx.author().id.get() as i64;

    let couple = match description {
        Some(text) => couple_service::set_description(pool, author, &text).await?,
        None => couple_service::couple_of(pool, author)
            .await?
            .ok_or_else(|| Error::invalid("You are not in a couple. Propose with /marry"))?,
    };

    let partner = couple.partner_of(author).unwrap_or(couple.user2_id);
    let together = sessions::total_time(pool, couple.id).await?;
    let running = love_queries::get_session(pool, couple.id).await?;
    let access = love_queries::get_access(pool, author).await?;

    let mut embed = embeds::love_embed()
        .title("💞 Couple")
        .description(format!(
            "{} & {}\n*{}*",
            mention_id(author),
            mention_id(partner),
            couple.description
        ))
        .field("Together since", format!("<t:{}:D>", couple.created_at.timestamp()), true)
        .field("Time in voice", format_seconds(together), true);

    if let Some(session) = running {
        embed = embed.field(
            "Now",
            format!("Together in <#{}> since <t:{}:R>", session.channel_id, session.started_at.timestamp()),
            false,
        );
    }
    let access_text = match access {
        Some(a) if a.expires_at > Utc::now() => format!("Until <t:{}:D>", a.expires_at.timestamp()),
        _ => "None, buy it with /love_access".to_string(),
    };
    embed = embed.field("Love room", access_text, false);

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Propose to another member
#[poise::command(slash_command, guild_only)]
pub async fn marry(
    ctx: Context<'_>,
    #[description = "Member to propose to"] user: User,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or(Error::custom("Not in a guild"))?;
    let data = ctx.data();
    if user.bot {
        return Err(Error::invalid("Bots cannot marry"));
    }

    couple_service::check_proposal(
        &data.pool,
        &data.settings.love,
        guild_id.get() as i64,
        ctx.author().id.get() as i64,
        user.id.get() as i64,
    )
    .await?;

    if data.has_pending_proposal(guild_id.get(), user.id.get()) {
        return Err(Error::invalid("That member already has a proposal waiting"));
    }
    data.add_proposal(guild_id.get(), user.id.get(), ctx.author().id.get());

    let embed = embeds::love_embed()
        .title("💍 Proposal")
        .description(format!(
            "<@{}>, <@{}> wants to be your partner.\nThe wedding costs {}, paid by <@{}>.",
            user.id,
            ctx.author().id,
            format_coins(data.settings.love.marry_cost),
            ctx.author().id
        ))
        .footer(poise::serenity_prelude::CreateEmbedFooter::new(format!(
            "Answer within {} seconds",
            PROPOSAL_TIMEOUT_SECONDS
        )));

    ctx.send(
        poise::CreateReply::default()
            .content(format!("<@{}>", user.id))
            .embed(embed)
            .components(vec![marriage_prompt::buttons(ctx.author().id, user.id)]),
    )
    .await?;
    Ok(())
}

/// End your couple
#[poise::command(slash_command, guild_only)]
pub async fn divorce(ctx: Context<'_>) -> Result<(), Error> {
    let author = ctx.author().id.get() as i64;
    let couple = couple_service::divorce(&ctx.data().pool, author).await?;
    let partner = couple.partner_of(author).unwrap_or(couple.user2_id);

    let embed = embeds::standard_embed()
        .title("Divorced")
        .description(format!("{} and {} went separate ways.", mention_id(author), mention_id(partner)));
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Buy access to the love room
#[poise::command(slash_command, guild_only)]
pub async fn love_access(
    ctx: Context<'_>,
    #[description = "Months to buy"]
    #[min = 1]
    #[max = 12]
    months: Option<i64>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or(Error::custom("Not in a guild"))?;
    let data = ctx.data();
    let months = months.unwrap_or(1);

    let access = couple_service::buy_room_access(
        &data.pool,
        &data.settings.love,
        guild_id.get() as i64,
        ctx.author().id.get() as i64,
        months,
        Utc::now(),
    )
    .await?;

    let embed = embeds::love_embed()
        .title("Love Room Access")
        .description(format!(
            "Paid {} for {} month(s). Access runs until <t:{}:D>.",
            format_coins(data.settings.love.room_access_cost * months),
            months,
            access.expires_at.timestamp()
        ));
    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}
