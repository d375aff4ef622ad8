use chrono::Utc;
use poise::serenity_prelude::{
    AutoArchiveDuration, ChannelType, CreateMessage, CreateThread, EditThread,
};
use tracing::warn;

use crate::bot::data::Context;
use crate::bot::error::Error;
use crate::constants::embeds;
use crate::services::tickets::{self, TicketType};
use crate::utils::formatting::{mention_role, truncate};
use crate::utils::permissions::ensure_access;

#[derive(Debug, Clone, Copy, poise::ChoiceParameter)]
pub enum TicketChoice {
    #[name = "Staff application"]
    StaffApplication,
    #[name = "Server appeal"]
    ServerAppeal,
    #[name = "Moderation appeal"]
    ModerationAppeal,
    #[name = "Tech support"]
    TechSupport,
}

impl From<TicketChoice> for TicketType {
    fn from(choice: TicketChoice) -> Self {
        match choice {
            TicketChoice::StaffApplication => TicketType::StaffApplication,
            TicketChoice::ServerAppeal => TicketType::ServerAppeal,
            TicketChoice::ModerationAppeal => TicketType::ModerationAppeal,
            TicketChoice::TechSupport => TicketType::TechSupport,
        }
    }
}

/// Support tickets
#[poise::command(slash_command, subcommands("open", "close"), guild_only)]
pub async fn ticket(ctx: Context<'_>) -> Result<(), Error> {
    ctx.say("Use `/ticket open` or `/ticket close`").await?;
    Ok(())
}

/// Open a private ticket thread with the staff
#[poise::command(slash_command, guild_only)]
pub async fn open(
    ctx: Context<'_>,
    #[description = "Ticket type"] kind: TicketChoice,
    #[description = "What is it about?"]
    #[max_length = 1000]
    description: String,
    #[description = "Position you apply for (staff applications)"] position: Option<String>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or(Error::custom("Not in a guild"))?;
    let data = ctx.data();
    let author = ctx.author().id;
    let kind = TicketType::from(kind);

    if kind == TicketType::StaffApplication && position.is_none() {
        return Err(Error::invalid("Staff applications need a position"));
    }
    tickets::check_can_open(&data.pool, guild_id.get() as i64, author.get() as i64).await?;
    ctx.defer_ephemeral().await?;

    let number = tickets::next_ticket_number(&data.pool).await?;
    let created = tickets::create(
        &data.pool,
        &number,
        guild_id.get() as i64,
        author.get() as i64,
        kind,
        &description,
        position.as_deref(),
        Utc::now(),
    )
    .await?;
    if !created {
        return Err(Error::custom("Ticket number clash, please try again"));
    }

    let thread = ctx
        .channel_id()
        .create_thread(
            ctx,
            CreateThread::new(format!("{} {}", number, kind.label()))
                .kind(ChannelType::PrivateThread)
                .invitable(false)
                .auto_archive_duration(AutoArchiveDuration::OneWeek),
        )
        .await?;
    thread.id.add_thread_member(ctx, author).await?;

    let pings: Vec<String> = kind
        .staff_roles(&data.settings.tickets)
        .iter()
        .map(|r| mention_role(*r))
        .collect();

    let mut embed = embeds::standard_embed()
        .title(format!("{} • {}", number, kind.label()))
        .description(truncate(&description, 1000))
        .field("Opened by", format!("<@{}>", author), true);
    if let Some(position) = &position {
        embed = embed.field("Position", position, true);
    }

    let mut message = CreateMessage::new().embed(embed);
    if !pings.is_empty() {
        message = message.content(pings.join(" "));
    }
    if let Err(e) = thread.send_message(ctx, message).await {
        warn!("Could not post ticket {} intro: {:?}", number, e);
    }

    let embed = embeds::success_embed()
        .title("Ticket Opened")
        .description(format!("{} is waiting in <#{}>", number, thread.id));
    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}

/// Close a ticket. Inside a ticket thread the number can be left out.
#[poise::command(slash_command, guild_only)]
pub async fn close(
    ctx: Context<'_>,
    #[description = "Ticket number, e.g. TICKET-0001"] number: Option<String>,
) -> Result<(), Error> {
    let data = ctx.data();
    let channel = ctx.channel_id();

    let number = match number {
        Some(n) => n.trim().to_uppercase(),
        None => {
            let name = channel.name(ctx).await?;
            name.split_whitespace()
                .next()
                .filter(|n| n.starts_with("TICKET-"))
                .map(str::to_string)
                .ok_or_else(|| Error::invalid("Give a ticket number or run this inside a ticket"))?
        }
    };

    let found = tickets::get(&data.pool, &number)
        .await?
        .ok_or_else(|| Error::not_found(number.clone()))?;

    if found.user_id != ctx.author().id.get() as i64 {
        let staff = TicketType::parse(&found.ticket_type)
            .map(|t| t.staff_roles(&data.settings.tickets))
            .unwrap_or(&[]);
        ensure_access(ctx, staff).await?;
    }

    if !tickets::close(&data.pool, &number).await? {
        return Err(Error::invalid(format!("{} is already closed", number)));
    }

    let embed = embeds::info_embed()
        .title("Ticket Closed")
        .description(format!("{} was closed by <@{}>", number, ctx.author().id));
    ctx.send(poise::CreateReply::default().embed(embed)).await?;

    if channel
        .name(ctx)
        .await
        .map(|n| n.starts_with(&number))
        .unwrap_or(false)
    {
        if let Err(e) = channel
            .edit_thread(ctx, EditThread::new().archived(true).locked(true))
            .await
        {
            warn!("Could not archive ticket thread {}: {:?}", channel, e);
        }
    }
    Ok(())
}
