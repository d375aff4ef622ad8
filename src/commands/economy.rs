use chrono::Utc;
use poise::serenity_prelude::{CreateEmbedFooter, User};

use crate::bot::data::Context;
use crate::bot::error::Error;
use crate::constants::embeds;
use crate::constants::timeouts::format_seconds;
use crate::db::models::Cooldown;
use crate::db::queries::account::{self, Leaderboard};
use crate::services::economy::levels::xp_to_next;
use crate::services::economy::rewards::{self, Reward};
use crate::services::economy::robbery::{self, RobOutcome, RobRoll};
use crate::services::economy::wallet;
use crate::utils::formatting::{format_coins, format_number, mention_id, rank_label};
use crate::utils::permissions::ensure_access;

const TOP_LIMIT: i64 = 10;

/// Show a member's wallet and progress
#[poise::command(slash_command, guild_only)]
pub async fn balance(
    ctx: Context<'_>,
    #[description = "Member (defaults to you)"] user: Option<User>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or(Error::custom("Not in a guild"))?;
    let target = user.unwrap_or_else(|| ctx.author().clone());
    let data = ctx.data();
    let (guild, member) = (guild_id.get() as i64, target.id.get() as i64);

    let acc = account::get_or_create(&data.pool, guild, member).await?;
    let rank = account::rank(&data.pool, guild, member, Leaderboard::Balance).await?;
    let needed = xp_to_next(acc.level, &data.settings.economy.xp_per_level);

    let mut embed = embeds::economy_embed()
        .title(format!("Balance: {}", target.name))
        .field("Cash", format_coins(acc.cash), true)
        .field("Bank", format_coins(acc.bank), true)
        .field("Total", format_coins(acc.balance()), true)
        .field("Level", format!("{} ({:.1}/{:.0} XP)", acc.level, acc.xp, needed), true)
        .field("Voice", format_seconds(acc.voice_seconds), true)
        .field("Messages", format_number(acc.messages_sent), true)
        .field(
            "Robberies",
            format!(
                "{} total, {} successful, {} arrests",
                acc.robberies_total, acc.robberies_success, acc.robberies_arrest
            ),
            false,
        );
    if let Some(rank) = rank {
        embed = embed.footer(CreateEmbedFooter::new(format!("Rank #{} by balance", rank)));
    }
    if acc.is_arrested(Utc::now()) {
        if let Some(until) = acc.arrest_until {
            embed = embed.description(format!("🚔 Under arrest until <t:{}:R>", until.timestamp()));
        }
    }

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

async fn claim_reward(ctx: Context<'_>, reward: Reward) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or(Error::custom("Not in a guild"))?;
    let data = ctx.data();
    let settings = &data.settings.economy;

    let payout = {
        let mut rng = rand::rng();
        rewards::roll_payout(settings, reward, &mut rng)
    };

    let claim = rewards::claim(
        &data.pool,
        settings,
        guild_id.get() as i64,
        ctx.author().id.get() as i64,
        reward,
        payout,
        Utc::now(),
    )
    .await?;

    let (title, description) = match &claim.job {
        Some(job) => (
            format!("Worked as {}", job.name),
            format!("{}.\nYou earned {}.", job.description, format_coins(claim.amount)),
        ),
        None => (
            format!("{:?} Reward", reward),
            format!("You received {}.", format_coins(claim.amount)),
        ),
    };

    let embed = embeds::economy_embed()
        .title(title)
        .description(description)
        .field("Bank", format_coins(claim.bank), true)
        .field("Next", format!("<t:{}:R>", claim.next_at.timestamp()), true);

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Claim the daily reward
#[poise::command(slash_command, guild_only)]
pub async fn daily(ctx: Context<'_>) -> Result<(), Error> {
    claim_reward(ctx, Reward::Daily).await
}

/// Work a shift for coins
#[poise::command(slash_command, guild_only)]
pub async fn work(ctx: Context<'_>) -> Result<(), Error> {
    claim_reward(ctx, Reward::Work).await
}

/// Claim the weekly reward
#[poise::command(slash_command, guild_only)]
pub async fn weekly(ctx: Context<'_>) -> Result<(), Error> {
    claim_reward(ctx, Reward::Weekly).await
}

/// Move cash into the bank
#[poise::command(slash_command, guild_only)]
pub async fn deposit(
    ctx: Context<'_>,
    #[description = "Amount"]
    #[min = 1]
    amount: i64,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or(Error::custom("Not in a guild"))?;
    let acc = wallet::deposit(
        &ctx.data().pool,
        guild_id.get() as i64,
        ctx.author().id.get() as i64,
        amount,
    )
    .await?;

    let embed = embeds::success_embed()
        .title("Deposited")
        .description(format!("Moved {} into the bank.", format_coins(amount)))
        .field("Cash", format_coins(acc.cash), true)
        .field("Bank", format_coins(acc.bank), true);

    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}

/// Take cash out of the bank
#[poise::command(slash_command, guild_only)]
pub async fn withdraw(
    ctx: Context<'_>,
    #[description = "Amount"]
    #[min = 1]
    amount: i64,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or(Error::custom("Not in a guild"))?;
    let acc = wallet::withdraw(
        &ctx.data().pool,
        guild_id.get() as i64,
        ctx.author().id.get() as i64,
        amount,
    )
    .await?;

    let embed = embeds::success_embed()
        .title("Withdrawn")
        .description(format!("Took {} out of the bank.", format_coins(amount)))
        .field("Cash", format_coins(acc.cash), true)
        .field("Bank", format_coins(acc.bank), true);

    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}

/// Try to steal cash from another member
#[poise::command(slash_command, guild_only)]
pub async fn rob(
    ctx: Context<'_>,
    #[description = "Member to rob"] user: User,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or(Error::custom("Not in a guild"))?;
    if user.bot {
        return Err(Error::invalid("Bots carry no cash"));
    }

    let roll = {
        let mut rng = rand::rng();
        RobRoll::roll(&mut rng)
    };

    let data = ctx.data();
    let outcome = robbery::rob(
        &data.pool,
        &data.settings.economy,
        guild_id.get() as i64,
        ctx.author().id.get() as i64,
        user.id.get() as i64,
        roll,
        Utc::now(),
    )
    .await?;

    let embed = match outcome {
        RobOutcome::Success { loot, next_at } => embeds::success_embed()
            .title("Robbery Succeeded")
            .description(format!(
                "You took {} from <@{}>.\nNext attempt <t:{}:R>.",
                format_coins(loot),
                user.id,
                next_at.timestamp()
            )),
        RobOutcome::Arrested { until } => embeds::error_embed()
            .title("Arrested")
            .description(format!(
                "<@{}> called the police. You are locked up until <t:{}:f>.",
                user.id,
                until.timestamp()
            )),
        RobOutcome::Escaped { next_at } => embeds::warning_embed()
            .title("Robbery Failed")
            .description(format!(
                "<@{}> fought you off, but you got away.\nNext attempt <t:{}:R>.",
                user.id,
                next_at.timestamp()
            )),
    };

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Release a member from arrest
#[poise::command(slash_command, guild_only)]
pub async fn unarrest(
    ctx: Context<'_>,
    #[description = "Member"] user: User,
) -> Result<(), Error> {
    ensure_access(ctx, &ctx.data().settings.roles.economy_admin).await?;
    let guild_id = ctx.guild_id().ok_or(Error::custom("Not in a guild"))?;

    if !robbery::unarrest(&ctx.data().pool, guild_id.get() as i64, user.id.get() as i64).await? {
        return Err(Error::not_found("account"));
    }

    let embed = embeds::success_embed().description(format!("<@{}> is free to go", user.id));
    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}

/// Change a member's cash and bank
#[poise::command(slash_command, guild_only)]
pub async fn money(
    ctx: Context<'_>,
    #[description = "Member"] user: User,
    #[description = "Change to cash (may be negative)"] cash: Option<i64>,
    #[description = "Change to bank (may be negative)"] bank: Option<i64>,
) -> Result<(), Error> {
    ensure_access(ctx, &ctx.data().settings.roles.economy_admin).await?;
    let guild_id = ctx.guild_id().ok_or(Error::custom("Not in a guild"))?;

    let acc = wallet::adjust(
        &ctx.data().pool,
        guild_id.get() as i64,
        user.id.get() as i64,
        cash.unwrap_or(0),
        bank.unwrap_or(0),
    )
    .await?;

    let embed = embeds::success_embed()
        .title("Balance Adjusted")
        .description(format!("<@{}>", user.id))
        .field("Cash", format_coins(acc.cash), true)
        .field("Bank", format_coins(acc.bank), true);

    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}

#[derive(Debug, Clone, Copy, poise::ChoiceParameter)]
pub enum BoardChoice {
    Balance,
    Level,
    Voice,
    Messages,
    Robberies,
}

impl From<BoardChoice> for Leaderboard {
    fn from(choice: BoardChoice) -> Self {
        match choice {
            BoardChoice::Balance => Leaderboard::Balance,
            BoardChoice::Level => Leaderboard::Level,
            BoardChoice::Voice => Leaderboard::Voice,
            BoardChoice::Messages => Leaderboard::Messages,
            BoardChoice::Robberies => Leaderboard::Robberies,
        }
    }
}

fn board_value(board: Leaderboard, acc: &crate::db::models::Account) -> String {
    match board {
        Leaderboard::Balance => format_coins(acc.balance()),
        Leaderboard::Level => format!("level {}", acc.level),
        Leaderboard::Voice => format_seconds(acc.voice_seconds),
        Leaderboard::Messages => format!("{} messages", format_number(acc.messages_sent)),
        Leaderboard::Robberies => format!("{} robberies", acc.robberies_success),
    }
}

/// Show the server leaderboard
#[poise::command(slash_command, guild_only)]
pub async fn top(
    ctx: Context<'_>,
    #[description = "Leaderboard"] board: Option<BoardChoice>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or(Error::custom("Not in a guild"))?;
    let choice = board.unwrap_or(BoardChoice::Balance);
    let board = Leaderboard::from(choice);
    let data = ctx.data();
    let guild = guild_id.get() as i64;

    let accounts = account::top(&data.pool, guild, board, TOP_LIMIT).await?;
    let description = if accounts.is_empty() {
        "Nobody is on this board yet.".to_string()
    } else {
        accounts
            .iter()
            .enumerate()
            .map(|(i, acc)| {
                format!(
                    "{} {} {}",
                    rank_label(i + 1),
                    mention_id(acc.user_id),
                    board_value(board, acc)
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    let mut embed = embeds::economy_embed()
        .title(format!("Top: {}", poise::ChoiceParameter::name(&choice)))
        .description(description);
    if let Some(rank) = account::rank(&data.pool, guild, ctx.author().id.get() as i64, board).await? {
        embed = embed.footer(CreateEmbedFooter::new(format!("Your rank: #{}", rank)));
    }

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Turn cooldown reminders by DM on or off
#[poise::command(slash_command, guild_only)]
pub async fn notifications(
    ctx: Context<'_>,
    #[description = "Send reminders"] enabled: bool,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or(Error::custom("Not in a guild"))?;
    account::set_notifications(
        &ctx.data().pool,
        guild_id.get() as i64,
        ctx.author().id.get() as i64,
        enabled,
    )
    .await?;

    let embed = embeds::success_embed().description(if enabled {
        "Reminders are on. You will get a DM when a reward is ready."
    } else {
        "Reminders are off."
    });
    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}

#[derive(Debug, Clone, Copy, poise::ChoiceParameter)]
pub enum CooldownChoice {
    All,
    Daily,
    Work,
    Weekly,
    Rob,
}

impl CooldownChoice {
    fn kinds(self) -> Vec<Cooldown> {
        match self {
            CooldownChoice::All => Cooldown::ALL.to_vec(),
            CooldownChoice::Daily => vec![Cooldown::Daily],
            CooldownChoice::Work => vec![Cooldown::Work],
            CooldownChoice::Weekly => vec![Cooldown::Weekly],
            CooldownChoice::Rob => vec![Cooldown::Rob],
        }
    }
}

/// Inspect or reset reward cooldowns
#[poise::command(slash_command, subcommands("cooldowns_check", "cooldowns_reset"), guild_only)]
pub async fn cooldowns(ctx: Context<'_>) -> Result<(), Error> {
    ctx.say("Use `/cooldowns check` or `/cooldowns reset`").await?;
    Ok(())
}

/// Show when each reward is ready again
#[poise::command(slash_command, guild_only, rename = "check")]
pub async fn cooldowns_check(
    ctx: Context<'_>,
    #[description = "Member"] user: User,
) -> Result<(), Error> {
    ensure_access(ctx, &ctx.data().settings.roles.economy_admin).await?;
    let guild_id = ctx.guild_id().ok_or(Error::custom("Not in a guild"))?;

    let now = Utc::now();
    let state = rewards::cooldowns(&ctx.data().pool, guild_id.get() as i64, user.id.get() as i64, now)
        .await?;
    let lines: Vec<String> = state
        .iter()
        .map(|(kind, left)| match left {
            Some(seconds) => format!("**{}**: {}", kind.as_str(), format_seconds(*seconds)),
            None => format!("**{}**: ready", kind.as_str()),
        })
        .collect();

    let embed = embeds::info_embed()
        .title(format!("Cooldowns: {}", user.name))
        .description(embeds::bullet_list(&lines));
    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}

/// Make rewards available again for a member
#[poise::command(slash_command, guild_only, rename = "reset")]
pub async fn cooldowns_reset(
    ctx: Context<'_>,
    #[description = "Member"] user: User,
    #[description = "Cooldown to reset"] kind: CooldownChoice,
) -> Result<(), Error> {
    ensure_access(ctx, &ctx.data().settings.roles.economy_admin).await?;
    let guild_id = ctx.guild_id().ok_or(Error::custom("Not in a guild"))?;

    let kinds = kind.kinds();
    if !rewards::reset_cooldowns(&ctx.data().pool, guild_id.get() as i64, user.id.get() as i64, &kinds)
        .await?
    {
        return Err(Error::not_found("account"));
    }

    let names: Vec<&str> = kinds.iter().map(|k| k.as_str()).collect();
    let embed = embeds::success_embed().description(format!(
        "Reset {} for <@{}>",
        names.join(", "),
        user.id
    ));
    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}
