use chrono::Utc;
use poise::serenity_prelude::User;

use crate::bot::data::Context;
use crate::bot::error::Error;
use crate::constants::embeds;
use crate::db::models::{DisciplineSummary, PunishmentRecord};
use crate::services::discipline::{
    self, Normalization, PRAISES_PER_WARNING, STRIKE_LIMIT, WARNINGS_PER_STRIKE,
};
use crate::services::moderation::mod_log::{self, LogEntry};
use crate::utils::formatting::{mention_id, truncate};
use crate::utils::permissions::ensure_access;

const HISTORY_PAGE_SIZE: i64 = 10;

fn summary_lines(summary: &DisciplineSummary) -> String {
    format!(
        "⚠️ Warnings {}/{} {}\n⛔ Strikes {}/{} {}\n🌟 Praises {}/{} {}",
        summary.warnings,
        WARNINGS_PER_STRIKE,
        embeds::meter(summary.warnings, WARNINGS_PER_STRIKE),
        summary.strikes,
        STRIKE_LIMIT,
        embeds::meter(summary.strikes, STRIKE_LIMIT),
        summary.praises,
        PRAISES_PER_WARNING,
        embeds::meter(summary.praises, PRAISES_PER_WARNING),
    )
}

fn normalization_note(outcome: &Normalization) -> Option<String> {
    if outcome.is_empty() {
        return None;
    }

    let mut notes = Vec::new();
    if outcome.strikes_issued > 0 {
        notes.push(format!(
            "{} warnings turned into {} strike(s)",
            WARNINGS_PER_STRIKE * outcome.strikes_issued as i64,
            outcome.strikes_issued
        ));
    }
    if outcome.warnings_forgiven > 0 {
        notes.push(format!(
            "{} praises cancelled {} warning(s)",
            PRAISES_PER_WARNING * outcome.warnings_forgiven as i64,
            outcome.warnings_forgiven
        ));
    }
    Some(embeds::bullet_list(&notes))
}

async fn log_mark(ctx: Context<'_>, target: &User, action: &str, reason: &str) {
    let data = ctx.data();
    mod_log::log_action(
        &ctx.serenity_context().http,
        &data.settings,
        LogEntry {
            moderator_id: ctx.author().id,
            target_id: target.id,
            action,
            reason,
            duration: None,
        },
    )
    .await;
}

async fn reply_with_summary(
    ctx: Context<'_>,
    title: &str,
    target: &User,
    reason: &str,
    outcome: Option<Normalization>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or(Error::custom("Not in a guild"))?;
    let summary = discipline::summary(
        &ctx.data().pool,
        guild_id.get() as i64,
        target.id.get() as i64,
        Utc::now(),
    )
    .await?;

    let mut embed = embeds::success_embed()
        .title(title)
        .description(format!("<@{}>\n{}", target.id, summary_lines(&summary)));
    if !reason.is_empty() {
        embed = embed.field("Reason", reason, false);
    }
    if let Some(note) = outcome.as_ref().and_then(normalization_note) {
        embed = embed.field("Adjusted", note, false);
    }

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Give a member a warning
#[poise::command(slash_command, guild_only)]
pub async fn warn(
    ctx: Context<'_>,
    #[description = "Member to warn"] user: User,
    #[description = "Reason"] reason: String,
) -> Result<(), Error> {
    ensure_access(ctx, &ctx.data().settings.roles.warn).await?;
    let guild_id = ctx.guild_id().ok_or(Error::custom("Not in a guild"))?;

    let (_, outcome) = discipline::add_warning(
        &ctx.data().pool,
        guild_id.get() as i64,
        user.id.get() as i64,
        ctx.author().id.get() as i64,
        &reason,
        Utc::now(),
    )
    .await?;

    log_mark(ctx, &user, "Warning", &reason).await;
    reply_with_summary(ctx, "Warning Issued", &user, &reason, Some(outcome)).await
}

/// Remove a member's oldest active warning
#[poise::command(slash_command, guild_only)]
pub async fn warn_remove(
    ctx: Context<'_>,
    #[description = "Member"] user: User,
) -> Result<(), Error> {
    ensure_access(ctx, &ctx.data().settings.roles.warn_remove).await?;
    let guild_id = ctx.guild_id().ok_or(Error::custom("Not in a guild"))?;

    let removed = discipline::remove_one_warning(
        &ctx.data().pool,
        guild_id.get() as i64,
        user.id.get() as i64,
        Utc::now(),
    )
    .await?;
    if !removed {
        return Err(Error::invalid("That member has no active warnings"));
    }

    log_mark(ctx, &user, "Warning removed", "").await;
    reply_with_summary(ctx, "Warning Removed", &user, "", None).await
}

/// Give a member a strike
#[poise::command(slash_command, guild_only)]
pub async fn strike(
    ctx: Context<'_>,
    #[description = "Member to strike"] user: User,
    #[description = "Reason"] reason: String,
) -> Result<(), Error> {
    ensure_access(ctx, &ctx.data().settings.roles.strike).await?;
    let guild_id = ctx.guild_id().ok_or(Error::custom("Not in a guild"))?;

    discipline::add_strike(
        &ctx.data().pool,
        guild_id.get() as i64,
        user.id.get() as i64,
        ctx.author().id.get() as i64,
        &reason,
        Utc::now(),
    )
    .await?;

    log_mark(ctx, &user, "Strike", &reason).await;
    reply_with_summary(ctx, "Strike Issued", &user, &reason, None).await
}

/// Remove a member's oldest active strike
#[poise::command(slash_command, guild_only)]
pub async fn strike_remove(
    ctx: Context<'_>,
    #[description = "Member"] user: User,
) -> Result<(), Error> {
    ensure_access(ctx, &ctx.data().settings.roles.strike).await?;
    let guild_id = ctx.guild_id().ok_or(Error::custom("Not in a guild"))?;

    let removed = discipline::remove_one_strike(
        &ctx.data().pool,
        guild_id.get() as i64,
        user.id.get() as i64,
        Utc::now(),
    )
    .await?;
    if !removed {
        return Err(Error::invalid("That member has no active strikes"));
    }

    log_mark(ctx, &user, "Strike removed", "").await;
    reply_with_summary(ctx, "Strike Removed", &user, "", None).await
}

/// Praise a member for good conduct
#[poise::command(slash_command, guild_only)]
pub async fn praise(
    ctx: Context<'_>,
    #[description = "Member to praise"] user: User,
    #[description = "Reason"] reason: String,
) -> Result<(), Error> {
    ensure_access(ctx, &ctx.data().settings.roles.praise).await?;
    let guild_id = ctx.guild_id().ok_or(Error::custom("Not in a guild"))?;

    let (_, outcome) = discipline::add_praise(
        &ctx.data().pool,
        guild_id.get() as i64,
        user.id.get() as i64,
        ctx.author().id.get() as i64,
        &reason,
        Utc::now(),
    )
    .await?;

    log_mark(ctx, &user, "Praise", &reason).await;
    reply_with_summary(ctx, "Praise Given", &user, &reason, Some(outcome)).await
}

/// Show a member's warnings, strikes and praises
#[poise::command(slash_command, guild_only, rename = "discipline")]
pub async fn discipline_summary(
    ctx: Context<'_>,
    #[description = "Member (defaults to you)"] user: Option<User>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or(Error::custom("Not in a guild"))?;
    let target = user.unwrap_or_else(|| ctx.author().clone());
    if target.id != ctx.author().id {
        ensure_access(ctx, &ctx.data().settings.roles.discipline_view).await?;
    }

    let summary = discipline::summary(
        &ctx.data().pool,
        guild_id.get() as i64,
        target.id.get() as i64,
        Utc::now(),
    )
    .await?;

    let embed = embeds::standard_embed()
        .title(format!("Discipline: {}", target.name))
        .description(summary_lines(&summary))
        .footer(poise::serenity_prelude::CreateEmbedFooter::new(format!(
            "{} warnings become a strike. {} praises cancel a warning.",
            WARNINGS_PER_STRIKE, PRAISES_PER_WARNING
        )));

    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}

fn history_line(record: &PunishmentRecord) -> String {
    let expiry = match record.expires_at {
        Some(at) => format!(", expires <t:{}:R>", at.timestamp()),
        None => String::new(),
    };
    let reason = if record.reason.is_empty() {
        "no reason".to_string()
    } else {
        truncate(&record.reason, 80)
    };

    format!(
        "**{}** <t:{}:d> by {}{}\n{}",
        record.kind.label(),
        record.issued_at.timestamp(),
        mention_id(record.moderator_id),
        expiry,
        reason
    )
}

/// Show a member's full discipline history
#[poise::command(slash_command, guild_only)]
pub async fn history(
    ctx: Context<'_>,
    #[description = "Member"] user: User,
    #[description = "Page"]
    #[min = 1]
    page: Option<i64>,
) -> Result<(), Error> {
    ensure_access(ctx, &ctx.data().settings.roles.discipline_view).await?;
    let guild_id = ctx.guild_id().ok_or(Error::custom("Not in a guild"))?;
    let page = page.unwrap_or(1).max(1);

    let (records, total) = discipline::history(
        &ctx.data().pool,
        guild_id.get() as i64,
        user.id.get() as i64,
        HISTORY_PAGE_SIZE,
        (page - 1) * HISTORY_PAGE_SIZE,
    )
    .await?;

    let pages = ((total + HISTORY_PAGE_SIZE - 1) / HISTORY_PAGE_SIZE).max(1);
    let description = if records.is_empty() {
        "Nothing on record.".to_string()
    } else {
        records
            .iter()
            .map(history_line)
            .collect::<Vec<_>>()
            .join(&format!("\n{}\n", embeds::DIVIDER))
    };

    let embed = embeds::info_embed()
        .title(format!("History: {}", user.name))
        .description(description)
        .footer(poise::serenity_prelude::CreateEmbedFooter::new(format!(
            "Page {}/{} • {} entries",
            page, pages, total
        )));

    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_lines() {
        let summary = DisciplineSummary {
            warnings: 2,
            strikes: 1,
            praises: 0,
        };
        let text = summary_lines(&summary);
        assert!(text.contains("Warnings 2/3"));
        assert!(text.contains("Strikes 1/2"));
        assert!(text.contains("Praises 0/3"));
    }

    #[test]
    fn test_normalization_note() {
        assert!(normalization_note(&Normalization::default()).is_none());
        let note = normalization_note(&Normalization {
            strikes_issued: 1,
            warnings_forgiven: 0,
        })
        .unwrap();
        assert!(note.contains("3 warnings turned into 1 strike"));
    }
}
