use serenity::all::{ChannelId, CreateMessage, Http, UserId};
use tracing::warn;

use crate::config::Settings;
use crate::constants::embeds;

/// A moderation action to report in the log channel
#[derive(Debug, Clone)]
pub struct LogEntry<'a> {
    pub moderator_id: UserId,
    pub target_id: UserId,
    pub action: &'a str,
    pub reason: &'a str,
    pub duration: Option<String>,
}

/// Post an action to the moderation log channel, if one is configured.
/// Delivery failures are logged and otherwise ignored.
pub async fn log_action(http: &Http, settings: &Settings, entry: LogEntry<'_>) {
    let Some(channel_id) = settings.moderation_log_channel_id else {
        return;
    };

    let mut embed = embeds::info_embed()
        .title(entry.action)
        .field("Moderator", format!("<@{}>", entry.moderator_id), true)
        .field("Member", format!("<@{}>", entry.target_id), true);

    if let Some(duration) = entry.duration {
        embed = embed.field("Duration", duration, false);
    }

    let reason = if entry.reason.is_empty() {
        "No reason given"
    } else {
        entry.reason
    };
    embed = embed.field("Reason", reason, false);

    let message = CreateMessage::new().embed(embed);
    if let Err(e) = ChannelId::new(channel_id).send_message(http, message).await {
        warn!("Failed to post to moderation log {}: {:?}", channel_id, e);
    }
}
