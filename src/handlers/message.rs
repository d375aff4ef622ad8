use std::sync::Arc;

use serenity::all::{Context, CreateMessage, Message};
use tracing::{debug, info};

use crate::bot::data::Data;
use crate::bot::error::Error;
use crate::constants::embeds;
use crate::services::economy::activity;

/// Count guild messages towards activity and announce level ups
pub async fn handle_message(ctx: &Context, data: &Arc<Data>, message: &Message) -> Result<(), Error> {
    if message.author.bot {
        return Ok(());
    }
    let Some(guild_id) = message.guild_id else {
        return Ok(());
    };

    let change = activity::record_message(
        &data.pool,
        &data.settings.economy,
        guild_id.get() as i64,
        message.author.id.get() as i64,
    )
    .await?;

    if change.leveled_up() {
        info!("{} reached level {} in {}", message.author.id, change.to, guild_id);
        let embed = embeds::success_embed()
            .title("Level Up")
            .description(format!("<@{}> is now level **{}**!", message.author.id, change.to));
        if let Err(e) = message
            .channel_id
            .send_message(&ctx.http, CreateMessage::new().embed(embed))
            .await
        {
            debug!("Could not announce level up in {}: {:?}", message.channel_id, e);
        }
    }

    Ok(())
}
