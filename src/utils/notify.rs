use serenity::all::{CreateEmbed, CreateMessage, Http, UserId};
use tracing::debug;

/// DM a member. Closed DMs are common, so failures are only logged.
pub async fn dm(http: &Http, user_id: UserId, embed: CreateEmbed) -> bool {
    match user_id.create_dm_channel(http).await {
        Ok(dm_channel) => match dm_channel.send_message(http, CreateMessage::new().embed(embed)).await {
            Ok(_) => true,
            Err(e) => {
                debug!("Could not DM {}: {:?}", user_id, e);
                false
            }
        },
        Err(e) => {
            debug!("Could not create DM channel for {}: {:?}", user_id, e);
            false
        }
    }
}
