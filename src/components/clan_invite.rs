use std::sync::Arc;

use chrono::Utc;
use serenity::all::{
    ButtonStyle, ComponentInteraction, Context, CreateActionRow, CreateButton,
    CreateInteractionResponse, CreateInteractionResponseMessage, UserId,
};
use tracing::debug;

use crate::bot::data::Data;
use crate::bot::error::Error;
use crate::components::parse_button_id;
use crate::constants::embeds;
use crate::handlers::interaction::send_component_error;
use crate::services::clans::clan_service;

pub const PREFIX: &str = "clan";

pub fn buttons(clan_id: i64, invitee_id: UserId) -> CreateActionRow {
    CreateActionRow::Buttons(vec![
        CreateButton::new(format!("{}_accept_{}_{}", PREFIX, clan_id, invitee_id))
            .label("Join")
            .style(ButtonStyle::Success),
        CreateButton::new(format!("{}_decline_{}_{}", PREFIX, clan_id, invitee_id))
            .label("Decline")
            .style(ButtonStyle::Secondary),
    ])
}

pub async fn handle_response(
    ctx: &Context,
    data: &Arc<Data>,
    component: &ComponentInteraction,
) -> Result<(), Error> {
    let Some((action, clan_id, invitee_id)) = parse_button_id(&component.data.custom_id, PREFIX)
    else {
        send_component_error(ctx, component, "Invalid button state").await?;
        return Ok(());
    };

    if component.user.id.get() != invitee_id {
        send_component_error(ctx, component, "This invitation is not for you").await?;
        return Ok(());
    }

    debug!("Clan invite {} for {}: {}", clan_id, invitee_id, action);

    let embed = match action {
        "accept" => {
            let clan_id = clan_id as i64;
            match clan_service::add_member(&data.pool, clan_id, invitee_id as i64, Utc::now()).await
            {
                Ok(()) => {
                    let name = clan_service::by_id(&data.pool, clan_id)
                        .await?
                        .map(|c| c.display_name())
                        .unwrap_or_else(|| "the clan".to_string());
                    embeds::success_embed()
                        .title("Welcome")
                        .description(format!("<@{}> joined {}", invitee_id, name))
                }
                Err(e) if e.is_user_facing() => embeds::error_embed()
                    .title("Could Not Join")
                    .description(e.to_string()),
                Err(e) => return Err(e),
            }
        }
        "decline" => embeds::standard_embed()
            .title("Invitation Declined")
            .description(format!("<@{}> declined the invitation.", invitee_id)),
        _ => {
            send_component_error(ctx, component, "Unknown action").await?;
            return Ok(());
        }
    };

    component
        .create_response(
            ctx,
            CreateInteractionResponse::UpdateMessage(
                CreateInteractionResponseMessage::new()
                    .embed(embed)
                    .components(vec![]),
            ),
        )
        .await?;

    Ok(())
}
