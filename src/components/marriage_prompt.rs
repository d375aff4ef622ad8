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
use crate::services::love::couple_service;
use crate::utils::formatting::format_coins;

pub const PREFIX: &str = "marry";

/// Accept and decline buttons shown to the member being proposed to
pub fn buttons(proposer_id: UserId, target_id: UserId) -> CreateActionRow {
    CreateActionRow::Buttons(vec![
        CreateButton::new(format!("{}_accept_{}_{}", PREFIX, proposer_id, target_id))
            .label("Accept")
            .emoji('💍')
            .style(ButtonStyle::Success),
        CreateButton::new(format!("{}_decline_{}_{}", PREFIX, proposer_id, target_id))
            .label("Decline")
            .style(ButtonStyle::Secondary),
    ])
}

pub async fn handle_response(
    ctx: &Context,
    data: &Arc<Data>,
    component: &ComponentInteraction,
) -> Result<(), Error> {
    let Some((action, proposer_id, target_id)) =
        parse_button_id(&component.data.custom_id, PREFIX)
    else {
        send_component_error(ctx, component, "Invalid button state").await?;
        return Ok(());
    };

    if component.user.id.get() != target_id {
        send_component_error(ctx, component, "This proposal is not addressed to you").await?;
        return Ok(());
    }

    let Some(guild_id) = component.guild_id else {
        send_component_error(ctx, component, "This only works in a server").await?;
        return Ok(());
    };

    if data
        .take_proposal(guild_id.get(), target_id, proposer_id)
        .is_none()
    {
        send_component_error(ctx, component, "This proposal has expired").await?;
        return Ok(());
    }

    debug!("Proposal {} -> {}: {}", proposer_id, target_id, action);

    let embed = match action {
        "accept" => {
            match couple_service::marry(
                &data.pool,
                &data.settings.love,
                guild_id.get() as i64,
                proposer_id as i64,
                target_id as i64,
                Utc::now(),
            )
            .await
            {
                Ok(_) => embeds::love_embed().title("Just Married 💞").description(format!(
                    "<@{}> and <@{}> are now a couple!\n{} was paid by <@{}>.",
                    proposer_id,
                    target_id,
                    format_coins(data.settings.love.marry_cost),
                    proposer_id
                )),
                Err(e) if e.is_user_facing() => embeds::error_embed()
                    .title("Wedding Cancelled")
                    .description(e.to_string()),
                Err(e) => return Err(e),
            }
        }
        "decline" => embeds::standard_embed()
            .title("Proposal Declined")
            .description(format!("<@{}> said no.", target_id)),
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
