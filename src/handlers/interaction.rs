use std::sync::Arc;

use serenity::all::{
    ComponentInteraction, Context, CreateInteractionResponse, CreateInteractionResponseMessage,
    Interaction,
};
use tracing::{debug, error};

use crate::bot::data::Data;
use crate::bot::error::Error;
use crate::components::{clan_invite, marriage_prompt};
use crate::constants::embeds;

pub async fn handle_interaction(
    ctx: &Context,
    data: &Arc<Data>,
    interaction: &Interaction,
) -> Result<(), Error> {
    match interaction {
        Interaction::Component(component) => {
            handle_component(ctx, data, component).await?;
        }
        Interaction::Command(_) => {
            // Slash commands belong to poise
            debug!("Received ApplicationCommand interaction - should be handled by poise");
        }
        _ => {
            debug!("Unhandled interaction type: {:?}", interaction.kind());
        }
    }

    Ok(())
}

async fn handle_component(
    ctx: &Context,
    data: &Arc<Data>,
    component: &ComponentInteraction,
) -> Result<(), Error> {
    let custom_id = &component.data.custom_id;
    debug!("Component interaction: {}", custom_id);

    let result = if custom_id.starts_with(&format!("{}_", marriage_prompt::PREFIX)) {
        marriage_prompt::handle_response(ctx, data, component).await
    } else if custom_id.starts_with(&format!("{}_", clan_invite::PREFIX)) {
        clan_invite::handle_response(ctx, data, component).await
    } else {
        debug!("Unknown component interaction: {}", custom_id);
        Ok(())
    };

    if let Err(e) = result {
        error!("Component interaction error for {}: {:?}", custom_id, e);
        let message = if e.is_user_facing() {
            e.to_string()
        } else {
            "Something went wrong, try again later".to_string()
        };
        let _ = send_component_error(ctx, component, &message).await;
    }

    Ok(())
}

/// Send an ephemeral error message for a component interaction
pub async fn send_component_error(
    ctx: &Context,
    component: &ComponentInteraction,
    message: &str,
) -> Result<(), Error> {
    let embed = embeds::error_embed().title("Error").description(message);

    component
        .create_response(
            ctx,
            CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new()
                    .embed(embed)
                    .ephemeral(true),
            ),
        )
        .await?;

    Ok(())
}
