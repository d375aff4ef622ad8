use std::sync::Arc;

use poise::serenity_prelude::{self as serenity, GatewayIntents, GuildId};
use sqlx::SqlitePool;
use tracing::{error, info, warn};

use crate::bot::data::Data;
use crate::bot::error::Error;
use crate::commands;
use crate::config::Settings;
use crate::constants::embeds;
use crate::handlers::event_handler::event_handler;
use crate::services::clans::billing as clan_billing;
use crate::services::economy::{activity, reminders, shop};
use crate::services::love::{billing as love_billing, sessions};
use crate::services::{discipline, moderation::expiry};

fn all_commands() -> Vec<poise::Command<Arc<Data>, Error>> {
    vec![
        commands::discipline::warn(),
        commands::discipline::warn_remove(),
        commands::discipline::strike(),
        commands::discipline::strike_remove(),
        commands::discipline::praise(),
        commands::discipline::discipline_summary(),
        commands::discipline::history(),
        commands::moderation::punish(),
        commands::moderation::pardon(),
        commands::moderation::moderate(),
        commands::moderation::clear(),
        commands::economy::balance(),
        commands::economy::daily(),
        commands::economy::work(),
        commands::economy::weekly(),
        commands::economy::deposit(),
        commands::economy::withdraw(),
        commands::economy::rob(),
        commands::economy::unarrest(),
        commands::economy::money(),
        commands::economy::top(),
        commands::economy::notifications(),
        commands::economy::cooldowns(),
        commands::help::help(),
        commands::shop::shop_list(),
        commands::shop::buy(),
        commands::shop::shop_add(),
        commands::shop::shop_remove(),
        commands::shop::temprole(),
        commands::custom_role::custom_role(),
        commands::custom_role::market(),
        commands::custom_role::market_buy(),
        commands::clan::clan(),
        commands::love::love(),
        commands::love::marry(),
        commands::love::divorce(),
        commands::love::love_access(),
        commands::ticket::ticket(),
    ]
}

async fn on_error(error: poise::FrameworkError<'_, Arc<Data>, Error>) {
    match error {
        poise::FrameworkError::Command { error, ctx, .. } => {
            let message = if error.is_user_facing() {
                error.to_string()
            } else {
                error!("Command /{} failed: {:?}", ctx.command().qualified_name, error);
                "Something went wrong, try again later".to_string()
            };
            let embed = embeds::error_embed().title("Error").description(message);
            let _ = ctx
                .send(poise::CreateReply::default().embed(embed).ephemeral(true))
                .await;
        }
        poise::FrameworkError::ArgumentParse { error, ctx, .. } => {
            let _ = ctx
                .send(
                    poise::CreateReply::default()
                        .content(format!("Invalid argument: {}", error))
                        .ephemeral(true),
                )
                .await;
        }
        poise::FrameworkError::UnknownCommand { .. } => {}
        err => {
            error!("Framework error: {:?}", err);
        }
    }
}

/// Voice joins and love sessions recorded before a restart cannot be trusted.
/// Runs before the gateway connects, so `GuildCreate` re-seeds a clean slate.
async fn reset_voice_state(pool: &SqlitePool) {
    if let Err(e) = activity::reset_voice_tracking(pool).await {
        warn!("Failed to reset voice tracking: {:?}", e);
    }
    if let Err(e) = sessions::reset_active_sessions(pool).await {
        warn!("Failed to reset love sessions: {:?}", e);
    }
}

pub async fn run(settings: Settings, pool: SqlitePool) -> Result<(), Error> {
    reset_voice_state(&pool).await;
    let data = Arc::new(Data::new(pool, settings.clone()));

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: all_commands(),
            prefix_options: poise::PrefixFrameworkOptions {
                prefix: None,
                ..Default::default()
            },
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            on_error: |error| Box::pin(on_error(error)),
            ..Default::default()
        })
        .setup(|ctx, ready, framework| {
            Box::pin(async move {
                info!("Bot connected as {}", ready.user.name);

                expiry::spawn_mute_sweeper(ctx.http.clone(), data.clone());
                discipline::spawn_cleanup_task(data.clone());
                shop::spawn_temp_role_sweeper(ctx.http.clone(), data.clone());
                reminders::spawn_reminder_task(ctx.http.clone(), data.clone());
                clan_billing::spawn_billing_task(ctx.http.clone(), data.clone());
                sessions::spawn_session_tasks(data.clone());
                love_billing::spawn_room_billing_task(ctx.http.clone(), data.clone());
                info!("Started background tasks");

                let commands = &framework.options().commands;
                match data.settings.guild_id {
                    Some(guild_id) => {
                        let guild_id = GuildId::new(guild_id);
                        info!("Registering {} commands in guild {}", commands.len(), guild_id);
                        if let Err(e) =
                            poise::builtins::register_in_guild(ctx, commands, guild_id).await
                        {
                            error!("Failed to register guild commands: {:?}", e);
                            error!(
                                "Re-invite URL: https://discord.com/api/oauth2/authorize?client_id={}&permissions=0&scope=bot%20applications.commands",
                                ready.user.id
                            );
                            return Err(Error::Serenity(e));
                        }
                    }
                    None => {
                        info!("Registering {} commands globally", commands.len());
                        if let Err(e) = poise::builtins::register_globally(ctx, commands).await {
                            error!("Failed to register commands globally: {:?}", e);
                            return Err(Error::Serenity(e));
                        }
                        info!("Note: Global commands can take up to 1 hour to appear in all servers");
                    }
                }

                Ok(data)
            })
        })
        .build();

    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MEMBERS
        | GatewayIntents::GUILD_VOICE_STATES
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    let mut client = serenity::ClientBuilder::new(&settings.discord_token, intents)
        .framework(framework)
        .await
        .map_err(Error::Serenity)?;

    info!("Starting Discord client...");
    client.start().await.map_err(Error::Serenity)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_names_are_unique() {
        let commands = all_commands();
        let mut names: Vec<&str> = commands.iter().map(|c| c.name.as_str()).collect();
        let total = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), total);
        assert!(names.contains(&"discipline"));
        assert!(names.contains(&"shop"));
        assert!(names.contains(&"custom_role"));
        assert!(names.contains(&"help"));
    }
}
