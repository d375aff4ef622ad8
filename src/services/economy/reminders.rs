use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serenity::all::{CreateEmbedFooter, Http, UserId};
use tokio::time::interval;
use tracing::error;

use crate::bot::data::Data;
use crate::constants::embeds;
use crate::db::models::Cooldown;
use crate::db::queries::account;
use crate::utils::notify;

const REMINDER_INTERVAL_SECONDS: u64 = 60;

/// Start the task that DMs members when `/daily`, `/work` or `/weekly` is ready again
pub fn spawn_reminder_task(http: Arc<Http>, data: Arc<Data>) {
    tokio::spawn(async move {
        let mut ticker = interval(Duration::from_secs(REMINDER_INTERVAL_SECONDS));
        let mut last_check = Utc::now();

        loop {
            ticker.tick().await;
            let now = Utc::now();

            for kind in [Cooldown::Daily, Cooldown::Work, Cooldown::Weekly] {
                match account::cooldowns_ending(&data.pool, kind, last_check, now).await {
                    Ok(accounts) => {
                        for acc in accounts {
                            notify_ready(&http, UserId::new(acc.user_id as u64), kind).await;
                        }
                    }
                    Err(e) => error!("Error loading {} reminders: {:?}", kind.as_str(), e),
                }
            }

            last_check = now;
        }
    });
}

async fn notify_ready(http: &Http, user_id: UserId, kind: Cooldown) {
    let embed = embeds::info_embed()
        .title("Command Ready")
        .description(format!("`/{}` is available again.", kind.as_str()))
        .footer(CreateEmbedFooter::new("Turn these off with /notifications"));

    notify::dm(http, user_id, embed).await;
}
