use std::sync::Arc;

use chrono::{DateTime, Utc};
use serenity::all::Http;
use tokio::time::interval;
use tracing::{error, info, warn};

use crate::bot::data::Data;
use crate::bot::error::Error;
use crate::constants::timeouts::MUTE_SWEEP_INTERVAL;
use crate::db::queries::active_mute;
use crate::services::moderation::punishment_service;

/// Start the background task that lifts expired mutes and bans
pub fn spawn_mute_sweeper(http: Arc<Http>, data: Arc<Data>) {
    tokio::spawn(async move {
        let mut ticker = interval(MUTE_SWEEP_INTERVAL);

        loop {
            ticker.tick().await;

            if let Err(e) = lift_expired(&http, &data, Utc::now()).await {
                error!("Error lifting expired punishments: {:?}", e);
            }
        }
    });
}

/// Lift every sanction that ended at or before `now`.
/// A failed Discord call still clears the row so it is not retried forever.
pub async fn lift_expired(http: &Http, data: &Arc<Data>, now: DateTime<Utc>) -> Result<usize, Error> {
    let expired = active_mute::list_expired(&data.pool, now).await?;
    let count = expired.len();

    for mute in expired {
        if let Err(e) =
            punishment_service::remove_effect(http, &data.settings, &mute, "Punishment expired").await
        {
            warn!(
                "Failed to lift {} for {} in {}: {:?}",
                mute.kind, mute.user_id, mute.guild_id, e
            );
        }

        active_mute::delete(&data.pool, mute.guild_id, mute.user_id, mute.kind).await?;
    }

    if count > 0 {
        info!("Lifted {} expired punishments", count);
    }

    Ok(count)
}
