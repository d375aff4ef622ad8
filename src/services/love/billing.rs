use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serenity::all::{Http, UserId};
use sqlx::SqlitePool;
use tokio::time::interval;
use tracing::{error, info, warn};

use crate::bot::data::Data;
use crate::bot::error::Error;
use crate::config::LoveSettings;
use crate::constants::embeds;
use crate::constants::timeouts::{LOVE_ACCESS_DAYS_PER_MONTH, LOVE_BILLING_INTERVAL};
use crate::db::models::LoveRoomAccess;
use crate::db::queries::{account, love};
use crate::utils::notify;

#[derive(Debug, Clone)]
pub struct RoomBillingOutcome {
    pub user_id: i64,
    pub paid: bool,
}

pub async fn remove_expired_access(pool: &SqlitePool, now: DateTime<Utc>) -> Result<u64, Error> {
    let removed = love::delete_expired_access(pool, now).await?;
    if removed > 0 {
        info!("Removed {} expired love room passes", removed);
    }
    Ok(removed)
}

/// Renew access paid a month or more ago that runs out before the next billing run.
/// Members who cannot pay lose their access.
pub async fn run_room_billing(
    pool: &SqlitePool,
    settings: &LoveSettings,
    now: DateTime<Utc>,
) -> Result<Vec<RoomBillingOutcome>, Error> {
    let paid_before = now - Duration::days(LOVE_ACCESS_DAYS_PER_MONTH);
    let expiring_before = now + Duration::from_std(LOVE_BILLING_INTERVAL).unwrap_or(Duration::days(1));
    let due = love::list_access_due(pool, paid_before, expiring_before).await?;

    let mut outcomes = Vec::with_capacity(due.len());
    for access in due {
        match renew(pool, settings, &access, now).await {
            Ok(paid) => outcomes.push(RoomBillingOutcome {
                user_id: access.user_id,
                paid,
            }),
            Err(e) => warn!("Failed to renew love room access of {}: {:?}", access.user_id, e),
        }
    }

    Ok(outcomes)
}

async fn renew(
    pool: &SqlitePool,
    settings: &LoveSettings,
    access: &LoveRoomAccess,
    now: DateTime<Utc>,
) -> Result<bool, Error> {
    let mut tx = pool.begin().await?;
    account::ensure(&mut *tx, access.guild_id, access.user_id).await?;

    let paid =
        account::try_spend_cash(&mut *tx, access.guild_id, access.user_id, settings.room_access_cost)
            .await?;
    if paid {
        let base = access.expires_at.max(now);
        love::upsert_access(
            &mut *tx,
            access.guild_id,
            access.user_id,
            base + Duration::days(LOVE_ACCESS_DAYS_PER_MONTH),
            now,
        )
        .await?;
    }
    tx.commit().await?;

    if !paid {
        love::delete_access(pool, access.user_id).await?;
        info!("{} lost love room access for missed payment", access.user_id);
    }
    Ok(paid)
}

/// Start the daily love room billing task
pub fn spawn_room_billing_task(http: Arc<Http>, data: Arc<Data>) {
    tokio::spawn(async move {
        let mut ticker = interval(LOVE_BILLING_INTERVAL);

        loop {
            ticker.tick().await;

            match run_room_billing(&data.pool, &data.settings.love, Utc::now()).await {
                Ok(outcomes) => {
                    for outcome in outcomes {
                        notify_member(&http, &outcome, data.settings.love.room_access_cost).await;
                    }
                }
                Err(e) => error!("Error running love room billing: {:?}", e),
            }
        }
    });
}

async fn notify_member(http: &Http, outcome: &RoomBillingOutcome, cost: i64) {
    let embed = if outcome.paid {
        embeds::info_embed()
            .title("Love Room Renewed")
            .description(format!("{} coins were taken from your cash for another month.", cost))
    } else {
        embeds::warning_embed()
            .title("Love Room Access Ended")
            .description(format!(
                "You did not have {} coins in cash, so your love room access ended.",
                cost
            ))
    };

    notify::dm(http, UserId::new(outcome.user_id as u64), embed).await;
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::db::pool::test_pool;
    use crate::services::economy::wallet;
    use crate::services::love::couple_service;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 4, 1, 0, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_room_billing() {
        let pool = test_pool().await;
        let settings = LoveSettings::default();
        let cost = settings.room_access_cost;
        wallet::adjust(&pool, 1, 10, cost * 2, 0).await.unwrap();
        wallet::adjust(&pool, 1, 20, cost, 0).await.unwrap();
        couple_service::buy_room_access(&pool, &settings, 1, 10, 1, t0()).await.unwrap();
        couple_service::buy_room_access(&pool, &settings, 1, 20, 1, t0()).await.unwrap();

        assert!(run_room_billing(&pool, &settings, t0() + Duration::days(20))
            .await
            .unwrap()
            .is_empty());

        let due_at = t0() + Duration::days(30);
        let outcomes = run_room_billing(&pool, &settings, due_at).await.unwrap();
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().any(|o| o.user_id == 10 && o.paid));
        assert!(outcomes.iter().any(|o| o.user_id == 20 && !o.paid));

        let renewed = love::get_access(&pool, 10).await.unwrap().unwrap();
        assert_eq!(renewed.expires_at, t0() + Duration::days(60));
        assert!(love::get_access(&pool, 20).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_prepaid_months_not_billed_early() {
        let pool = test_pool().await;
        let settings = LoveSettings::default();
        wallet::adjust(&pool, 1, 10, settings.room_access_cost * 4, 0).await.unwrap();
        couple_service::buy_room_access(&pool, &settings, 1, 10, 3, t0()).await.unwrap();

        let month_later = t0() + Duration::days(31);
        assert!(run_room_billing(&pool, &settings, month_later).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove_expired_access() {
        let pool = test_pool().await;
        love::upsert_access(&pool, 1, 10, t0(), t0() - Duration::days(30)).await.unwrap();
        love::upsert_access(&pool, 1, 20, t0() + Duration::days(1), t0()).await.unwrap();

        assert_eq!(remove_expired_access(&pool, t0()).await.unwrap(), 1);
        assert!(love::get_access(&pool, 20).await.unwrap().is_some());
    }
}
