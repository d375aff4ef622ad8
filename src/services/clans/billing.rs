use std::sync::Arc;

use chrono::{DateTime, Months, Utc};
use serenity::all::{Http, UserId};
use sqlx::SqlitePool;
use tokio::time::interval;
use tracing::{error, info, warn};

use crate::bot::data::Data;
use crate::bot::error::Error;
use crate::config::ClanSettings;
use crate::constants::embeds;
use crate::constants::timeouts::CLAN_BILLING_INTERVAL;
use crate::db::models::Clan;
use crate::db::queries::{account, clan};
use crate::utils::notify;

#[derive(Debug, Clone)]
pub struct BillingOutcome {
    pub clan: Clan,
    pub paid: bool,
}

/// A clan is due once a full calendar month has passed since its last payment
pub fn is_due(clan: &Clan, now: DateTime<Utc>) -> bool {
    clan.last_payment
        .checked_add_months(Months::new(1))
        .map(|due| due <= now)
        .unwrap_or(false)
}

/// Charge every due clan its upkeep, deactivating those whose owner cannot pay
pub async fn run_billing(
    pool: &SqlitePool,
    settings: &ClanSettings,
    now: DateTime<Utc>,
) -> Result<Vec<BillingOutcome>, Error> {
    let due: Vec<Clan> = clan::list_active(pool)
        .await?
        .into_iter()
        .filter(|c| is_due(c, now))
        .collect();

    let mut outcomes = Vec::with_capacity(due.len());
    for billed in due {
        match bill_clan(pool, settings, &billed, now).await {
            Ok(paid) => outcomes.push(BillingOutcome { clan: billed, paid }),
            Err(e) => warn!("Failed to bill clan {}: {:?}", billed.id, e),
        }
    }

    Ok(outcomes)
}

async fn bill_clan(
    pool: &SqlitePool,
    settings: &ClanSettings,
    billed: &Clan,
    now: DateTime<Utc>,
) -> Result<bool, Error> {
    let mut tx = pool.begin().await?;
    account::ensure(&mut *tx, billed.guild_id, billed.owner_id).await?;

    let paid =
        account::try_spend_cash(&mut *tx, billed.guild_id, billed.owner_id, settings.monthly_cost)
            .await?;
    if paid {
        clan::set_last_payment(&mut *tx, billed.id, now).await?;
    }
    tx.commit().await?;

    if paid {
        info!("Clan {} paid {} upkeep", billed.id, settings.monthly_cost);
    } else {
        clan::deactivate(pool, billed.id).await?;
        info!("Clan {} deactivated for missed upkeep", billed.id);
    }
    Ok(paid)
}

/// Start the daily clan upkeep task
pub fn spawn_billing_task(http: Arc<Http>, data: Arc<Data>) {
    tokio::spawn(async move {
        let mut ticker = interval(CLAN_BILLING_INTERVAL);

        loop {
            ticker.tick().await;

            match run_billing(&data.pool, &data.settings.clans, Utc::now()).await {
                Ok(outcomes) => {
                    for outcome in outcomes {
                        notify_owner(&http, &outcome, data.settings.clans.monthly_cost).await;
                    }
                }
                Err(e) => error!("Error running clan billing: {:?}", e),
            }
        }
    });
}

async fn notify_owner(http: &Http, outcome: &BillingOutcome, cost: i64) {
    let name = outcome.clan.display_name();
    let embed = if outcome.paid {
        embeds::info_embed()
            .title("Clan Upkeep Paid")
            .description(format!("{} coins were taken from your cash for {}.", cost, name))
    } else {
        embeds::warning_embed()
            .title("Clan Deactivated")
            .description(format!(
                "You did not have {} coins in cash, so {} was deactivated.",
                cost, name
            ))
    };

    notify::dm(http, UserId::new(outcome.clan.owner_id as u64), embed).await;
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;
    use crate::db::pool::test_pool;
    use crate::services::clans::clan_service;
    use crate::services::economy::wallet;

    #[tokio::test]
    async fn test_billing_charges_or_deactivates() {
        let pool = test_pool().await;
        let settings = ClanSettings::default();
        let created_at = Utc.with_ymd_and_hms(2025, 1, 31, 12, 0, 0).unwrap();

        wallet::adjust(&pool, 1, 10, settings.create_cost + settings.monthly_cost, 0)
            .await
            .unwrap();
        wallet::adjust(&pool, 1, 20, settings.create_cost, 0).await.unwrap();
        let paying = clan_service::create(&pool, &settings, 1, 10, "Paying", created_at)
            .await
            .unwrap();
        let broke = clan_service::create(&pool, &settings, 1, 20, "Broke", created_at)
            .await
            .unwrap();

        // Not a month yet
        let early = created_at + Duration::days(27);
        assert!(run_billing(&pool, &settings, early).await.unwrap().is_empty());

        let later = created_at + Duration::days(31);
        let outcomes = run_billing(&pool, &settings, later).await.unwrap();
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().any(|o| o.clan.id == paying.id && o.paid));
        assert!(outcomes.iter().any(|o| o.clan.id == broke.id && !o.paid));

        let owner = account::get_or_create(&pool, 1, 10).await.unwrap();
        assert_eq!(owner.cash, 0);
        assert!(clan::get_by_id(&pool, broke.id).await.unwrap().is_none());
        let kept = clan::get_by_id(&pool, paying.id).await.unwrap().unwrap();
        assert_eq!(kept.last_payment, later);

        // Paid clans are not billed again right away
        assert!(run_billing(&pool, &settings, later + Duration::days(1))
            .await
            .unwrap()
            .is_empty());
    }
}
