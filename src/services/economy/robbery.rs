use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use sqlx::SqlitePool;
use tracing::info;

use crate::bot::error::Error;
use crate::config::EconomySettings;
use crate::constants::economy::{ROB_ARREST_CHANCE, ROB_SUCCESS_CHANCE};
use crate::constants::timeouts::{format_seconds, ARREST_SECONDS, ROB_COOLDOWN_SECONDS};
use crate::db::models::Cooldown;
use crate::db::queries::account;

/// Dice for one robbery attempt, rolled before touching the database
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RobRoll {
    pub success: bool,
    pub arrested: bool,
    /// Position of the loot inside its allowed range, in `[0, 1)`
    pub loot_fraction: f64,
}

impl RobRoll {
    pub fn roll<R: Rng>(rng: &mut R) -> Self {
        Self {
            success: rng.random_bool(ROB_SUCCESS_CHANCE),
            arrested: rng.random_bool(ROB_ARREST_CHANCE),
            loot_fraction: rng.random::<f64>(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RobOutcome {
    Success { loot: i64, next_at: DateTime<Utc> },
    Arrested { until: DateTime<Utc> },
    Escaped { next_at: DateTime<Utc> },
}

/// Uniform amount in `[min, min(max, target_cash)]` picked by `fraction`
pub fn loot_amount(min: i64, max: i64, target_cash: i64, fraction: f64) -> i64 {
    let high = max.min(target_cash);
    if high <= min {
        return high.max(0);
    }
    let span = (high - min + 1) as f64;
    (min + (fraction.clamp(0.0, 1.0) * span) as i64).min(high)
}

pub async fn rob(
    pool: &SqlitePool,
    settings: &EconomySettings,
    guild_id: i64,
    robber_id: i64,
    target_id: i64,
    roll: RobRoll,
    now: DateTime<Utc>,
) -> Result<RobOutcome, Error> {
    if robber_id == target_id {
        return Err(Error::invalid("You cannot rob yourself"));
    }

    let mut tx = pool.begin().await?;
    account::ensure(&mut *tx, guild_id, robber_id).await?;
    account::ensure(&mut *tx, guild_id, target_id).await?;

    let robber = account::get(&mut *tx, guild_id, robber_id)
        .await?
        .ok_or_else(|| Error::not_found("account"))?;
    if let Some(until) = robber.arrest_until.filter(|until| *until > now) {
        return Err(Error::invalid(format!(
            "You are under arrest until <t:{}:R>",
            until.timestamp()
        )));
    }
    if let Some(remaining) = robber.cooldown_remaining(Cooldown::Rob, now) {
        return Err(Error::Cooldown(format_seconds(remaining)));
    }

    let target = account::get(&mut *tx, guild_id, target_id)
        .await?
        .ok_or_else(|| Error::not_found("account"))?;
    if target.cash < settings.rob_min {
        return Err(Error::invalid(format!(
            "<@{}> carries too little cash to rob (minimum {})",
            target_id, settings.rob_min
        )));
    }

    let next_at = now + Duration::seconds(ROB_COOLDOWN_SECONDS);
    let outcome = if roll.success {
        let loot = loot_amount(settings.rob_min, settings.rob_max, target.cash, roll.loot_fraction);
        if !account::try_spend_cash(&mut *tx, guild_id, target_id, loot).await? {
            return Err(Error::invalid("The target's cash changed, try again"));
        }
        account::add_cash(&mut *tx, guild_id, robber_id, loot).await?;
        account::set_cooldown(&mut *tx, guild_id, robber_id, Cooldown::Rob, next_at).await?;
        account::record_robbery(&mut *tx, guild_id, robber_id, true, false).await?;
        RobOutcome::Success { loot, next_at }
    } else if roll.arrested {
        let until = now + Duration::seconds(ARREST_SECONDS);
        account::set_arrest(&mut *tx, guild_id, robber_id, Some(until)).await?;
        account::record_robbery(&mut *tx, guild_id, robber_id, false, true).await?;
        RobOutcome::Arrested { until }
    } else {
        account::set_cooldown(&mut *tx, guild_id, robber_id, Cooldown::Rob, next_at).await?;
        account::record_robbery(&mut *tx, guild_id, robber_id, false, false).await?;
        RobOutcome::Escaped { next_at }
    };
    tx.commit().await?;

    info!("{} robbed {} in {}: {:?}", robber_id, target_id, guild_id, outcome);

    Ok(outcome)
}

/// Release a member from arrest. False when they have no account.
pub async fn unarrest(pool: &SqlitePool, guild_id: i64, user_id: i64) -> Result<bool, Error> {
    Ok(account::set_arrest(pool, guild_id, user_id, None).await?)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::db::pool::test_pool;
    use crate::services::economy::wallet;

    const GUILD: i64 = 1;
    const ROBBER: i64 = 2;
    const VICTIM: i64 = 3;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 22, 0, 0).unwrap()
    }

    fn roll(success: bool, arrested: bool, loot_fraction: f64) -> RobRoll {
        RobRoll {
            success,
            arrested,
            loot_fraction,
        }
    }

    #[test]
    fn test_loot_amount_bounds() {
        assert_eq!(loot_amount(300, 1000, 5000, 0.0), 300);
        assert_eq!(loot_amount(300, 1000, 5000, 0.999_999), 1000);
        assert_eq!(loot_amount(300, 1000, 450, 0.999_999), 450);
        assert_eq!(loot_amount(300, 1000, 300, 0.5), 300);
    }

    #[tokio::test]
    async fn test_successful_robbery_moves_cash() {
        let pool = test_pool().await;
        let settings = EconomySettings::default();
        wallet::adjust(&pool, GUILD, VICTIM, 800, 0).await.unwrap();

        let outcome = rob(&pool, &settings, GUILD, ROBBER, VICTIM, roll(true, false, 0.0), t0())
            .await
            .unwrap();
        assert_eq!(
            outcome,
            RobOutcome::Success {
                loot: 300,
                next_at: t0() + Duration::minutes(5)
            }
        );

        let robber = account::get(&pool, GUILD, ROBBER).await.unwrap().unwrap();
        let victim = account::get(&pool, GUILD, VICTIM).await.unwrap().unwrap();
        assert_eq!(robber.cash, 300);
        assert_eq!(victim.cash, 500);
        assert_eq!((robber.robberies_total, robber.robberies_success), (1, 1));

        // Cooldown blocks the next attempt
        let err = rob(&pool, &settings, GUILD, ROBBER, VICTIM, roll(true, false, 0.0), t0())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Cooldown(_)));
    }

    #[tokio::test]
    async fn test_failed_robbery_can_arrest() {
        let pool = test_pool().await;
        let settings = EconomySettings::default();
        wallet::adjust(&pool, GUILD, VICTIM, 800, 0).await.unwrap();

        let outcome = rob(&pool, &settings, GUILD, ROBBER, VICTIM, roll(false, true, 0.0), t0())
            .await
            .unwrap();
        let until = t0() + Duration::hours(6);
        assert_eq!(outcome, RobOutcome::Arrested { until });

        let robber = account::get(&pool, GUILD, ROBBER).await.unwrap().unwrap();
        assert!(robber.is_arrested(t0()));
        assert_eq!(robber.rob_cd, None);
        assert_eq!((robber.robberies_fail, robber.robberies_arrest), (1, 1));

        assert!(rob(&pool, &settings, GUILD, ROBBER, VICTIM, roll(true, false, 0.0), t0())
            .await
            .is_err());

        assert!(unarrest(&pool, GUILD, ROBBER).await.unwrap());
        let outcome = rob(&pool, &settings, GUILD, ROBBER, VICTIM, roll(false, false, 0.0), t0())
            .await
            .unwrap();
        assert!(matches!(outcome, RobOutcome::Escaped { .. }));
        let victim = account::get(&pool, GUILD, VICTIM).await.unwrap().unwrap();
        assert_eq!(victim.cash, 800);
    }

    #[tokio::test]
    async fn test_rob_rejects_poor_or_self() {
        let pool = test_pool().await;
        let settings = EconomySettings::default();
        wallet::adjust(&pool, GUILD, VICTIM, 299, 5000).await.unwrap();

        assert!(rob(&pool, &settings, GUILD, ROBBER, VICTIM, roll(true, false, 0.5), t0())
            .await
            .is_err());
        assert!(rob(&pool, &settings, GUILD, ROBBER, ROBBER, roll(true, false, 0.5), t0())
            .await
            .is_err());

        let robber = account::get_or_create(&pool, GUILD, ROBBER).await.unwrap();
        assert_eq!(robber.robberies_total, 0);
    }
}
