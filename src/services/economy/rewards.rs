use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use sqlx::SqlitePool;
use tracing::info;

use crate::bot::error::Error;
use crate::config::EconomySettings;
use crate::constants::economy::Job;
use crate::constants::timeouts::format_seconds;
use crate::db::models::Cooldown;
use crate::db::queries::account;

/// Periodic rewards paid into the bank
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reward {
    Daily,
    Work,
    Weekly,
}

impl Reward {
    pub fn cooldown(&self) -> Cooldown {
        match self {
            Reward::Daily => Cooldown::Daily,
            Reward::Work => Cooldown::Work,
            Reward::Weekly => Cooldown::Weekly,
        }
    }

    fn cooldown_seconds(&self, settings: &EconomySettings) -> i64 {
        match self {
            Reward::Daily => settings.daily_cooldown_seconds,
            Reward::Work => settings.work_cooldown_seconds,
            Reward::Weekly => settings.weekly_cooldown_seconds,
        }
    }
}

/// Amount decided before the claim is attempted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payout {
    pub amount: i64,
    pub job: Option<Job>,
}

/// Result of a successful claim
#[derive(Debug, Clone)]
pub struct Claim {
    pub amount: i64,
    pub job: Option<Job>,
    pub bank: i64,
    pub next_at: DateTime<Utc>,
}

/// Decide what a reward pays. Work picks a random job and a random amount in its range.
pub fn roll_payout<R: Rng>(settings: &EconomySettings, reward: Reward, rng: &mut R) -> Payout {
    match reward {
        Reward::Daily => Payout {
            amount: settings.daily_amount,
            job: None,
        },
        Reward::Weekly => Payout {
            amount: settings.weekly_amount,
            job: None,
        },
        Reward::Work => {
            if settings.jobs.is_empty() {
                return Payout {
                    amount: settings.work_amount,
                    job: None,
                };
            }
            let job = settings.jobs[rng.random_range(0..settings.jobs.len())].clone();
            let (low, high) = if job.min_reward <= job.max_reward {
                (job.min_reward, job.max_reward)
            } else {
                (job.max_reward, job.min_reward)
            };
            Payout {
                amount: rng.random_range(low..=high),
                job: Some(job),
            }
        }
    }
}

/// Pay a reward if the member is free and off cooldown
pub async fn claim(
    pool: &SqlitePool,
    settings: &EconomySettings,
    guild_id: i64,
    user_id: i64,
    reward: Reward,
    payout: Payout,
    now: DateTime<Utc>,
) -> Result<Claim, Error> {
    if reward == Reward::Weekly && !settings.weekly_enabled {
        return Err(Error::invalid("The weekly reward is disabled"));
    }

    let mut tx = pool.begin().await?;
    account::ensure(&mut *tx, guild_id, user_id).await?;
    let current = account::get(&mut *tx, guild_id, user_id)
        .await?
        .ok_or_else(|| Error::not_found("account"))?;

    if let Some(until) = current.arrest_until.filter(|until| *until > now) {
        return Err(Error::invalid(format!(
            "You are under arrest until <t:{}:R>",
            until.timestamp()
        )));
    }

    if let Some(remaining) = current.cooldown_remaining(reward.cooldown(), now) {
        return Err(Error::Cooldown(format_seconds(remaining)));
    }

    let next_at = now + Duration::seconds(reward.cooldown_seconds(settings));
    let updated = account::add_bank(&mut *tx, guild_id, user_id, payout.amount)
        .await?
        .ok_or_else(|| Error::not_found("account"))?;
    account::set_cooldown(&mut *tx, guild_id, user_id, reward.cooldown(), next_at).await?;
    tx.commit().await?;

    info!("{:?} reward of {} paid to {} in {}", reward, payout.amount, user_id, guild_id);

    Ok(Claim {
        amount: payout.amount,
        job: payout.job,
        bank: updated.bank,
        next_at,
    })
}

/// Clear the given cooldowns. False when the member has no account yet.
pub async fn reset_cooldowns(
    pool: &SqlitePool,
    guild_id: i64,
    user_id: i64,
    kinds: &[Cooldown],
) -> Result<bool, Error> {
    let mut tx = pool.begin().await?;
    let mut found = true;
    for kind in kinds {
        found &= account::clear_cooldown(&mut *tx, guild_id, user_id, *kind).await?;
    }
    tx.commit().await?;

    info!("Reset {:?} cooldowns of {} in {}", kinds, user_id, guild_id);
    Ok(found)
}

/// Every cooldown with the seconds left on it (`None` when ready) at `now`
pub async fn cooldowns(
    pool: &SqlitePool,
    guild_id: i64,
    user_id: i64,
    now: DateTime<Utc>,
) -> Result<Vec<(Cooldown, Option<i64>)>, Error> {
    let acc = account::get_or_create(pool, guild_id, user_id).await?;
    Ok(Cooldown::ALL
        .iter()
        .map(|kind| (*kind, acc.cooldown_remaining(*kind, now)))
        .collect())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::db::pool::test_pool;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap()
    }

    fn fixed(amount: i64) -> Payout {
        Payout { amount, job: None }
    }

    #[test]
    fn test_work_payout_in_job_range() {
        let settings = EconomySettings::default();
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..50 {
            let payout = roll_payout(&settings, Reward::Work, &mut rng);
            let job = payout.job.expect("work picks a job");
            assert!(payout.amount >= job.min_reward && payout.amount <= job.max_reward);
        }
    }

    #[test]
    fn test_work_without_jobs_pays_flat() {
        let settings = EconomySettings {
            jobs: Vec::new(),
            ..EconomySettings::default()
        };
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(roll_payout(&settings, Reward::Work, &mut rng), fixed(150));
        assert_eq!(roll_payout(&settings, Reward::Daily, &mut rng), fixed(100));
    }

    #[tokio::test]
    async fn test_daily_cooldown() {
        let pool = test_pool().await;
        let settings = EconomySettings::default();
        let now = t0();

        let claim_ok = claim(&pool, &settings, 1, 2, Reward::Daily, fixed(100), now)
            .await
            .unwrap();
        assert_eq!(claim_ok.bank, 100);
        assert_eq!(claim_ok.next_at, now + Duration::days(1));

        let err = claim(&pool, &settings, 1, 2, Reward::Daily, fixed(100), now + Duration::hours(23))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Cooldown(_)));

        // Other rewards have their own cooldown
        claim(&pool, &settings, 1, 2, Reward::Work, fixed(40), now).await.unwrap();

        let again = claim(&pool, &settings, 1, 2, Reward::Daily, fixed(100), now + Duration::days(1))
            .await
            .unwrap();
        assert_eq!(again.bank, 240);
    }

    #[tokio::test]
    async fn test_arrest_blocks_rewards() {
        let pool = test_pool().await;
        let settings = EconomySettings::default();
        let now = t0();

        account::ensure(&pool, 1, 2).await.unwrap();
        account::set_arrest(&pool, 1, 2, Some(now + Duration::hours(6)))
            .await
            .unwrap();

        let err = claim(&pool, &settings, 1, 2, Reward::Daily, fixed(100), now)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidOperation(_)));

        claim(&pool, &settings, 1, 2, Reward::Daily, fixed(100), now + Duration::hours(6))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_weekly_can_be_disabled() {
        let pool = test_pool().await;
        let settings = EconomySettings {
            weekly_enabled: false,
            ..EconomySettings::default()
        };

        assert!(claim(&pool, &settings, 1, 2, Reward::Weekly, fixed(200), t0())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_reset_cooldowns() {
        let pool = test_pool().await;
        let settings = EconomySettings::default();
        let now = t0();

        assert!(!reset_cooldowns(&pool, 1, 2, &[Cooldown::Daily]).await.unwrap());

        claim(&pool, &settings, 1, 2, Reward::Daily, fixed(100), now).await.unwrap();
        claim(&pool, &settings, 1, 2, Reward::Work, fixed(40), now).await.unwrap();

        let before = cooldowns(&pool, 1, 2, now).await.unwrap();
        assert_eq!(before[0], (Cooldown::Daily, Some(86400)));
        assert_eq!(before[1], (Cooldown::Work, Some(3600)));
        assert_eq!(before[2], (Cooldown::Weekly, None));

        assert!(reset_cooldowns(&pool, 1, 2, &[Cooldown::Daily]).await.unwrap());
        let after = cooldowns(&pool, 1, 2, now).await.unwrap();
        assert_eq!(after[0], (Cooldown::Daily, None));
        assert_eq!(after[1], (Cooldown::Work, Some(3600)));

        // The daily reward can be claimed again right away
        claim(&pool, &settings, 1, 2, Reward::Daily, fixed(100), now).await.unwrap();

        reset_cooldowns(&pool, 1, 2, &Cooldown::ALL).await.unwrap();
        assert!(cooldowns(&pool, 1, 2, now)
            .await
            .unwrap()
            .iter()
            .all(|(_, left)| left.is_none()));
    }
}
