use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;
use tracing::info;

use crate::bot::error::Error;
use crate::config::LoveSettings;
use crate::constants::timeouts::LOVE_ACCESS_DAYS_PER_MONTH;
use crate::db::models::{Couple, LoveRoomAccess};
use crate::db::queries::{account, love};

pub const MAX_ACCESS_MONTHS: i64 = 12;
pub const MAX_DESCRIPTION_LENGTH: usize = 100;

pub async fn couple_of(pool: &SqlitePool, user_id: i64) -> Result<Option<Couple>, Error> {
    Ok(love::couple_of(pool, user_id).await?)
}

/// Checks run before a proposal is shown to its target
pub async fn check_proposal(
    pool: &SqlitePool,
    settings: &LoveSettings,
    guild_id: i64,
    proposer_id: i64,
    target_id: i64,
) -> Result<(), Error> {
    if proposer_id == target_id {
        return Err(Error::invalid("You cannot marry yourself"));
    }
    if love::couple_of(pool, proposer_id).await?.is_some() {
        return Err(Error::invalid("You are already in a couple"));
    }
    if love::couple_of(pool, target_id).await?.is_some() {
        return Err(Error::invalid("That member is already in a couple"));
    }

    let proposer = account::get_or_create(pool, guild_id, proposer_id).await?;
    if proposer.cash < settings.marry_cost {
        return Err(Error::InsufficientFunds {
            needed: settings.marry_cost,
            available: proposer.cash,
        });
    }
    Ok(())
}

/// Create the couple once the proposal is accepted, charging the proposer.
/// Nothing is charged if the couple cannot be created.
pub async fn marry(
    pool: &SqlitePool,
    settings: &LoveSettings,
    guild_id: i64,
    proposer_id: i64,
    target_id: i64,
    now: DateTime<Utc>,
) -> Result<Couple, Error> {
    if proposer_id == target_id {
        return Err(Error::invalid("You cannot marry yourself"));
    }

    let mut tx = pool.begin().await?;
    if love::couple_of(&mut *tx, proposer_id).await?.is_some()
        || love::couple_of(&mut *tx, target_id).await?.is_some()
    {
        return Err(Error::invalid("One of you is already in a couple"));
    }

    account::ensure(&mut *tx, guild_id, proposer_id).await?;
    let proposer = account::get(&mut *tx, guild_id, proposer_id)
        .await?
        .ok_or_else(|| Error::not_found("account"))?;
    if !account::try_spend_cash(&mut *tx, guild_id, proposer_id, settings.marry_cost).await? {
        return Err(Error::InsufficientFunds {
            needed: settings.marry_cost,
            available: proposer.cash,
        });
    }

    let couple = love::insert_couple(&mut *tx, guild_id, proposer_id, target_id, now).await?;
    tx.commit().await?;

    info!("{} and {} are now couple {}", proposer_id, target_id, couple.id);
    Ok(couple)
}

/// Dissolve the user's couple together with its sessions
pub async fn divorce(pool: &SqlitePool, user_id: i64) -> Result<Couple, Error> {
    let couple = love::couple_of(pool, user_id)
        .await?
        .ok_or_else(|| Error::invalid("You are not in a couple"))?;

    love::take_session(pool, couple.id).await?;
    love::delete_couple(pool, couple.id).await?;

    info!("Couple {} dissolved by {}", couple.id, user_id);
    Ok(couple)
}

pub async fn set_description(
    pool: &SqlitePool,
    user_id: i64,
    description: &str,
) -> Result<Couple, Error> {
    let description = description.trim();
    if description.is_empty() || description.chars().count() > MAX_DESCRIPTION_LENGTH {
        return Err(Error::invalid(format!(
            "Description must be 1 to {} characters",
            MAX_DESCRIPTION_LENGTH
        )));
    }

    let couple = love::couple_of(pool, user_id)
        .await?
        .ok_or_else(|| Error::invalid("You are not in a couple"))?;
    love::set_description(pool, couple.id, description)
        .await?
        .ok_or_else(|| Error::not_found("couple"))
}

/// Pay for `months` of love room access, extending any access still running
pub async fn buy_room_access(
    pool: &SqlitePool,
    settings: &LoveSettings,
    guild_id: i64,
    user_id: i64,
    months: i64,
    now: DateTime<Utc>,
) -> Result<LoveRoomAccess, Error> {
    if !(1..=MAX_ACCESS_MONTHS).contains(&months) {
        return Err(Error::invalid(format!(
            "You can buy 1 to {} months at a time",
            MAX_ACCESS_MONTHS
        )));
    }
    let cost = settings.room_access_cost * months;

    let mut tx = pool.begin().await?;
    account::ensure(&mut *tx, guild_id, user_id).await?;
    let buyer = account::get(&mut *tx, guild_id, user_id)
        .await?
        .ok_or_else(|| Error::not_found("account"))?;
    if !account::try_spend_cash(&mut *tx, guild_id, user_id, cost).await? {
        return Err(Error::InsufficientFunds {
            needed: cost,
            available: buyer.cash,
        });
    }

    let extension = Duration::days(LOVE_ACCESS_DAYS_PER_MONTH * months);
    let expires_at = match love::get_access(&mut *tx, user_id).await? {
        Some(current) if current.expires_at > now => current.expires_at + extension,
        _ => now + extension,
    };
    let access = love::upsert_access(&mut *tx, guild_id, user_id, expires_at, now).await?;
    tx.commit().await?;

    info!("{} bought love room access until {}", user_id, access.expires_at);
    Ok(access)
}

pub async fn has_access(pool: &SqlitePool, user_id: i64, now: DateTime<Utc>) -> Result<bool, Error> {
    Ok(love::get_access(pool, user_id)
        .await?
        .map(|a| a.expires_at > now)
        .unwrap_or(false))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use tokio_test::{assert_err, assert_ok};

    use super::*;
    use crate::db::pool::test_pool;
    use crate::services::economy::wallet;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 2, 14, 18, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_marry_charges_proposer() {
        let pool = test_pool().await;
        let settings = LoveSettings::default();
        wallet::adjust(&pool, 1, 10, settings.marry_cost + 5, 0).await.unwrap();

        check_proposal(&pool, &settings, 1, 10, 20).await.unwrap();
        let couple = marry(&pool, &settings, 1, 10, 20, now()).await.unwrap();
        assert_eq!(couple.partner_of(20), Some(10));
        assert_eq!(couple.description, "Together");

        let proposer = account::get_or_create(&pool, 1, 10).await.unwrap();
        assert_eq!(proposer.cash, 5);

        // Both partners are now taken
        wallet::adjust(&pool, 1, 30, settings.marry_cost, 0).await.unwrap();
        assert!(check_proposal(&pool, &settings, 1, 30, 20).await.is_err());
        assert!(marry(&pool, &settings, 1, 30, 10, now()).await.is_err());
        let other = account::get_or_create(&pool, 1, 30).await.unwrap();
        assert_eq!(other.cash, settings.marry_cost);
    }

    #[tokio::test]
    async fn test_marry_without_funds() {
        let pool = test_pool().await;
        let settings = LoveSettings::default();

        assert!(check_proposal(&pool, &settings, 1, 10, 10).await.is_err());
        let err = check_proposal(&pool, &settings, 1, 10, 20).await.unwrap_err();
        assert!(matches!(err, Error::InsufficientFunds { .. }));
        assert!(marry(&pool, &settings, 1, 10, 20, now()).await.is_err());
        assert!(couple_of(&pool, 20).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_divorce() {
        let pool = test_pool().await;
        let settings = LoveSettings {
            marry_cost: 0,
            ..LoveSettings::default()
        };
        let couple = marry(&pool, &settings, 1, 10, 20, now()).await.unwrap();
        love::start_session(&pool, couple.id, 99, now()).await.unwrap();

        let divorced = assert_ok!(divorce(&pool, 20).await);
        assert_eq!(divorced.id, couple.id);
        assert!(couple_of(&pool, 10).await.unwrap().is_none());
        assert!(love::get_session(&pool, couple.id).await.unwrap().is_none());
        assert_err!(divorce(&pool, 20).await);
    }

    #[tokio::test]
    async fn test_room_access_extends() {
        let pool = test_pool().await;
        let settings = LoveSettings::default();
        wallet::adjust(&pool, 1, 10, settings.room_access_cost * 3, 0).await.unwrap();

        let first = buy_room_access(&pool, &settings, 1, 10, 1, now()).await.unwrap();
        assert_eq!(first.expires_at, now() + Duration::days(30));

        let later = now() + Duration::days(10);
        let second = buy_room_access(&pool, &settings, 1, 10, 2, later).await.unwrap();
        assert_eq!(second.expires_at, now() + Duration::days(90));
        assert_eq!(second.last_payment, later);

        assert!(has_access(&pool, 10, later).await.unwrap());
        assert!(!has_access(&pool, 10, now() + Duration::days(90)).await.unwrap());
        assert!(buy_room_access(&pool, &settings, 1, 10, 1, later).await.is_err());
        assert!(buy_room_access(&pool, &settings, 1, 10, 0, later).await.is_err());
    }

    #[tokio::test]
    async fn test_room_access_after_expiry_starts_fresh() {
        let pool = test_pool().await;
        let settings = LoveSettings {
            room_access_cost: 1,
            ..LoveSettings::default()
        };
        wallet::adjust(&pool, 1, 10, 10, 0).await.unwrap();

        buy_room_access(&pool, &settings, 1, 10, 1, now()).await.unwrap();
        let much_later = now() + Duration::days(45);
        let renewed = buy_room_access(&pool, &settings, 1, 10, 1, much_later)
            .await
            .unwrap();
        assert_eq!(renewed.expires_at, much_later + Duration::days(30));
    }

    #[tokio::test]
    async fn test_description() {
        let pool = test_pool().await;
        let settings = LoveSettings {
            marry_cost: 0,
            ..LoveSettings::default()
        };
        assert_err!(set_description(&pool, 10, "hi").await);
        marry(&pool, &settings, 1, 10, 20, now()).await.unwrap();

        let updated = assert_ok!(set_description(&pool, 20, "  Since 2025  ").await);
        assert_eq!(updated.description, "Since 2025");
        assert_err!(set_description(&pool, 20, "").await);
    }
}
