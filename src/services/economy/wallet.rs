use sqlx::SqlitePool;
use tracing::info;

use crate::bot::error::Error;
use crate::db::models::Account;
use crate::db::queries::account;

pub async fn deposit(
    pool: &SqlitePool,
    guild_id: i64,
    user_id: i64,
    amount: i64,
) -> Result<Account, Error> {
    if amount <= 0 {
        return Err(Error::invalid("Amount must be positive"));
    }

    let current = account::get_or_create(pool, guild_id, user_id).await?;
    if !account::deposit(pool, guild_id, user_id, amount).await? {
        return Err(Error::InsufficientFunds {
            needed: amount,
            available: current.cash,
        });
    }

    Ok(account::get_or_create(pool, guild_id, user_id).await?)
}

pub async fn withdraw(
    pool: &SqlitePool,
    guild_id: i64,
    user_id: i64,
    amount: i64,
) -> Result<Account, Error> {
    if amount <= 0 {
        return Err(Error::invalid("Amount must be positive"));
    }

    let current = account::get_or_create(pool, guild_id, user_id).await?;
    if !account::withdraw(pool, guild_id, user_id, amount).await? {
        return Err(Error::InsufficientFunds {
            needed: amount,
            available: current.bank,
        });
    }

    Ok(account::get_or_create(pool, guild_id, user_id).await?)
}

/// Pay `amount` out of cash, or fail without touching the account
pub async fn spend_cash(
    pool: &SqlitePool,
    guild_id: i64,
    user_id: i64,
    amount: i64,
) -> Result<(), Error> {
    let current = account::get_or_create(pool, guild_id, user_id).await?;
    if !account::try_spend_cash(pool, guild_id, user_id, amount).await? {
        return Err(Error::InsufficientFunds {
            needed: amount,
            available: current.cash,
        });
    }
    Ok(())
}

/// Admin adjustment; either side may be negative, balances never drop below zero
pub async fn adjust(
    pool: &SqlitePool,
    guild_id: i64,
    user_id: i64,
    cash_delta: i64,
    bank_delta: i64,
) -> Result<Account, Error> {
    let mut tx = pool.begin().await?;
    account::ensure(&mut *tx, guild_id, user_id).await?;
    account::add_cash(&mut *tx, guild_id, user_id, cash_delta).await?;
    let updated = account::add_bank(&mut *tx, guild_id, user_id, bank_delta)
        .await?
        .ok_or_else(|| Error::not_found("account"))?;
    tx.commit().await?;

    info!(
        "Adjusted balance of {} in {} by cash {:+} bank {:+}",
        user_id, guild_id, cash_delta, bank_delta
    );

    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::pool::test_pool;

    #[tokio::test]
    async fn test_deposit_and_withdraw() {
        let pool = test_pool().await;
        adjust(&pool, 1, 2, 500, 0).await.unwrap();

        let acc = deposit(&pool, 1, 2, 200).await.unwrap();
        assert_eq!((acc.cash, acc.bank), (300, 200));

        let acc = withdraw(&pool, 1, 2, 50).await.unwrap();
        assert_eq!((acc.cash, acc.bank), (350, 150));
    }

    #[tokio::test]
    async fn test_transfers_reject_bad_amounts() {
        let pool = test_pool().await;
        adjust(&pool, 1, 2, 100, 10).await.unwrap();

        assert!(matches!(
            deposit(&pool, 1, 2, 0).await,
            Err(Error::InvalidOperation(_))
        ));
        assert!(matches!(
            deposit(&pool, 1, 2, 101).await,
            Err(Error::InsufficientFunds {
                needed: 101,
                available: 100
            })
        ));
        assert!(matches!(
            withdraw(&pool, 1, 2, 11).await,
            Err(Error::InsufficientFunds { .. })
        ));

        let acc = account::get(&pool, 1, 2).await.unwrap().unwrap();
        assert_eq!((acc.cash, acc.bank), (100, 10));
    }

    #[tokio::test]
    async fn test_adjust_clamps_at_zero() {
        let pool = test_pool().await;
        adjust(&pool, 1, 2, 100, 100).await.unwrap();

        let acc = adjust(&pool, 1, 2, -1000, -30).await.unwrap();
        assert_eq!((acc.cash, acc.bank), (0, 70));
    }

    #[tokio::test]
    async fn test_spend_cash() {
        let pool = test_pool().await;
        adjust(&pool, 1, 2, 100, 0).await.unwrap();

        spend_cash(&pool, 1, 2, 60).await.unwrap();
        assert!(spend_cash(&pool, 1, 2, 60).await.is_err());
        let acc = account::get(&pool, 1, 2).await.unwrap().unwrap();
        assert_eq!(acc.cash, 40);
    }
}
