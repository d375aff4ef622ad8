use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serenity::all::{GuildId, Http, RoleId, UserId};
use sqlx::SqlitePool;
use tokio::time::interval;
use tracing::{error, info, warn};

use crate::bot::data::Data;
use crate::bot::error::Error;
use crate::constants::timeouts::TEMP_ROLE_SWEEP_INTERVAL;
use crate::db::models::{ShopItem, TempRole};
use crate::db::queries::{account, shop, temp_role};

pub async fn add_listing(
    pool: &SqlitePool,
    guild_id: i64,
    role_id: i64,
    price: i64,
    stock: Option<i64>,
) -> Result<ShopItem, Error> {
    if price < 0 {
        return Err(Error::invalid("Price cannot be negative"));
    }
    if stock.map(|s| s < 0).unwrap_or(false) {
        return Err(Error::invalid("Stock cannot be negative"));
    }

    let item = shop::add(pool, guild_id, role_id, price, stock)
        .await?
        .ok_or_else(|| Error::invalid("This role is already in the shop"))?;

    info!("Listed role {} in {} for {}", role_id, guild_id, price);
    Ok(item)
}

/// Charge the bank and take one unit of stock
pub async fn purchase(
    pool: &SqlitePool,
    guild_id: i64,
    user_id: i64,
    item_id: i64,
) -> Result<ShopItem, Error> {
    let mut tx = pool.begin().await?;
    let item = shop::get(&mut *tx, guild_id, item_id)
        .await?
        .ok_or_else(|| Error::not_found(format!("shop item #{}", item_id)))?;

    if !item.in_stock() {
        return Err(Error::invalid("This item is sold out"));
    }

    account::ensure(&mut *tx, guild_id, user_id).await?;
    let buyer = account::get(&mut *tx, guild_id, user_id)
        .await?
        .ok_or_else(|| Error::not_found("account"))?;
    if !account::try_spend_bank(&mut *tx, guild_id, user_id, item.price).await? {
        return Err(Error::InsufficientFunds {
            needed: item.price,
            available: buyer.bank,
        });
    }
    if !shop::take_stock(&mut *tx, item.id).await? {
        return Err(Error::invalid("This item is sold out"));
    }
    tx.commit().await?;

    info!("{} bought shop item {} in {}", user_id, item.id, guild_id);
    Ok(item)
}

/// Undo a purchase whose role could not be handed out
pub async fn refund(pool: &SqlitePool, item: &ShopItem, user_id: i64) -> Result<(), Error> {
    let mut tx = pool.begin().await?;
    account::add_bank(&mut *tx, item.guild_id, user_id, item.price).await?;
    if item.stock.is_some() {
        sqlx::query("UPDATE shop_roles SET stock = stock + 1 WHERE id = ? AND stock IS NOT NULL")
            .bind(item.id)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;

    warn!("Refunded shop item {} to {}", item.id, user_id);
    Ok(())
}

/// Give a member a role that is taken away again after `duration`
pub async fn grant_temp_role(
    http: &Http,
    pool: &SqlitePool,
    guild_id: GuildId,
    user_id: UserId,
    role_id: RoleId,
    duration: Duration,
    now: DateTime<Utc>,
) -> Result<TempRole, Error> {
    http.add_member_role(guild_id, user_id, role_id, Some("Temporary role"))
        .await?;

    let granted = temp_role::upsert(
        pool,
        guild_id.get() as i64,
        user_id.get() as i64,
        role_id.get() as i64,
        now + duration,
    )
    .await?;

    info!("Granted temporary role {} to {} until {}", role_id, user_id, granted.expires_at);
    Ok(granted)
}

/// Start the background task that takes away expired temporary roles
pub fn spawn_temp_role_sweeper(http: Arc<Http>, data: Arc<Data>) {
    tokio::spawn(async move {
        let mut ticker = interval(TEMP_ROLE_SWEEP_INTERVAL);

        loop {
            ticker.tick().await;

            if let Err(e) = remove_expired_temp_roles(&http, &data.pool, Utc::now()).await {
                error!("Error removing expired temporary roles: {:?}", e);
            }
        }
    });
}

pub async fn remove_expired_temp_roles(
    http: &Http,
    pool: &SqlitePool,
    now: DateTime<Utc>,
) -> Result<usize, Error> {
    let expired = temp_role::list_expired(pool, now).await?;
    let count = expired.len();

    for role in expired {
        if let Err(e) = http
            .remove_member_role(
                GuildId::new(role.guild_id as u64),
                UserId::new(role.user_id as u64),
                RoleId::new(role.role_id as u64),
                Some("Temporary role expired"),
            )
            .await
        {
            warn!(
                "Failed to remove temporary role {} from {}: {:?}",
                role.role_id, role.user_id, e
            );
        }
        temp_role::delete(pool, role.guild_id, role.user_id, role.role_id).await?;
    }

    if count > 0 {
        info!("Removed {} expired temporary roles", count);
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::pool::test_pool;
    use crate::db::queries::shop::ShopOrder;
    use crate::services::economy::wallet;

    #[tokio::test]
    async fn test_duplicate_listing_rejected() {
        let pool = test_pool().await;
        add_listing(&pool, 1, 500, 1000, None).await.unwrap();
        assert!(add_listing(&pool, 1, 500, 2000, None).await.is_err());
        // Same role in another guild is a separate listing
        add_listing(&pool, 2, 500, 2000, None).await.unwrap();
        assert!(add_listing(&pool, 1, 501, -1, None).await.is_err());
    }

    #[tokio::test]
    async fn test_purchase_limited_stock() {
        let pool = test_pool().await;
        let item = add_listing(&pool, 1, 500, 1000, Some(1)).await.unwrap();
        wallet::adjust(&pool, 1, 2, 0, 2500).await.unwrap();
        wallet::adjust(&pool, 1, 3, 0, 2500).await.unwrap();

        purchase(&pool, 1, 2, item.id).await.unwrap();
        let err = purchase(&pool, 1, 3, item.id).await.unwrap_err();
        assert!(matches!(err, Error::InvalidOperation(_)));

        let buyer = account::get(&pool, 1, 2).await.unwrap().unwrap();
        assert_eq!(buyer.bank, 1500);
        let other = account::get(&pool, 1, 3).await.unwrap().unwrap();
        assert_eq!(other.bank, 2500);
    }

    #[tokio::test]
    async fn test_purchase_needs_bank_funds() {
        let pool = test_pool().await;
        let item = add_listing(&pool, 1, 500, 1000, None).await.unwrap();
        wallet::adjust(&pool, 1, 2, 5000, 999).await.unwrap();

        let err = purchase(&pool, 1, 2, item.id).await.unwrap_err();
        assert!(matches!(
            err,
            Error::InsufficientFunds {
                needed: 1000,
                available: 999
            }
        ));
        assert!(purchase(&pool, 1, 2, item.id + 100).await.is_err());
    }

    #[tokio::test]
    async fn test_refund_restocks() {
        let pool = test_pool().await;
        let item = add_listing(&pool, 1, 500, 100, Some(2)).await.unwrap();
        wallet::adjust(&pool, 1, 2, 0, 100).await.unwrap();

        let bought = purchase(&pool, 1, 2, item.id).await.unwrap();
        refund(&pool, &bought, 2).await.unwrap();

        let listed = shop::list(&pool, 1, ShopOrder::PriceAsc, 10, 0).await.unwrap();
        assert_eq!(listed[0].stock, Some(2));
        let buyer = account::get(&pool, 1, 2).await.unwrap().unwrap();
        assert_eq!(buyer.bank, 100);
    }

    #[tokio::test]
    async fn test_shop_ordering() {
        let pool = test_pool().await;
        add_listing(&pool, 1, 10, 300, None).await.unwrap();
        add_listing(&pool, 1, 11, 100, Some(5)).await.unwrap();
        add_listing(&pool, 1, 12, 200, Some(1)).await.unwrap();

        let by_price: Vec<i64> = shop::list(&pool, 1, ShopOrder::PriceDesc, 10, 0)
            .await
            .unwrap()
            .iter()
            .map(|i| i.price)
            .collect();
        assert_eq!(by_price, vec![300, 200, 100]);

        let by_stock: Vec<i64> = shop::list(&pool, 1, ShopOrder::Availability, 10, 0)
            .await
            .unwrap()
            .iter()
            .map(|i| i.role_id)
            .collect();
        assert_eq!(by_stock, vec![12, 11, 10]);
    }
}
