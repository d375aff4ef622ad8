use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::bot::error::Error;
use crate::constants::economy::CUSTOM_ROLE_NAME_MAX;
use crate::constants::embeds::parse_hex_color;
use crate::db::models::{
    CustomRoleRequest, OwnedCustomRole, RequestStatus, RoleEditRequest, RoleListing,
};
use crate::db::queries::{account, custom_role};

/// Trimmed role name, rejected when empty or too long
pub fn validate_name(name: &str) -> Result<String, Error> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::invalid("Role name cannot be empty"));
    }
    if name.chars().count() > CUSTOM_ROLE_NAME_MAX {
        return Err(Error::invalid(format!(
            "Role name can be at most {} characters",
            CUSTOM_ROLE_NAME_MAX
        )));
    }
    Ok(name.to_string())
}

/// Normalize to lowercase `#rrggbb`, the leading `#` is optional
pub fn validate_color(color: &str) -> Result<String, Error> {
    let color = color.trim();
    let hex = if color.starts_with('#') {
        color.to_lowercase()
    } else {
        format!("#{}", color.to_lowercase())
    };
    parse_hex_color(&hex)
        .map(|_| hex)
        .ok_or_else(|| Error::invalid("Color must look like #ff8800"))
}

async fn bank_of(pool: &SqlitePool, guild_id: i64, user_id: i64) -> Result<i64, Error> {
    Ok(account::get_or_create(pool, guild_id, user_id).await?.bank)
}

/// File a request for review. Nothing is charged until it is approved.
#[allow(clippy::too_many_arguments)]
pub async fn request_role(
    pool: &SqlitePool,
    price: i64,
    guild_id: i64,
    user_id: i64,
    name: &str,
    color: &str,
    image_url: Option<&str>,
    now: DateTime<Utc>,
) -> Result<CustomRoleRequest, Error> {
    let name = validate_name(name)?;
    let color = validate_color(color)?;

    if let Some(pending) = custom_role::pending_request(pool, guild_id, user_id).await? {
        return Err(Error::invalid(format!(
            "You already have request #{} waiting for review",
            pending.id
        )));
    }

    let available = bank_of(pool, guild_id, user_id).await?;
    if available < price {
        return Err(Error::InsufficientFunds {
            needed: price,
            available,
        });
    }

    let request =
        custom_role::insert_request(pool, guild_id, user_id, &name, &color, image_url, now).await?;
    info!("{} requested custom role `{}` in {}", user_id, request.name, guild_id);
    Ok(request)
}

/// A request that can still be reviewed
pub async fn pending(
    pool: &SqlitePool,
    guild_id: i64,
    request_id: i64,
) -> Result<CustomRoleRequest, Error> {
    let request = custom_role::get_request(pool, guild_id, request_id)
        .await?
        .ok_or_else(|| Error::not_found(format!("request #{}", request_id)))?;
    if request.status != RequestStatus::Pending {
        return Err(Error::invalid(format!(
            "Request #{} was already {}",
            request.id,
            request.status.as_str()
        )));
    }
    Ok(request)
}

/// Charge the requester and record `role_id` as theirs.
/// A requester who can no longer pay has the request denied.
pub async fn approve_request(
    pool: &SqlitePool,
    price: i64,
    guild_id: i64,
    request_id: i64,
    role_id: i64,
    reviewer_id: i64,
    now: DateTime<Utc>,
) -> Result<CustomRoleRequest, Error> {
    let request = pending(pool, guild_id, request_id).await?;

    let mut tx = pool.begin().await?;
    account::ensure(&mut *tx, guild_id, request.user_id).await?;
    if !account::try_spend_bank(&mut *tx, guild_id, request.user_id, price).await? {
        let available = account::get(&mut *tx, guild_id, request.user_id)
            .await?
            .map(|a| a.bank)
            .unwrap_or(0);
        custom_role::set_request_status(&mut *tx, request.id, RequestStatus::Denied, reviewer_id, now)
            .await?;
        tx.commit().await?;
        warn!("Denied custom role request {}: requester cannot pay", request.id);
        return Err(Error::InsufficientFunds {
            needed: price,
            available,
        });
    }
    if !custom_role::set_request_status(&mut *tx, request.id, RequestStatus::Approved, reviewer_id, now)
        .await?
    {
        return Err(Error::invalid(format!("Request #{} was already reviewed", request.id)));
    }
    custom_role::add_owned(&mut *tx, guild_id, request.user_id, role_id, now).await?;
    tx.commit().await?;

    info!(
        "Approved custom role request {} as role {} for {}",
        request.id, role_id, request.user_id
    );
    Ok(CustomRoleRequest {
        status: RequestStatus::Approved,
        reviewed_by: Some(reviewer_id),
        reviewed_at: Some(now),
        ..request
    })
}

pub async fn deny_request(
    pool: &SqlitePool,
    guild_id: i64,
    request_id: i64,
    reviewer_id: i64,
    now: DateTime<Utc>,
) -> Result<CustomRoleRequest, Error> {
    let request = pending(pool, guild_id, request_id).await?;
    if !custom_role::set_request_status(pool, request.id, RequestStatus::Denied, reviewer_id, now)
        .await?
    {
        return Err(Error::invalid(format!("Request #{} was already reviewed", request.id)));
    }

    info!("Denied custom role request {}", request.id);
    Ok(request)
}

pub async fn owned_roles(
    pool: &SqlitePool,
    guild_id: i64,
    user_id: i64,
) -> Result<Vec<OwnedCustomRole>, Error> {
    Ok(custom_role::owned(pool, guild_id, user_id).await?)
}

/// Forget a role's owners and take its listing down. Returns the number of owners removed.
pub async fn revoke_role(pool: &SqlitePool, guild_id: i64, role_id: i64) -> Result<u64, Error> {
    let mut tx = pool.begin().await?;
    let owners = custom_role::remove_owned(&mut *tx, guild_id, role_id).await?;
    let listings = custom_role::cleanup_invalid_listings(&mut *tx, guild_id).await?;
    tx.commit().await?;

    info!(
        "Revoked custom role {} in {} ({} owners, {} listings)",
        role_id, guild_id, owners, listings
    );
    Ok(owners)
}

/// Put an owned role up for resale, replacing any earlier listing of it
pub async fn create_listing(
    pool: &SqlitePool,
    guild_id: i64,
    seller_id: i64,
    role_id: i64,
    price: i64,
    max_sales: Option<i64>,
    description: &str,
) -> Result<RoleListing, Error> {
    if price <= 0 {
        return Err(Error::invalid("Price must be positive"));
    }
    if max_sales.map(|m| m < 1).unwrap_or(false) {
        return Err(Error::invalid("Sales limit must be at least 1"));
    }
    if !custom_role::owns(pool, guild_id, seller_id, role_id).await? {
        return Err(Error::invalid("You can only sell custom roles you own"));
    }

    let listing = custom_role::upsert_listing(
        pool,
        guild_id,
        role_id,
        seller_id,
        price,
        max_sales,
        description.trim(),
    )
    .await?;

    info!("{} listed role {} in {} for {}", seller_id, role_id, guild_id, price);
    Ok(listing)
}

async fn own_listing(
    pool: &SqlitePool,
    guild_id: i64,
    seller_id: i64,
    role_id: i64,
) -> Result<RoleListing, Error> {
    let listing = custom_role::get_listing(pool, guild_id, role_id)
        .await?
        .ok_or_else(|| Error::not_found("listing for that role"))?;
    if listing.seller_id != seller_id {
        return Err(Error::PermissionDenied("This is not your listing".to_string()));
    }
    Ok(listing)
}

pub async fn update_listing(
    pool: &SqlitePool,
    guild_id: i64,
    seller_id: i64,
    role_id: i64,
    price: Option<i64>,
    max_sales: Option<i64>,
) -> Result<RoleListing, Error> {
    if price.map(|p| p <= 0).unwrap_or(false) {
        return Err(Error::invalid("Price must be positive"));
    }
    if max_sales.map(|m| m < 1).unwrap_or(false) {
        return Err(Error::invalid("Sales limit must be at least 1"));
    }
    own_listing(pool, guild_id, seller_id, role_id).await?;

    custom_role::update_listing(pool, guild_id, role_id, price, max_sales)
        .await?
        .ok_or_else(|| Error::not_found("listing for that role"))
}

pub async fn remove_listing(
    pool: &SqlitePool,
    guild_id: i64,
    seller_id: i64,
    role_id: i64,
) -> Result<(), Error> {
    own_listing(pool, guild_id, seller_id, role_id).await?;
    custom_role::remove_listing(pool, guild_id, role_id).await?;
    info!("{} unlisted role {} in {}", seller_id, role_id, guild_id);
    Ok(())
}

/// Move the price from the buyer's bank to the seller's bank and count the sale
pub async fn purchase_listing(
    pool: &SqlitePool,
    guild_id: i64,
    buyer_id: i64,
    role_id: i64,
) -> Result<RoleListing, Error> {
    let mut tx = pool.begin().await?;
    let listing = custom_role::get_listing(&mut *tx, guild_id, role_id)
        .await?
        .ok_or_else(|| Error::not_found("listing for that role"))?;

    if listing.seller_id == buyer_id {
        return Err(Error::invalid("You cannot buy your own listing"));
    }
    if listing.sold_out() {
        return Err(Error::invalid("This listing has reached its sales limit"));
    }

    account::ensure(&mut *tx, guild_id, buyer_id).await?;
    let buyer = account::get(&mut *tx, guild_id, buyer_id)
        .await?
        .ok_or_else(|| Error::not_found("account"))?;
    if !account::try_spend_bank(&mut *tx, guild_id, buyer_id, listing.price).await? {
        return Err(Error::InsufficientFunds {
            needed: listing.price,
            available: buyer.bank,
        });
    }
    if !custom_role::record_sale(&mut *tx, guild_id, role_id).await? {
        return Err(Error::invalid("This listing has reached its sales limit"));
    }
    account::ensure(&mut *tx, guild_id, listing.seller_id).await?;
    account::add_bank(&mut *tx, guild_id, listing.seller_id, listing.price).await?;
    tx.commit().await?;

    info!(
        "{} bought role {} from {} for {}",
        buyer_id, role_id, listing.seller_id, listing.price
    );
    Ok(RoleListing {
        sales_done: listing.sales_done + 1,
        ..listing
    })
}

/// Undo a listing purchase whose role could not be handed out
pub async fn refund_listing(
    pool: &SqlitePool,
    listing: &RoleListing,
    buyer_id: i64,
) -> Result<(), Error> {
    let mut tx = pool.begin().await?;
    account::add_bank(&mut *tx, listing.guild_id, listing.seller_id, -listing.price).await?;
    account::add_bank(&mut *tx, listing.guild_id, buyer_id, listing.price).await?;
    custom_role::undo_sale(&mut *tx, listing.guild_id, listing.role_id).await?;
    tx.commit().await?;

    warn!("Refunded listing {} to {}", listing.role_id, buyer_id);
    Ok(())
}

pub async fn cleanup_invalid_listings(pool: &SqlitePool, guild_id: i64) -> Result<u64, Error> {
    let removed = custom_role::cleanup_invalid_listings(pool, guild_id).await?;
    if removed > 0 {
        info!("Removed {} invalid role listings in {}", removed, guild_id);
    }
    Ok(removed)
}

/// Pay for a name or color change up front; a denial refunds it
#[allow(clippy::too_many_arguments)]
pub async fn request_edit(
    pool: &SqlitePool,
    price: i64,
    guild_id: i64,
    user_id: i64,
    role_id: i64,
    new_name: Option<&str>,
    new_color: Option<&str>,
    now: DateTime<Utc>,
) -> Result<RoleEditRequest, Error> {
    if new_name.is_none() && new_color.is_none() {
        return Err(Error::invalid("Give a new name, a new color, or both"));
    }
    let new_name = new_name.map(validate_name).transpose()?;
    let new_color = new_color.map(validate_color).transpose()?;

    if !custom_role::owns(pool, guild_id, user_id, role_id).await? {
        return Err(Error::invalid("You can only edit custom roles you own"));
    }

    let mut tx = pool.begin().await?;
    account::ensure(&mut *tx, guild_id, user_id).await?;
    let current = account::get(&mut *tx, guild_id, user_id)
        .await?
        .ok_or_else(|| Error::not_found("account"))?;
    if !account::try_spend_bank(&mut *tx, guild_id, user_id, price).await? {
        return Err(Error::InsufficientFunds {
            needed: price,
            available: current.bank,
        });
    }
    let request = custom_role::insert_edit_request(
        &mut *tx,
        guild_id,
        user_id,
        role_id,
        new_name.as_deref(),
        new_color.as_deref(),
        price,
        now,
    )
    .await?;
    tx.commit().await?;

    info!("{} requested an edit of role {} ({})", user_id, role_id, request.id);
    Ok(request)
}

pub async fn pending_edit(
    pool: &SqlitePool,
    guild_id: i64,
    request_id: i64,
) -> Result<RoleEditRequest, Error> {
    let request = custom_role::get_edit_request(pool, guild_id, request_id)
        .await?
        .ok_or_else(|| Error::not_found(format!("edit request #{}", request_id)))?;
    if request.status != RequestStatus::Pending {
        return Err(Error::invalid(format!(
            "Edit request #{} was already {}",
            request.id,
            request.status.as_str()
        )));
    }
    Ok(request)
}

/// Mark an edit as applied, once the role itself has been changed
pub async fn approve_edit(
    pool: &SqlitePool,
    guild_id: i64,
    request_id: i64,
    reviewer_id: i64,
    now: DateTime<Utc>,
) -> Result<RoleEditRequest, Error> {
    let request = pending_edit(pool, guild_id, request_id).await?;
    if !custom_role::set_edit_status(pool, request.id, RequestStatus::Approved, reviewer_id, now)
        .await?
    {
        return Err(Error::invalid(format!("Edit request #{} was already reviewed", request.id)));
    }
    Ok(request)
}

/// Deny an edit and give back what was paid for it
pub async fn deny_edit(
    pool: &SqlitePool,
    guild_id: i64,
    request_id: i64,
    reviewer_id: i64,
    now: DateTime<Utc>,
) -> Result<RoleEditRequest, Error> {
    let request = pending_edit(pool, guild_id, request_id).await?;

    let mut tx = pool.begin().await?;
    if !custom_role::set_edit_status(&mut *tx, request.id, RequestStatus::Denied, reviewer_id, now)
        .await?
    {
        return Err(Error::invalid(format!("Edit request #{} was already reviewed", request.id)));
    }
    account::ensure(&mut *tx, guild_id, request.user_id).await?;
    account::add_bank(&mut *tx, guild_id, request.user_id, request.price_paid).await?;
    tx.commit().await?;

    info!("Denied edit request {}, refunded {}", request.id, request.price_paid);
    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::MarketKind;
    use crate::db::pool::test_pool;
    use crate::db::queries::shop::ShopOrder;
    use crate::services::economy::{shop, wallet};
    use chrono::TimeZone;

    const PRICE: i64 = 5000;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    async fn bank(pool: &SqlitePool, user_id: i64) -> i64 {
        account::get(pool, 1, user_id).await.unwrap().unwrap().bank
    }

    /// Member 2 owns role 900 after an approved request
    async fn owner_of_role(pool: &SqlitePool) {
        wallet::adjust(pool, 1, 2, 0, PRICE).await.unwrap();
        let request = request_role(pool, PRICE, 1, 2, "Night Owl", "#112233", None, t0())
            .await
            .unwrap();
        approve_request(pool, PRICE, 1, request.id, 900, 99, t0()).await.unwrap();
    }

    #[test]
    fn test_validate_color() {
        assert_eq!(validate_color("FF8800").unwrap(), "#ff8800");
        assert_eq!(validate_color(" #abcdef ").unwrap(), "#abcdef");
        assert!(validate_color("#ff88").is_err());
        assert!(validate_color("orange").is_err());
        assert!(validate_name("   ").is_err());
        assert!(validate_name(&"x".repeat(CUSTOM_ROLE_NAME_MAX + 1)).is_err());
    }

    #[tokio::test]
    async fn test_one_pending_request_at_a_time() {
        let pool = test_pool().await;
        wallet::adjust(&pool, 1, 2, 0, PRICE).await.unwrap();

        request_role(&pool, PRICE, 1, 2, "Night Owl", "112233", None, t0())
            .await
            .unwrap();
        let err = request_role(&pool, PRICE, 1, 2, "Early Bird", "#445566", None, t0())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidOperation(_)));

        // Requesting checks funds but does not charge
        assert_eq!(bank(&pool, 2).await, PRICE);
        let err = request_role(&pool, PRICE, 1, 3, "Broke", "#000000", None, t0())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InsufficientFunds { .. }));
    }

    #[tokio::test]
    async fn test_approval_charges_and_records_owner() {
        let pool = test_pool().await;
        owner_of_role(&pool).await;

        assert_eq!(bank(&pool, 2).await, 0);
        let owned = owned_roles(&pool, 1, 2).await.unwrap();
        assert_eq!(owned.len(), 1);
        assert_eq!(owned[0].role_id, 900);

        let requests = custom_role::list_requests(&pool, 1, RequestStatus::Approved, 10)
            .await
            .unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].reviewed_by, Some(99));

        // Reviewed requests cannot be reviewed again
        let id = requests[0].id;
        assert!(deny_request(&pool, 1, id, 99, t0()).await.is_err());
    }

    #[tokio::test]
    async fn test_approval_denies_when_requester_spent_the_money() {
        let pool = test_pool().await;
        wallet::adjust(&pool, 1, 2, 0, PRICE).await.unwrap();
        let request = request_role(&pool, PRICE, 1, 2, "Night Owl", "#112233", None, t0())
            .await
            .unwrap();
        wallet::adjust(&pool, 1, 2, 0, -1).await.unwrap();

        let err = approve_request(&pool, PRICE, 1, request.id, 900, 99, t0())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InsufficientFunds { needed: PRICE, .. }));

        let stored = custom_role::get_request(&pool, 1, request.id).await.unwrap().unwrap();
        assert_eq!(stored.status, RequestStatus::Denied);
        assert!(owned_roles(&pool, 1, 2).await.unwrap().is_empty());
        assert_eq!(bank(&pool, 2).await, PRICE - 1);
    }

    #[tokio::test]
    async fn test_only_owners_can_list() {
        let pool = test_pool().await;
        owner_of_role(&pool).await;

        assert!(create_listing(&pool, 1, 3, 900, 100, None, "").await.is_err());
        assert!(create_listing(&pool, 1, 2, 900, 0, None, "").await.is_err());
        assert!(create_listing(&pool, 1, 2, 900, 100, Some(0), "").await.is_err());
        create_listing(&pool, 1, 2, 900, 100, None, "Glows at night").await.unwrap();

        let err = remove_listing(&pool, 1, 3, 900).await.unwrap_err();
        assert!(matches!(err, Error::PermissionDenied(_)));
    }

    #[tokio::test]
    async fn test_market_purchase_moves_bank_funds() {
        let pool = test_pool().await;
        owner_of_role(&pool).await;
        create_listing(&pool, 1, 2, 900, 750, Some(3), "").await.unwrap();
        wallet::adjust(&pool, 1, 3, 200, 1000).await.unwrap();

        let sold = purchase_listing(&pool, 1, 3, 900).await.unwrap();
        assert_eq!(sold.sales_done, 1);
        assert_eq!(sold.remaining(), Some(2));

        assert_eq!(bank(&pool, 3).await, 250);
        assert_eq!(bank(&pool, 2).await, 750);
        let buyer = account::get(&pool, 1, 3).await.unwrap().unwrap();
        assert_eq!(buyer.cash, 200);

        // Cash does not count towards market purchases
        let err = purchase_listing(&pool, 1, 3, 900).await.unwrap_err();
        assert!(matches!(
            err,
            Error::InsufficientFunds {
                needed: 750,
                available: 250
            }
        ));
        assert!(purchase_listing(&pool, 1, 2, 900).await.is_err());
    }

    #[tokio::test]
    async fn test_sales_cap_is_enforced() {
        let pool = test_pool().await;
        owner_of_role(&pool).await;
        create_listing(&pool, 1, 2, 900, 100, Some(2), "").await.unwrap();
        for buyer in 3..=5 {
            wallet::adjust(&pool, 1, buyer, 0, 100).await.unwrap();
        }

        purchase_listing(&pool, 1, 3, 900).await.unwrap();
        purchase_listing(&pool, 1, 4, 900).await.unwrap();
        let err = purchase_listing(&pool, 1, 5, 900).await.unwrap_err();
        assert!(matches!(err, Error::InvalidOperation(_)));
        assert_eq!(bank(&pool, 5).await, 100);
        assert_eq!(bank(&pool, 2).await, 200);

        // Relisting keeps the sales already made
        let relisted = create_listing(&pool, 1, 2, 900, 150, Some(2), "").await.unwrap();
        assert_eq!(relisted.sales_done, 2);
        assert!(relisted.sold_out());

        // Raising the cap reopens it
        update_listing(&pool, 1, 2, 900, None, Some(3)).await.unwrap();
        wallet::adjust(&pool, 1, 5, 0, 50).await.unwrap();
        let sold = purchase_listing(&pool, 1, 5, 900).await.unwrap();
        assert_eq!(sold.price, 150);
        assert!(sold.sold_out());
    }

    #[tokio::test]
    async fn test_refund_listing() {
        let pool = test_pool().await;
        owner_of_role(&pool).await;
        create_listing(&pool, 1, 2, 900, 100, Some(1), "").await.unwrap();
        wallet::adjust(&pool, 1, 3, 0, 100).await.unwrap();

        let sold = purchase_listing(&pool, 1, 3, 900).await.unwrap();
        refund_listing(&pool, &sold, 3).await.unwrap();

        assert_eq!(bank(&pool, 3).await, 100);
        assert_eq!(bank(&pool, 2).await, 0);
        let listing = custom_role::get_listing(&pool, 1, 900).await.unwrap().unwrap();
        assert_eq!(listing.sales_done, 0);
    }

    #[tokio::test]
    async fn test_revoked_roles_leave_the_market() {
        let pool = test_pool().await;
        owner_of_role(&pool).await;
        create_listing(&pool, 1, 2, 900, 100, None, "").await.unwrap();
        assert_eq!(cleanup_invalid_listings(&pool, 1).await.unwrap(), 0);

        assert_eq!(revoke_role(&pool, 1, 900).await.unwrap(), 1);
        assert!(custom_role::get_listing(&pool, 1, 900).await.unwrap().is_none());
        assert!(owned_roles(&pool, 1, 2).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_market_combines_shop_and_listings() {
        let pool = test_pool().await;
        owner_of_role(&pool).await;
        shop::add_listing(&pool, 1, 500, 300, Some(4)).await.unwrap();
        create_listing(&pool, 1, 2, 900, 700, Some(2), "").await.unwrap();

        let items = custom_role::market_items(&pool, 1, ShopOrder::PriceDesc, 10, 0)
            .await
            .unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].kind, MarketKind::Listing);
        assert_eq!(items[0].seller_id, Some(2));
        assert_eq!(items[0].available, Some(2));
        assert_eq!(items[1].kind, MarketKind::Shop);
        assert!(items[1].item_id.is_some());
        assert_eq!(custom_role::market_count(&pool, 1).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_denied_edit_is_refunded() {
        let pool = test_pool().await;
        owner_of_role(&pool).await;
        wallet::adjust(&pool, 1, 2, 0, 1000).await.unwrap();

        assert!(request_edit(&pool, 1000, 1, 2, 900, None, None, t0()).await.is_err());
        assert!(request_edit(&pool, 1000, 1, 3, 900, Some("Mine"), None, t0())
            .await
            .is_err());

        let edit = request_edit(&pool, 1000, 1, 2, 900, Some("Day Owl"), Some("abcdef"), t0())
            .await
            .unwrap();
        assert_eq!(edit.new_color.as_deref(), Some("#abcdef"));
        assert_eq!(bank(&pool, 2).await, 0);

        deny_edit(&pool, 1, edit.id, 99, t0()).await.unwrap();
        assert_eq!(bank(&pool, 2).await, 1000);
        assert!(approve_edit(&pool, 1, edit.id, 99, t0()).await.is_err());
    }
}
