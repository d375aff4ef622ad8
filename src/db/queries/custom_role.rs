use chrono::{DateTime, Utc};
use sqlx::{SqliteExecutor, SqlitePool};

use crate::db::models::{
    CustomRoleRequest, MarketItem, OwnedCustomRole, RequestStatus, RoleEditRequest, RoleListing,
};
use crate::db::queries::shop::ShopOrder;

pub async fn insert_request<'e, E: SqliteExecutor<'e>>(
    executor: E,
    guild_id: i64,
    user_id: i64,
    name: &str,
    color: &str,
    image_url: Option<&str>,
    now: DateTime<Utc>,
) -> Result<CustomRoleRequest, sqlx::Error> {
    sqlx::query_as::<_, CustomRoleRequest>(
        r#"
        INSERT INTO custom_role_requests (guild_id, user_id, name, color, image_url, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(guild_id)
    .bind(user_id)
    .bind(name)
    .bind(color)
    .bind(image_url)
    .bind(now)
    .fetch_one(executor)
    .await
}

pub async fn get_request<'e, E: SqliteExecutor<'e>>(
    executor: E,
    guild_id: i64,
    id: i64,
) -> Result<Option<CustomRoleRequest>, sqlx::Error> {
    sqlx::query_as::<_, CustomRoleRequest>(
        "SELECT * FROM custom_role_requests WHERE guild_id = ? AND id = ?",
    )
    .bind(guild_id)
    .bind(id)
    .fetch_optional(executor)
    .await
}

pub async fn pending_request<'e, E: SqliteExecutor<'e>>(
    executor: E,
    guild_id: i64,
    user_id: i64,
) -> Result<Option<CustomRoleRequest>, sqlx::Error> {
    sqlx::query_as::<_, CustomRoleRequest>(
        r#"
        SELECT * FROM custom_role_requests
        WHERE guild_id = ? AND user_id = ? AND status = 'pending'
        ORDER BY id DESC LIMIT 1
        "#,
    )
    .bind(guild_id)
    .bind(user_id)
    .fetch_optional(executor)
    .await
}

pub async fn list_requests(
    pool: &SqlitePool,
    guild_id: i64,
    status: RequestStatus,
    limit: i64,
) -> Result<Vec<CustomRoleRequest>, sqlx::Error> {
    sqlx::query_as::<_, CustomRoleRequest>(
        "SELECT * FROM custom_role_requests WHERE guild_id = ? AND status = ? ORDER BY id ASC LIMIT ?",
    )
    .bind(guild_id)
    .bind(status)
    .bind(limit)
    .fetch_all(pool)
    .await
}

/// Close a pending request. False when it was already reviewed.
pub async fn set_request_status<'e, E: SqliteExecutor<'e>>(
    executor: E,
    id: i64,
    status: RequestStatus,
    reviewed_by: i64,
    now: DateTime<Utc>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE custom_role_requests SET status = ?, reviewed_by = ?, reviewed_at = ?
        WHERE id = ? AND status = 'pending'
        "#,
    )
    .bind(status)
    .bind(reviewed_by)
    .bind(now)
    .bind(id)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Record ownership. False when it was already recorded.
pub async fn add_owned<'e, E: SqliteExecutor<'e>>(
    executor: E,
    guild_id: i64,
    user_id: i64,
    role_id: i64,
    now: DateTime<Utc>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO owned_custom_roles (guild_id, user_id, role_id, created_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT (guild_id, user_id, role_id) DO NOTHING
        "#,
    )
    .bind(guild_id)
    .bind(user_id)
    .bind(role_id)
    .bind(now)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn owned<'e, E: SqliteExecutor<'e>>(
    executor: E,
    guild_id: i64,
    user_id: i64,
) -> Result<Vec<OwnedCustomRole>, sqlx::Error> {
    sqlx::query_as::<_, OwnedCustomRole>(
        "SELECT * FROM owned_custom_roles WHERE guild_id = ? AND user_id = ? ORDER BY created_at DESC",
    )
    .bind(guild_id)
    .bind(user_id)
    .fetch_all(executor)
    .await
}

pub async fn owns<'e, E: SqliteExecutor<'e>>(
    executor: E,
    guild_id: i64,
    user_id: i64,
    role_id: i64,
) -> Result<bool, sqlx::Error> {
    let row: Option<(i64,)> = sqlx::query_as(
        "SELECT 1 FROM owned_custom_roles WHERE guild_id = ? AND user_id = ? AND role_id = ?",
    )
    .bind(guild_id)
    .bind(user_id)
    .bind(role_id)
    .fetch_optional(executor)
    .await?;

    Ok(row.is_some())
}

/// Forget every owner of a role, for roles that were deleted
pub async fn remove_owned<'e, E: SqliteExecutor<'e>>(
    executor: E,
    guild_id: i64,
    role_id: i64,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM owned_custom_roles WHERE guild_id = ? AND role_id = ?")
        .bind(guild_id)
        .bind(role_id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected())
}

/// Create or replace a listing. Sales already made are kept.
pub async fn upsert_listing<'e, E: SqliteExecutor<'e>>(
    executor: E,
    guild_id: i64,
    role_id: i64,
    seller_id: i64,
    price: i64,
    max_sales: Option<i64>,
    description: &str,
) -> Result<RoleListing, sqlx::Error> {
    sqlx::query_as::<_, RoleListing>(
        r#"
        INSERT INTO role_listings (guild_id, role_id, seller_id, price, max_sales, description)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT (guild_id, role_id) DO UPDATE SET
            seller_id = excluded.seller_id,
            price = excluded.price,
            max_sales = excluded.max_sales,
            description = excluded.description
        RETURNING *
        "#,
    )
    .bind(guild_id)
    .bind(role_id)
    .bind(seller_id)
    .bind(price)
    .bind(max_sales)
    .bind(description)
    .fetch_one(executor)
    .await
}

pub async fn get_listing<'e, E: SqliteExecutor<'e>>(
    executor: E,
    guild_id: i64,
    role_id: i64,
) -> Result<Option<RoleListing>, sqlx::Error> {
    sqlx::query_as::<_, RoleListing>(
        "SELECT * FROM role_listings WHERE guild_id = ? AND role_id = ?",
    )
    .bind(guild_id)
    .bind(role_id)
    .fetch_optional(executor)
    .await
}

/// Change price and/or sales cap, leaving `None` fields alone
pub async fn update_listing<'e, E: SqliteExecutor<'e>>(
    executor: E,
    guild_id: i64,
    role_id: i64,
    price: Option<i64>,
    max_sales: Option<i64>,
) -> Result<Option<RoleListing>, sqlx::Error> {
    sqlx::query_as::<_, RoleListing>(
        r#"
        UPDATE role_listings
        SET price = COALESCE(?, price), max_sales = COALESCE(?, max_sales)
        WHERE guild_id = ? AND role_id = ?
        RETURNING *
        "#,
    )
    .bind(price)
    .bind(max_sales)
    .bind(guild_id)
    .bind(role_id)
    .fetch_optional(executor)
    .await
}

pub async fn remove_listing<'e, E: SqliteExecutor<'e>>(
    executor: E,
    guild_id: i64,
    role_id: i64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM role_listings WHERE guild_id = ? AND role_id = ?")
        .bind(guild_id)
        .bind(role_id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Count one sale unless the cap is already reached
pub async fn record_sale<'e, E: SqliteExecutor<'e>>(
    executor: E,
    guild_id: i64,
    role_id: i64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE role_listings SET sales_done = sales_done + 1
        WHERE guild_id = ? AND role_id = ? AND (max_sales IS NULL OR sales_done < max_sales)
        "#,
    )
    .bind(guild_id)
    .bind(role_id)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn undo_sale<'e, E: SqliteExecutor<'e>>(
    executor: E,
    guild_id: i64,
    role_id: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE role_listings SET sales_done = MAX(0, sales_done - 1) WHERE guild_id = ? AND role_id = ?",
    )
    .bind(guild_id)
    .bind(role_id)
    .execute(executor)
    .await?;

    Ok(())
}

/// Drop listings whose seller no longer owns the role
pub async fn cleanup_invalid_listings<'e, E: SqliteExecutor<'e>>(
    executor: E,
    guild_id: i64,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        DELETE FROM role_listings
        WHERE guild_id = ? AND NOT EXISTS (
            SELECT 1 FROM owned_custom_roles o
            WHERE o.guild_id = role_listings.guild_id
              AND o.user_id = role_listings.seller_id
              AND o.role_id = role_listings.role_id
        )
        "#,
    )
    .bind(guild_id)
    .execute(executor)
    .await?;

    Ok(result.rows_affected())
}

fn market_order_by(order: ShopOrder) -> &'static str {
    match order {
        ShopOrder::PriceDesc => "price DESC, role_id ASC",
        ShopOrder::PriceAsc => "price ASC, role_id ASC",
        ShopOrder::Availability => "available IS NULL, available ASC, price DESC",
    }
}

/// Shop items and member listings as one list
pub async fn market_items(
    pool: &SqlitePool,
    guild_id: i64,
    order: ShopOrder,
    limit: i64,
    offset: i64,
) -> Result<Vec<MarketItem>, sqlx::Error> {
    let sql = format!(
        r#"
        SELECT 'shop' AS kind, id AS item_id, role_id, price, stock AS available,
               NULL AS seller_id, '' AS description
        FROM shop_roles WHERE guild_id = ?
        UNION ALL
        SELECT 'listing' AS kind, NULL AS item_id, role_id, price,
               CASE WHEN max_sales IS NULL THEN NULL ELSE MAX(0, max_sales - sales_done) END AS available,
               seller_id, description
        FROM role_listings WHERE guild_id = ?
        ORDER BY {}
        LIMIT ? OFFSET ?
        "#,
        market_order_by(order)
    );

    sqlx::query_as::<_, MarketItem>(&sql)
        .bind(guild_id)
        .bind(guild_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
}

pub async fn market_count(pool: &SqlitePool, guild_id: i64) -> Result<i64, sqlx::Error> {
    let row: (i64,) = sqlx::query_as(
        r#"
        SELECT (SELECT COUNT(*) FROM shop_roles WHERE guild_id = ?)
             + (SELECT COUNT(*) FROM role_listings WHERE guild_id = ?)
        "#,
    )
    .bind(guild_id)
    .bind(guild_id)
    .fetch_one(pool)
    .await?;

    Ok(row.0)
}

#[allow(clippy::too_many_arguments)]
pub async fn insert_edit_request<'e, E: SqliteExecutor<'e>>(
    executor: E,
    guild_id: i64,
    user_id: i64,
    role_id: i64,
    new_name: Option<&str>,
    new_color: Option<&str>,
    price_paid: i64,
    now: DateTime<Utc>,
) -> Result<RoleEditRequest, sqlx::Error> {
    sqlx::query_as::<_, RoleEditRequest>(
        r#"
        INSERT INTO role_edit_requests (guild_id, user_id, role_id, new_name, new_color, price_paid, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(guild_id)
    .bind(user_id)
    .bind(role_id)
    .bind(new_name)
    .bind(new_color)
    .bind(price_paid)
    .bind(now)
    .fetch_one(executor)
    .await
}

pub async fn get_edit_request<'e, E: SqliteExecutor<'e>>(
    executor: E,
    guild_id: i64,
    id: i64,
) -> Result<Option<RoleEditRequest>, sqlx::Error> {
    sqlx::query_as::<_, RoleEditRequest>(
        "SELECT * FROM role_edit_requests WHERE guild_id = ? AND id = ?",
    )
    .bind(guild_id)
    .bind(id)
    .fetch_optional(executor)
    .await
}

pub async fn set_edit_status<'e, E: SqliteExecutor<'e>>(
    executor: E,
    id: i64,
    status: RequestStatus,
    reviewed_by: i64,
    now: DateTime<Utc>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE role_edit_requests SET status = ?, reviewed_by = ?, reviewed_at = ?
        WHERE id = ? AND status = 'pending'
        "#,
    )
    .bind(status)
    .bind(reviewed_by)
    .bind(now)
    .bind(id)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}
