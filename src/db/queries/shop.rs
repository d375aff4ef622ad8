use sqlx::{SqliteExecutor, SqlitePool};

use crate::db::models::ShopItem;

/// Sort order for shop listings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShopOrder {
    PriceDesc,
    PriceAsc,
    /// Limited items first, fewest left first
    Availability,
}

impl ShopOrder {
    fn order_by(&self) -> &'static str {
        match self {
            ShopOrder::PriceDesc => "price DESC, id ASC",
            ShopOrder::PriceAsc => "price ASC, id ASC",
            ShopOrder::Availability => "stock IS NULL, stock ASC, id ASC",
        }
    }
}

/// Insert a listing. `None` when the role is already for sale.
pub async fn add(
    pool: &SqlitePool,
    guild_id: i64,
    role_id: i64,
    price: i64,
    stock: Option<i64>,
) -> Result<Option<ShopItem>, sqlx::Error> {
    sqlx::query_as::<_, ShopItem>(
        r#"
        INSERT INTO shop_roles (guild_id, role_id, price, stock)
        VALUES (?, ?, ?, ?)
        ON CONFLICT (guild_id, role_id) DO NOTHING
        RETURNING *
        "#,
    )
    .bind(guild_id)
    .bind(role_id)
    .bind(price)
    .bind(stock)
    .fetch_optional(pool)
    .await
}

pub async fn get<'e, E: SqliteExecutor<'e>>(
    executor: E,
    guild_id: i64,
    id: i64,
) -> Result<Option<ShopItem>, sqlx::Error> {
    sqlx::query_as::<_, ShopItem>("SELECT * FROM shop_roles WHERE guild_id = ? AND id = ?")
        .bind(guild_id)
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub async fn remove(pool: &SqlitePool, guild_id: i64, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM shop_roles WHERE guild_id = ? AND id = ?")
        .bind(guild_id)
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn list(
    pool: &SqlitePool,
    guild_id: i64,
    order: ShopOrder,
    limit: i64,
    offset: i64,
) -> Result<Vec<ShopItem>, sqlx::Error> {
    let sql = format!(
        "SELECT * FROM shop_roles WHERE guild_id = ? ORDER BY {} LIMIT ? OFFSET ?",
        order.order_by()
    );

    sqlx::query_as::<_, ShopItem>(&sql)
        .bind(guild_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
}

pub async fn count(pool: &SqlitePool, guild_id: i64) -> Result<i64, sqlx::Error> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM shop_roles WHERE guild_id = ?")
        .bind(guild_id)
        .fetch_one(pool)
        .await?;

    Ok(row.0)
}

/// Take one unit of limited stock. Unlimited items always succeed.
pub async fn take_stock<'e, E: SqliteExecutor<'e>>(
    executor: E,
    id: i64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE shop_roles SET stock = CASE WHEN stock IS NULL THEN NULL ELSE stock - 1 END
        WHERE id = ? AND (stock IS NULL OR stock > 0)
        "#,
    )
    .bind(id)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}
