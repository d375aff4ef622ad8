use chrono::{DateTime, Utc};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ShopItem {
    pub id: i64,
    pub guild_id: i64,
    pub role_id: i64,
    pub price: i64,
    /// `None` means unlimited
    pub stock: Option<i64>,
}

impl ShopItem {
    pub fn in_stock(&self) -> bool {
        self.stock.map(|s| s > 0).unwrap_or(true)
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TempRole {
    pub user_id: i64,
    pub guild_id: i64,
    pub role_id: i64,
    pub expires_at: DateTime<Utc>,
}
