use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Approved,
    Denied,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Denied => "denied",
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CustomRoleRequest {
    pub id: i64,
    pub guild_id: i64,
    pub user_id: i64,
    pub name: String,
    /// `#rrggbb`
    pub color: String,
    pub image_url: Option<String>,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub reviewed_by: Option<i64>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OwnedCustomRole {
    pub id: i64,
    pub guild_id: i64,
    pub user_id: i64,
    pub role_id: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RoleListing {
    pub guild_id: i64,
    pub role_id: i64,
    pub seller_id: i64,
    pub price: i64,
    /// `None` means unlimited
    pub max_sales: Option<i64>,
    pub sales_done: i64,
    pub description: String,
}

impl RoleListing {
    pub fn remaining(&self) -> Option<i64> {
        self.max_sales.map(|max| (max - self.sales_done).max(0))
    }

    pub fn sold_out(&self) -> bool {
        self.remaining() == Some(0)
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RoleEditRequest {
    pub id: i64,
    pub guild_id: i64,
    pub user_id: i64,
    pub role_id: i64,
    pub new_name: Option<String>,
    pub new_color: Option<String>,
    pub price_paid: i64,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub reviewed_by: Option<i64>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
pub enum MarketKind {
    Shop,
    Listing,
}

/// A row of the combined market: admin shop items and member listings
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MarketItem {
    pub kind: MarketKind,
    /// Shop item id, `None` for listings
    pub item_id: Option<i64>,
    pub role_id: i64,
    pub price: i64,
    /// Units left, `None` when unlimited
    pub available: Option<i64>,
    pub seller_id: Option<i64>,
    pub description: String,
}
