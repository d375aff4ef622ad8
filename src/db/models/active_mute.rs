use chrono::{DateTime, Utc};

use super::PunishmentKind;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ActiveMute {
    pub user_id: i64,
    pub guild_id: i64,
    pub kind: PunishmentKind,
    pub ends_at: DateTime<Utc>,
}
