use chrono::{DateTime, Utc};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Couple {
    pub id: i64,
    pub guild_id: i64,
    pub user1_id: i64,
    pub user2_id: i64,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl Couple {
    pub fn partner_of(&self, user_id: i64) -> Option<i64> {
        if self.user1_id == user_id {
            Some(self.user2_id)
        } else if self.user2_id == user_id {
            Some(self.user1_id)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LoveRoomAccess {
    pub user_id: i64,
    pub guild_id: i64,
    pub expires_at: DateTime<Utc>,
    pub last_payment: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ActiveSession {
    pub couple_id: i64,
    pub channel_id: i64,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct VoiceSessionLog {
    pub id: i64,
    pub couple_id: i64,
    pub channel_id: i64,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration_seconds: i64,
}
