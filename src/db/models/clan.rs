use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
pub enum ClanRole {
    Owner,
    Officer,
    Member,
}

impl ClanRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClanRole::Owner => "owner",
            ClanRole::Officer => "officer",
            ClanRole::Member => "member",
        }
    }

    /// Owners and officers may invite and kick
    pub fn can_manage(&self) -> bool {
        matches!(self, ClanRole::Owner | ClanRole::Officer)
    }
}

impl std::fmt::Display for ClanRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Clan {
    pub id: i64,
    pub guild_id: i64,
    pub name: String,
    pub description: String,
    pub color: String,
    pub emoji: String,
    pub owner_id: i64,
    pub role_id: Option<i64>,
    pub max_members: i64,
    pub voice_channels_count: i64,
    pub created_at: DateTime<Utc>,
    pub last_payment: DateTime<Utc>,
    pub is_active: bool,
}

impl Clan {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.emoji, self.name)
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ClanMember {
    pub clan_id: i64,
    pub user_id: i64,
    pub role: ClanRole,
    pub joined_at: DateTime<Utc>,
}
