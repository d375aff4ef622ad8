use chrono::{DateTime, Utc};

/// Per-action cooldown columns on an account
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cooldown {
    Daily,
    Work,
    Weekly,
    Rob,
}

impl Cooldown {
    pub const ALL: [Cooldown; 4] = [Cooldown::Daily, Cooldown::Work, Cooldown::Weekly, Cooldown::Rob];

    pub fn as_str(&self) -> &'static str {
        match self {
            Cooldown::Daily => "daily",
            Cooldown::Work => "work",
            Cooldown::Weekly => "weekly",
            Cooldown::Rob => "rob",
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Account {
    pub user_id: i64,
    pub guild_id: i64,
    pub cash: i64,
    pub bank: i64,
    pub xp: f64,
    pub level: i64,
    pub voice_seconds: i64,
    pub messages_sent: i64,
    pub arrest_until: Option<DateTime<Utc>>,
    pub daily_cd: Option<DateTime<Utc>>,
    pub work_cd: Option<DateTime<Utc>>,
    pub weekly_cd: Option<DateTime<Utc>>,
    pub rob_cd: Option<DateTime<Utc>>,
    pub robberies_total: i64,
    pub robberies_success: i64,
    pub robberies_fail: i64,
    pub robberies_arrest: i64,
    pub notifications_enabled: bool,
}

impl Account {
    pub fn balance(&self) -> i64 {
        self.cash + self.bank
    }

    pub fn is_arrested(&self, now: DateTime<Utc>) -> bool {
        self.arrest_until.map(|until| until > now).unwrap_or(false)
    }

    pub fn cooldown(&self, kind: Cooldown) -> Option<DateTime<Utc>> {
        match kind {
            Cooldown::Daily => self.daily_cd,
            Cooldown::Work => self.work_cd,
            Cooldown::Weekly => self.weekly_cd,
            Cooldown::Rob => self.rob_cd,
        }
    }

    /// Seconds left on a cooldown, if it is still running at `now`
    pub fn cooldown_remaining(&self, kind: Cooldown, now: DateTime<Utc>) -> Option<i64> {
        self.cooldown(kind)
            .filter(|until| *until > now)
            .map(|until| (until - now).num_seconds().max(1))
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct VoicePresence {
    pub user_id: i64,
    pub guild_id: i64,
    pub channel_id: i64,
    pub joined_at: DateTime<Utc>,
}
