use chrono::{DateTime, Utc};

/// Kinds of entries in the punishment ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
pub enum PunishmentKind {
    Warning,
    Strike,
    Praise,
    TextMute,
    VoiceMute,
    Ban,
}

impl PunishmentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PunishmentKind::Warning => "warning",
            PunishmentKind::Strike => "strike",
            PunishmentKind::Praise => "praise",
            PunishmentKind::TextMute => "text_mute",
            PunishmentKind::VoiceMute => "voice_mute",
            PunishmentKind::Ban => "ban",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PunishmentKind::Warning => "Warning",
            PunishmentKind::Strike => "Strike",
            PunishmentKind::Praise => "Praise",
            PunishmentKind::TextMute => "Text mute",
            PunishmentKind::VoiceMute => "Voice mute",
            PunishmentKind::Ban => "Ban",
        }
    }

    /// Whether this kind is a timed sanction rather than a ledger mark
    pub fn is_timed(&self) -> bool {
        matches!(
            self,
            PunishmentKind::TextMute | PunishmentKind::VoiceMute | PunishmentKind::Ban
        )
    }
}

impl std::fmt::Display for PunishmentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PunishmentRecord {
    pub id: i64,
    pub user_id: i64,
    pub guild_id: i64,
    pub moderator_id: i64,
    pub kind: PunishmentKind,
    pub reason: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl PunishmentRecord {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|at| at > now).unwrap_or(true)
    }
}

/// Active ledger counts for one member
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DisciplineSummary {
    pub warnings: i64,
    pub strikes: i64,
    pub praises: i64,
}
