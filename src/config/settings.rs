use std::collections::BTreeMap;
use std::env;
use std::str::FromStr;

use tracing::warn;

use crate::constants::economy::{
    Job, DEFAULT_CLAN_CREATE_COST, DEFAULT_CLAN_MAX_MEMBERS, DEFAULT_CLAN_MAX_MEMBER_SLOTS,
    DEFAULT_CLAN_MAX_VOICE_CHANNELS, DEFAULT_CLAN_MEMBER_SLOT_COST, DEFAULT_CLAN_MONTHLY_COST,
    DEFAULT_CLAN_VOICE_CHANNEL_COST, DEFAULT_CUSTOM_ROLE_EDIT_PRICE, DEFAULT_CUSTOM_ROLE_PRICE,
    DEFAULT_DAILY_AMOUNT, DEFAULT_JOBS, DEFAULT_LOVE_MARRY_COST,
    DEFAULT_LOVE_ROOM_ACCESS_COST, DEFAULT_MESSAGE_XP, DEFAULT_ROB_MAX, DEFAULT_ROB_MIN,
    DEFAULT_VOICE_MINUTE_XP, DEFAULT_WEEKLY_AMOUNT, DEFAULT_WORK_AMOUNT, MAX_TABLE_LEVEL,
};
use crate::constants::timeouts::{
    DEFAULT_DAILY_COOLDOWN_SECONDS, DEFAULT_WEEKLY_COOLDOWN_SECONDS, DEFAULT_WORK_COOLDOWN_SECONDS,
};

const DEFAULT_DATABASE_URL: &str = "sqlite://naeratus.db";

#[derive(Debug, Clone)]
pub struct Settings {
    pub discord_token: String,
    pub database_url: String,
    pub guild_id: Option<u64>,
    pub moderation_log_channel_id: Option<u64>,
    pub text_mute_role_id: Option<u64>,
    pub voice_mute_role_id: Option<u64>,
    pub roles: CommandRoles,
    pub economy: EconomySettings,
    pub clans: ClanSettings,
    pub love: LoveSettings,
    pub tickets: TicketSettings,
}

/// Role ids allowed to use each moderation command, on top of administrators
#[derive(Debug, Clone, Default)]
pub struct CommandRoles {
    pub warn: Vec<u64>,
    pub warn_remove: Vec<u64>,
    pub strike: Vec<u64>,
    pub praise: Vec<u64>,
    pub discipline_view: Vec<u64>,
    pub moderate: Vec<u64>,
    pub clear: Vec<u64>,
    pub economy_admin: Vec<u64>,
    /// Reviewers of custom role and role edit requests
    pub economy_review: Vec<u64>,
}

#[derive(Debug, Clone)]
pub struct EconomySettings {
    pub daily_amount: i64,
    pub daily_cooldown_seconds: i64,
    pub work_amount: i64,
    pub work_cooldown_seconds: i64,
    pub weekly_enabled: bool,
    pub weekly_amount: i64,
    pub weekly_cooldown_seconds: i64,
    pub jobs: Vec<Job>,
    pub rob_min: i64,
    pub rob_max: i64,
    pub message_xp: f64,
    pub voice_minute_xp: f64,
    /// XP needed to leave each level
    pub xp_per_level: BTreeMap<i64, f64>,
    pub custom_role_price: i64,
    pub custom_role_edit_price: i64,
    /// Where custom role requests are posted for review
    pub review_channel_id: Option<u64>,
}

impl Default for EconomySettings {
    fn default() -> Self {
        Self {
            daily_amount: DEFAULT_DAILY_AMOUNT,
            daily_cooldown_seconds: DEFAULT_DAILY_COOLDOWN_SECONDS,
            work_amount: DEFAULT_WORK_AMOUNT,
            work_cooldown_seconds: DEFAULT_WORK_COOLDOWN_SECONDS,
            weekly_enabled: true,
            weekly_amount: DEFAULT_WEEKLY_AMOUNT,
            weekly_cooldown_seconds: DEFAULT_WEEKLY_COOLDOWN_SECONDS,
            jobs: DEFAULT_JOBS.clone(),
            rob_min: DEFAULT_ROB_MIN,
            rob_max: DEFAULT_ROB_MAX,
            message_xp: DEFAULT_MESSAGE_XP,
            voice_minute_xp: DEFAULT_VOICE_MINUTE_XP,
            xp_per_level: default_xp_table(),
            custom_role_price: DEFAULT_CUSTOM_ROLE_PRICE,
            custom_role_edit_price: DEFAULT_CUSTOM_ROLE_EDIT_PRICE,
            review_channel_id: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClanSettings {
    pub create_cost: i64,
    pub monthly_cost: i64,
    pub default_max_members: i64,
    pub member_slot_cost: i64,
    pub max_member_slots: i64,
    pub voice_channel_cost: i64,
    pub max_voice_channels: i64,
}

impl Default for ClanSettings {
    fn default() -> Self {
        Self {
            create_cost: DEFAULT_CLAN_CREATE_COST,
            monthly_cost: DEFAULT_CLAN_MONTHLY_COST,
            default_max_members: DEFAULT_CLAN_MAX_MEMBERS,
            member_slot_cost: DEFAULT_CLAN_MEMBER_SLOT_COST,
            max_member_slots: DEFAULT_CLAN_MAX_MEMBER_SLOTS,
            voice_channel_cost: DEFAULT_CLAN_VOICE_CHANNEL_COST,
            max_voice_channels: DEFAULT_CLAN_MAX_VOICE_CHANNELS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoveSettings {
    pub marry_cost: i64,
    pub room_access_cost: i64,
    /// Voice channel reserved for couples with room access
    pub lobby_channel_id: Option<u64>,
}

impl Default for LoveSettings {
    fn default() -> Self {
        Self {
            marry_cost: DEFAULT_LOVE_MARRY_COST,
            room_access_cost: DEFAULT_LOVE_ROOM_ACCESS_COST,
            lobby_channel_id: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TicketSettings {
    pub staff_application_roles: Vec<u64>,
    pub server_appeal_roles: Vec<u64>,
    pub moderation_appeal_roles: Vec<u64>,
    pub tech_support_roles: Vec<u64>,
}

impl Settings {
    pub fn from_env() -> Result<Self, String> {
        let discord_token = env::var("DISCORD_TOKEN")
            .map_err(|_| "DISCORD_TOKEN environment variable not set")?;

        let database_url = env::var("DATABASE_URL")
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        let roles = CommandRoles {
            warn: env_id_list("WARN_ROLES"),
            warn_remove: env_id_list("WARN_REMOVE_ROLES"),
            strike: env_id_list("STRIKE_ROLES"),
            praise: env_id_list("PRAISE_ROLES"),
            discipline_view: env_id_list("DISCIPLINE_VIEW_ROLES"),
            moderate: env_id_list("MODERATE_ROLES"),
            clear: env_id_list("CLEAR_ROLES"),
            economy_admin: env_id_list("ECONOMY_ADMIN_ROLES"),
            economy_review: env_id_list("ECONOMY_REVIEW_ROLES"),
        };

        let defaults = EconomySettings::default();
        let economy = EconomySettings {
            daily_amount: env_or("ECONOMY_DAILY_AMOUNT", defaults.daily_amount),
            daily_cooldown_seconds: env_or("ECONOMY_DAILY_COOLDOWN", defaults.daily_cooldown_seconds),
            work_amount: env_or("ECONOMY_WORK_AMOUNT", defaults.work_amount),
            work_cooldown_seconds: env_or("ECONOMY_WORK_COOLDOWN", defaults.work_cooldown_seconds),
            weekly_enabled: env_or("ECONOMY_WEEKLY_ENABLED", defaults.weekly_enabled),
            weekly_amount: env_or("ECONOMY_WEEKLY_AMOUNT", defaults.weekly_amount),
            weekly_cooldown_seconds: env_or(
                "ECONOMY_WEEKLY_COOLDOWN",
                defaults.weekly_cooldown_seconds,
            ),
            jobs: env_json("ECONOMY_JOBS").unwrap_or(defaults.jobs),
            rob_min: env_or("ECONOMY_ROB_MIN", defaults.rob_min),
            rob_max: env_or("ECONOMY_ROB_MAX", defaults.rob_max),
            message_xp: env_or("ECONOMY_MESSAGE_XP", defaults.message_xp),
            voice_minute_xp: env_or("ECONOMY_VOICE_MINUTE_XP", defaults.voice_minute_xp),
            xp_per_level: env_json("ECONOMY_XP_PER_LEVEL").unwrap_or(defaults.xp_per_level),
            custom_role_price: env_or("ECONOMY_CUSTOM_ROLE_PRICE", defaults.custom_role_price),
            custom_role_edit_price: env_or(
                "ECONOMY_CUSTOM_ROLE_EDIT_PRICE",
                defaults.custom_role_edit_price,
            ),
            review_channel_id: env_id("ECONOMY_REVIEW_CHANNEL_ID"),
        };

        if economy.rob_min > economy.rob_max {
            return Err(format!(
                "ECONOMY_ROB_MIN ({}) is greater than ECONOMY_ROB_MAX ({})",
                economy.rob_min, economy.rob_max
            ));
        }

        let defaults = ClanSettings::default();
        let clans = ClanSettings {
            create_cost: env_or("CLAN_CREATE_COST", defaults.create_cost),
            monthly_cost: env_or("CLAN_MONTHLY_COST", defaults.monthly_cost),
            default_max_members: env_or("CLAN_DEFAULT_MAX_MEMBERS", defaults.default_max_members),
            member_slot_cost: env_or("CLAN_MEMBER_SLOT_COST", defaults.member_slot_cost),
            max_member_slots: env_or("CLAN_MAX_MEMBER_SLOTS", defaults.max_member_slots),
            voice_channel_cost: env_or("CLAN_VOICE_CHANNEL_COST", defaults.voice_channel_cost),
            max_voice_channels: env_or("CLAN_MAX_VOICE_CHANNELS", defaults.max_voice_channels),
        };

        let defaults = LoveSettings::default();
        let love = LoveSettings {
            marry_cost: env_or("LOVE_MARRY_COST", defaults.marry_cost),
            room_access_cost: env_or("LOVE_ROOM_ACCESS_COST", defaults.room_access_cost),
            lobby_channel_id: env_id("LOVE_LOBBY_CHANNEL_ID"),
        };

        let tickets = TicketSettings {
            staff_application_roles: env_id_list("TICKET_STAFF_APPLICATION_ROLES"),
            server_appeal_roles: env_id_list("TICKET_SERVER_APPEAL_ROLES"),
            moderation_appeal_roles: env_id_list("TICKET_MODERATION_APPEAL_ROLES"),
            tech_support_roles: env_id_list("TICKET_TECH_SUPPORT_ROLES"),
        };

        Ok(Self {
            discord_token,
            database_url,
            guild_id: env_id("GUILD_ID"),
            moderation_log_channel_id: env_id("MODERATION_LOG_CHANNEL_ID"),
            text_mute_role_id: env_id("TEXT_MUTE_ROLE_ID"),
            voice_mute_role_id: env_id("VOICE_MUTE_ROLE_ID"),
            roles,
            economy,
            clans,
            love,
            tickets,
        })
    }
}

/// `level * 100` for every level in the table
pub fn default_xp_table() -> BTreeMap<i64, f64> {
    (1..=MAX_TABLE_LEVEL)
        .map(|level| (level, (level * 100) as f64))
        .collect()
}

/// Parse a comma separated list of ids, skipping anything malformed
pub fn parse_id_list(raw: &str) -> Vec<u64> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse::<u64>().ok())
        .collect()
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn env_id(key: &str) -> Option<u64> {
    env::var(key).ok().and_then(|s| s.trim().parse::<u64>().ok())
}

fn env_id_list(key: &str) -> Vec<u64> {
    env::var(key).map(|s| parse_id_list(&s)).unwrap_or_default()
}

fn env_json<T: serde::de::DeserializeOwned>(key: &str) -> Option<T> {
    let raw = env::var(key).ok().filter(|s| !s.trim().is_empty())?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Ignoring malformed {}: {}", key, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id_list() {
        assert_eq!(parse_id_list("1, 2,3"), vec![1, 2, 3]);
        assert_eq!(parse_id_list(" 10 ,, abc, 20 "), vec![10, 20]);
        assert!(parse_id_list("").is_empty());
    }

    #[test]
    fn test_default_xp_table() {
        let table = default_xp_table();
        assert_eq!(table.len(), 30);
        assert_eq!(table.get(&1), Some(&100.0));
        assert_eq!(table.get(&30), Some(&3000.0));
        assert_eq!(table.get(&31), None);
    }

    #[test]
    fn test_jobs_json_shape() {
        let jobs: Vec<Job> = serde_json::from_str(
            r#"[{"name": "Baker", "description": "Bread", "min_reward": 10, "max_reward": 20}]"#,
        )
        .unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].max_reward, 20);

        let table: BTreeMap<i64, f64> = serde_json::from_str(r#"{"1": 50, "2": 75.5}"#).unwrap();
        assert_eq!(table.get(&2), Some(&75.5));
    }
}
