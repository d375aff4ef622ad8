use once_cell::sync::Lazy;
use serde::Deserialize;

/// A job picked at random by `/work`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Job {
    pub name: String,
    pub description: String,
    pub min_reward: i64,
    pub max_reward: i64,
}

impl Job {
    fn new(name: &str, description: &str, min_reward: i64, max_reward: i64) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            min_reward,
            max_reward,
        }
    }
}

pub static DEFAULT_JOBS: Lazy<Vec<Job>> = Lazy::new(|| {
    vec![
        Job::new("Courier", "You delivered parcels across the city", 80, 160),
        Job::new("Barista", "You pulled shots through the morning rush", 60, 140),
        Job::new("Programmer", "You fixed a bug nobody could reproduce", 120, 250),
        Job::new("Streamer", "You kept chat entertained for hours", 50, 300),
        Job::new("Mechanic", "You brought an old engine back to life", 100, 200),
    ]
});

/// Highest level with an entry in the default XP table
pub const MAX_TABLE_LEVEL: i64 = 30;

pub const DEFAULT_DAILY_AMOUNT: i64 = 100;
pub const DEFAULT_WORK_AMOUNT: i64 = 150;
pub const DEFAULT_WEEKLY_AMOUNT: i64 = 200;

pub const DEFAULT_ROB_MIN: i64 = 300;
pub const DEFAULT_ROB_MAX: i64 = 1000;
pub const ROB_SUCCESS_CHANCE: f64 = 0.4;
pub const ROB_ARREST_CHANCE: f64 = 0.5;

pub const DEFAULT_CUSTOM_ROLE_PRICE: i64 = 5_000;
pub const DEFAULT_CUSTOM_ROLE_EDIT_PRICE: i64 = 1_000;
pub const CUSTOM_ROLE_NAME_MAX: usize = 100;

pub const DEFAULT_MESSAGE_XP: f64 = 0.5;
pub const DEFAULT_VOICE_MINUTE_XP: f64 = 0.5;

/// Clans
pub const DEFAULT_CLAN_CREATE_COST: i64 = 100_000;
pub const DEFAULT_CLAN_MONTHLY_COST: i64 = 5_000;
pub const DEFAULT_CLAN_MAX_MEMBERS: i64 = 10;
pub const DEFAULT_CLAN_MEMBER_SLOT_COST: i64 = 10_000;
pub const CLAN_SLOTS_PER_PURCHASE: i64 = 10;
pub const DEFAULT_CLAN_MAX_MEMBER_SLOTS: i64 = 50;
pub const DEFAULT_CLAN_VOICE_CHANNEL_COST: i64 = 5_000;
pub const DEFAULT_CLAN_MAX_VOICE_CHANNELS: i64 = 3;

/// Love
pub const DEFAULT_LOVE_MARRY_COST: i64 = 1_000;
pub const DEFAULT_LOVE_ROOM_ACCESS_COST: i64 = 5_000;
