use std::time::Duration;

/// Lifetime of ledger marks
pub const WARNING_TTL_DAYS: i64 = 30;
pub const STRIKE_TTL_DAYS: i64 = 90;

/// Background sweep intervals
pub const MUTE_SWEEP_INTERVAL: Duration = Duration::from_secs(60);
pub const DISCIPLINE_SWEEP_INTERVAL: Duration = Duration::from_secs(30 * 60);
pub const TEMP_ROLE_SWEEP_INTERVAL: Duration = Duration::from_secs(10 * 60);
pub const CLAN_BILLING_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);
pub const LOVE_CHECKPOINT_INTERVAL: Duration = Duration::from_secs(5 * 60);
pub const LOVE_CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60);
pub const LOVE_BILLING_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Sessions running at least this long are checkpointed into history
pub const LOVE_CHECKPOINT_MIN_SECONDS: i64 = 300;

/// Active sessions older than this are considered abandoned
pub const LOVE_STALE_SESSION_HOURS: i64 = 24;

/// Days bought by one month of love room access
pub const LOVE_ACCESS_DAYS_PER_MONTH: i64 = 30;

/// How long a marriage proposal stays answerable
pub const PROPOSAL_TIMEOUT_SECONDS: u64 = 60;

/// Fallback when a mute duration cannot be parsed
pub const DEFAULT_MUTE_MINUTES: i64 = 10;

/// Economy cooldowns
pub const DEFAULT_DAILY_COOLDOWN_SECONDS: i64 = 24 * 60 * 60;
pub const DEFAULT_WORK_COOLDOWN_SECONDS: i64 = 60 * 60;
pub const DEFAULT_WEEKLY_COOLDOWN_SECONDS: i64 = 7 * 24 * 60 * 60;
pub const ROB_COOLDOWN_SECONDS: i64 = 5 * 60;
pub const ARREST_SECONDS: i64 = 6 * 60 * 60;

/// Format a number of seconds for display
pub fn format_seconds(total_secs: i64) -> String {
    let total_secs = total_secs.max(0);

    if total_secs < 60 {
        format!("{} second{}", total_secs, if total_secs == 1 { "" } else { "s" })
    } else if total_secs < 3600 {
        let mins = total_secs / 60;
        format!("{} minute{}", mins, if mins == 1 { "" } else { "s" })
    } else if total_secs < 86400 {
        let hours = total_secs / 3600;
        let mins = (total_secs % 3600) / 60;
        if mins == 0 {
            format!("{} hour{}", hours, if hours == 1 { "" } else { "s" })
        } else {
            format!("{}h {}m", hours, mins)
        }
    } else {
        let days = total_secs / 86400;
        format!("{} day{}", days, if days == 1 { "" } else { "s" })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_seconds() {
        assert_eq!(format_seconds(1), "1 second");
        assert_eq!(format_seconds(45), "45 seconds");
        assert_eq!(format_seconds(600), "10 minutes");
        assert_eq!(format_seconds(3600), "1 hour");
        assert_eq!(format_seconds(5400), "1h 30m");
        assert_eq!(format_seconds(3 * 86400), "3 days");
        assert_eq!(format_seconds(-5), "0 seconds");
    }
}
