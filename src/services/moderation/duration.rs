use chrono::Duration;

use crate::constants::timeouts::DEFAULT_MUTE_MINUTES;

/// Keeps parsed durations well inside chrono's range
const MAX_AMOUNT: i64 = 100_000;

/// Parse a moderator supplied duration such as `30m`, `2h` or `7d`.
///
/// Digits anywhere in the input give the amount (10 when there are none).
/// The unit is the first of `m`, `h`, `d` found in that order; without a unit
/// the result is the 10 minute default regardless of the digits.
pub fn parse_duration(input: &str) -> Duration {
    let text = input.trim().to_lowercase();
    let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
    let amount = digits
        .parse::<i64>()
        .unwrap_or(DEFAULT_MUTE_MINUTES)
        .min(MAX_AMOUNT);

    if text.contains('m') {
        Duration::minutes(amount)
    } else if text.contains('h') {
        Duration::hours(amount)
    } else if text.contains('d') {
        Duration::days(amount)
    } else {
        Duration::minutes(DEFAULT_MUTE_MINUTES)
    }
}

/// Short display form, e.g. `2h` or `45m`
pub fn format_duration(duration: Duration) -> String {
    let minutes = duration.num_minutes();
    if minutes > 0 && minutes % (24 * 60) == 0 {
        format!("{}d", minutes / (24 * 60))
    } else if minutes > 0 && minutes % 60 == 0 {
        format!("{}h", minutes / 60)
    } else {
        format!("{}m", minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_units() {
        assert_eq!(parse_duration("30m"), Duration::minutes(30));
        assert_eq!(parse_duration("2h"), Duration::hours(2));
        assert_eq!(parse_duration("7d"), Duration::days(7));
        assert_eq!(parse_duration(" 3D "), Duration::days(3));
    }

    #[test]
    fn test_parse_defaults() {
        assert_eq!(parse_duration(""), Duration::minutes(10));
        assert_eq!(parse_duration("45"), Duration::minutes(10));
        assert_eq!(parse_duration("h"), Duration::hours(10));
        assert_eq!(parse_duration("99999999999999999999d"), Duration::days(10));
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::minutes(45)), "45m");
        assert_eq!(format_duration(Duration::hours(6)), "6h");
        assert_eq!(format_duration(Duration::days(2)), "2d");
    }
}
