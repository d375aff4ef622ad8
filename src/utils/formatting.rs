use serenity::all::UserId;

pub const COIN: &str = "🪙";

/// Format a user mention
pub fn mention_user(user_id: UserId) -> String {
    format!("<@{}>", user_id)
}

/// Format a user mention from a stored id
pub fn mention_id(user_id: i64) -> String {
    format!("<@{}>", user_id)
}

pub fn mention_channel(channel_id: u64) -> String {
    format!("<#{}>", channel_id)
}

pub fn mention_role(role_id: u64) -> String {
    format!("<@&{}>", role_id)
}

/// Format a number with commas
pub fn format_number(n: i64) -> String {
    let s = n.unsigned_abs().to_string();
    let mut result = String::new();

    for (count, c) in s.chars().rev().enumerate() {
        if count > 0 && count % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }

    if n < 0 {
        result.push('-');
    }

    result.chars().rev().collect()
}

pub fn format_coins(n: i64) -> String {
    format!("{} {}", format_number(n), COIN)
}

/// Truncate a string to at most `max_len` characters, adding ellipsis if needed
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Medal for the top three leaderboard places, the position otherwise
pub fn rank_label(position: usize) -> String {
    match position {
        1 => "🥇".to_string(),
        2 => "🥈".to_string(),
        3 => "🥉".to_string(),
        n => format!("`#{}`", n),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1234567), "1,234,567");
        assert_eq!(format_number(-100000), "-100,000");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a longer sentence", 8), "a lon...");
        assert_eq!(truncate("абвгд", 4), "а...");
        assert_eq!(truncate("abc", 2), "ab");
    }

    #[test]
    fn test_rank_label() {
        assert_eq!(rank_label(1), "🥇");
        assert_eq!(rank_label(4), "`#4`");
    }
}
