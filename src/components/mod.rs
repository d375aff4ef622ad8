pub mod clan_invite;
pub mod marriage_prompt;

/// Split `{prefix}_{action}_{first}_{second}` button ids
pub fn parse_button_id<'a>(custom_id: &'a str, prefix: &str) -> Option<(&'a str, u64, u64)> {
    let rest = custom_id.strip_prefix(prefix)?.strip_prefix('_')?;
    let mut parts = rest.split('_');

    let action = parts.next()?;
    let first = parts.next()?.parse().ok()?;
    let second = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((action, first, second))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_button_id() {
        assert_eq!(
            parse_button_id("marry_accept_10_20", "marry"),
            Some(("accept", 10, 20))
        );
        assert_eq!(parse_button_id("clan_decline_3_99", "clan"), Some(("decline", 3, 99)));
        assert_eq!(parse_button_id("clan_accept_3", "clan"), None);
        assert_eq!(parse_button_id("clan_accept_x_3", "clan"), None);
        assert_eq!(parse_button_id("clan_accept_1_2_3", "clan"), None);
        assert_eq!(parse_button_id("marry_accept_1_2", "clan"), None);
    }
}
