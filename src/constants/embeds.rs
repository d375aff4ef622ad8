use serenity::all::{Colour, CreateEmbed};

// ============================================================================
// Color Palette
// ============================================================================

pub const PRIMARY_COLOR: Colour = Colour::from_rgb(88, 101, 242);

pub const SUCCESS_COLOR: Colour = Colour::from_rgb(16, 185, 129);

pub const ERROR_COLOR: Colour = Colour::from_rgb(244, 63, 94);

pub const WARNING_COLOR: Colour = Colour::from_rgb(245, 158, 11);

pub const INFO_COLOR: Colour = Colour::from_rgb(100, 116, 139);

/// Coins and leaderboards
pub const ECONOMY_COLOR: Colour = Colour::from_rgb(234, 179, 8);

/// Couples and love rooms
pub const LOVE_COLOR: Colour = Colour::from_rgb(236, 72, 153);

// ============================================================================
// Text Formatting
// ============================================================================

pub const DIVIDER: &str = "───────────────────────";

pub const BULLET: &str = "•";

// ============================================================================
// Embed Builders
// ============================================================================

pub fn standard_embed() -> CreateEmbed {
    CreateEmbed::new().color(PRIMARY_COLOR)
}

pub fn success_embed() -> CreateEmbed {
    CreateEmbed::new().color(SUCCESS_COLOR)
}

pub fn error_embed() -> CreateEmbed {
    CreateEmbed::new().color(ERROR_COLOR)
}

pub fn warning_embed() -> CreateEmbed {
    CreateEmbed::new().color(WARNING_COLOR)
}

pub fn info_embed() -> CreateEmbed {
    CreateEmbed::new().color(INFO_COLOR)
}

pub fn economy_embed() -> CreateEmbed {
    CreateEmbed::new().color(ECONOMY_COLOR)
}

pub fn love_embed() -> CreateEmbed {
    CreateEmbed::new().color(LOVE_COLOR)
}

/// Embed in a clan's own color, falling back to the primary color
pub fn clan_embed(hex: &str) -> CreateEmbed {
    CreateEmbed::new().color(parse_hex_color(hex).unwrap_or(PRIMARY_COLOR))
}

/// Parse `#RRGGBB`
pub fn parse_hex_color(hex: &str) -> Option<Colour> {
    let digits = hex.strip_prefix('#')?;
    if digits.len() != 6 {
        return None;
    }
    u32::from_str_radix(digits, 16).ok().map(Colour::new)
}

// ============================================================================
// Text Helpers
// ============================================================================

/// Format a list of items with bullet points
pub fn bullet_list(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("{} {}", BULLET, item))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Format a section with a header and content
pub fn section(header: &str, content: &str) -> String {
    format!("**{}**\n{}", header, content)
}

/// Filled and empty squares showing `current` out of `max`
pub fn meter(current: i64, max: i64) -> String {
    let filled = current.clamp(0, max) as usize;
    let empty = (max.max(0) as usize).saturating_sub(filled);
    format!("{}{}", "■".repeat(filled), "□".repeat(empty))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#5865F2"), Some(Colour::new(0x5865F2)));
        assert_eq!(parse_hex_color("5865F2"), None);
        assert_eq!(parse_hex_color("#12345"), None);
        assert_eq!(parse_hex_color("#GGGGGG"), None);
    }

    #[test]
    fn test_meter() {
        assert_eq!(meter(2, 3), "■■□");
        assert_eq!(meter(5, 3), "■■■");
        assert_eq!(meter(0, 2), "□□");
    }
}
