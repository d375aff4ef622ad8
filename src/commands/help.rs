use std::sync::Arc;

use crate::bot::data::{Context, Data};
use crate::bot::error::Error;
use crate::constants::embeds;
use crate::utils::formatting::truncate;

const EMBED_DESCRIPTION_LIMIT: usize = 4000;

type Command = poise::Command<Arc<Data>, Error>;

/// One line per slash command, subcommands spelled out in full
pub fn help_lines(commands: &[Command]) -> Vec<String> {
    let mut lines = Vec::new();
    for command in commands {
        push_lines(&mut lines, command, "");
    }
    lines.sort();
    lines
}

fn push_lines(lines: &mut Vec<String>, command: &Command, parent: &str) {
    let path = if parent.is_empty() {
        command.name.clone()
    } else {
        format!("{} {}", parent, command.name)
    };

    if command.subcommands.is_empty() {
        let description = command.description.as_deref().unwrap_or("No description");
        lines.push(format!("`/{}` - {}", path, description));
    } else {
        for sub in &command.subcommands {
            push_lines(lines, sub, &path);
        }
    }
}

/// List every command
#[poise::command(slash_command)]
pub async fn help(ctx: Context<'_>) -> Result<(), Error> {
    let lines = help_lines(&ctx.framework().options().commands);

    let embed = embeds::info_embed()
        .title("Commands")
        .description(truncate(&lines.join("\n"), EMBED_DESCRIPTION_LIMIT));
    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{clan, economy};

    #[test]
    fn test_help_lines_expand_subcommands() {
        let lines = help_lines(&[economy::balance(), clan::clan(), economy::cooldowns()]);

        assert!(lines.iter().any(|l| l.starts_with("`/balance` - ")));
        assert!(lines.iter().any(|l| l.starts_with("`/clan create` - ")));
        assert!(lines.iter().any(|l| l.starts_with("`/cooldowns reset` - ")));
        assert!(!lines.iter().any(|l| l.starts_with("`/clan` ")));
    }
}
