//! This module aggregates all the command modules for the bot.

/// General purpose commands (e.g., ping, invite).
pub mod general;
/// Commands related to music playback.
pub mod music;
/// Per-guild settings management.
pub mod settings;

use poise::serenity_prelude::{CreateEmbed, Permissions};
use poise::CreateReply;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::utils::config::CommandOptions;
use crate::{CommandResult, Context, Data, Error};

/// Every bot command except the `help` and `register` builtins.
pub fn all() -> Vec<poise::Command<Data, Error>> {
    let mut commands = vec![
        general::ping::ping(),
        general::invite::invite(),
        general::contribute::contribute(),
        general::crash_reports::crash_reports(),
        music::play::play(),
        music::search::search(),
        music::pause::pause(),
        music::skip::skip(),
        music::stop::stop(),
        music::clear::clear(),
        music::shuffle::shuffle(),
        music::repeat::repeat(),
        music::move_track::move_track(),
        music::remove::remove(),
        music::previous::previous(),
        music::queue::queue(),
        music::now_playing::now_playing(),
        settings::settings(),
    ];

    #[cfg(feature = "lyrics")]
    commands.push(music::lyrics::lyrics());

    commands
}

/// Applies the `command_options` overrides from the config file, matched by
/// command name.
pub fn apply_command_options(
    commands: &mut [poise::Command<Data, Error>],
    options: &HashMap<String, CommandOptions>,
) {
    for (name, overrides) in options {
        let Some(command) = commands.iter_mut().find(|command| command.name == *name) else {
            warn!("Options configured for unknown command {}", name);
            continue;
        };
        debug!("Applying options to command {}", name);

        if let Some(description) = &overrides.description {
            command.description = Some(description.clone());
        }
        for alias in &overrides.aliases {
            if !command.aliases.contains(alias) {
                command.aliases.push(alias.clone());
            }
        }
        if let Some(bits) = overrides.required_member_permissions {
            command.required_permissions = Permissions::from_bits_truncate(bits);
        }
        if let Some(bits) = overrides.required_bot_permissions {
            command.required_bot_permissions = Permissions::from_bits_truncate(bits);
        }
        if let Some(cooldown) = overrides.cooldown {
            match command.cooldown_config.write() {
                Ok(mut config) => config.user = Some(cooldown),
                Err(e) => warn!("Cooldown config for {} is poisoned: {}", name, e),
            }
        }
    }
}

async fn reply(ctx: Context<'_>, embed: CreateEmbed) -> CommandResult {
    ctx.send(CreateReply::default().embed(embed)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    #[test]
    fn test_all_commands_have_unique_names() {
        let commands = all();
        let mut names: Vec<&str> = commands.iter().map(|command| command.name.as_str()).collect();
        names.sort();
        let total = names.len();
        names.dedup();
        assert_eq!(names.len(), total);
        assert!(names.contains(&"now-playing"));
        assert!(names.contains(&"loop"));
        assert!(names.contains(&"move"));
        assert!(names.contains(&"crash-reports"));
    }

    #[test]
    fn test_apply_command_options() {
        let mut commands = all();
        let options = HashMap::from([(
            "skip".to_string(),
            CommandOptions {
                description: Some("Next please".to_string()),
                aliases: vec!["n".to_string()],
                cooldown: Some(Duration::from_secs(3)),
                required_member_permissions: Some(Permissions::MUTE_MEMBERS.bits()),
                ..Default::default()
            },
        )]);

        apply_command_options(&mut commands, &options);

        let skip = commands.iter().find(|command| command.name == "skip").unwrap();
        assert_eq!(skip.description.as_deref(), Some("Next please"));
        assert!(skip.aliases.contains(&"next".to_string()));
        assert!(skip.aliases.contains(&"n".to_string()));
        assert_eq!(skip.required_permissions, Permissions::MUTE_MEMBERS);
        assert_eq!(
            skip.cooldown_config.read().unwrap().user,
            Some(Duration::from_secs(3))
        );
    }
}
