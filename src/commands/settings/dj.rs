use poise::serenity_prelude::{self as serenity, Permissions};

use super::{load, permission_names, save, updated};
use crate::models::GuildDjSettings;
use crate::{CommandResult, Context};

/// Parses permission names such as `MANAGE_CHANNELS, MUTE_MEMBERS`.
/// `none` or an empty string clears them.
pub fn parse_permissions(input: &str) -> Result<Permissions, String> {
    let input = input.trim();
    if input.is_empty() || input.eq_ignore_ascii_case("none") {
        return Ok(Permissions::empty());
    }

    input
        .split([',', ' '])
        .filter(|name| !name.is_empty())
        .try_fold(Permissions::empty(), |acc, name| {
            let flag = name.trim().to_uppercase().replace('-', "_");
            Permissions::from_name(&flag)
                .map(|permission| acc | permission)
                .ok_or_else(|| name.to_string())
        })
}

/// Turn the DJ rules on or off
#[poise::command(slash_command, prefix_command, guild_only, rename = "dj-enable")]
pub async fn dj_enable(
    ctx: Context<'_>,
    #[description = "Whether only DJs may control playback"] enabled: bool,
) -> CommandResult {
    let (guild_id, mut settings) = load(ctx)?;
    settings
        .dj_settings
        .get_or_insert_with(|| GuildDjSettings::new(guild_id))
        .enabled = enabled;
    save(ctx, settings)?;

    let state = if enabled { "enabled" } else { "disabled" };
    updated(ctx, format!("DJ mode {}", state)).await
}

/// Allow or disallow a role to control playback
#[poise::command(slash_command, prefix_command, guild_only, rename = "dj-role")]
pub async fn dj_role(
    ctx: Context<'_>,
    #[description = "Role to toggle"] role: serenity::Role,
) -> CommandResult {
    let (guild_id, mut settings) = load(ctx)?;
    let allowed = settings
        .dj_settings
        .get_or_insert_with(|| GuildDjSettings::new(guild_id))
        .toggle_role(role.id);
    save(ctx, settings)?;

    let change = if allowed { "is now a DJ role" } else { "is no longer a DJ role" };
    updated(ctx, format!("<@&{}> {}", role.id, change)).await
}

/// Allow or disallow a member to control playback
#[poise::command(slash_command, prefix_command, guild_only, rename = "dj-user")]
pub async fn dj_user(
    ctx: Context<'_>,
    #[description = "Member to toggle"] user: serenity::User,
) -> CommandResult {
    let (guild_id, mut settings) = load(ctx)?;
    let allowed = settings
        .dj_settings
        .get_or_insert_with(|| GuildDjSettings::new(guild_id))
        .toggle_user(user.id);
    save(ctx, settings)?;

    let change = if allowed { "is now a DJ" } else { "is no longer a DJ" };
    updated(ctx, format!("<@{}> {}", user.id, change)).await
}

/// Set the permissions DJs must have
#[poise::command(slash_command, prefix_command, guild_only, rename = "dj-permissions")]
pub async fn dj_permissions(
    ctx: Context<'_>,
    #[description = "Permission names such as MANAGE_CHANNELS, or none"]
    #[rest]
    permissions: String,
) -> CommandResult {
    let required = parse_permissions(&permissions)
        .map_err(|name| format!("Unknown permission: {}", name))?;

    let (guild_id, mut settings) = load(ctx)?;
    settings
        .dj_settings
        .get_or_insert_with(|| GuildDjSettings::new(guild_id))
        .required_permissions = required;
    save(ctx, settings)?;

    updated(ctx, format!("DJ permissions set to {}", permission_names(required))).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case("", Permissions::empty() ; "empty")]
    #[test_case("none", Permissions::empty() ; "none")]
    #[test_case("MANAGE_CHANNELS", Permissions::MANAGE_CHANNELS ; "single")]
    #[test_case("manage-channels, mute_members", Permissions::MANAGE_CHANNELS | Permissions::MUTE_MEMBERS ; "mixed case")]
    fn test_parse_permissions(input: &str, expected: Permissions) {
        assert_eq!(parse_permissions(input), Ok(expected));
    }

    #[test]
    fn test_parse_unknown_permission() {
        assert_eq!(parse_permissions("MANAGE_CHANNELS, FLY"), Err("FLY".to_string()));
    }
}
