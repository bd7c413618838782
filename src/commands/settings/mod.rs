//! `/settings` and its subcommands, restricted to members who can manage the guild.

mod dj;

use poise::serenity_prelude::{self as serenity, CreateEmbed, GuildId, Permissions};
use tracing::info;

use super::reply;
use crate::models::{GuildDjSettings, GuildSettings, Record};
use crate::player::error::PlayerError;
use crate::{CommandResult, Context, Error};
use dj::{dj_enable, dj_permissions, dj_role, dj_user};

/// View or change this server's settings
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    category = "Settings",
    required_permissions = "MANAGE_GUILD",
    subcommands(
        "show",
        "commands_channel",
        "dj_enable",
        "dj_role",
        "dj_user",
        "dj_permissions",
        "reset"
    ),
    subcommand_required
)]
pub async fn settings(_ctx: Context<'_>) -> CommandResult {
    Ok(())
}

fn load(ctx: Context<'_>) -> Result<(GuildId, GuildSettings), Error> {
    let guild_id = ctx.guild_id().ok_or(PlayerError::NotInGuild)?;
    let settings = ctx.data().player.get_guild_settings(guild_id)?;
    Ok((guild_id, settings))
}

/// Writes the settings back without touching the guild's cached queue.
fn save(ctx: Context<'_>, mut settings: GuildSettings) -> Result<(), Error> {
    settings.cached_queue = None;
    settings.update(&ctx.data().player.db).map_err(PlayerError::from)?;
    Ok(())
}

async fn updated(ctx: Context<'_>, change: String) -> CommandResult {
    info!("Settings updated in guild {:?}: {}", ctx.guild_id(), change);
    let embed = ctx.data().player.message_embed("settingsUpdated", true, &[change]);
    reply(ctx, embed).await
}

/// Comma separated permission names for display.
pub fn permission_names(permissions: Permissions) -> String {
    if permissions.is_empty() {
        "None".to_string()
    } else {
        permissions.get_permission_names().join(", ")
    }
}

fn mentions<T: std::fmt::Display>(ids: &[T], prefix: &str) -> String {
    if ids.is_empty() {
        return "None".to_string();
    }
    ids.iter()
        .map(|id| format!("<{}{}>", prefix, id))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Show the current settings
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn show(ctx: Context<'_>) -> CommandResult {
    let (_, settings) = load(ctx)?;
    let dj = settings
        .dj_settings
        .clone()
        .unwrap_or_else(|| GuildDjSettings::new(settings.guild_id));

    let commands_channel = settings
        .commands_channel_id
        .map(|channel| format!("<#{}>", channel))
        .unwrap_or_else(|| "Any".to_string());

    let embed = CreateEmbed::new()
        .title("Server settings")
        .field("Commands channel", commands_channel, false)
        .field("DJ mode", if dj.enabled { "Enabled" } else { "Disabled" }, true)
        .field("DJ permissions", permission_names(dj.required_permissions), true)
        .field("DJ roles", mentions(&dj.allowed_roles, "@&"), false)
        .field("DJ users", mentions(&dj.allowed_users, "@"), false)
        .field(
            "Pro",
            if settings.is_pro(chrono::Utc::now()) { "Yes" } else { "No" },
            true,
        )
        .colour(ctx.data().player.messages.embed_colour(true));

    reply(ctx, embed).await
}

/// Restrict music commands to one channel, or allow them everywhere
#[poise::command(slash_command, prefix_command, guild_only, rename = "commands-channel")]
pub async fn commands_channel(
    ctx: Context<'_>,
    #[description = "Channel for music commands, leave empty to allow every channel"]
    channel: Option<serenity::GuildChannel>,
) -> CommandResult {
    let (_, mut settings) = load(ctx)?;
    settings.commands_channel_id = channel.as_ref().map(|channel| channel.id);
    save(ctx, settings)?;

    let change = match channel {
        Some(channel) => format!("music commands are limited to <#{}>", channel.id),
        None => "music commands are allowed in every channel".to_string(),
    };
    updated(ctx, change).await
}

/// Reset every setting of this server
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn reset(ctx: Context<'_>) -> CommandResult {
    let (_, mut settings) = load(ctx)?;
    settings.cached_queue = None;
    settings
        .delete(&ctx.data().player.db)
        .map_err(PlayerError::from)?;

    updated(ctx, "all settings were reset".to_string()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use poise::serenity_prelude::{RoleId, UserId};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_permission_names() {
        assert_eq!(permission_names(Permissions::empty()), "None");
        assert_eq!(permission_names(Permissions::CONNECT), "Connect");
    }

    #[test]
    fn test_mentions() {
        assert_eq!(mentions::<RoleId>(&[], "@&"), "None");
        assert_eq!(mentions(&[RoleId::new(1), RoleId::new(2)], "@&"), "<@&1> <@&2>");
        assert_eq!(mentions(&[UserId::new(3)], "@"), "<@3>");
    }
}
