//! Command checks shared by the music commands.
//!
//! Failing checks return a [`PlayerError`] so the halt handler can reply with
//! the matching message; a plain `false` means the DJ policy rejected the member.

use poise::serenity_prelude::{ChannelId, GuildId, Permissions};
use tracing::debug;

use crate::models::{DjCandidate, GuildDjSettings};
use crate::player::EPlayer;
use crate::player::error::PlayerError;
use crate::{Context, Error};

/// Whether music commands may be used in `used`, given the guild's configured channel.
pub fn check_commands_channel(configured: Option<ChannelId>, used: ChannelId) -> Result<(), PlayerError> {
    match configured {
        Some(channel) if channel != used => Err(PlayerError::WrongCommandsChannel(channel)),
        _ => Ok(()),
    }
}

pub async fn commands_channel_check(ctx: Context<'_>) -> Result<bool, Error> {
    let guild_id = ctx.guild_id().ok_or(PlayerError::NotInGuild)?;
    let settings = ctx.data().player.get_guild_settings(guild_id)?;
    check_commands_channel(settings.commands_channel_id, ctx.channel_id())?;
    Ok(true)
}

/// The bot's permissions in `channel_id`, per the cache.
fn bot_permissions_in(ctx: Context<'_>, channel_id: Option<ChannelId>) -> Permissions {
    let Some(channel_id) = channel_id else {
        return Permissions::empty();
    };
    let bot_id = ctx.serenity_context().cache.current_user().id;
    ctx.guild()
        .and_then(|guild| {
            let channel = guild.channels.get(&channel_id)?;
            let bot = guild.members.get(&bot_id)?;
            Some(guild.user_permissions_in(channel, bot))
        })
        .unwrap_or_else(Permissions::empty)
}

async fn dj_candidate(ctx: Context<'_>, guild_id: GuildId) -> Result<DjCandidate, Error> {
    let member = ctx.author_member().await.ok_or(PlayerError::NotInGuild)?;
    let permissions = match member.permissions {
        Some(permissions) => permissions,
        None => ctx
            .guild()
            .map(|guild| guild.member_permissions(&member))
            .unwrap_or_else(Permissions::empty),
    };

    let voice_channel = EPlayer::user_voice_channel(ctx.serenity_context(), guild_id, member.user.id);

    Ok(DjCandidate {
        user_id: member.user.id,
        roles: member.roles.clone(),
        permissions,
        voice_channel,
        bot_voice_permissions: bot_permissions_in(ctx, voice_channel),
    })
}

/// Rejects members outside the bot's voice channel or failing the guild's DJ rules.
pub async fn dj_check(ctx: Context<'_>) -> Result<bool, Error> {
    let guild_id = ctx.guild_id().ok_or(PlayerError::NotInGuild)?;
    let settings = ctx.data().player.get_guild_settings(guild_id)?;
    check_commands_channel(settings.commands_channel_id, ctx.channel_id())?;

    let candidate = dj_candidate(ctx, guild_id).await?;
    let bot_channel = EPlayer::bot_voice_channel(ctx.serenity_context(), guild_id);
    match (candidate.voice_channel, bot_channel) {
        (None, _) => return Err(PlayerError::NotInVoiceChannel.into()),
        (Some(member_channel), Some(bot_channel)) if member_channel != bot_channel => {
            return Err(PlayerError::InDifferentVoiceChannel.into());
        }
        _ => {}
    }

    let dj_settings = settings
        .dj_settings
        .unwrap_or_else(|| GuildDjSettings::new(guild_id));
    let required = ctx.data().player.config.player.bot_voice_permissions();
    let allowed = dj_settings.is_dj_member(&candidate, bot_channel, required);
    if !allowed {
        debug!("{} failed the DJ check in guild {}", candidate.user_id, guild_id);
    }
    Ok(allowed)
}
