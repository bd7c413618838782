use super::*;
use crate::player::PauseToggle;

/// Pause or resume the current track
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    category = "Music",
    aliases("resume"),
    check = "dj_check"
)]
pub async fn pause(ctx: Context<'_>) -> CommandResult {
    let guild_id = guild_id(ctx)?;
    let player = &ctx.data().player;

    let (toggle, track) = player.toggle_pause(guild_id).await?;
    let key = match toggle {
        PauseToggle::Paused => "pausedTrack",
        PauseToggle::Resumed => "unpausedTrack",
    };

    reply(ctx, player.message_embed(key, true, &[track.title])).await
}
