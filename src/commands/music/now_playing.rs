use super::*;
use crate::player::embeds;

/// Show the track that is currently playing
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    rename = "now-playing",
    category = "Music",
    aliases("np", "now"),
    check = "commands_channel_check"
)]
pub async fn now_playing(ctx: Context<'_>) -> CommandResult {
    let guild_id = guild_id(ctx)?;
    let player = &ctx.data().player;

    let now_playing = player.now_playing(guild_id).await?;
    let mut embed = embeds::now_playing(
        &player.messages,
        &now_playing.track,
        Some(now_playing.position),
        player.config.big_now_playing_thumbnails,
    );
    if now_playing.paused {
        embed = embed.title("⏸️ Paused");
    }

    reply(ctx, embed).await
}
