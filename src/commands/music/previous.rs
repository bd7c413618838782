use super::*;

/// Play the previous track again
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    category = "Music",
    aliases("prev", "back"),
    check = "dj_check"
)]
pub async fn previous(ctx: Context<'_>) -> CommandResult {
    let guild_id = guild_id(ctx)?;
    let player = &ctx.data().player;

    let track = player.previous(guild_id).await?;
    reply(ctx, player.message_embed("previousTrack", true, &[track.title])).await
}
