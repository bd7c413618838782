use super::*;

/// Move a track to another position in the queue
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    rename = "move",
    category = "Music",
    check = "dj_check"
)]
pub async fn move_track(
    ctx: Context<'_>,
    #[description = "Position of the track to move"]
    #[rename = "track-id"]
    track_id: usize,
    #[description = "Position to move it to"]
    #[rename = "move-after"]
    move_after: usize,
) -> CommandResult {
    let guild_id = guild_id(ctx)?;
    let player = &ctx.data().player;

    let moved = player.move_track(guild_id, track_id, move_after).await?;
    let position = move_after.max(1).to_string();
    reply(ctx, player.message_embed("movedTrack", true, &[moved.title, position])).await
}
