use super::*;

/// Remove a track from the queue
#[poise::command(slash_command, prefix_command, guild_only, category = "Music", check = "dj_check")]
pub async fn remove(
    ctx: Context<'_>,
    #[description = "Position of the track to remove"]
    #[rename = "track-id"]
    track_id: usize,
) -> CommandResult {
    let guild_id = guild_id(ctx)?;
    let player = &ctx.data().player;

    let removed = player.remove_track(guild_id, track_id).await?;
    reply(ctx, player.message_embed("removedTrack", true, &[removed.title])).await
}
