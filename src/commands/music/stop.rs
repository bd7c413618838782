use super::*;

/// Stop playback and clear the queue
#[poise::command(slash_command, prefix_command, guild_only, category = "Music", check = "dj_check")]
pub async fn stop(ctx: Context<'_>) -> CommandResult {
    let guild_id = guild_id(ctx)?;
    let player = &ctx.data().player;

    let stopped = player.stop(guild_id).await?;
    let title = stopped.map(|track| track.title).unwrap_or_default();
    let user = ctx.author().id.to_string();

    reply(ctx, player.message_embed("stoppedQueue", true, &[title, user])).await
}
