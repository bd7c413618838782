use super::*;

/// Remove every upcoming track from the queue
#[poise::command(slash_command, prefix_command, guild_only, category = "Music", check = "dj_check")]
pub async fn clear(ctx: Context<'_>) -> CommandResult {
    let guild_id = guild_id(ctx)?;
    let player = &ctx.data().player;

    let removed = player.clear(guild_id).await?;
    reply(ctx, player.message_embed("clearedQueue", true, &[removed.to_string()])).await
}
