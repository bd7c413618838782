use super::*;

/// Skip the current track, or jump to a position in the queue
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    category = "Music",
    aliases("next"),
    check = "dj_check"
)]
pub async fn skip(
    ctx: Context<'_>,
    #[description = "Queue position to skip to"]
    #[rename = "skip-to"]
    #[min = 1]
    skip_to: Option<usize>,
) -> CommandResult {
    let guild_id = guild_id(ctx)?;
    let player = &ctx.data().player;

    let skipped = player.skip(guild_id, skip_to).await?;
    reply(ctx, player.message_embed("skippedTrack", true, &[skipped.title])).await
}
