use super::*;
use crate::player::queue::LoopMode;

/// Change what happens when the current track ends
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    rename = "loop",
    category = "Music",
    aliases("l"),
    check = "dj_check"
)]
pub async fn repeat(
    ctx: Context<'_>,
    #[description = "Loop mode"] mode: LoopMode,
) -> CommandResult {
    let guild_id = guild_id(ctx)?;
    let player = &ctx.data().player;

    player.set_loop_mode(guild_id, mode).await?;
    reply(ctx, player.message_embed("loopMode", true, &[mode.label()])).await
}
