use super::*;
use crate::player::embeds;

/// Show the tracks in the queue
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    category = "Music",
    aliases("q"),
    check = "commands_channel_check"
)]
pub async fn queue(ctx: Context<'_>) -> CommandResult {
    let guild_id = guild_id(ctx)?;
    let snapshot = ctx.data().player.queue(guild_id).await?;

    let mut pages = embeds::queue_pages(snapshot.current.as_ref(), &snapshot.upcoming);
    if let Some(last) = pages.last_mut() {
        last.push_str(&format!("\nLoop: `{}`", snapshot.loop_mode.label()));
    }
    let pages: Vec<&str> = pages.iter().map(String::as_str).collect();

    poise::builtins::paginate(ctx, &pages).await?;
    Ok(())
}
