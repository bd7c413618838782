use super::*;

/// Shuffle the upcoming tracks
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    category = "Music",
    aliases("sh", "rand", "random"),
    check = "dj_check"
)]
pub async fn shuffle(ctx: Context<'_>) -> CommandResult {
    let guild_id = guild_id(ctx)?;
    let player = &ctx.data().player;

    player.shuffle(guild_id).await?;
    let author = ctx.author();
    let placeholders = [author.name.clone(), author.id.to_string()];
    reply(ctx, player.message_embed("shuffledQueue", true, &placeholders)).await
}
