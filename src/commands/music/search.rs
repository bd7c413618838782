use super::*;
use crate::player::embeds;
use crate::utils::format::unescape;

/// Search for tracks without queueing them
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    category = "Music",
    aliases("s", "find"),
    check = "commands_channel_check"
)]
pub async fn search(
    ctx: Context<'_>,
    #[description = "What to search for"]
    #[rest]
    query: String,
) -> CommandResult {
    let query = match ctx {
        poise::Context::Prefix(_) => unescape(&query),
        poise::Context::Application(_) => query,
    };
    ctx.defer().await?;

    let player = &ctx.data().player;
    let result = player.search(&query).await?;
    let embed = match &result.playlist {
        Some(playlist) => embeds::playlist_result(&player.messages, &query, playlist, &result.tracks),
        None => embeds::search_results(
            &player.messages,
            &query,
            &result.tracks,
            player.config.big_search_result_thumbnails,
        ),
    };
    reply(ctx, embed).await
}
