use poise::serenity_prelude::{CreateEmbed, CreateEmbedFooter};
use poise::CreateReply;
use tracing::{debug, warn};

use super::*;
use crate::utils::lyrics::{LyricsClient, LyricsError};

/// Show the lyrics of the current track or of a search
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    category = "Music",
    check = "commands_channel_check"
)]
pub async fn lyrics(
    ctx: Context<'_>,
    #[description = "Song to look up, defaults to the current track"]
    #[rest]
    search: Option<String>,
) -> CommandResult {
    let guild_id = guild_id(ctx)?;
    let player = &ctx.data().player;

    let query = match search.filter(|search| !search.trim().is_empty()) {
        Some(search) => search,
        None => player.now_playing(guild_id).await?.track.title,
    };
    debug!("Looking up lyrics for {}", query);

    ctx.defer().await?;

    let lyrics = match LyricsClient::default().search(&query).await {
        Ok(lyrics) => lyrics,
        Err(LyricsError::NotFound) => {
            return reply(ctx, player.message_embed::<&str>("noResultsFound", false, &[])).await;
        }
        Err(e) => {
            warn!("Lyrics lookup failed for {}: {}", query, e);
            return reply(ctx, player.message_embed::<&str>("botInternalError", false, &[])).await;
        }
    };

    let colour = player.messages.embed_colour(true);
    let pages = lyrics.pages();
    let last = pages.len().saturating_sub(1);
    // One message per page; a single message caps embed text at 6000 characters.
    for (i, page) in pages.into_iter().enumerate() {
        let mut embed = CreateEmbed::new().description(page).colour(colour);
        if i == 0 {
            embed = embed.title(format!("{} - {}", lyrics.artist, lyrics.title));
        }
        if i == last {
            embed = embed.footer(CreateEmbedFooter::new("Lyrics provided by lrclib.net"));
        }
        ctx.send(CreateReply::default().embed(embed)).await?;
    }

    Ok(())
}
