use poise::serenity_prelude::AutocompleteChoice;
use std::time::Duration;
use tracing::{debug, info};

use super::*;
use crate::player::{PlayRequest, embeds, source};
use crate::utils::format::{truncate, unescape};

const AUTOCOMPLETE_TIMEOUT: Duration = Duration::from_millis(2500);
/// Discord's limit for choice names and values.
const CHOICE_MAX_CHARS: usize = 100;

/// Play a song from YouTube, SoundCloud or a direct URL
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    category = "Music",
    aliases("p"),
    check = "commands_channel_check"
)]
pub async fn play(
    ctx: Context<'_>,
    #[description = "Song name or URL"]
    #[autocomplete = "autocomplete_search"]
    #[rest]
    search: String,
) -> CommandResult {
    let guild_id = guild_id(ctx)?;
    let query = match ctx {
        poise::Context::Prefix(_) => unescape(&search),
        poise::Context::Application(_) => search,
    };
    info!("Received play command with query: {}", query);

    ctx.defer().await?;

    let player = &ctx.data().player;
    let outcome = player
        .play(
            ctx.serenity_context(),
            PlayRequest {
                guild_id,
                user_id: ctx.author().id,
                text_channel: ctx.channel_id(),
                query,
            },
        )
        .await?;

    let embed = embeds::added_to_queue(
        &player.messages,
        &outcome.tracks,
        outcome.playlist.as_ref(),
        outcome.position,
    );
    reply(ctx, embed).await
}

/// Suggests search results while the user types. URLs are left alone.
async fn autocomplete_search<'a>(ctx: Context<'_>, partial: &'a str) -> Vec<AutocompleteChoice> {
    let partial = partial.trim();
    if partial.chars().count() < 3 || source::is_url(partial) {
        return Vec::new();
    }

    let limit = ctx.data().player.config.player.max_search_results;
    let results = match tokio::time::timeout(AUTOCOMPLETE_TIMEOUT, source::search(partial, limit)).await {
        Ok(Ok(results)) => results.tracks,
        Ok(Err(e)) => {
            debug!("Autocomplete search failed for '{}': {}", partial, e);
            return Vec::new();
        }
        Err(_) => {
            debug!("Autocomplete search timed out for '{}'", partial);
            return Vec::new();
        }
    };

    results
        .into_iter()
        .filter(|track| track.url.chars().count() <= CHOICE_MAX_CHARS)
        .map(|track| AutocompleteChoice::new(truncate(&track.title, CHOICE_MAX_CHARS), track.url))
        .collect()
}
