use poise::serenity_prelude::{CreateEmbed, CreateEmbedAuthor, CreateEmbedFooter};
use std::time::Duration;

use super::track::{PlaylistMetadata, TrackMetadata};
use crate::utils::format::{format_duration, format_progress_bar, truncate};
use crate::utils::messages::Messages;

/// Tracks listed on each queue page.
pub const QUEUE_PAGE_SIZE: usize = 10;

fn duration_label(track: &TrackMetadata) -> String {
    track
        .duration
        .map(format_duration)
        .unwrap_or_else(|| "Live".to_string())
}

fn requester_label(track: &TrackMetadata) -> String {
    track
        .requested_by
        .map(|user| format!("<@{}>", user))
        .unwrap_or_else(|| "Autoplay".to_string())
}

/// Embed announcing the playing track, with a progress bar when the position is known.
pub fn now_playing(
    messages: &Messages,
    track: &TrackMetadata,
    position: Option<Duration>,
    big_thumbnail: bool,
) -> CreateEmbed {
    let mut description = format!("**{}**", track.link());
    if let (Some(position), Some(total)) = (position, track.duration) {
        description.push_str(&format!("\n\n`{}`", format_progress_bar(position, total)));
    }

    let mut embed = CreateEmbed::new()
        .author(CreateEmbedAuthor::new(messages.get::<&str>("nowPlaying", &[])))
        .description(description)
        .field("Duration", format!("`{}`", duration_label(track)), true)
        .field("Requested by", requester_label(track), true)
        .colour(messages.embed_colour(true));

    if let Some(author) = &track.author {
        embed = embed.footer(CreateEmbedFooter::new(author));
    }
    if let Some(thumbnail) = &track.thumbnail {
        embed = if big_thumbnail {
            embed.image(thumbnail)
        } else {
            embed.thumbnail(thumbnail)
        };
    }
    embed
}

/// Embed confirming a track (or playlist) was added.
pub fn added_to_queue(
    messages: &Messages,
    tracks: &[TrackMetadata],
    playlist: Option<&PlaylistMetadata>,
    position: usize,
) -> CreateEmbed {
    let embed = CreateEmbed::new().colour(messages.embed_colour(true));

    if let Some(playlist) = playlist {
        let total: Duration = tracks.iter().filter_map(|track| track.duration).sum();
        let mut embed = embed
            .author(CreateEmbedAuthor::new(messages.get::<&str>("addedPlaylist", &[])))
            .description(format!("**[{}]({})**", playlist.title, playlist.url))
            .field("Tracks", format!("`{}`", tracks.len()), true)
            .field("Duration", format!("`{}`", format_duration(total)), true);
        if let Some(thumbnail) = &playlist.thumbnail {
            embed = embed.thumbnail(thumbnail);
        }
        return embed;
    }

    let Some(track) = tracks.first() else {
        return embed.description(messages.get::<&str>("noResultsFound", &[]));
    };

    let mut embed = embed
        .author(CreateEmbedAuthor::new(messages.get::<&str>("addedToQueue", &[])))
        .description(format!("**{}**", track.link()))
        .field("Duration", format!("`{}`", duration_label(track)), true)
        .field("Position", format!("`#{}`", position), true);
    if let Some(thumbnail) = &track.thumbnail {
        embed = embed.thumbnail(thumbnail);
    }
    embed
}

/// Numbered list of search results.
pub fn search_results(
    messages: &Messages,
    query: &str,
    tracks: &[TrackMetadata],
    big_thumbnail: bool,
) -> CreateEmbed {
    let description = tracks
        .iter()
        .enumerate()
        .map(|(i, track)| {
            format!(
                "`{}.` {} `{}`",
                i + 1,
                truncate(&track.link(), 200),
                duration_label(track)
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let mut embed = CreateEmbed::new()
        .author(CreateEmbedAuthor::new(format!("Results for \"{}\"", truncate(query, 100))))
        .description(description)
        .colour(messages.embed_colour(true));

    if let Some(thumbnail) = tracks.first().and_then(|track| track.thumbnail.as_ref()) {
        embed = if big_thumbnail {
            embed.image(thumbnail)
        } else {
            embed.thumbnail(thumbnail)
        };
    }
    embed
}

/// A playlist found by a search: its title, owner and track count.
pub fn playlist_result(
    messages: &Messages,
    query: &str,
    playlist: &PlaylistMetadata,
    tracks: &[TrackMetadata],
) -> CreateEmbed {
    let count = match tracks.len() {
        1 => "1 Track".to_string(),
        n => format!("{} Tracks", n),
    };

    let mut embed = CreateEmbed::new()
        .author(CreateEmbedAuthor::new("Playlist"))
        .title(truncate(&playlist.title, 256))
        .url(&playlist.url)
        .field("Tracks", count, true)
        .footer(CreateEmbedFooter::new(format!("Result for \"{}\"", truncate(query, 50))))
        .colour(messages.embed_colour(true));

    if let Some(author) = &playlist.author {
        embed = embed.field("Author", author, true);
    }
    if let Some(thumbnail) = &playlist.thumbnail {
        embed = embed.thumbnail(thumbnail);
    }
    embed
}

/// Queue pages as markdown, `QUEUE_PAGE_SIZE` upcoming tracks per page.
pub fn queue_pages(current: Option<&TrackMetadata>, upcoming: &[TrackMetadata]) -> Vec<String> {
    let header = current
        .map(|track| format!("**Now Playing**\n{} `{}`\n\n", track.link(), duration_label(track)))
        .unwrap_or_default();

    if upcoming.is_empty() {
        return vec![format!("{}*No upcoming tracks*", header)];
    }

    let total: Duration = upcoming.iter().filter_map(|track| track.duration).sum();
    let page_count = upcoming.len().div_ceil(QUEUE_PAGE_SIZE);

    upcoming
        .chunks(QUEUE_PAGE_SIZE)
        .enumerate()
        .map(|(page, chunk)| {
            let lines = chunk
                .iter()
                .enumerate()
                .map(|(i, track)| {
                    format!(
                        "`{}.` {} `{}` {}",
                        page * QUEUE_PAGE_SIZE + i + 1,
                        track.link(),
                        duration_label(track),
                        requester_label(track)
                    )
                })
                .collect::<Vec<_>>()
                .join("\n");

            format!(
                "{}**Up Next**\n{}\n\n`{} tracks • {} • page {}/{}`",
                header,
                lines,
                upcoming.len(),
                format_duration(total),
                page + 1,
                page_count
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn track(i: usize) -> TrackMetadata {
        TrackMetadata {
            title: format!("Track {}", i),
            url: format!("https://example.com/{}", i),
            duration: Some(Duration::from_secs(60)),
            ..Default::default()
        }
    }

    #[test]
    fn test_queue_pages_split_by_ten() {
        let upcoming: Vec<_> = (1..=25).map(track).collect();
        let pages = queue_pages(Some(&track(0)), &upcoming);

        assert_eq!(pages.len(), 3);
        assert!(pages[0].starts_with("**Now Playing**"));
        assert!(pages[0].contains("`1.` [Track 1]"));
        assert!(pages[1].contains("`11.` [Track 11]"));
        assert!(pages[2].contains("`25.` [Track 25]"));
        assert!(pages[2].ends_with("`25 tracks • 25:00 • page 3/3`"));
    }

    #[test]
    fn test_queue_pages_without_upcoming() {
        let pages = queue_pages(None, &[]);
        assert_eq!(pages, vec!["*No upcoming tracks*".to_string()]);
    }

    #[test]
    fn test_requester_label() {
        let mut metadata = track(1);
        assert_eq!(requester_label(&metadata), "Autoplay");
        metadata.requested_by = Some(poise::serenity_prelude::UserId::new(5));
        assert_eq!(requester_label(&metadata), "<@5>");
    }

    #[test]
    fn test_playlist_result_shows_title_and_count() {
        let playlist = PlaylistMetadata {
            title: "Road Trip".to_string(),
            url: "https://www.youtube.com/playlist?list=PL1".to_string(),
            thumbnail: None,
            author: Some("DJ".to_string()),
        };
        let tracks: Vec<_> = (1..=3).map(track).collect();

        let embed = playlist_result(&Messages::defaults(), "road trip", &playlist, &tracks);
        let json = serde_json::to_value(&embed).unwrap();

        assert_eq!(json["title"], "Road Trip");
        assert_eq!(json["url"], "https://www.youtube.com/playlist?list=PL1");
        assert_eq!(json["fields"][0]["value"], "3 Tracks");
        assert_eq!(json["fields"][1]["value"], "DJ");
        assert_eq!(json["footer"]["text"], "Result for \"road trip\"");
    }
}
