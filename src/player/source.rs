//! Query resolution through the `yt-dlp` executable.
//!
//! Direct URLs are probed with `-j --no-playlist`, playlist URLs with
//! `-J --flat-playlist`, and anything else becomes a `ytsearchN:` search.

use std::sync::LazyLock;

use regex::Regex;
use tokio::process::Command;
use tracing::{debug, info, warn};
use url::Url;

use super::error::{PlayerError, PlayerResult};
use super::track::{PlaylistMetadata, SearchResult, TrackMetadata};

const YT_DLP: &str = "yt-dlp";

/// Trailing noise in video titles such as "(Official Video)" or "[Lyrics]".
static TITLE_NOISE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s*[\(\[][^\)\]]*(official|video|audio|lyrics?|visuali[sz]er|hd|4k)[^\)\]]*[\)\]]")
        .unwrap()
});

pub fn is_url(query: &str) -> bool {
    Url::parse(query).is_ok_and(|url| matches!(url.scheme(), "http" | "https"))
}

/// Playlist pages and watch URLs carrying a `list` parameter.
pub fn is_playlist_url(query: &str) -> bool {
    let Ok(url) = Url::parse(query) else {
        return false;
    };

    url.path().starts_with("/playlist")
        || url.path().starts_with("/sets/")
        || url.query_pairs().any(|(key, _)| key == "list")
}

async fn run(args: &[&str]) -> PlayerResult<String> {
    debug!("Running {} {:?}", YT_DLP, args);
    let output = Command::new(YT_DLP)
        .args(args)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| PlayerError::Source(format!("Failed to run {}: {}", YT_DLP, e)))?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    if !output.status.success() && stdout.trim().is_empty() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        warn!("{} exited with {}: {}", YT_DLP, output.status, stderr.trim());
        return Err(PlayerError::Source(
            stderr.lines().last().unwrap_or("yt-dlp failed").to_string(),
        ));
    }

    Ok(stdout)
}

/// One JSON object per line, as printed by `-j`.
pub fn parse_entries(stdout: &str) -> Vec<TrackMetadata> {
    stdout
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| serde_json::from_str::<serde_json::Value>(line).ok())
        .filter_map(|json| TrackMetadata::from_ytdlp(&json))
        .collect()
}

/// A single JSON document with an `entries` array, as printed by `-J`.
pub fn parse_playlist(stdout: &str, url: &str) -> PlayerResult<SearchResult> {
    let json: serde_json::Value = serde_json::from_str(stdout.trim())
        .map_err(|e| PlayerError::Source(format!("Failed to parse playlist metadata: {}", e)))?;

    let tracks: Vec<TrackMetadata> = json["entries"]
        .as_array()
        .map(|entries| entries.iter().filter_map(TrackMetadata::from_ytdlp).collect())
        .unwrap_or_default();

    let playlist = PlaylistMetadata {
        title: json["title"].as_str().unwrap_or("Unknown Playlist").to_string(),
        url: json["webpage_url"].as_str().unwrap_or(url).to_string(),
        thumbnail: tracks.first().and_then(|track| track.thumbnail.clone()),
        author: json["uploader"]
            .as_str()
            .or_else(|| json["channel"].as_str())
            .map(str::to_string),
    };

    Ok(SearchResult {
        playlist: Some(playlist),
        tracks,
    })
}

/// Resolves a URL or search query. Searches return up to `limit` tracks.
pub async fn resolve(query: &str, limit: usize) -> PlayerResult<SearchResult> {
    let query = query.trim();
    if query.is_empty() {
        return Err(PlayerError::NoSearchQuery);
    }

    let result = if is_playlist_url(query) {
        info!("Resolving playlist {}", query);
        parse_playlist(&run(&["-J", "--flat-playlist", query]).await?, query)?
    } else if is_url(query) {
        info!("Resolving URL {}", query);
        SearchResult {
            playlist: None,
            tracks: parse_entries(&run(&["-j", "--no-playlist", query]).await?),
        }
    } else {
        search(query, limit).await?
    };

    if result.is_empty() {
        return Err(PlayerError::NoResults);
    }
    Ok(result)
}

/// Plain YouTube search.
pub async fn search(query: &str, limit: usize) -> PlayerResult<SearchResult> {
    info!("Searching for: {}", query);
    let search = format!("ytsearch{}:{}", limit.max(1), query);
    let tracks = parse_entries(&run(&["-j", "--flat-playlist", &search]).await?);

    Ok(SearchResult {
        playlist: None,
        tracks,
    })
}

/// Search term for tracks related to `title`: the artist when the title
/// looks like "Artist - Song", otherwise the cleaned title itself.
pub fn related_search_term(title: &str) -> String {
    let cleaned = TITLE_NOISE.replace_all(title, "");
    let cleaned = cleaned.trim();

    match cleaned.split_once(" - ") {
        Some((artist, _)) => format!("{} music", artist.trim()),
        None if cleaned.is_empty() => "music".to_string(),
        None => format!("{} mix", cleaned),
    }
}

/// Tracks related to `track`, excluding the track itself and anything in `exclude`.
pub async fn related(
    track: &TrackMetadata,
    exclude: &[String],
    limit: usize,
) -> PlayerResult<Vec<TrackMetadata>> {
    let term = related_search_term(&track.title);
    let found = search(&term, limit + exclude.len() + 1).await?;

    Ok(found
        .tracks
        .into_iter()
        .filter(|candidate| candidate.url != track.url && !exclude.contains(&candidate.url))
        .take(limit)
        .collect())
}
