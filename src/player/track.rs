//! Track metadata attached to every queued songbird track, and the results
//! of resolving a query through yt-dlp.

use poise::serenity_prelude::UserId;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Metadata for a playable track. Stored as the songbird track's user data
/// and serialized into cached queues.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrackMetadata {
    pub title: String,
    /// Page URL handed back to yt-dlp when the track is played.
    pub url: String,
    #[serde(with = "humantime_serde", default)]
    pub duration: Option<Duration>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    /// Uploader or channel name.
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub requested_by: Option<UserId>,
}

impl Default for TrackMetadata {
    fn default() -> Self {
        Self {
            title: "Unknown Track".to_string(),
            url: String::new(),
            duration: None,
            thumbnail: None,
            author: None,
            requested_by: None,
        }
    }
}

impl TrackMetadata {
    /// Builds metadata from a single yt-dlp JSON object. Entries without a
    /// usable URL are skipped.
    pub fn from_ytdlp(json: &serde_json::Value) -> Option<Self> {
        let url = json["webpage_url"]
            .as_str()
            .or_else(|| json["url"].as_str())
            .filter(|url| url.starts_with("http"))?
            .to_string();

        let thumbnail = json["thumbnail"].as_str().map(str::to_string).or_else(|| {
            json["thumbnails"]
                .as_array()
                .and_then(|thumbnails| thumbnails.last())
                .and_then(|thumbnail| thumbnail["url"].as_str())
                .map(str::to_string)
        });

        Some(Self {
            title: json["title"].as_str().unwrap_or("Unknown Title").to_string(),
            url,
            duration: json["duration"].as_f64().map(Duration::from_secs_f64),
            thumbnail,
            author: json["uploader"]
                .as_str()
                .or_else(|| json["channel"].as_str())
                .map(str::to_string),
            requested_by: None,
        })
    }

    pub fn with_requester(mut self, user_id: UserId) -> Self {
        self.requested_by = Some(user_id);
        self
    }

    /// Markdown link to the track page.
    pub fn link(&self) -> String {
        format!("[{}]({})", self.title.replace(['[', ']'], ""), self.url)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlaylistMetadata {
    pub title: String,
    pub url: String,
    pub thumbnail: Option<String>,
    pub author: Option<String>,
}

/// Outcome of resolving a query: a playlist with its entries or a list of
/// matching tracks (a single one for direct URLs).
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub playlist: Option<PlaylistMetadata>,
    pub tracks: Vec<TrackMetadata>,
}

impl SearchResult {
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}
