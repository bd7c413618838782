//! Lyrics lookup through the lrclib.net API.
//! Requires the `lyrics` feature flag.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::format::split_chunks;

/// Public lrclib endpoint.
pub const LRCLIB_URL: &str = "https://lrclib.net";
/// Characters per lyrics embed.
pub const PAGE_CHARS: usize = 4000;
/// Embeds sent for a single lyrics reply.
pub const MAX_PAGES: usize = 10;

/// Errors that can occur during lrclib interactions.
#[derive(Error, Debug)]
pub enum LyricsError {
    /// Error during HTTP request communication.
    #[error("API communication failure: {0}")]
    Api(#[from] reqwest::Error),

    /// No result carried plain lyrics.
    #[error("No lyrics found")]
    NotFound,
}

/// A single lrclib search hit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LyricsRecord {
    pub track_name: String,
    pub artist_name: String,
    #[serde(default)]
    pub instrumental: bool,
    #[serde(default)]
    pub plain_lyrics: Option<String>,
}

impl LyricsRecord {
    fn lyrics(&self) -> Option<&str> {
        if self.instrumental {
            return None;
        }
        self.plain_lyrics
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
    }
}

/// Lyrics ready to be displayed.
#[derive(Debug, Clone, PartialEq)]
pub struct Lyrics {
    pub title: String,
    pub artist: String,
    pub text: String,
}

impl Lyrics {
    /// Lyrics text split into embed-sized pages, at most [`MAX_PAGES`].
    pub fn pages(&self) -> Vec<String> {
        split_chunks(&self.text, PAGE_CHARS)
            .into_iter()
            .take(MAX_PAGES)
            .collect()
    }
}

pub struct LyricsClient {
    http: Client,
    base_url: String,
}

impl Default for LyricsClient {
    fn default() -> Self {
        Self::new(LRCLIB_URL)
    }
}

impl LyricsClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Searches lrclib and returns the first result that has plain lyrics.
    pub async fn search(&self, query: &str) -> Result<Lyrics, LyricsError> {
        let url = format!("{}/api/search", self.base_url);
        let records: Vec<LyricsRecord> = self
            .http
            .get(&url)
            .query(&[("q", query)])
            .header("Accept", "application/json")
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        records
            .iter()
            .find_map(|record| {
                record.lyrics().map(|text| Lyrics {
                    title: record.track_name.clone(),
                    artist: record.artist_name.clone(),
                    text: text.to_string(),
                })
            })
            .ok_or(LyricsError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_search_skips_instrumental_results() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/search"))
            .and(query_param("q", "never gonna"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {
                    "trackName": "Never Gonna Give You Up (Instrumental)",
                    "artistName": "Rick Astley",
                    "instrumental": true,
                    "plainLyrics": null
                },
                {
                    "trackName": "Never Gonna Give You Up",
                    "artistName": "Rick Astley",
                    "instrumental": false,
                    "plainLyrics": "We're no strangers to love\n"
                }
            ])))
            .mount(&server)
            .await;

        let lyrics = LyricsClient::new(server.uri())
            .search("never gonna")
            .await
            .unwrap();

        assert_eq!(
            lyrics,
            Lyrics {
                title: "Never Gonna Give You Up".to_string(),
                artist: "Rick Astley".to_string(),
                text: "We're no strangers to love".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_search_without_lyrics() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let result = LyricsClient::new(server.uri()).search("nothing").await;
        assert_matches!(result, Err(LyricsError::NotFound));
    }

    #[tokio::test]
    async fn test_search_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/search"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let result = LyricsClient::new(server.uri()).search("boom").await;
        assert_matches!(result, Err(LyricsError::Api(_)));
    }

    #[test]
    fn test_pages_are_capped() {
        let lyrics = Lyrics {
            title: "Long".to_string(),
            artist: "Someone".to_string(),
            text: "a".repeat(PAGE_CHARS * 12),
        };

        let pages = lyrics.pages();
        assert_eq!(pages.len(), MAX_PAGES);
        assert!(pages.iter().all(|page| page.chars().count() == PAGE_CHARS));
    }
}
