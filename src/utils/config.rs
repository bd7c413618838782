//! Read-or-create configuration files.
//!
//! Both the bot configuration and the reply messages live as TOML files in
//! the config directory (`$EPLAYER_CONFIG_DIR`, default `config/eplayer`).
//! A missing file is written out with the defaults so it can be edited, and
//! every struct is `#[serde(default)]` so partial files keep working.

use poise::serenity_prelude::{Permissions, UserId};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

/// Directory used when `EPLAYER_CONFIG_DIR` is not set.
pub const DEFAULT_CONFIG_DIR: &str = "config/eplayer";
pub const CONFIG_FILE: &str = "config.toml";
pub const MESSAGES_FILE: &str = "messages.toml";

/// Errors that can occur while loading or creating a config file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to access config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to serialize default config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Returns the configured config directory.
pub fn config_dir() -> PathBuf {
    std::env::var("EPLAYER_CONFIG_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_DIR))
}

/// Reads `path` if it exists, otherwise writes `default` there and returns it.
pub fn create_config_file<T>(path: &Path, default: T) -> Result<T, ConfigError>
where
    T: Serialize + DeserializeOwned,
{
    let io_err = |source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    };

    if path.exists() {
        let contents = fs::read_to_string(path).map_err(io_err)?;
        return toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        });
    }

    let serialized = toml::to_string_pretty(&default)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    fs::write(path, serialized).map_err(io_err)?;
    info!("Created default config file at {}", path.display());

    Ok(default)
}

/// Top-level bot configuration (`config.toml`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EPlayerConfig {
    /// Prefix for message commands.
    pub prefix: String,
    /// SQLite file holding guild settings and cached queues.
    pub database_path: String,
    /// Permission bits requested by the `/invite` link.
    pub invite_permissions: u64,
    /// Repository linked by `/contribute`.
    pub source_url: String,
    pub big_search_result_thumbnails: bool,
    pub big_now_playing_thumbnails: bool,
    /// Post a "now playing" embed in the queue's text channel on every track start.
    pub announce_tracks: bool,
    pub player: PlayerOptions,
    pub cached_queue: CachedQueueOptions,
    pub status: StatusOptions,
    pub nocrash: NoCrashOptions,
    pub command_options: HashMap<String, CommandOptions>,
}

impl Default for EPlayerConfig {
    fn default() -> Self {
        let mut command_options = HashMap::new();
        command_options.insert(
            "play".to_string(),
            CommandOptions {
                description: Some("Search for a song to play.".to_string()),
                ..Default::default()
            },
        );

        Self {
            prefix: "!".to_string(),
            database_path: format!("{}/eplayer.db", DEFAULT_CONFIG_DIR),
            invite_permissions: 274944321856,
            source_url: "https://github.com/FalloutStudios/e-player".to_string(),
            big_search_result_thumbnails: true,
            big_now_playing_thumbnails: false,
            announce_tracks: true,
            player: PlayerOptions::default(),
            cached_queue: CachedQueueOptions::default(),
            status: StatusOptions::default(),
            nocrash: NoCrashOptions::default(),
            command_options,
        }
    }
}

impl EPlayerConfig {
    /// Loads `config.toml` from the config directory, creating it if needed.
    pub fn load() -> Result<Self, ConfigError> {
        create_config_file(&config_dir().join(CONFIG_FILE), Self::default())
    }
}

/// Crash reporting.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NoCrashOptions {
    /// Bot owner; may run `crash-reports` and receives crash DMs.
    pub owner_id: Option<u64>,
    pub report_to_owner: bool,
    /// Keep running after a panic instead of exiting once it is reported.
    pub prevent_crash: bool,
}

impl Default for NoCrashOptions {
    fn default() -> Self {
        Self {
            owner_id: None,
            report_to_owner: false,
            prevent_crash: true,
        }
    }
}

impl NoCrashOptions {
    pub fn owner(&self) -> Option<UserId> {
        self.owner_id.filter(|id| *id != 0).map(UserId::new)
    }

    /// Owner to DM crash reports to, when reporting is on.
    pub fn report_target(&self) -> Option<UserId> {
        self.owner().filter(|_| self.report_to_owner)
    }
}

/// Playback behaviour handed to songbird and the queue handlers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlayerOptions {
    pub self_deaf: bool,
    /// Volume in percent applied to every new track.
    pub initial_volume: u16,
    pub leave_on_empty: bool,
    #[serde(with = "humantime_serde")]
    pub leave_on_empty_cooldown: Duration,
    pub leave_on_end: bool,
    pub leave_on_stop: bool,
    /// How many played tracks `/previous` can step back through.
    pub history_size: usize,
    pub max_search_results: usize,
    /// Permission bits the bot needs in a member's voice channel before
    /// that member counts as a DJ.
    pub required_bot_voice_permissions: u64,
}

impl Default for PlayerOptions {
    fn default() -> Self {
        Self {
            self_deaf: true,
            initial_volume: 100,
            leave_on_empty: true,
            leave_on_empty_cooldown: Duration::from_secs(60),
            leave_on_end: true,
            leave_on_stop: true,
            history_size: 50,
            max_search_results: 10,
            required_bot_voice_permissions: (Permissions::CONNECT | Permissions::SPEAK).bits(),
        }
    }
}

impl PlayerOptions {
    /// Volume as the linear factor songbird expects.
    pub fn volume(&self) -> f32 {
        f32::from(self.initial_volume.min(200)) / 100.0
    }

    pub fn bot_voice_permissions(&self) -> Permissions {
        Permissions::from_bits_truncate(self.required_bot_voice_permissions)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CachedQueueOptions {
    pub enabled: bool,
    /// How long a snapshot stays restorable after it was last written.
    #[serde(with = "humantime_serde")]
    pub expire_after: Duration,
}

impl Default for CachedQueueOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            expire_after: Duration::from_secs(60 * 60),
        }
    }
}

/// Rotating bot presence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StatusOptions {
    pub shuffle: bool,
    #[serde(with = "humantime_serde")]
    pub change_interval: Duration,
    pub activities: Vec<StatusActivity>,
}

impl Default for StatusOptions {
    fn default() -> Self {
        Self {
            shuffle: false,
            change_interval: Duration::from_secs(5 * 60),
            activities: vec![StatusActivity {
                kind: ActivityKind::Listening,
                name: "Music".to_string(),
                status: PresenceStatus::Online,
            }],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusActivity {
    pub kind: ActivityKind,
    pub name: String,
    #[serde(default)]
    pub status: PresenceStatus,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Playing,
    Listening,
    Watching,
    Competing,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PresenceStatus {
    #[default]
    Online,
    Idle,
    Dnd,
    Invisible,
}

/// Per-command overrides applied to the framework commands at start-up.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CommandOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    #[serde(
        with = "humantime_serde",
        skip_serializing_if = "Option::is_none"
    )]
    pub cooldown: Option<Duration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_member_permissions: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_bot_permissions: Option<u64>,
}
