use poise::serenity_prelude::ChannelId;
use songbird::error::ControlError;
use thiserror::Error;

use crate::utils::database::DbError;

/// Errors that can occur during player operations
#[derive(Error, Debug)]
pub enum PlayerError {
    #[error("Not in a guild")]
    NotInGuild,

    #[error("User is not in a voice channel")]
    NotInVoiceChannel,

    #[error("User is in a different voice channel")]
    InDifferentVoiceChannel,

    #[error("No queue")]
    NoQueue,

    #[error("Member is not allowed to control the queue")]
    NotDj,

    #[error("Music commands are restricted to channel {0}")]
    WrongCommandsChannel(ChannelId),

    #[error("No search query provided")]
    NoSearchQuery,

    #[error("No results found")]
    NoResults,

    #[error("Failed to join voice channel {0}")]
    CantConnect(ChannelId),

    #[error("Track not found")]
    TrackNotFound,

    #[error("No previous track")]
    NoPreviousTrack,

    #[error("Audio source error: {0}")]
    Source(String),

    #[error(transparent)]
    Database(#[from] DbError),

    #[error("Track control error: {0}")]
    Track(#[from] ControlError),
}

/// Result type for player operations
pub type PlayerResult<T> = Result<T, PlayerError>;

impl PlayerError {
    /// Message key used when this error is reported back to the user.
    pub fn message_key(&self) -> &'static str {
        match self {
            Self::NotInGuild => "notInGuild",
            Self::NotInVoiceChannel => "notInVoiceChannel",
            Self::InDifferentVoiceChannel => "notInBotVoiceChannel",
            Self::NoQueue => "noQueue",
            Self::NotDj => "noQueuePermissions",
            Self::WrongCommandsChannel(_) => "wrongCommandsChannel",
            Self::NoSearchQuery => "noSearchQueryProvided",
            Self::NoResults => "noResultsFound",
            Self::CantConnect(_) => "cantConnectToVoiceChannel",
            Self::TrackNotFound => "trackNotFound",
            Self::NoPreviousTrack => "noPreviousTrack",
            Self::Database(_) => "databaseError",
            Self::Source(_) | Self::Track(_) => "botInternalError",
        }
    }

    /// Placeholders for the message template.
    pub fn placeholders(&self) -> Vec<String> {
        match self {
            Self::WrongCommandsChannel(channel) => vec![channel.get().to_string()],
            Self::CantConnect(channel) => vec![format!("<#{}>", channel)],
            Self::Source(reason) => vec![reason.clone()],
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(PlayerError::NotDj, "noQueuePermissions" ; "dj check")]
    #[test_case(PlayerError::InDifferentVoiceChannel, "notInBotVoiceChannel" ; "voice channel")]
    #[test_case(PlayerError::Source("boom".into()), "botInternalError" ; "source failure")]
    #[test_case(PlayerError::Database(DbError::Poisoned), "databaseError" ; "database")]
    fn test_message_key(error: PlayerError, key: &str) {
        assert_eq!(error.message_key(), key);
    }

    #[test]
    fn test_placeholders() {
        let error = PlayerError::WrongCommandsChannel(ChannelId::new(55));
        assert_eq!(error.placeholders(), vec!["55".to_string()]);

        let error = PlayerError::CantConnect(ChannelId::new(9));
        assert_eq!(error.placeholders(), vec!["<#9>".to_string()]);
    }
}
