//! Turns framework errors into the configured reply messages.

use humantime_serde::re::humantime;
use poise::serenity_prelude::Permissions;
use poise::{CreateReply, FrameworkError};
use std::time::Duration;
use tracing::{error, warn};

use super::crash_reports::CrashReport;
use crate::player::error::PlayerError;
use crate::{Data, Error};

/// Why a command invocation was halted.
#[derive(Debug, Clone, PartialEq)]
pub enum HaltReason {
    Cooldown(Duration),
    Player {
        key: &'static str,
        placeholders: Vec<String>,
    },
    CommandError(String),
    InvalidArguments(String),
    MissingArguments(String),
    NoBotPermissions(Permissions),
    NoMemberPermissions(Permissions),
    NotPermitted,
    GuildOnly,
}

impl HaltReason {
    fn player(error: &PlayerError) -> Self {
        Self::Player {
            key: error.message_key(),
            placeholders: error.placeholders(),
        }
    }

    /// Reason for a command that returned `error`.
    pub fn from_command_error(error: &Error) -> Self {
        match error.downcast_ref::<PlayerError>() {
            Some(player_error) => Self::player(player_error),
            None => Self::CommandError(error.to_string()),
        }
    }

    /// Reason for a failed check; checks without an error fail on DJ rules.
    pub fn from_check_error(error: Option<&Error>) -> Self {
        match error.and_then(|error| error.downcast_ref::<PlayerError>()) {
            Some(player_error) => Self::player(player_error),
            None => Self::NotPermitted,
        }
    }

    pub fn from_argument_error(error: &(dyn std::error::Error + Send + Sync), input: Option<&str>) -> Self {
        match input {
            Some(input) if !input.is_empty() => Self::InvalidArguments(input.to_string()),
            _ => Self::MissingArguments(error.to_string()),
        }
    }

    pub fn message_key(&self) -> &'static str {
        match self {
            Self::Cooldown(_) => "commandCooldown",
            Self::Player { key, .. } => *key,
            Self::CommandError(_) => "commandError",
            Self::InvalidArguments(_) => "commandInvalidArguments",
            Self::MissingArguments(_) => "commandMissingArguments",
            Self::NoBotPermissions(_) => "commandNoBotPermissions",
            Self::NoMemberPermissions(_) => "commandNoMemberPermissions",
            Self::NotPermitted => "noQueuePermissions",
            Self::GuildOnly => "notInGuild",
        }
    }

    pub fn placeholders(&self) -> Vec<String> {
        match self {
            Self::Cooldown(remaining) => {
                let seconds = Duration::from_secs(remaining.as_secs().max(1));
                vec![humantime::format_duration(seconds).to_string()]
            }
            Self::Player { placeholders, .. } => placeholders.clone(),
            Self::CommandError(text) | Self::InvalidArguments(text) | Self::MissingArguments(text) => {
                vec![text.clone()]
            }
            Self::NoBotPermissions(missing) | Self::NoMemberPermissions(missing) => {
                vec![missing.get_permission_names().join(", ")]
            }
            Self::NotPermitted | Self::GuildOnly => Vec::new(),
        }
    }
}

/// The halt reason for the errors that get a configured reply.
pub fn halt_reason(error: &FrameworkError<'_, Data, Error>) -> Option<HaltReason> {
    let reason = match error {
        FrameworkError::CooldownHit {
            remaining_cooldown, ..
        } => HaltReason::Cooldown(*remaining_cooldown),
        FrameworkError::Command { error, .. } => HaltReason::from_command_error(error),
        FrameworkError::ArgumentParse { error, input, .. } => {
            HaltReason::from_argument_error(error.as_ref(), input.as_deref())
        }
        FrameworkError::MissingBotPermissions {
            missing_permissions,
            ..
        } => HaltReason::NoBotPermissions(*missing_permissions),
        FrameworkError::MissingUserPermissions {
            missing_permissions,
            ..
        } => HaltReason::NoMemberPermissions(missing_permissions.unwrap_or_else(Permissions::empty)),
        FrameworkError::CommandCheckFailed { error, .. } => HaltReason::from_check_error(error.as_ref()),
        FrameworkError::GuildOnly { .. } => HaltReason::GuildOnly,
        _ => return None,
    };
    Some(reason)
}

/// Framework `on_error` hook: replies with an ephemeral message embed and
/// leaves everything else to poise.
pub async fn on_error(error: FrameworkError<'_, Data, Error>) {
    let (Some(reason), Some(ctx)) = (halt_reason(&error), error.ctx()) else {
        if let FrameworkError::EventHandler { error, framework, event, .. } = &error {
            framework.user_data.crashes.report(CrashReport::new(
                error.to_string(),
                Some(format!("{} event", event.snake_case_name())),
            ));
        }
        if let Err(e) = poise::builtins::on_error(error).await {
            error!("Error while handling error: {}", e);
        }
        return;
    };

    if let HaltReason::CommandError(text) = &reason {
        let command = &ctx.command().qualified_name;
        error!("Command {} failed: {}", command, text);
        ctx.data()
            .crashes
            .report(CrashReport::new(text.clone(), Some(format!("{} command", command))));
    } else {
        warn!(
            "Command {} halted: {}",
            ctx.command().qualified_name,
            reason.message_key()
        );
    }

    let embed = ctx
        .data()
        .player
        .message_embed(reason.message_key(), false, &reason.placeholders());
    if let Err(e) = ctx
        .send(CreateReply::default().embed(embed).ephemeral(true))
        .await
    {
        error!("Failed to send halt reply: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test]
    fn test_player_errors_keep_their_message() {
        let error: Error = Box::new(PlayerError::WrongCommandsChannel(
            poise::serenity_prelude::ChannelId::new(42),
        ));
        let reason = HaltReason::from_command_error(&error);

        assert_eq!(reason.message_key(), "wrongCommandsChannel");
        assert_eq!(reason.placeholders(), vec!["42".to_string()]);
    }

    #[test]
    fn test_other_command_errors() {
        let error: Error = "boom".into();
        let reason = HaltReason::from_command_error(&error);

        assert_eq!(reason, HaltReason::CommandError("boom".to_string()));
        assert_eq!(reason.message_key(), "commandError");
    }

    #[test]
    fn test_check_failure_without_error_is_dj_rejection() {
        assert_eq!(HaltReason::from_check_error(None).message_key(), "noQueuePermissions");

        let error: Error = Box::new(PlayerError::NotInVoiceChannel);
        assert_eq!(
            HaltReason::from_check_error(Some(&error)).message_key(),
            "notInVoiceChannel"
        );
    }

    #[test_case(Some("abc"), "commandInvalidArguments", "abc" ; "with input")]
    #[test_case(Some(""), "commandMissingArguments", "missing" ; "empty input")]
    #[test_case(None, "commandMissingArguments", "missing" ; "without input")]
    fn test_argument_errors(input: Option<&str>, key: &str, placeholder: &str) {
        let error: Error = "missing".into();
        let reason = HaltReason::from_argument_error(error.as_ref(), input);

        assert_eq!(reason.message_key(), key);
        assert_eq!(reason.placeholders(), vec![placeholder.to_string()]);
    }

    #[test]
    fn test_cooldown_rounds_to_seconds() {
        let reason = HaltReason::Cooldown(Duration::from_millis(2500));
        assert_eq!(reason.placeholders(), vec!["2s".to_string()]);

        let reason = HaltReason::Cooldown(Duration::from_millis(10));
        assert_eq!(reason.placeholders(), vec!["1s".to_string()]);
    }

    #[test]
    fn test_permission_names() {
        let reason = HaltReason::NoBotPermissions(Permissions::CONNECT);
        assert_eq!(reason.placeholders(), vec!["Connect".to_string()]);
        assert_eq!(reason.message_key(), "commandNoBotPermissions");
    }
}
