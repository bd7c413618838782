//! Reply messages and the embeds built from them.
//!
//! Every user-facing reply is looked up by key so server owners can reword
//! the bot from `messages.toml`. Templates take positional placeholders
//! written either `{0}` or `%0%`, and a `description:` or `author:` prefix
//! decides where the text lands in the embed.

use poise::serenity_prelude::{Colour, CreateEmbed, CreateEmbedAuthor};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::LazyLock;

use super::config::{ConfigError, MESSAGES_FILE, config_dir, create_config_file};

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{(\d+)\}|%(\d+)%").unwrap());

/// Fallback embed colour when a configured colour cannot be parsed.
const FALLBACK_COLOUR: u32 = 0xde111e;

/// Built-in message templates.
pub const DEFAULT_MESSAGES: &[(&str, &str)] = &[
    ("embedColor", "#de111e"),
    ("errorEmbedColor", "#de111e"),
    ("loading", "Loading..."),
    ("noSearchQueryProvided", "Enter a search query."),
    ("noResultsFound", "No results found."),
    ("notInGuild", "You are not in a guild."),
    ("notInVoiceChannel", "You are not in a voice channel."),
    ("notInBotVoiceChannel", "You are not in the voice channel I'm in."),
    ("cantConnectToVoiceChannel", "description:Can't connect to {0}"),
    ("botInternalError", "An error occurred"),
    ("databaseError", "Couldn't reach the settings database."),
    ("commandCooldown", "description:Wait for `{0}` cooldown."),
    ("commandError", "An error occurred while executing this command."),
    ("commandInvalidArguments", "description:Invalid arguments given to option(s): {0}"),
    ("commandMissingArguments", "description:Missing required command arguments: {0}"),
    ("commandNoBotPermissions", "I don't have enough permissions to execute this command."),
    ("commandNoMemberPermissions", "You do not have enough permissions to execute this command."),
    ("noQueue", "There's no active queue in this server."),
    ("noQueuePermissions", "You don't have permission to control the queue."),
    ("wrongCommandsChannel", "description:Music commands can only be used in <#{0}>"),
    ("trackNotFound", "Track not found in the queue."),
    ("noPreviousTrack", "There's no previous track to play."),
    ("pausedTrack", "description:Paused **{0}**"),
    ("unpausedTrack", "description:Resumed **{0}**"),
    ("skippedTrack", "description:Skipped **{0}**"),
    ("stoppedQueue", "description:Queue stopped by <@{1}>"),
    ("clearedQueue", "description:Removed **{0}** track(s) from the queue"),
    ("shuffledQueue", "description:Queue shuffled by <@{1}>"),
    ("loopMode", "description:Loop mode set to **{0}**"),
    ("movedTrack", "description:Moved **{0}** to position **{1}**"),
    ("removedTrack", "description:Removed **{0}** from the queue"),
    ("previousTrack", "description:Playing previous track **{0}**"),
    ("nowPlaying", "Now Playing"),
    ("addedToQueue", "Track"),
    ("addedPlaylist", "Playlist"),
    ("restoredQueue", "description:Restored **{0}** track(s) from the last session"),
    ("errorPlaying", "description:Error playing **{0}**"),
    ("settingsUpdated", "description:Settings updated: {0}"),
    ("queueEnded", "Queue ended"),
];

/// Where the message text is placed inside the embed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmbedLayout {
    /// Short single-line messages go in the author slot next to the bot avatar.
    Author(String),
    /// Multi-line or explicitly prefixed messages become the description.
    Description(String),
}

/// Configured message templates, falling back to [`DEFAULT_MESSAGES`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Messages {
    overrides: BTreeMap<String, String>,
}

impl Messages {
    /// Messages seeded with every built-in template.
    pub fn defaults() -> Self {
        Self {
            overrides: DEFAULT_MESSAGES
                .iter()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect(),
        }
    }

    /// Loads `messages.toml` from the config directory, creating it if needed.
    pub fn load() -> Result<Self, ConfigError> {
        create_config_file(&config_dir().join(MESSAGES_FILE), Self::defaults())
    }

    pub fn with_override(mut self, key: &str, value: &str) -> Self {
        self.overrides.insert(key.to_string(), value.to_string());
        self
    }

    /// Raw template for `key`: configured, then built-in, then the key itself.
    pub fn template(&self, key: &str) -> String {
        self.overrides
            .get(key)
            .map(String::as_str)
            .or_else(|| {
                DEFAULT_MESSAGES
                    .iter()
                    .find(|(default_key, _)| *default_key == key)
                    .map(|(_, value)| *value)
            })
            .unwrap_or(key)
            .to_string()
    }

    /// Template for `key` with `{i}` and `%i%` replaced by `placeholders[i]`.
    /// Substituted values are never expanded again.
    pub fn get<S: AsRef<str>>(&self, key: &str, placeholders: &[S]) -> String {
        let template = self.template(key);

        PLACEHOLDER
            .replace_all(&template, |caps: &Captures| {
                caps.get(1)
                    .or_else(|| caps.get(2))
                    .and_then(|index| index.as_str().parse::<usize>().ok())
                    .and_then(|index| placeholders.get(index))
                    .map(|value| value.as_ref().to_string())
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }

    /// Parses a colour message (`#rrggbb` or `rrggbb`).
    pub fn colour(&self, key: &str) -> Colour {
        let value = self.template(key);
        let hex = value.trim().trim_start_matches('#');
        u32::from_str_radix(hex, 16)
            .map(Colour::new)
            .unwrap_or(Colour::new(FALLBACK_COLOUR))
    }

    /// Colour for a positive or an error reply.
    pub fn embed_colour(&self, positive: bool) -> Colour {
        if positive {
            self.colour("embedColor")
        } else {
            self.colour("errorEmbedColor")
        }
    }

    /// Builds an embed for `key`.
    ///
    /// `positive` picks between `embedColor` and `errorEmbedColor`; `icon` is
    /// shown next to author-style messages, usually the bot avatar.
    pub fn embed<S: AsRef<str>>(
        &self,
        key: &str,
        positive: bool,
        placeholders: &[S],
        icon: Option<&str>,
    ) -> CreateEmbed {
        let embed = CreateEmbed::new().colour(self.embed_colour(positive));

        match layout(&self.get(key, placeholders)) {
            EmbedLayout::Description(description) => embed.description(description),
            EmbedLayout::Author(name) => {
                let mut author = CreateEmbedAuthor::new(name);
                if let Some(icon) = icon {
                    author = author.icon_url(icon);
                }
                embed.author(author)
            }
        }
    }
}

/// Strips `prefix` from the start of `message`, ignoring ASCII case.
fn strip_prefix_ignore_case<'a>(message: &'a str, prefix: &str) -> Option<&'a str> {
    let head = message.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &message[prefix.len()..])
}

/// Decides where a rendered message goes inside an embed.
pub fn layout(message: &str) -> EmbedLayout {
    if let Some(rest) = strip_prefix_ignore_case(message, "description:") {
        return EmbedLayout::Description(rest.trim().to_string());
    }

    if let Some(rest) = strip_prefix_ignore_case(message, "author:") {
        return EmbedLayout::Author(rest.trim().replace('\n', "\\n"));
    }

    if message.contains('\n') {
        EmbedLayout::Description(message.to_string())
    } else {
        EmbedLayout::Author(message.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test]
    fn test_get_falls_back_to_default_then_key() {
        let messages = Messages::default();
        assert_eq!(messages.get::<&str>("loading", &[]), "Loading...");
        assert_eq!(messages.get::<&str>("unknownKey", &[]), "unknownKey");
    }

    #[test]
    fn test_get_prefers_override() {
        let messages = Messages::defaults().with_override("loading", "Hang on");
        assert_eq!(messages.get::<&str>("loading", &[]), "Hang on");
    }

    #[test]
    fn test_placeholders_both_styles() {
        let messages = Messages::default().with_override("greet", "{0} and %1% and {0}");
        assert_eq!(messages.get("greet", &["a", "b"]), "a and b and a");
    }

    #[test]
    fn test_placeholder_values_are_not_expanded() {
        let messages = Messages::default().with_override("playing", "{0} requested by %1%");
        assert_eq!(
            messages.get("playing", &["Song {1} %1%", "Ana"]),
            "Song {1} %1% requested by Ana"
        );
    }

    #[test]
    fn test_missing_placeholders_are_left_alone() {
        let messages = Messages::default().with_override("greet", "{0} {1}");
        assert_eq!(messages.get("greet", &["only"]), "only {1}");
    }

    #[test_case("description:Hello", EmbedLayout::Description("Hello".into()) ; "description prefix")]
    #[test_case("DESCRIPTION: Hi", EmbedLayout::Description("Hi".into()) ; "prefix is case insensitive")]
    #[test_case("author:line\nbreak", EmbedLayout::Author("line\\nbreak".into()) ; "author escapes newlines")]
    #[test_case("two\nlines", EmbedLayout::Description("two\nlines".into()) ; "newline means description")]
    #[test_case("Loading...", EmbedLayout::Author("Loading...".into()) ; "single line is author")]
    fn test_layout(message: &str, expected: EmbedLayout) {
        assert_eq!(layout(message), expected);
    }

    #[test]
    fn test_colour_parsing() {
        let messages = Messages::default()
            .with_override("embedColor", "#00ff00")
            .with_override("errorEmbedColor", "not a colour");

        assert_eq!(messages.embed_colour(true), Colour::new(0x00ff00));
        assert_eq!(messages.embed_colour(false), Colour::new(FALLBACK_COLOUR));
    }

    #[test]
    fn test_defaults_round_trip_through_toml() {
        let defaults = Messages::defaults();
        let serialized = toml::to_string_pretty(&defaults).unwrap();
        let parsed: Messages = toml::from_str(&serialized).unwrap();
        assert_eq!(parsed, defaults);
    }
}
