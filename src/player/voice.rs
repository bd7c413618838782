//! Reacting to voice state changes: leaving empty channels and cleaning up
//! after the bot gets disconnected.

use poise::serenity_prelude::{self as serenity, ChannelId, GuildId, UserId, VoiceState};
use std::sync::Arc;
use tracing::{debug, info};

use super::EPlayer;

/// Counts the members in `channel` that aren't bots.
pub fn count_listeners<I>(states: I, channel: ChannelId, is_bot: impl Fn(UserId) -> bool) -> usize
where
    I: IntoIterator<Item = (UserId, Option<ChannelId>)>,
{
    states
        .into_iter()
        .filter(|(user_id, channel_id)| *channel_id == Some(channel) && !is_bot(*user_id))
        .count()
}

fn listeners_in(ctx: &serenity::Context, guild_id: GuildId, channel: ChannelId) -> usize {
    let Some(guild) = ctx.cache.guild(guild_id) else {
        return 0;
    };

    let states = guild
        .voice_states
        .values()
        .map(|state| (state.user_id, state.channel_id));
    count_listeners(states, channel, |user_id| {
        guild
            .members
            .get(&user_id)
            .map(|member| member.user.bot)
            .or_else(|| ctx.cache.user(user_id).map(|user| user.bot))
            .unwrap_or(false)
    })
}

impl EPlayer {
    pub async fn handle_voice_state_update(
        self: &Arc<Self>,
        ctx: &serenity::Context,
        old: Option<&VoiceState>,
        new: &VoiceState,
    ) {
        let Some(guild_id) = new.guild_id else {
            return;
        };
        if self.songbird.get(guild_id).is_none() {
            return;
        }

        let bot_id = ctx.cache.current_user().id;
        if new.user_id == bot_id && new.channel_id.is_none() {
            info!("Disconnected from voice in guild {}", guild_id);
            self.leave(guild_id).await;
            return;
        }

        if !self.config.player.leave_on_empty {
            return;
        }

        let bot_channel = if new.user_id == bot_id {
            new.channel_id
        } else {
            Self::bot_voice_channel(ctx, guild_id)
        };
        let Some(bot_channel) = bot_channel else {
            return;
        };

        let touched_bot_channel = new.user_id == bot_id
            || new.channel_id == Some(bot_channel)
            || old.and_then(|state| state.channel_id) == Some(bot_channel);
        if !touched_bot_channel {
            return;
        }

        if listeners_in(ctx, guild_id, bot_channel) > 0 {
            self.cancel_leave_timer(guild_id);
        } else {
            self.schedule_leave(ctx.clone(), guild_id, bot_channel);
        }
    }

    /// Leaves `guild_id` after the configured cooldown unless someone joins
    /// `channel` in the meantime.
    fn schedule_leave(self: &Arc<Self>, ctx: serenity::Context, guild_id: GuildId, channel: ChannelId) {
        if self.leave_timers.contains_key(&guild_id) {
            return;
        }

        let cooldown = self.config.player.leave_on_empty_cooldown;
        debug!("Voice channel {} is empty, leaving in {:?}", channel, cooldown);

        let player = Arc::clone(self);
        let timer = tokio::spawn(async move {
            tokio::time::sleep(cooldown).await;
            player.leave_timers.remove(&guild_id);

            if listeners_in(&ctx, guild_id, channel) == 0 {
                info!("Leaving empty voice channel {} in guild {}", channel, guild_id);
                player.leave(guild_id).await;
            }
        });
        self.leave_timers.insert(guild_id, timer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const VOICE: ChannelId = ChannelId::new(10);
    const OTHER: ChannelId = ChannelId::new(20);
    const BOT: UserId = UserId::new(1);

    fn states() -> Vec<(UserId, Option<ChannelId>)> {
        vec![
            (BOT, Some(VOICE)),
            (UserId::new(2), Some(VOICE)),
            (UserId::new(3), Some(OTHER)),
            (UserId::new(4), None),
        ]
    }

    #[test]
    fn test_count_listeners_ignores_bots_and_other_channels() {
        assert_eq!(count_listeners(states(), VOICE, |user| user == BOT), 1);
        assert_eq!(count_listeners(states(), OTHER, |user| user == BOT), 1);
    }

    #[test]
    fn test_count_listeners_only_bots_left() {
        let mut states = states();
        states.retain(|(user, _)| *user != UserId::new(2));
        assert_eq!(count_listeners(states, VOICE, |user| user == BOT), 0);
    }
}
