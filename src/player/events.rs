//! Global track event handlers registered on every call.

use poise::serenity_prelude::{self as serenity, GuildId, async_trait};
use songbird::tracks::{PlayMode, TrackHandle, TrackState};
use songbird::{EventContext, EventHandler};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::queue::{self, AfterEnd, LoopMode, TrackExit};
use super::track::TrackMetadata;
use super::{EPlayer, embeds, source, track_metadata};

/// Announces new tracks and keeps the cached queue in sync.
pub struct TrackStartNotifier {
    pub player: Arc<EPlayer>,
    pub http: Arc<serenity::Http>,
    pub guild_id: GuildId,
}

#[async_trait]
impl EventHandler for TrackStartNotifier {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<songbird::Event> {
        if let EventContext::Track(tracks) = ctx {
            for (_, handle) in tracks.iter() {
                self.handle_track_start(handle).await;
            }
        }
        None
    }
}

impl TrackStartNotifier {
    async fn handle_track_start(&self, handle: &TrackHandle) {
        let metadata = track_metadata(handle);
        info!("Now playing {} in guild {}", metadata.title, self.guild_id);

        if self.player.loop_mode(self.guild_id) == LoopMode::Track {
            if let Err(e) = handle.enable_loop() {
                warn!("Failed to loop track in guild {}: {}", self.guild_id, e);
            }
        }

        if self.player.config.announce_tracks {
            let embed = embeds::now_playing(
                &self.player.messages,
                &metadata,
                None,
                self.player.config.big_now_playing_thumbnails,
            );
            self.player.announce(&self.http, self.guild_id, embed).await;
        }

        self.player.cache_queue(self.guild_id, None).await;
    }
}

/// Records history and decides what happens after a track finishes.
pub struct TrackEndNotifier {
    pub player: Arc<EPlayer>,
    pub http: Arc<serenity::Http>,
    pub guild_id: GuildId,
}

#[async_trait]
impl EventHandler for TrackEndNotifier {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<songbird::Event> {
        if let EventContext::Track(tracks) = ctx {
            for (state, handle) in tracks.iter() {
                self.handle_track_end(handle, track_exit(state)).await;
            }
        }
        None
    }
}

/// Errored tracks and tracks stopped before their first frame never played.
fn track_exit(state: &TrackState) -> TrackExit {
    match state.playing {
        PlayMode::Errored(_) => TrackExit::Unplayed,
        _ if state.play_time.is_zero() => TrackExit::Unplayed,
        _ => TrackExit::Played,
    }
}

impl TrackEndNotifier {
    async fn handle_track_end(&self, handle: &TrackHandle, exit: TrackExit) {
        let player = &self.player;
        let guild_id = self.guild_id;
        let metadata = track_metadata(handle);
        debug!("Track ended in guild {} ({:?}): {}", guild_id, exit, metadata.title);

        let plan = {
            let Some(mut state) = player.guilds.get_mut(&guild_id) else {
                return;
            };
            state.track_ended(handle.uuid(), &metadata, exit, player.config.player.history_size)
        };
        let Some(plan) = plan else {
            return;
        };

        let Some(call) = player.songbird.get(guild_id) else {
            return;
        };

        let remaining = {
            let mut handler = call.lock().await;
            if plan.requeue {
                player.enqueue_track(&mut handler, metadata.clone());
            }
            handler
                .queue()
                .current_queue()
                .iter()
                .filter(|queued| queued.uuid() != handle.uuid())
                .count()
        };

        let leave_on_end = player.config.player.leave_on_end;
        let leave = match queue::after_end(plan.loop_mode, remaining, leave_on_end) {
            AfterEnd::Continue => {
                player.cache_queue(guild_id, Some(handle)).await;
                return;
            }
            AfterEnd::Autoplay if self.autoplay(&metadata).await => return,
            AfterEnd::Autoplay => leave_on_end,
            AfterEnd::QueueEnded { leave } => leave,
        };

        info!("Queue ended in guild {}", guild_id);
        player.forget_cached_queue(guild_id);
        let embed = player.message_embed::<&str>("queueEnded", true, &[]);
        player.announce(&self.http, guild_id, embed).await;

        if leave {
            player.leave(guild_id).await;
        }
    }

    /// Queues a track related to `ended`. Returns whether one was found.
    async fn autoplay(&self, ended: &TrackMetadata) -> bool {
        let history: Vec<String> = self
            .player
            .guilds
            .get(&self.guild_id)
            .map(|state| state.history.iter().map(|track| track.url.clone()).collect())
            .unwrap_or_default();

        let related = match source::related(ended, &history, 1).await {
            Ok(related) => related,
            Err(e) => {
                warn!("Autoplay lookup failed in guild {}: {}", self.guild_id, e);
                return false;
            }
        };

        let Some(next) = related.into_iter().next() else {
            return false;
        };
        let Some(call) = self.player.songbird.get(self.guild_id) else {
            return false;
        };

        info!("Autoplaying {} in guild {}", next.title, self.guild_id);
        let mut handler = call.lock().await;
        self.player.enqueue_track(&mut handler, next);
        true
    }
}

/// Reports tracks that failed to play.
pub struct TrackErrorNotifier {
    pub player: Arc<EPlayer>,
    pub http: Arc<serenity::Http>,
    pub guild_id: GuildId,
}

#[async_trait]
impl EventHandler for TrackErrorNotifier {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<songbird::Event> {
        if let EventContext::Track(tracks) = ctx {
            for (state, handle) in tracks.iter() {
                debug!("Track error state in guild {}: {:?}", self.guild_id, state.playing);
                self.player
                    .connection_error(&self.http, self.guild_id, handle)
                    .await;
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn state(playing: PlayMode, play_time: Duration) -> TrackState {
        TrackState {
            playing,
            play_time,
            ..Default::default()
        }
    }

    #[test]
    fn test_track_exit() {
        assert_eq!(
            track_exit(&state(PlayMode::End, Duration::from_secs(180))),
            TrackExit::Played
        );
        assert_eq!(
            track_exit(&state(PlayMode::Stop, Duration::from_millis(20))),
            TrackExit::Played
        );
        // A queued track stopped while still waiting its turn.
        assert_eq!(
            track_exit(&state(PlayMode::Stop, Duration::ZERO)),
            TrackExit::Unplayed
        );
    }
}
