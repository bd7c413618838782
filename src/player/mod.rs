//! The EPlayer façade.
//!
//! Commands never touch songbird or the database directly; they go through
//! [`EPlayer`], which owns the voice manager, the settings database, the
//! configuration and the in-memory state of every guild with an active call.

pub mod embeds;
pub mod error;
pub mod events;
pub mod queue;
pub mod source;
pub mod track;
pub mod voice;

use chrono::Utc;
use dashmap::DashMap;
use poise::serenity_prelude::{self as serenity, ChannelId, CreateEmbed, CreateMessage, GuildId, UserId};
use songbird::input::YoutubeDl;
use songbird::tracks::{PlayMode, Track, TrackHandle};
use songbird::{Call, Event, Songbird, TrackEvent};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::models::{CachedQueue, GuildSettings, Record, RestoreAction};
use crate::utils::config::EPlayerConfig;
use crate::utils::database::Database;
use crate::utils::messages::Messages;

use error::{PlayerError, PlayerResult};
use events::{TrackEndNotifier, TrackErrorNotifier, TrackStartNotifier};
use queue::{GuildState, LoopMode};
use track::{PlaylistMetadata, SearchResult, TrackMetadata};

/// Everything `play` needs to know about the request.
#[derive(Debug, Clone)]
pub struct PlayRequest {
    pub guild_id: GuildId,
    pub user_id: UserId,
    pub text_channel: ChannelId,
    pub query: String,
}

/// What `play` ended up queueing.
#[derive(Debug, Clone)]
pub struct PlayOutcome {
    pub tracks: Vec<TrackMetadata>,
    pub playlist: Option<PlaylistMetadata>,
    /// 1-based queue position of the first added track; 0 when it started playing.
    pub position: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseToggle {
    Paused,
    Resumed,
}

#[derive(Debug, Clone)]
pub struct NowPlaying {
    pub track: TrackMetadata,
    pub position: Duration,
    pub paused: bool,
}

#[derive(Debug, Clone, Default)]
pub struct QueueSnapshot {
    pub current: Option<TrackMetadata>,
    pub upcoming: Vec<TrackMetadata>,
    pub loop_mode: LoopMode,
}

/// How long before a track's end the next one starts loading.
const PRELOAD_LEAD: Duration = Duration::from_secs(5);

/// Reads the metadata every queued track carries.
pub fn track_metadata(handle: &TrackHandle) -> TrackMetadata {
    handle.data::<TrackMetadata>().as_ref().clone()
}

/// Position in a track at which songbird starts loading the next one. Live
/// streams have no known end and preload nothing.
fn preload_point(duration: Option<Duration>) -> Option<Duration> {
    duration.map(|duration| duration.saturating_sub(PRELOAD_LEAD))
}

/// Queue contents worth caching. The track whose end event triggered the
/// snapshot may still sit at the head of the queue and is left out.
fn snapshot_tracks(
    queued: impl IntoIterator<Item = (Uuid, TrackMetadata)>,
    ended: Option<Uuid>,
) -> Vec<TrackMetadata> {
    queued
        .into_iter()
        .filter(|(id, _)| Some(*id) != ended)
        .map(|(_, track)| track)
        .collect()
}

pub struct EPlayer {
    pub config: EPlayerConfig,
    pub messages: Messages,
    pub db: Database,
    songbird: Arc<Songbird>,
    http_client: reqwest::Client,
    guilds: DashMap<GuildId, GuildState>,
    leave_timers: DashMap<GuildId, JoinHandle<()>>,
    /// Bot avatar shown next to author-style message embeds.
    icon: OnceLock<String>,
}

impl EPlayer {
    pub fn new(config: EPlayerConfig, messages: Messages, db: Database, songbird: Arc<Songbird>) -> Self {
        Self {
            config,
            messages,
            db,
            songbird,
            http_client: reqwest::Client::new(),
            guilds: DashMap::new(),
            leave_timers: DashMap::new(),
            icon: OnceLock::new(),
        }
    }

    pub fn songbird(&self) -> &Arc<Songbird> {
        &self.songbird
    }

    pub fn set_icon(&self, url: String) {
        let _ = self.icon.set(url);
    }

    /// Message embed for `key`, see [`Messages::embed`].
    pub fn message_embed<S: AsRef<str>>(&self, key: &str, positive: bool, placeholders: &[S]) -> CreateEmbed {
        self.messages
            .embed(key, positive, placeholders, self.icon.get().map(String::as_str))
    }

    pub fn error_embed(&self, error: &PlayerError) -> CreateEmbed {
        self.message_embed(error.message_key(), false, &error.placeholders())
    }

    /// Guild settings with their DJ settings and cached queue, created on first use.
    pub fn get_guild_settings(&self, guild_id: GuildId) -> PlayerResult<GuildSettings> {
        Ok(GuildSettings::fetch_or_create(&self.db, guild_id)?)
    }

    pub fn loop_mode(&self, guild_id: GuildId) -> LoopMode {
        self.guilds
            .get(&guild_id)
            .map(|state| state.loop_mode)
            .unwrap_or_default()
    }

    pub fn text_channel(&self, guild_id: GuildId) -> Option<ChannelId> {
        self.guilds.get(&guild_id).and_then(|state| state.text_channel)
    }

    /// Voice channel the bot is connected to in `guild_id`, per the cache.
    pub fn bot_voice_channel(ctx: &serenity::Context, guild_id: GuildId) -> Option<ChannelId> {
        let bot_id = ctx.cache.current_user().id;
        Self::user_voice_channel(ctx, guild_id, bot_id)
    }

    pub fn user_voice_channel(ctx: &serenity::Context, guild_id: GuildId, user_id: UserId) -> Option<ChannelId> {
        let guild = ctx.cache.guild(guild_id)?;
        guild.voice_states.get(&user_id)?.channel_id
    }

    /// The active call for `guild_id`.
    pub fn call(&self, guild_id: GuildId) -> PlayerResult<Arc<Mutex<Call>>> {
        self.songbird.get(guild_id).ok_or(PlayerError::NoQueue)
    }

    /// Joins `channel_id` unless a call already exists, registering the
    /// track event handlers on new calls.
    async fn connect(
        self: &Arc<Self>,
        http: Arc<serenity::Http>,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> PlayerResult<Arc<Mutex<Call>>> {
        if let Some(call) = self.songbird.get(guild_id) {
            return Ok(call);
        }

        info!("Joining voice channel {} in guild {}", channel_id, guild_id);
        let call = match self.songbird.join(guild_id, channel_id).await {
            Ok(call) => call,
            Err(e) => {
                error!("Failed to join voice channel {} in guild {}: {}", channel_id, guild_id, e);
                if let Err(e) = self.songbird.remove(guild_id).await {
                    debug!("Nothing to clean up after failed join: {}", e);
                }
                return Err(PlayerError::CantConnect(channel_id));
            }
        };

        {
            let mut handler = call.lock().await;
            if let Err(e) = handler.deafen(self.config.player.self_deaf).await {
                warn!("Failed to set self-deaf in guild {}: {}", guild_id, e);
            }

            handler.add_global_event(
                Event::Track(TrackEvent::Play),
                TrackStartNotifier {
                    player: Arc::clone(self),
                    http: http.clone(),
                    guild_id,
                },
            );
            handler.add_global_event(
                Event::Track(TrackEvent::End),
                TrackEndNotifier {
                    player: Arc::clone(self),
                    http: http.clone(),
                    guild_id,
                },
            );
            handler.add_global_event(
                Event::Track(TrackEvent::Error),
                TrackErrorNotifier {
                    player: Arc::clone(self),
                    http,
                    guild_id,
                },
            );
        }

        Ok(call)
    }

    fn build_track(&self, metadata: TrackMetadata) -> Track {
        let input = YoutubeDl::new(self.http_client.clone(), metadata.url.clone());
        Track::new_with_data(input.into(), Arc::new(metadata)).volume(self.config.player.volume())
    }

    /// Appends one track to the queue. The preload point comes from the
    /// resolved duration so songbird doesn't query the source again.
    fn enqueue_track(&self, handler: &mut Call, metadata: TrackMetadata) -> TrackHandle {
        let preload = preload_point(metadata.duration);
        handler.enqueue_with_preload(self.build_track(metadata), preload)
    }

    /// Appends `tracks` to the call's queue.
    async fn enqueue_all(&self, call: &Arc<Mutex<Call>>, tracks: &[TrackMetadata]) {
        let mut handler = call.lock().await;
        for metadata in tracks {
            debug!("Queueing {}", metadata.title);
            self.enqueue_track(&mut handler, metadata.clone());
        }
    }

    /// Marks queued tracks that are about to be stopped without playing.
    fn discard(&self, guild_id: GuildId, handles: &[TrackHandle]) {
        if handles.is_empty() {
            return;
        }
        self.guilds
            .entry(guild_id)
            .or_default()
            .discard(handles.iter().map(TrackHandle::uuid));
        for handle in handles {
            let _ = handle.stop();
        }
    }

    /// Resolves the query, joins the member's voice channel if needed and
    /// queues every resolved track.
    pub async fn play(self: &Arc<Self>, ctx: &serenity::Context, request: PlayRequest) -> PlayerResult<PlayOutcome> {
        let query = request.query.trim();
        if query.is_empty() {
            return Err(PlayerError::NoSearchQuery);
        }

        let voice_channel = Self::user_voice_channel(ctx, request.guild_id, request.user_id)
            .ok_or(PlayerError::NotInVoiceChannel)?;
        if let Some(bot_channel) = Self::bot_voice_channel(ctx, request.guild_id) {
            if bot_channel != voice_channel && self.songbird.get(request.guild_id).is_some() {
                return Err(PlayerError::InDifferentVoiceChannel);
            }
        }

        let SearchResult { playlist, tracks } = source::resolve(query, 1).await?;
        let tracks: Vec<TrackMetadata> = tracks
            .into_iter()
            .map(|track| track.with_requester(request.user_id))
            .collect();

        let call = self.connect(ctx.http.clone(), request.guild_id, voice_channel).await?;
        let queued_before = call.lock().await.queue().len();

        {
            let mut state = self.guilds.entry(request.guild_id).or_default();
            state.text_channel = Some(request.text_channel);
            state.stopping = false;
        }
        self.cancel_leave_timer(request.guild_id);

        self.enqueue_all(&call, &tracks).await;
        info!(
            "Queued {} track(s) in guild {} for {}",
            tracks.len(),
            request.guild_id,
            request.user_id
        );
        self.cache_queue(request.guild_id, None).await;

        Ok(PlayOutcome {
            tracks,
            playlist,
            position: queued_before,
        })
    }

    /// Search without queueing anything.
    pub async fn search(&self, query: &str) -> PlayerResult<SearchResult> {
        source::resolve(query, self.config.player.max_search_results).await
    }

    async fn current_track(&self, guild_id: GuildId) -> PlayerResult<TrackHandle> {
        let call = self.call(guild_id)?;
        let handler = call.lock().await;
        handler.queue().current().ok_or(PlayerError::NoQueue)
    }

    pub async fn toggle_pause(&self, guild_id: GuildId) -> PlayerResult<(PauseToggle, TrackMetadata)> {
        let current = self.current_track(guild_id).await?;
        let info = current.get_info().await?;

        let toggle = match info.playing {
            PlayMode::Pause => {
                current.play()?;
                PauseToggle::Resumed
            }
            _ => {
                current.pause()?;
                PauseToggle::Paused
            }
        };

        debug!("{:?} track in guild {}", toggle, guild_id);
        Ok((toggle, track_metadata(&current)))
    }

    /// Skips the playing track. With `to`, first drops the upcoming tracks in
    /// front of that 1-based position. Returns the skipped track.
    pub async fn skip(&self, guild_id: GuildId, to: Option<usize>) -> PlayerResult<TrackMetadata> {
        let call = self.call(guild_id)?;
        let handler = call.lock().await;
        let track_queue = handler.queue();
        let current = track_queue.current().ok_or(PlayerError::NoQueue)?;

        if let Some(position) = to {
            let dropped = track_queue
                .modify_queue(|q| queue::drain_before(q, position))
                .ok_or(PlayerError::TrackNotFound)?;
            let dropped: Vec<TrackHandle> = dropped.iter().map(|queued| queued.handle()).collect();
            self.discard(guild_id, &dropped);
        }

        track_queue.skip()?;
        Ok(track_metadata(&current))
    }

    /// Stops playback, clears the queue and forgets the cached queue.
    pub async fn stop(&self, guild_id: GuildId) -> PlayerResult<Option<TrackMetadata>> {
        let call = self.call(guild_id)?;
        if let Some(mut state) = self.guilds.get_mut(&guild_id) {
            state.stopping = true;
        }

        let current = {
            let handler = call.lock().await;
            let current = handler.queue().current().map(|handle| track_metadata(&handle));
            handler.queue().stop();
            current
        };

        self.forget_cached_queue(guild_id);
        if self.config.player.leave_on_stop {
            self.leave(guild_id).await;
        }
        Ok(current)
    }

    /// Removes every upcoming track. Returns how many were removed.
    pub async fn clear(&self, guild_id: GuildId) -> PlayerResult<usize> {
        let call = self.call(guild_id)?;
        let removed: Vec<TrackHandle> = {
            let handler = call.lock().await;
            handler
                .queue()
                .modify_queue(queue::drain_upcoming)
                .iter()
                .map(|queued| queued.handle())
                .collect()
        };

        self.discard(guild_id, &removed);
        self.cache_queue(guild_id, None).await;
        Ok(removed.len())
    }

    pub async fn shuffle(&self, guild_id: GuildId) -> PlayerResult<()> {
        let call = self.call(guild_id)?;
        {
            let handler = call.lock().await;
            if handler.queue().is_empty() {
                return Err(PlayerError::NoQueue);
            }
            handler
                .queue()
                .modify_queue(|q| queue::shuffle_upcoming(q, &mut rand::rng()));
        }

        self.cache_queue(guild_id, None).await;
        Ok(())
    }

    pub async fn set_loop_mode(&self, guild_id: GuildId, mode: LoopMode) -> PlayerResult<()> {
        let current = self.current_track(guild_id).await?;
        if mode == LoopMode::Track {
            current.enable_loop()?;
        } else if self.loop_mode(guild_id) == LoopMode::Track {
            current.disable_loop()?;
        }

        self.guilds.entry(guild_id).or_default().loop_mode = mode;
        info!("Loop mode set to {} in guild {}", mode.label(), guild_id);
        Ok(())
    }

    /// Moves the track at 1-based `track` to `after`. Returns the moved track.
    pub async fn move_track(&self, guild_id: GuildId, track: usize, after: usize) -> PlayerResult<TrackMetadata> {
        let call = self.call(guild_id)?;
        let moved = {
            let handler = call.lock().await;
            handler.queue().modify_queue(|q| {
                let index = queue::move_queued(q, track, after)?;
                q.get(index).map(|queued| queued.handle())
            })
        };

        let moved = moved.ok_or(PlayerError::TrackNotFound)?;
        self.cache_queue(guild_id, None).await;
        Ok(track_metadata(&moved))
    }

    pub async fn remove_track(&self, guild_id: GuildId, track: usize) -> PlayerResult<TrackMetadata> {
        let call = self.call(guild_id)?;
        let removed = {
            let handler = call.lock().await;
            handler
                .queue()
                .modify_queue(|q| queue::remove_queued(q, track))
                .ok_or(PlayerError::TrackNotFound)?
        };

        let handle = removed.handle();
        self.discard(guild_id, std::slice::from_ref(&handle));
        self.cache_queue(guild_id, None).await;
        Ok(track_metadata(&handle))
    }

    /// Replays the most recently finished track.
    pub async fn previous(&self, guild_id: GuildId) -> PlayerResult<TrackMetadata> {
        let call = self.call(guild_id)?;
        let previous = self
            .guilds
            .get_mut(&guild_id)
            .and_then(|mut state| state.pop_history())
            .ok_or(PlayerError::NoPreviousTrack)?;

        let mut handler = call.lock().await;
        let playing = handler.queue().current().is_some();
        self.enqueue_track(&mut handler, previous.clone());

        if playing {
            handler.queue().modify_queue(|q| {
                if let Some(item) = q.pop_back() {
                    queue::insert_next(q, item);
                }
            });
            if let Some(mut state) = self.guilds.get_mut(&guild_id) {
                state.skip_history = true;
            }
            handler.queue().skip()?;
        }

        Ok(previous)
    }

    pub async fn now_playing(&self, guild_id: GuildId) -> PlayerResult<NowPlaying> {
        let current = self.current_track(guild_id).await?;
        let info = current.get_info().await?;

        Ok(NowPlaying {
            track: track_metadata(&current),
            position: info.position,
            paused: info.playing == PlayMode::Pause,
        })
    }

    pub async fn queue(&self, guild_id: GuildId) -> PlayerResult<QueueSnapshot> {
        let call = self.call(guild_id)?;
        let handles = call.lock().await.queue().current_queue();
        let mut tracks = handles.iter().map(track_metadata);

        Ok(QueueSnapshot {
            current: tracks.next(),
            upcoming: tracks.collect(),
            loop_mode: self.loop_mode(guild_id),
        })
    }

    /// Leaves the voice channel and drops the guild's in-memory state.
    pub async fn leave(&self, guild_id: GuildId) {
        self.cancel_leave_timer(guild_id);
        if let Some(mut state) = self.guilds.get_mut(&guild_id) {
            state.stopping = true;
        }

        if let Some(call) = self.songbird.get(guild_id) {
            call.lock().await.queue().stop();
        }
        if let Err(e) = self.songbird.remove(guild_id).await {
            debug!("Leave in guild {} had no call to remove: {}", guild_id, e);
        }

        self.guilds.remove(&guild_id);
        self.forget_cached_queue(guild_id);
        info!("Left voice channel in guild {}", guild_id);
    }

    /// Writes the guild's current queue as its cached queue. `ended` is left
    /// out of the snapshot when it is still at the head of the queue.
    pub async fn cache_queue(&self, guild_id: GuildId, ended: Option<&TrackHandle>) {
        if !self.config.cached_queue.enabled {
            return;
        }
        let Some(call) = self.songbird.get(guild_id) else {
            return;
        };
        let Some(text_channel) = self.text_channel(guild_id) else {
            return;
        };

        let (voice_channel, handles) = {
            let handler = call.lock().await;
            (handler.current_channel(), handler.queue().current_queue())
        };
        let Some(voice_channel) = voice_channel else {
            return;
        };

        let tracks = snapshot_tracks(
            handles.iter().map(|handle| (handle.uuid(), track_metadata(handle))),
            ended.map(TrackHandle::uuid),
        );

        if tracks.is_empty() {
            self.forget_cached_queue(guild_id);
            return;
        }

        let expire_after = chrono::Duration::from_std(self.config.cached_queue.expire_after)
            .unwrap_or_else(|_| chrono::Duration::hours(1));
        let cached = CachedQueue::new(
            guild_id,
            text_channel,
            ChannelId::new(voice_channel.0.get()),
            tracks,
            Utc::now() + expire_after,
        );

        match cached.update(&self.db) {
            Ok(()) => debug!("Cached {} track(s) for guild {}", cached.tracks.len(), guild_id),
            Err(e) => warn!("Failed to cache queue for guild {}: {}", guild_id, e),
        }
    }

    pub fn forget_cached_queue(&self, guild_id: GuildId) {
        if let Err(e) = self.db.delete_cached_queue(guild_id) {
            warn!("Failed to delete cached queue for guild {}: {}", guild_id, e);
        }
    }

    /// Resumes every stored queue that hasn't expired.
    pub async fn restore_cached_queues(self: &Arc<Self>, ctx: &serenity::Context) {
        if !self.config.cached_queue.enabled {
            return;
        }

        let cached_queues = match self.db.all_cached_queues() {
            Ok(queues) => queues,
            Err(e) => {
                error!("Failed to load cached queues: {}", e);
                return;
            }
        };

        info!("Restoring {} cached queue(s)", cached_queues.len());
        let restores = cached_queues.into_iter().map(|mut cached| async move {
            let guild_id = cached.guild_id;
            let text_channel_exists = match cached.text_channel_id.to_channel(ctx).await {
                Ok(_) => true,
                Err(e) => {
                    debug!("Text channel {} is gone: {}", cached.text_channel_id, e);
                    false
                }
            };

            match cached.restore_action(Utc::now(), text_channel_exists) {
                RestoreAction::Restore => {
                    let Err(e) = self.restore_cached_queue(ctx, &cached).await else {
                        return;
                    };
                    warn!("Couldn't restore cached queue for guild {}: {}", guild_id, e);
                }
                RestoreAction::Discard(reason) => {
                    info!("Discarding cached queue for guild {}: {:?}", guild_id, reason);
                }
            }

            if let Err(e) = cached.delete(&self.db) {
                warn!("Failed to delete cached queue for guild {}: {}", guild_id, e);
            }
        });
        futures::future::join_all(restores).await;
    }

    async fn restore_cached_queue(self: &Arc<Self>, ctx: &serenity::Context, cached: &CachedQueue) -> PlayerResult<()> {
        let call = self.connect(ctx.http.clone(), cached.guild_id, cached.voice_channel_id).await?;
        self.guilds.entry(cached.guild_id).or_default().text_channel = Some(cached.text_channel_id);
        self.enqueue_all(&call, &cached.tracks).await;

        info!("Restored {} track(s) in guild {}", cached.tracks.len(), cached.guild_id);
        let embed = self.message_embed("restoredQueue", true, &[cached.tracks.len().to_string()]);
        if let Err(e) = cached
            .text_channel_id
            .send_message(&ctx.http, CreateMessage::new().embed(embed))
            .await
        {
            warn!("Failed to announce restored queue in guild {}: {}", cached.guild_id, e);
        }

        self.cache_queue(cached.guild_id, None).await;
        Ok(())
    }

    /// Posts `embed` to the guild's remembered text channel, if any.
    pub async fn announce(&self, http: &serenity::Http, guild_id: GuildId, embed: CreateEmbed) {
        let Some(channel) = self.text_channel(guild_id) else {
            return;
        };
        if let Err(e) = channel.send_message(http, CreateMessage::new().embed(embed)).await {
            warn!("Failed to send message to {} in guild {}: {}", channel, guild_id, e);
        }
    }

    /// Reports a track that failed to play and moves on when it is still current.
    pub async fn connection_error(&self, http: &serenity::Http, guild_id: GuildId, failed: &TrackHandle) {
        let metadata = track_metadata(failed);
        error!("Error playing {} in guild {}", metadata.title, guild_id);

        if let Some(call) = self.songbird.get(guild_id) {
            let handler = call.lock().await;
            let still_current = handler
                .queue()
                .current()
                .is_some_and(|current| current.uuid() == failed.uuid());
            if still_current && handler.queue().len() > 1 {
                if let Err(e) = handler.queue().skip() {
                    warn!("Failed to skip errored track in guild {}: {}", guild_id, e);
                }
            }
        }

        let embed = self.message_embed("errorPlaying", false, &[metadata.title.as_str()]);
        self.announce(http, guild_id, embed).await;
        let embed = self.message_embed::<&str>("botInternalError", false, &[]);
        self.announce(http, guild_id, embed).await;
    }

    fn cancel_leave_timer(&self, guild_id: GuildId) {
        if let Some((_, timer)) = self.leave_timers.remove(&guild_id) {
            debug!("Cancelled leave timer for guild {}", guild_id);
            timer.abort();
        }
    }
}
