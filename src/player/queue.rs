//! Per-guild player state and queue index operations.
//!
//! Queue positions shown to users are 1-based over the upcoming tracks,
//! while the songbird queue keeps the playing track at index 0. Position `n`
//! therefore maps straight to queue index `n`, with 0 clamped to 1.

use poise::serenity_prelude::ChannelId;
use rand::Rng;
use rand::seq::SliceRandom;
use std::collections::{HashSet, VecDeque};
use uuid::Uuid;

use super::track::TrackMetadata;

/// What happens when the playing track ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, poise::ChoiceParameter)]
pub enum LoopMode {
    #[name = "Turn off loop"]
    #[name = "off"]
    Off,
    #[name = "Loop currently playing track"]
    #[name = "track"]
    Track,
    #[name = "Loop current queue"]
    #[name = "queue"]
    Queue,
    #[name = "Autoplay similar tracks"]
    #[name = "autoplay"]
    Autoplay,
}

impl Default for LoopMode {
    fn default() -> Self {
        Self::Off
    }
}

impl LoopMode {
    /// Upper-case label used in replies.
    pub fn label(self) -> &'static str {
        match self {
            Self::Off => "OFF",
            Self::Track => "TRACK",
            Self::Queue => "QUEUE",
            Self::Autoplay => "AUTOPLAY",
        }
    }
}

/// In-memory state kept for every guild with an active call.
#[derive(Debug, Default)]
pub struct GuildState {
    /// Channel replies and announcements go to.
    pub text_channel: Option<ChannelId>,
    pub loop_mode: LoopMode,
    /// Played tracks, most recent first.
    pub history: VecDeque<TrackMetadata>,
    /// Set by `previous` so the track being replaced isn't pushed back onto history.
    pub skip_history: bool,
    /// Set while the queue is being torn down so end events don't autoplay.
    pub stopping: bool,
    /// Queued tracks stopped by `clear`, `remove` or `skip-to`. Their end
    /// events are not real track ends.
    pub discarded: HashSet<Uuid>,
}

/// How a track ended, as reported by its end event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackExit {
    /// The track produced audio before ending.
    Played,
    /// Errored or stopped before a single frame was played.
    Unplayed,
}

/// Follow-up for a track end, see [`GuildState::track_ended`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndPlan {
    pub loop_mode: LoopMode,
    /// Queue loop puts the ended track back at the end of the queue.
    pub requeue: bool,
}

/// What the player does once the ended track is accounted for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AfterEnd {
    /// Other tracks remain; only the cached queue is refreshed.
    Continue,
    /// Nothing remains but autoplay may find a related track.
    Autoplay,
    /// The queue is over.
    QueueEnded { leave: bool },
}

impl GuildState {
    pub fn push_history(&mut self, track: TrackMetadata, limit: usize) {
        if limit == 0 {
            return;
        }
        self.history.push_front(track);
        self.history.truncate(limit);
    }

    pub fn pop_history(&mut self) -> Option<TrackMetadata> {
        self.history.pop_front()
    }

    pub fn discard(&mut self, ids: impl IntoIterator<Item = Uuid>) {
        self.discarded.extend(ids);
    }

    /// Accounts for the end of track `id`. Returns `None` when the event
    /// needs no follow-up: the queue is being torn down or the track was
    /// dropped from the queue without playing.
    pub fn track_ended(
        &mut self,
        id: Uuid,
        track: &TrackMetadata,
        exit: TrackExit,
        history_size: usize,
    ) -> Option<EndPlan> {
        let discarded = self.discarded.remove(&id);
        if self.stopping || discarded {
            return None;
        }

        let played = exit == TrackExit::Played;
        if played && !std::mem::take(&mut self.skip_history) {
            self.push_history(track.clone(), history_size);
        }

        Some(EndPlan {
            loop_mode: self.loop_mode,
            requeue: played && self.loop_mode == LoopMode::Queue,
        })
    }
}

/// Decides what follows a track end given how many tracks are still queued.
pub fn after_end(loop_mode: LoopMode, remaining: usize, leave_on_end: bool) -> AfterEnd {
    if remaining > 0 {
        AfterEnd::Continue
    } else if loop_mode == LoopMode::Autoplay {
        AfterEnd::Autoplay
    } else {
        AfterEnd::QueueEnded { leave: leave_on_end }
    }
}

fn queue_index(position: usize) -> usize {
    position.max(1)
}

/// Moves the track at `track` to `after`. Returns the new queue index, or
/// `None` when either position is out of range.
pub fn move_queued<T>(queue: &mut VecDeque<T>, track: usize, after: usize) -> Option<usize> {
    let from = queue_index(track);
    let to = queue_index(after);
    if from >= queue.len() || to >= queue.len() {
        return None;
    }

    let item = queue.remove(from)?;
    queue.insert(to, item);
    Some(to)
}

pub fn remove_queued<T>(queue: &mut VecDeque<T>, track: usize) -> Option<T> {
    queue.remove(queue_index(track))
}

/// Drops the upcoming tracks in front of `position`, so that a following
/// skip lands on it. Returns the dropped tracks.
pub fn drain_before<T>(queue: &mut VecDeque<T>, position: usize) -> Option<Vec<T>> {
    let target = queue_index(position);
    if target >= queue.len() {
        return None;
    }
    Some(queue.drain(1..target).collect())
}

/// Removes every upcoming track, keeping the playing one.
pub fn drain_upcoming<T>(queue: &mut VecDeque<T>) -> Vec<T> {
    if queue.len() <= 1 {
        return Vec::new();
    }
    queue.drain(1..).collect()
}

pub fn shuffle_upcoming<T, R: Rng + ?Sized>(queue: &mut VecDeque<T>, rng: &mut R) {
    if queue.len() > 2 {
        queue.make_contiguous()[1..].shuffle(rng);
    }
}

/// Puts `item` right after the playing track.
pub fn insert_next<T>(queue: &mut VecDeque<T>, item: T) {
    if queue.is_empty() {
        queue.push_back(item);
    } else {
        queue.insert(1, item);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rstest::rstest;

    fn queue() -> VecDeque<&'static str> {
        VecDeque::from(["now", "a", "b", "c", "d"])
    }

    #[test]
    fn test_move_queued() {
        let mut q = queue();
        assert_eq!(move_queued(&mut q, 4, 1), Some(1));
        assert_eq!(q, ["now", "d", "a", "b", "c"]);

        let mut q = queue();
        assert_eq!(move_queued(&mut q, 1, 3), Some(3));
        assert_eq!(q, ["now", "b", "c", "a", "d"]);
    }

    #[test]
    fn test_move_queued_clamps_zero_and_rejects_out_of_range() {
        let mut q = queue();
        assert_eq!(move_queued(&mut q, 0, 2), Some(2));
        assert_eq!(q, ["now", "b", "a", "c", "d"]);

        let mut q = queue();
        assert_eq!(move_queued(&mut q, 5, 1), None);
        assert_eq!(move_queued(&mut q, 1, 5), None);
        assert_eq!(q, queue());
    }

    #[test]
    fn test_remove_queued() {
        let mut q = queue();
        assert_eq!(remove_queued(&mut q, 2), Some("b"));
        assert_eq!(remove_queued(&mut q, 0), Some("a"));
        assert_eq!(remove_queued(&mut q, 9), None);
        assert_eq!(q, ["now", "c", "d"]);
    }

    #[test]
    fn test_drain_before() {
        let mut q = queue();
        assert_eq!(drain_before(&mut q, 3), Some(vec!["a", "b"]));
        assert_eq!(q, ["now", "c", "d"]);

        assert_eq!(drain_before(&mut q, 1), Some(vec![]));
        assert_eq!(drain_before(&mut q, 3), None);
    }

    #[test]
    fn test_drain_upcoming() {
        let mut q = queue();
        assert_eq!(drain_upcoming(&mut q), vec!["a", "b", "c", "d"]);
        assert_eq!(q, ["now"]);
        assert!(drain_upcoming(&mut q).is_empty());
    }

    #[test]
    fn test_shuffle_keeps_current_track() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut q: VecDeque<u32> = (0..50).collect();
        shuffle_upcoming(&mut q, &mut rng);

        assert_eq!(q[0], 0);
        let mut sorted: Vec<u32> = q.iter().copied().collect();
        sorted.sort();
        assert_eq!(sorted, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_insert_next() {
        let mut q = VecDeque::new();
        insert_next(&mut q, "first");
        insert_next(&mut q, "second");
        insert_next(&mut q, "third");
        assert_eq!(q, ["first", "third", "second"]);
    }

    #[test]
    fn test_history_is_bounded_and_most_recent_first() {
        let mut state = GuildState::default();
        for title in ["one", "two", "three"] {
            state.push_history(
                TrackMetadata {
                    title: title.to_string(),
                    ..Default::default()
                },
                2,
            );
        }

        assert_eq!(state.history.len(), 2);
        assert_eq!(state.pop_history().map(|t| t.title), Some("three".to_string()));
        assert_eq!(state.pop_history().map(|t| t.title), Some("two".to_string()));
        assert!(state.pop_history().is_none());
    }

    #[test]
    fn test_loop_mode_label() {
        assert_eq!(LoopMode::Autoplay.label(), "AUTOPLAY");
        assert_eq!(LoopMode::default(), LoopMode::Off);
    }

    fn titled(title: &str) -> TrackMetadata {
        TrackMetadata {
            title: title.to_string(),
            ..Default::default()
        }
    }

    fn history_titles(state: &GuildState) -> Vec<String> {
        state.history.iter().map(|t| t.title.clone()).collect()
    }

    #[test]
    fn test_discarded_tracks_are_not_history_or_requeued() {
        let mut state = GuildState {
            loop_mode: LoopMode::Queue,
            ..Default::default()
        };
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        state.discard([a, b]);

        // Clearing the queue stops both tracks, each firing an end event.
        assert_eq!(state.track_ended(a, &titled("a"), TrackExit::Unplayed, 10), None);
        assert_eq!(state.track_ended(b, &titled("b"), TrackExit::Unplayed, 10), None);
        assert!(state.history.is_empty());
        assert!(state.discarded.is_empty());
    }

    #[test]
    fn test_discarded_track_is_ignored_even_when_it_played() {
        let mut state = GuildState::default();
        let id = Uuid::new_v4();
        state.discard([id]);

        assert_eq!(state.track_ended(id, &titled("a"), TrackExit::Played, 10), None);
        assert!(state.history.is_empty());
    }

    #[rstest]
    #[case::off(LoopMode::Off, false)]
    #[case::track(LoopMode::Track, false)]
    #[case::queue(LoopMode::Queue, true)]
    #[case::autoplay(LoopMode::Autoplay, false)]
    fn test_played_track_goes_to_history(#[case] loop_mode: LoopMode, #[case] requeue: bool) {
        let mut state = GuildState {
            loop_mode,
            ..Default::default()
        };

        let plan = state.track_ended(Uuid::new_v4(), &titled("song"), TrackExit::Played, 10);

        assert_eq!(plan, Some(EndPlan { loop_mode, requeue }));
        assert_eq!(history_titles(&state), vec!["song"]);
    }

    #[test]
    fn test_unplayed_track_skips_history_and_requeue() {
        let mut state = GuildState {
            loop_mode: LoopMode::Queue,
            ..Default::default()
        };

        let plan = state.track_ended(Uuid::new_v4(), &titled("broken"), TrackExit::Unplayed, 10);

        assert_eq!(
            plan,
            Some(EndPlan {
                loop_mode: LoopMode::Queue,
                requeue: false
            })
        );
        assert!(state.history.is_empty());
    }

    #[test]
    fn test_previous_keeps_replaced_track_out_of_history_once() {
        let mut state = GuildState {
            skip_history: true,
            ..Default::default()
        };

        state.track_ended(Uuid::new_v4(), &titled("replaced"), TrackExit::Played, 10);
        assert!(state.history.is_empty());
        assert!(!state.skip_history);

        state.track_ended(Uuid::new_v4(), &titled("next"), TrackExit::Played, 10);
        assert_eq!(history_titles(&state), vec!["next"]);
    }

    #[test]
    fn test_stopping_ignores_every_end() {
        let mut state = GuildState {
            stopping: true,
            loop_mode: LoopMode::Queue,
            ..Default::default()
        };

        assert_eq!(state.track_ended(Uuid::new_v4(), &titled("a"), TrackExit::Played, 10), None);
        assert!(state.history.is_empty());
    }

    #[rstest]
    #[case::tracks_left(LoopMode::Off, 2, true, AfterEnd::Continue)]
    #[case::autoplay_with_tracks_left(LoopMode::Autoplay, 1, true, AfterEnd::Continue)]
    #[case::autoplay(LoopMode::Autoplay, 0, true, AfterEnd::Autoplay)]
    #[case::ended_and_leave(LoopMode::Off, 0, true, AfterEnd::QueueEnded { leave: true })]
    #[case::ended_and_stay(LoopMode::Track, 0, false, AfterEnd::QueueEnded { leave: false })]
    fn test_after_end(
        #[case] loop_mode: LoopMode,
        #[case] remaining: usize,
        #[case] leave_on_end: bool,
        #[case] expected: AfterEnd,
    ) {
        assert_eq!(after_end(loop_mode, remaining, leave_on_end), expected);
    }
}
