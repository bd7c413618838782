use chrono::{DateTime, Utc};
use poise::serenity_prelude::{ChannelId, GuildId};

use super::Record;
use crate::player::track::TrackMetadata;
use crate::utils::database::{Database, DbError};

/// Whether a stored snapshot is resumed on startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreAction {
    Restore,
    /// The snapshot is deleted instead.
    Discard(DiscardReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    Expired,
    Empty,
    TextChannelGone,
}

/// Snapshot of a guild's queue used to resume playback after a restart.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedQueue {
    pub guild_id: GuildId,
    pub text_channel_id: ChannelId,
    pub voice_channel_id: ChannelId,
    /// The playing track first, then the upcoming ones.
    pub tracks: Vec<TrackMetadata>,
    pub expire_at: DateTime<Utc>,
    deleted: bool,
}

impl CachedQueue {
    pub fn new(
        guild_id: GuildId,
        text_channel_id: ChannelId,
        voice_channel_id: ChannelId,
        tracks: Vec<TrackMetadata>,
        expire_at: DateTime<Utc>,
    ) -> Self {
        Self {
            guild_id,
            text_channel_id,
            voice_channel_id,
            tracks,
            expire_at,
            deleted: false,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expire_at <= now
    }

    pub fn restore_action(&self, now: DateTime<Utc>, text_channel_exists: bool) -> RestoreAction {
        if self.is_expired(now) {
            RestoreAction::Discard(DiscardReason::Expired)
        } else if self.tracks.is_empty() {
            RestoreAction::Discard(DiscardReason::Empty)
        } else if !text_channel_exists {
            RestoreAction::Discard(DiscardReason::TextChannelGone)
        } else {
            RestoreAction::Restore
        }
    }
}

impl Record for CachedQueue {
    fn fetch(&mut self, db: &Database) -> Result<(), DbError> {
        match db.find_cached_queue(self.guild_id)? {
            Some(fresh) => *self = fresh,
            None => self.deleted = true,
        }
        Ok(())
    }

    fn update(&self, db: &Database) -> Result<(), DbError> {
        db.upsert_cached_queue(self)
    }

    fn delete(&mut self, db: &Database) -> Result<(), DbError> {
        db.delete_cached_queue(self.guild_id)?;
        self.deleted = true;
        Ok(())
    }

    fn is_deleted(&self) -> bool {
        self.deleted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rstest::rstest;

    fn queue(expire_at: DateTime<Utc>) -> CachedQueue {
        CachedQueue::new(
            GuildId::new(1),
            ChannelId::new(2),
            ChannelId::new(3),
            vec![TrackMetadata {
                title: "Song".to_string(),
                url: "https://example.com/song".to_string(),
                ..Default::default()
            }],
            expire_at,
        )
    }

    #[test]
    fn test_is_expired() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();
        assert!(queue(now).is_expired(now));
        assert!(queue(now - Duration::minutes(1)).is_expired(now));
        assert!(!queue(now + Duration::minutes(1)).is_expired(now));
    }

    #[test]
    fn test_delete_then_fetch() {
        let db = Database::open_in_memory().unwrap();
        let mut cached = queue(Utc::now() + Duration::hours(1));
        cached.update(&db).unwrap();

        let mut copy = cached.clone();
        cached.delete(&db).unwrap();
        assert!(cached.is_deleted());

        copy.fetch(&db).unwrap();
        assert!(copy.is_deleted());
    }

    #[rstest]
    #[case::fresh(Duration::minutes(5), true, RestoreAction::Restore)]
    #[case::expired(Duration::zero(), true, RestoreAction::Discard(DiscardReason::Expired))]
    #[case::expired_without_channel(
        -Duration::hours(2),
        false,
        RestoreAction::Discard(DiscardReason::Expired)
    )]
    #[case::channel_gone(
        Duration::minutes(5),
        false,
        RestoreAction::Discard(DiscardReason::TextChannelGone)
    )]
    fn test_restore_action(
        #[case] expires_in: Duration,
        #[case] text_channel_exists: bool,
        #[case] expected: RestoreAction,
    ) {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();
        assert_eq!(queue(now + expires_in).restore_action(now, text_channel_exists), expected);
    }

    #[test]
    fn test_empty_snapshot_is_discarded() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();
        let mut cached = queue(now + Duration::hours(1));
        cached.tracks.clear();
        assert_eq!(
            cached.restore_action(now, true),
            RestoreAction::Discard(DiscardReason::Empty)
        );
    }
}
