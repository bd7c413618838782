use chrono::{DateTime, Utc};
use poise::serenity_prelude::{ChannelId, GuildId};
use tracing::debug;

use super::{CachedQueue, GuildDjSettings, Record};
use crate::utils::database::{Database, DbError};

/// Per-guild settings, owning the guild's DJ settings and cached queue.
#[derive(Debug, Clone, PartialEq)]
pub struct GuildSettings {
    pub guild_id: GuildId,
    pub pro: bool,
    pub pro_expire_at: Option<DateTime<Utc>>,
    /// Music commands are only accepted in this channel when set.
    pub commands_channel_id: Option<ChannelId>,
    pub dj_settings: Option<GuildDjSettings>,
    pub cached_queue: Option<CachedQueue>,
    deleted: bool,
}

impl GuildSettings {
    pub fn new(guild_id: GuildId) -> Self {
        Self {
            guild_id,
            pro: false,
            pro_expire_at: None,
            commands_channel_id: None,
            dj_settings: None,
            cached_queue: None,
            deleted: false,
        }
    }

    /// Loads the guild's settings with their nested records, creating the
    /// settings row and a default DJ settings row when missing.
    pub fn fetch_or_create(db: &Database, guild_id: GuildId) -> Result<Self, DbError> {
        let mut settings = match db.find_guild_settings(guild_id)? {
            Some(settings) => settings,
            None => {
                debug!("Creating settings for guild {}", guild_id);
                let settings = Self::new(guild_id);
                db.upsert_guild_settings(&settings)?;
                settings
            }
        };

        settings.dj_settings = Some(GuildDjSettings::create_if_not_exists(db, guild_id)?);
        settings.cached_queue = db.find_cached_queue(guild_id)?;
        Ok(settings)
    }

    /// Pro status, honouring the expiry date when one is set.
    pub fn is_pro(&self, now: DateTime<Utc>) -> bool {
        self.pro && self.pro_expire_at.is_none_or(|expire_at| expire_at > now)
    }
}

impl Record for GuildSettings {
    fn fetch(&mut self, db: &Database) -> Result<(), DbError> {
        let Some(fresh) = db.find_guild_settings(self.guild_id)? else {
            return self.delete(db);
        };

        self.pro = fresh.pro;
        self.pro_expire_at = fresh.pro_expire_at;
        self.commands_channel_id = fresh.commands_channel_id;

        self.dj_settings = match self.dj_settings.take() {
            Some(mut dj) => {
                dj.fetch(db)?;
                (!dj.is_deleted()).then_some(dj)
            }
            None => db.find_dj_settings(self.guild_id)?,
        };

        self.cached_queue = match self.cached_queue.take() {
            Some(mut queue) => {
                queue.fetch(db)?;
                (!queue.is_deleted()).then_some(queue)
            }
            None => db.find_cached_queue(self.guild_id)?,
        };

        Ok(())
    }

    fn update(&self, db: &Database) -> Result<(), DbError> {
        db.upsert_guild_settings(self)?;
        if let Some(dj) = &self.dj_settings {
            dj.update(db)?;
        }
        if let Some(queue) = &self.cached_queue {
            queue.update(db)?;
        }
        Ok(())
    }

    /// Deletes the nested records first, then the settings row.
    fn delete(&mut self, db: &Database) -> Result<(), DbError> {
        if let Some(dj) = self.dj_settings.as_mut().filter(|dj| !dj.is_deleted()) {
            dj.delete(db)?;
        }
        if let Some(queue) = self.cached_queue.as_mut().filter(|q| !q.is_deleted()) {
            queue.delete(db)?;
        }
        db.delete_guild_settings(self.guild_id)?;
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
    use pretty_assertions::assert_eq;

    const GUILD: GuildId = GuildId::new(4242);

    #[test]
    fn test_fetch_or_create_creates_rows() {
        let db = Database::open_in_memory().unwrap();
        let settings = GuildSettings::fetch_or_create(&db, GUILD).unwrap();

        assert!(!settings.pro);
        assert!(settings.dj_settings.is_some());
        assert!(settings.cached_queue.is_none());
        assert!(db.find_guild_settings(GUILD).unwrap().is_some());
        assert!(db.find_dj_settings(GUILD).unwrap().is_some());
    }

    #[test]
    fn test_update_then_fetch() {
        let db = Database::open_in_memory().unwrap();
        let mut settings = GuildSettings::fetch_or_create(&db, GUILD).unwrap();
        settings.commands_channel_id = Some(ChannelId::new(77));
        if let Some(dj) = settings.dj_settings.as_mut() {
            dj.enabled = true;
        }
        settings.update(&db).unwrap();

        let mut reloaded = GuildSettings::new(GUILD);
        reloaded.fetch(&db).unwrap();
        assert_eq!(reloaded.commands_channel_id, Some(ChannelId::new(77)));
        assert_eq!(reloaded.dj_settings.as_ref().map(|dj| dj.enabled), Some(true));
        assert!(!reloaded.is_deleted());
    }

    #[test]
    fn test_fetch_missing_row_deletes_everything() {
        let db = Database::open_in_memory().unwrap();
        let mut settings = GuildSettings::fetch_or_create(&db, GUILD).unwrap();
        db.delete_guild_settings(GUILD).unwrap();

        settings.fetch(&db).unwrap();
        assert!(settings.is_deleted());
        assert!(db.find_dj_settings(GUILD).unwrap().is_none());
    }

    #[test]
    fn test_is_pro_respects_expiry() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        let mut settings = GuildSettings::new(GUILD);
        assert!(!settings.is_pro(now));

        settings.pro = true;
        assert!(settings.is_pro(now));

        settings.pro_expire_at = Some(now - Duration::days(1));
        assert!(!settings.is_pro(now));

        settings.pro_expire_at = Some(now + Duration::days(1));
        assert!(settings.is_pro(now));
    }
}
