//! SQLite storage for guild settings, DJ settings and cached queues.
//! Handles schema creation and row-level CRUD; the record lifecycle lives in
//! [`crate::models`].

use chrono::{DateTime, Utc};
use poise::serenity_prelude::{ChannelId, GuildId, Permissions, RoleId, UserId};
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;
use tracing::debug;

use crate::models::{CachedQueue, GuildDjSettings, GuildSettings};
use crate::player::track::TrackMetadata;

/// Errors that can occur while reading or writing the database
#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Failed to (de)serialize column: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to create database directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database connection lock was poisoned")]
    Poisoned,
}

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS guild_settings (
        guild_id INTEGER PRIMARY KEY,
        pro BOOLEAN NOT NULL DEFAULT 0,
        pro_expire_at INTEGER,
        commands_channel_id INTEGER
    );
    CREATE TABLE IF NOT EXISTS guild_dj_settings (
        guild_id INTEGER PRIMARY KEY,
        enabled BOOLEAN NOT NULL DEFAULT 0,
        required_permissions INTEGER NOT NULL DEFAULT 0,
        allowed_roles TEXT NOT NULL DEFAULT '[]',
        allowed_users TEXT NOT NULL DEFAULT '[]'
    );
    CREATE TABLE IF NOT EXISTS guild_cached_queues (
        guild_id INTEGER PRIMARY KEY,
        text_channel_id INTEGER NOT NULL,
        voice_channel_id INTEGER NOT NULL,
        tracks TEXT NOT NULL DEFAULT '[]',
        expire_at INTEGER NOT NULL
    );
";

/// A single SQLite connection shared by every guild.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Opens (or creates) the database file and ensures the tables exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DbError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        debug!("Opening database at {}", path.display());
        Self::with_connection(Connection::open(path)?)
    }

    /// In-memory database, used by tests.
    pub fn open_in_memory() -> Result<Self, DbError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, DbError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, DbError> {
        self.conn.lock().map_err(|_| DbError::Poisoned)
    }

    pub fn find_guild_settings(&self, guild_id: GuildId) -> Result<Option<GuildSettings>, DbError> {
        let conn = self.conn()?;
        let settings = conn
            .query_row(
                "SELECT pro, pro_expire_at, commands_channel_id
                 FROM guild_settings WHERE guild_id = ?1",
                params![guild_id.get()],
                |row| {
                    let mut settings = GuildSettings::new(guild_id);
                    settings.pro = row.get(0)?;
                    settings.pro_expire_at = row.get::<_, Option<i64>>(1)?.and_then(from_timestamp);
                    settings.commands_channel_id = row.get::<_, Option<u64>>(2)?.map(ChannelId::new);
                    Ok(settings)
                },
            )
            .optional()?;
        Ok(settings)
    }

    pub fn upsert_guild_settings(&self, settings: &GuildSettings) -> Result<(), DbError> {
        self.conn()?.execute(
            "INSERT OR REPLACE INTO guild_settings (guild_id, pro, pro_expire_at, commands_channel_id)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                settings.guild_id.get(),
                settings.pro,
                settings.pro_expire_at.map(|at| at.timestamp()),
                settings.commands_channel_id.map(|id| id.get()),
            ],
        )?;
        Ok(())
    }

    /// Returns whether a row was deleted.
    pub fn delete_guild_settings(&self, guild_id: GuildId) -> Result<bool, DbError> {
        let deleted = self.conn()?.execute(
            "DELETE FROM guild_settings WHERE guild_id = ?1",
            params![guild_id.get()],
        )?;
        Ok(deleted > 0)
    }

    pub fn find_dj_settings(&self, guild_id: GuildId) -> Result<Option<GuildDjSettings>, DbError> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT enabled, required_permissions, allowed_roles, allowed_users
                 FROM guild_dj_settings WHERE guild_id = ?1",
                params![guild_id.get()],
                |row| {
                    Ok((
                        row.get::<_, bool>(0)?,
                        row.get::<_, u64>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()?;

        let Some((enabled, permissions, roles, users)) = row else {
            return Ok(None);
        };

        let mut settings = GuildDjSettings::new(guild_id);
        settings.enabled = enabled;
        settings.required_permissions = Permissions::from_bits_truncate(permissions);
        settings.allowed_roles = serde_json::from_str::<Vec<u64>>(&roles)?
            .into_iter()
            .map(RoleId::new)
            .collect();
        settings.allowed_users = serde_json::from_str::<Vec<u64>>(&users)?
            .into_iter()
            .map(UserId::new)
            .collect();
        Ok(Some(settings))
    }

    pub fn upsert_dj_settings(&self, settings: &GuildDjSettings) -> Result<(), DbError> {
        let roles: Vec<u64> = settings.allowed_roles.iter().map(|id| id.get()).collect();
        let users: Vec<u64> = settings.allowed_users.iter().map(|id| id.get()).collect();

        self.conn()?.execute(
            "INSERT OR REPLACE INTO guild_dj_settings
             (guild_id, enabled, required_permissions, allowed_roles, allowed_users)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                settings.guild_id.get(),
                settings.enabled,
                settings.required_permissions.bits(),
                serde_json::to_string(&roles)?,
                serde_json::to_string(&users)?,
            ],
        )?;
        Ok(())
    }

    pub fn delete_dj_settings(&self, guild_id: GuildId) -> Result<bool, DbError> {
        let deleted = self.conn()?.execute(
            "DELETE FROM guild_dj_settings WHERE guild_id = ?1",
            params![guild_id.get()],
        )?;
        Ok(deleted > 0)
    }

    pub fn find_cached_queue(&self, guild_id: GuildId) -> Result<Option<CachedQueue>, DbError> {
        let conn = self.conn()?;
        let raw = conn
            .query_row(
                "SELECT guild_id, text_channel_id, voice_channel_id, tracks, expire_at
                 FROM guild_cached_queues WHERE guild_id = ?1",
                params![guild_id.get()],
                RawCachedQueue::from_row,
            )
            .optional()?;
        raw.map(RawCachedQueue::into_model).transpose()
    }

    /// Every stored snapshot, expired ones included.
    pub fn all_cached_queues(&self) -> Result<Vec<CachedQueue>, DbError> {
        let conn = self.conn()?;
        let mut statement = conn.prepare(
            "SELECT guild_id, text_channel_id, voice_channel_id, tracks, expire_at
             FROM guild_cached_queues",
        )?;
        let rows = statement.query_map([], RawCachedQueue::from_row)?;

        let mut queues = Vec::new();
        for raw in rows {
            queues.push(raw?.into_model()?);
        }
        Ok(queues)
    }

    pub fn upsert_cached_queue(&self, queue: &CachedQueue) -> Result<(), DbError> {
        self.conn()?.execute(
            "INSERT OR REPLACE INTO guild_cached_queues
             (guild_id, text_channel_id, voice_channel_id, tracks, expire_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                queue.guild_id.get(),
                queue.text_channel_id.get(),
                queue.voice_channel_id.get(),
                serde_json::to_string(&queue.tracks)?,
                queue.expire_at.timestamp(),
            ],
        )?;
        Ok(())
    }

    pub fn delete_cached_queue(&self, guild_id: GuildId) -> Result<bool, DbError> {
        let deleted = self.conn()?.execute(
            "DELETE FROM guild_cached_queues WHERE guild_id = ?1",
            params![guild_id.get()],
        )?;
        Ok(deleted > 0)
    }
}

fn from_timestamp(secs: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
}

/// Cached queue columns before the JSON track list is decoded.
struct RawCachedQueue {
    guild_id: u64,
    text_channel_id: u64,
    voice_channel_id: u64,
    tracks: String,
    expire_at: i64,
}

impl RawCachedQueue {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            guild_id: row.get(0)?,
            text_channel_id: row.get(1)?,
            voice_channel_id: row.get(2)?,
            tracks: row.get(3)?,
            expire_at: row.get(4)?,
        })
    }

    fn into_model(self) -> Result<CachedQueue, DbError> {
        let tracks: Vec<TrackMetadata> = serde_json::from_str(&self.tracks)?;
        Ok(CachedQueue::new(
            GuildId::new(self.guild_id),
            ChannelId::new(self.text_channel_id),
            ChannelId::new(self.voice_channel_id),
            tracks,
            from_timestamp(self.expire_at).unwrap_or(DateTime::UNIX_EPOCH),
        ))
    }
}
