//! Persisted per-guild records.
//!
//! Each record follows the same lifecycle: `fetch` reloads it from the
//! database (marking it deleted when the row is gone), `update` writes it
//! back, and `delete` removes the row.

mod cached_queue;
mod dj_settings;
mod guild_settings;

pub use cached_queue::{CachedQueue, DiscardReason, RestoreAction};
pub use dj_settings::{DjCandidate, GuildDjSettings};
pub use guild_settings::GuildSettings;

use crate::utils::database::{Database, DbError};

/// Fetch / update / delete lifecycle shared by the guild records.
pub trait Record {
    /// Reloads the record from `db`. A missing row marks it deleted.
    fn fetch(&mut self, db: &Database) -> Result<(), DbError>;

    /// Inserts or replaces the row.
    fn update(&self, db: &Database) -> Result<(), DbError>;

    fn delete(&mut self, db: &Database) -> Result<(), DbError>;

    fn is_deleted(&self) -> bool;
}
