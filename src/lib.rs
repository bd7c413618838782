//! EPlayer: a Discord music bot built on poise, serenity and songbird.
//!
//! The crate is split the same way the bot is wired at runtime: `commands`
//! holds the thin poise handlers, `player` the façade that drives songbird,
//! `models` the persisted per-guild records and `utils` the config, message,
//! database and formatting helpers they share.

use std::sync::Arc;
use std::time::Instant;

pub mod commands;
pub mod models;
pub mod player;
pub mod utils;

use player::EPlayer;
use utils::crash_reports::CrashReports;

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;
pub type CommandResult = Result<(), Error>;

/// User data, stored and accessible in all command invocations
pub struct Data {
    pub player: Arc<EPlayer>,
    pub started_at: Instant,
    pub crashes: Arc<CrashReports>,
}
