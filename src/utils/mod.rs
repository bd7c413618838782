//! This module aggregates various utility submodules used throughout the application.

/// TOML configuration files, created with defaults on first start.
pub mod config;
/// Panic and command failure reports for the bot owner.
pub mod crash_reports;
/// Utilities for interacting with the application's SQLite database.
pub mod database;
/// Duration, progress bar and text helpers.
pub mod format;
/// Framework error replies.
pub mod halt;
/// Lyrics lookup (requires the `lyrics` feature).
#[cfg(feature = "lyrics")]
pub mod lyrics;
/// Configurable reply messages.
pub mod messages;
/// Presence rotation.
pub mod status;
