pub mod checks;
pub mod clear;
#[cfg(feature = "lyrics")]
pub mod lyrics;
pub mod move_track;
pub mod now_playing;
pub mod pause;
pub mod play;
pub mod previous;
pub mod queue;
pub mod remove;
pub mod repeat;
pub mod search;
pub mod shuffle;
pub mod skip;
pub mod stop;

use poise::serenity_prelude::GuildId;

use super::reply;
use crate::player::error::PlayerError;
use crate::{CommandResult, Context, Error};
use checks::{commands_channel_check, dj_check};

fn guild_id(ctx: Context<'_>) -> Result<GuildId, Error> {
    Ok(ctx.guild_id().ok_or(PlayerError::NotInGuild)?)
}
