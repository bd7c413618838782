use poise::serenity_prelude::{self as serenity, CreateEmbed};
use poise::CreateReply;
use std::time::{Duration, Instant};

use crate::utils::format::format_duration;
use crate::{CommandResult, Context};

/// Ping the bot to check its latency
#[poise::command(slash_command, prefix_command, category = "General")]
pub async fn ping(ctx: Context<'_>) -> CommandResult {
    let shard_latency = get_shard_latency(&ctx).await.unwrap_or_default();
    let colour = ctx.data().player.messages.embed_colour(true);

    let started = Instant::now();
    let handle = ctx
        .send(CreateReply::default().embed(CreateEmbed::new().title("Pinging...").colour(colour)))
        .await?;
    let reply_latency = started.elapsed();

    let embed = CreateEmbed::new()
        .title("Pong!")
        .field("API Latency", format!("{} ms", shard_latency.as_millis()), true)
        .field("Reply Latency", format!("{} ms", reply_latency.as_millis()), true)
        .field("Uptime", format_duration(ctx.data().started_at.elapsed()), true)
        .colour(colour);

    handle
        .edit(ctx, CreateReply::default().embed(embed))
        .await?;

    Ok(())
}

async fn get_shard_latency(ctx: &Context<'_>) -> Option<Duration> {
    let shard_manager = ctx.framework().shard_manager();
    let runners = shard_manager.runners.lock().await;
    let runner = runners.get(&serenity::ShardId(ctx.serenity_context().shard_id.0))?;
    runner.latency
}
