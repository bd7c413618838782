use crate::utils::crash_reports::summary_embed;
use crate::{CommandResult, Context};

/// Show crash reports info
#[poise::command(prefix_command, owners_only, hide_in_help, rename = "crash-reports", category = "General")]
pub async fn crash_reports(ctx: Context<'_>) -> CommandResult {
    let data = ctx.data();
    let embed = summary_embed(
        &data.player.config.nocrash,
        &data.crashes,
        data.player.messages.embed_colour(true),
    );
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}
