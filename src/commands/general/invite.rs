use poise::serenity_prelude::{CreateActionRow, CreateButton, CreateEmbed, UserId};
use poise::CreateReply;

use crate::{CommandResult, Context};

/// OAuth2 link that adds the bot with the given permission bits.
pub fn invite_url(bot_id: UserId, permissions: u64) -> String {
    format!(
        "https://discord.com/oauth2/authorize?client_id={}&permissions={}&scope=bot%20applications.commands",
        bot_id, permissions
    )
}

/// Get a link to invite the bot to your server
#[poise::command(slash_command, prefix_command, category = "General", aliases("inv"))]
pub async fn invite(ctx: Context<'_>) -> CommandResult {
    let bot_id = ctx.framework().bot_id;
    let player = &ctx.data().player;
    let url = invite_url(bot_id, player.config.invite_permissions);

    let embed = CreateEmbed::new()
        .description("Click the button below to add me to your server.")
        .colour(player.messages.embed_colour(true));
    let button = CreateButton::new_link(url).label("Invite");

    ctx.send(
        CreateReply::default()
            .embed(embed)
            .components(vec![CreateActionRow::Buttons(vec![button])]),
    )
    .await?;

    Ok(())
}
