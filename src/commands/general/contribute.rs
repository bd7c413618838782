use poise::serenity_prelude::{Colour, CreateActionRow, CreateButton, CreateEmbed, CreateEmbedAuthor};
use poise::CreateReply;

use crate::{CommandResult, Context};

/// Maintainers' avatar shown next to the source link.
const THUMBNAIL: &str = "https://avatars.githubusercontent.com/u/88924248?s=200&v=4";

pub fn contribute_embed(bot_name: &str, icon: Option<String>, colour: Colour) -> CreateEmbed {
    let mut author = CreateEmbedAuthor::new("Contribute");
    if let Some(icon) = icon {
        author = author.icon_url(icon);
    }

    CreateEmbed::new()
        .author(author)
        .colour(colour)
        .title(format!("{} is open source!", bot_name))
        .thumbnail(THUMBNAIL)
        .description("Click the link below to view source code.")
}

/// Contribute to this bot
#[poise::command(slash_command, prefix_command, category = "General", aliases("github"))]
pub async fn contribute(ctx: Context<'_>) -> CommandResult {
    let (name, icon) = {
        let bot = ctx.cache().current_user();
        (bot.name.clone(), bot.face())
    };
    let player = &ctx.data().player;

    let embed = contribute_embed(&name, Some(icon), player.messages.embed_colour(true));
    let button = CreateButton::new_link(&player.config.source_url).label("View Source Code");

    ctx.send(
        CreateReply::default()
            .embed(embed)
            .components(vec![CreateActionRow::Buttons(vec![button])]),
    )
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_contribute_embed() {
        let embed = contribute_embed("EPlayer", None, Colour::new(0xde111e));
        let json = serde_json::to_value(&embed).unwrap();

        assert_eq!(json["title"], "EPlayer is open source!");
        assert_eq!(json["author"]["name"], "Contribute");
        assert_eq!(json["thumbnail"]["url"], THUMBNAIL);
    }
}
