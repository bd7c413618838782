use ::serenity::all::ClientBuilder;
use dotenv::dotenv;
use poise::serenity_prelude as serenity;
use songbird::{SerenityInit, Songbird};
use std::env;
use std::sync::Arc;
use std::time::Instant;
use std::collections::HashSet;
use tracing::{debug, error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use eplayer::player::EPlayer;
use eplayer::utils::config::EPlayerConfig;
use eplayer::utils::database::Database;
use eplayer::utils::crash_reports::{self, CrashReports};
use eplayer::utils::messages::Messages;
use eplayer::utils::{halt, status};
use eplayer::{CommandResult, Context, Data, Error, commands};

#[poise::command(slash_command, prefix_command, category = "General")]
async fn help(
    ctx: Context<'_>,
    #[description = "Specific command to show help about"]
    #[autocomplete = "poise::builtins::autocomplete_command"]
    command: Option<String>,
) -> CommandResult {
    poise::builtins::help(
        ctx,
        command.as_deref(),
        poise::builtins::HelpConfiguration {
            show_context_menu_commands: true,
            ..Default::default()
        },
    )
    .await
    .map_err(|e| e.into())
}

#[poise::command(prefix_command, hide_in_help)]
async fn register(ctx: Context<'_>) -> Result<(), Error> {
    poise::builtins::register_application_commands_buttons(ctx)
        .await
        .map_err(|e| e.into())
}

async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        serenity::FullEvent::VoiceStateUpdate { old, new } => {
            data.player
                .handle_voice_state_update(ctx, old.as_ref(), new)
                .await;
        }
        serenity::FullEvent::CacheReady { guilds } => {
            debug!("{} guild(s) found in cache:", guilds.len());
            for guild_id in guilds {
                if let Some(guild) = ctx.cache.guild(*guild_id) {
                    debug!("{} with {} member(s)", guild.name, guild.member_count);
                }
            }
        }
        serenity::FullEvent::GuildCreate { guild, is_new: Some(true) } => {
            debug!("Added new guild {} with {} member(s)", guild.name, guild.member_count);
        }
        _ => {}
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Initialize logging with debug level for our crate
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("eplayer=debug,warn")),
        )
        .with_thread_ids(true)
        .with_line_number(true)
        .with_file(true)
        .with_target(true)
        .with_ansi(true)
        .pretty()
        .init();

    dotenv().ok();

    let (crashes, crash_receiver) = CrashReports::new();
    crash_reports::install_panic_hook(Arc::clone(&crashes));

    let config = EPlayerConfig::load()?;
    let messages = Messages::load()?;
    let db = Database::open(&config.database_path)?;
    info!("Opened database at {}", config.database_path);

    let token = env::var("DISCORD_TOKEN").map_err(|_| "Missing DISCORD_TOKEN")?;

    let intents = serenity::GatewayIntents::non_privileged()
        | serenity::GatewayIntents::MESSAGE_CONTENT
        | serenity::GatewayIntents::GUILD_VOICE_STATES;

    let mut commands = vec![register(), help()];
    commands.extend(commands::all());
    commands::apply_command_options(&mut commands, &config.command_options);

    let prefix = config.prefix.clone();
    let nocrash = config.nocrash.clone();
    let owners: HashSet<_> = nocrash.owner().into_iter().collect();
    let songbird = Songbird::serenity();
    let player = Arc::new(EPlayer::new(config, messages, db, songbird.clone()));
    let started_at = Instant::now();

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands,
            owners,
            prefix_options: poise::PrefixFrameworkOptions {
                prefix: Some(prefix),
                ..Default::default()
            },
            on_error: |error| Box::pin(halt::on_error(error)),
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                info!("Logged in as {}", ready.user.name);

                player.set_icon(ready.user.face());
                tokio::spawn(crash_reports::report_to_owner(
                    ctx.http.clone(),
                    nocrash,
                    crash_receiver,
                ));
                status::start(ctx.clone(), player.config.status.clone());

                let restoring = Arc::clone(&player);
                let restore_ctx = ctx.clone();
                tokio::spawn(async move {
                    restoring.restore_cached_queues(&restore_ctx).await;
                });

                Ok(Data {
                    player,
                    started_at,
                    crashes,
                })
            })
        });

    let mut client = ClientBuilder::new(token, intents)
        .framework(framework.build())
        .register_songbird_with(songbird)
        .await?;

    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
            return;
        }
        info!("Shutting down");
        shard_manager.shutdown_all().await;
    });

    client.start().await.map_err(Into::into)
}
