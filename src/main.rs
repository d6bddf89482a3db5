use chaperone::{config::Config, Data};
use poise::serenity_prelude as serenity;
use songbird::serenity::SerenityInit;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging (VERBOSE lowers the default filter to debug)
    let default_filter = if config.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    let discord_token = config.discord_token.clone();
    let application_id = config.application_id;

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![
                chaperone::commands::watch::watch(),
                chaperone::commands::relay::relay(),
            ],
            event_handler: |ctx, event, _framework, data| {
                Box::pin(chaperone::events::handle(ctx, event, data))
            },
            ..Default::default()
        })
        .setup(|ctx, _ready, framework| {
            Box::pin(async move {
                info!("Bot is ready!");
                if let Some(guild_id) = config.dev_guild_id {
                    poise::builtins::register_in_guild(
                        ctx,
                        &framework.options().commands,
                        serenity::GuildId::new(guild_id),
                    )
                    .await?;
                } else {
                    poise::builtins::register_globally(ctx, &framework.options().commands)
                        .await?;
                }

                // Presence: "Watching <status_message>"
                ctx.set_activity(Some(serenity::ActivityData::watching(
                    &config.status_message,
                )));

                if !std::path::Path::new(&config.sound_file).exists() {
                    warn!(
                        "Join sound not found: {}. Bot will join silently.",
                        config.sound_file
                    );
                }

                let registry = Arc::new(chaperone::watchers::WatcherRegistry::load(
                    &config.watchers_file,
                    config.watch_seed,
                ));
                let engine = Arc::new(chaperone::watch::engine::WatchEngine::new(
                    &config,
                    registry.clone(),
                ));
                let relay = Arc::new(chaperone::relay::RelayStore::new(Duration::from_secs(
                    config.relay_ttl_secs,
                )));
                tokio::spawn(chaperone::relay::run_sweeper(relay.clone()));

                Ok(Data {
                    config,
                    registry,
                    engine,
                    relay,
                })
            })
        })
        .build();

    let intents = serenity::GatewayIntents::non_privileged()
        | serenity::GatewayIntents::GUILD_MEMBERS
        | serenity::GatewayIntents::GUILD_VOICE_STATES
        | serenity::GatewayIntents::DIRECT_MESSAGES
        | serenity::GatewayIntents::MESSAGE_CONTENT;

    let mut builder = serenity::ClientBuilder::new(&discord_token, intents)
        .framework(framework)
        .register_songbird();
    if let Some(app_id) = application_id {
        builder = builder.application_id(serenity::ApplicationId::new(app_id));
    }
    let mut client = builder
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create client: {}", e))?;

    info!("Starting bot...");
    if let Err(why) = client.start().await {
        error!("Client error: {:?}", why);
    }

    Ok(())
}
