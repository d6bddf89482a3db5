use crate::{Context, Error};
use poise::serenity_prelude as serenity;
use std::time::{Duration, Instant};
use tracing::info;

/// Relay a user's direct messages into a channel
#[poise::command(
    slash_command,
    guild_only,
    required_permissions = "MANAGE_GUILD",
    subcommands("start", "stop")
)]
pub async fn relay(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Start relaying a user's DMs into this channel
#[poise::command(slash_command)]
pub async fn start(
    ctx: Context<'_>,
    #[description = "User whose DMs get relayed here"] user: serenity::User,
    #[description = "Minutes until the relay expires"]
    #[min = 1]
    #[max = 120]
    minutes: Option<u64>,
) -> Result<(), Error> {
    if user.bot {
        ctx.send(
            poise::CreateReply::default()
                .content("❌ Bot accounts cannot be relayed.")
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    }

    let dm = user.create_dm_channel(ctx.serenity_context()).await?;
    let ttl = minutes.map(|m| Duration::from_secs(m * 60));
    ctx.data().relay.start(
        dm.id,
        ctx.channel_id(),
        user.id,
        ctx.author().id,
        Instant::now(),
        ttl,
    );
    info!(
        "Relay started for user {} into channel {}.",
        user.id,
        ctx.channel_id()
    );

    ctx.send(
        poise::CreateReply::default()
            .content(format!(
                "📨 Relaying DMs from <@{}> into this channel until the session expires.",
                user.id
            ))
            .ephemeral(true),
    )
    .await?;
    Ok(())
}

/// Stop relaying a user's DMs
#[poise::command(slash_command)]
pub async fn stop(
    ctx: Context<'_>,
    #[description = "User whose relay to stop"] user: serenity::User,
) -> Result<(), Error> {
    let stopped = ctx.data().relay.stop(user.id, ctx.author().id);
    let content = if stopped {
        format!("🛑 Stopped relaying DMs from <@{}>.", user.id)
    } else {
        format!("No active relay of yours for <@{}>.", user.id)
    };
    ctx.send(
        poise::CreateReply::default()
            .content(content)
            .ephemeral(true),
    )
    .await?;
    Ok(())
}
