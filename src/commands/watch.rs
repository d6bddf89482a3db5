use crate::watch::rules::WatchMode;
use crate::{Context, Error};
use poise::serenity_prelude as serenity;
use tracing::error;

/// Manage the watched user pair
#[poise::command(
    slash_command,
    guild_only,
    required_permissions = "MANAGE_GUILD",
    subcommands("set", "status", "clear")
)]
pub async fn watch(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Set the two watched users
#[poise::command(slash_command)]
pub async fn set(
    ctx: Context<'_>,
    #[description = "First user"] user1: serenity::User,
    #[description = "Second user"] user2: serenity::User,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("This command must be used in a server")?;

    if let Err(e) = ctx.data().registry.set(&user1, &user2) {
        ctx.send(
            poise::CreateReply::default()
                .content(format!("❌ {}", e))
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    }

    // Apply the new pair before confirming, so the reply reflects any
    // join/leave the change just caused.
    if let Err(e) = ctx
        .data()
        .engine
        .evaluate(ctx.serenity_context(), guild_id)
        .await
    {
        error!("Re-evaluation after /watch set failed: {}", e);
    }

    ctx.send(
        poise::CreateReply::default()
            .content(format!("👀 Watching <@{}> & <@{}>.", user1.id, user2.id))
            .ephemeral(true),
    )
    .await?;
    Ok(())
}

/// Show the watched users
#[poise::command(slash_command)]
pub async fn status(ctx: Context<'_>) -> Result<(), Error> {
    let content = status_line(ctx.data().registry.pair(), ctx.data().config.watch_mode);
    ctx.send(
        poise::CreateReply::default()
            .content(content)
            .ephemeral(true),
    )
    .await?;
    Ok(())
}

fn status_line(pair: Option<(serenity::UserId, serenity::UserId)>, mode: WatchMode) -> String {
    let mode_label = match mode {
        WatchMode::AloneTogether => "alone together",
        WatchMode::Together => "together",
    };
    match pair {
        Some((a, b)) => format!(
            "Currently watching: <@{}> & <@{}> (mode: {})",
            a, b, mode_label
        ),
        None => "No watchers set. Use `/watch set user1:@A user2:@B`.".to_string(),
    }
}

/// Clear the watched users and leave any held voice channel
#[poise::command(slash_command)]
pub async fn clear(ctx: Context<'_>) -> Result<(), Error> {
    ctx.data().registry.clear();
    // The rule cannot hold for an empty pair, so drop every connection
    // before reporting back.
    ctx.data()
        .engine
        .disconnect_all(ctx.serenity_context())
        .await;

    ctx.send(
        poise::CreateReply::default()
            .content("Cleared watchers. Use `/watch set` to configure.")
            .ephemeral(true),
    )
    .await?;
    Ok(())
}
