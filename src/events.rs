use crate::{relay, Data, Error};
use serenity::client::{Context, FullEvent};
use tracing::{debug, error, info};

/// Single dispatch point for every gateway event the bot consumes. Each
/// arm funnels into the reconcile pipeline (or the relay); a failed pass
/// is logged and the loop keeps running.
pub async fn handle(ctx: &Context, event: &FullEvent, data: &Data) -> Result<(), Error> {
    match event {
        FullEvent::Ready { data_about_bot } => {
            info!("Logged in as {}.", data_about_bot.user.name);
        }
        FullEvent::CacheReady { guilds } => {
            info!("Cache ready, scanning {} guild(s).", guilds.len());
            for guild_id in guilds {
                if let Err(e) = data.engine.evaluate(ctx, *guild_id).await {
                    error!("Initial evaluation for guild {} failed: {}", guild_id, e);
                }
            }
        }
        FullEvent::VoiceStateUpdate { old, new } => {
            let Some(guild_id) = new
                .guild_id
                .or_else(|| old.as_ref().and_then(|o| o.guild_id))
            else {
                return Ok(());
            };
            let Some((a, b)) = data.registry.pair() else {
                return Ok(());
            };
            if new.user_id == a || new.user_id == b {
                debug!(
                    "Tracked user {} moved: {:?} -> {:?}",
                    new.user_id,
                    old.as_ref().and_then(|o| o.channel_id),
                    new.channel_id
                );
            }
            if let Err(e) = data.engine.evaluate(ctx, guild_id).await {
                error!("Evaluation for guild {} failed: {}", guild_id, e);
            }
        }
        FullEvent::GuildDelete { incomplete, .. } => {
            if incomplete.unavailable {
                data.engine.force_disconnect(ctx, incomplete.id).await;
            }
        }
        FullEvent::Message { new_message } => {
            if new_message.guild_id.is_none() && !new_message.author.bot {
                relay::forward_dm(ctx, data, new_message).await;
            }
        }
        _ => {}
    }
    Ok(())
}
