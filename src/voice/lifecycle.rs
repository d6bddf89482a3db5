use serenity::model::id::{ChannelId, GuildId};
use songbird::input::File;
use songbird::tracks::Track;
use songbird::{Call, Songbird, TrackEvent};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::{timeout, Duration};
use tracing::{info, warn};

use super::events::PlaybackErrorLog;

#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("connection did not become ready within {0}s")]
    Timeout(u64),
    #[error("join failed: {0}")]
    Join(#[from] songbird::error::JoinError),
}

/// Establishes the guild's single voice connection to `channel_id`.
///
/// Any prior call is destroyed first, so at most one connection object
/// exists per guild. A join that does not reach ready within
/// `timeout_secs` is torn down and reported as `Timeout`.
pub async fn connect(
    manager: &Songbird,
    guild_id: GuildId,
    channel_id: ChannelId,
    timeout_secs: u64,
) -> Result<Arc<Mutex<Call>>, ConnectError> {
    if manager.get(guild_id).is_some() {
        let _ = manager.remove(guild_id).await;
    }

    match timeout(
        Duration::from_secs(timeout_secs),
        manager.join(guild_id, channel_id),
    )
    .await
    {
        Ok(Ok(call)) => Ok(call),
        Ok(Err(e)) => {
            let _ = manager.remove(guild_id).await;
            Err(ConnectError::Join(e))
        }
        Err(_) => {
            let _ = manager.remove(guild_id).await;
            Err(ConnectError::Timeout(timeout_secs))
        }
    }
}

/// Destroys the guild's voice connection, if one exists. Best effort.
pub async fn disconnect(manager: &Songbird, guild_id: GuildId) {
    if manager.get(guild_id).is_some() {
        if let Err(e) = manager.remove(guild_id).await {
            warn!("Failed to leave voice in guild {}: {}", guild_id, e);
        }
    }
}

/// One-shot greeting after a fresh join. A missing asset is a warning,
/// never a failure; the connection stays up silently. A teardown racing
/// the playback is benign, the error handler just logs.
pub async fn play_greeting(
    call: &Arc<Mutex<Call>>,
    guild_id: GuildId,
    sound_file: &str,
    volume: f32,
) {
    let path = PathBuf::from(sound_file);
    if !path.exists() {
        warn!(
            "Join sound not found: {}. Staying connected silently.",
            sound_file
        );
        return;
    }

    let track = Track::new(File::new(path).into()).volume(volume);
    let handle = call.lock().await.play(track);
    if let Err(e) = handle.add_event(
        songbird::Event::Track(TrackEvent::Error),
        PlaybackErrorLog { guild_id },
    ) {
        warn!("Could not attach playback error log: {}", e);
    }
    info!("Playing join sound {} in guild {}.", sound_file, guild_id);
}
