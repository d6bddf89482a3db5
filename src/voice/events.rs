use crate::watch::engine::GuildState;
use crate::watch::reconciler::ConnectionState;
use async_trait::async_trait;
use serenity::model::id::{ChannelId, GuildId};
use songbird::{Event, EventContext, EventHandler as VoiceEventHandler};
use std::sync::Arc;
use tracing::{info, warn};

/// Watches for unexpected driver drops on one call and gives the
/// transport a bounded window to recover before tearing the call down.
///
/// Deliberate leaves also fire the disconnect event; those are ignored
/// because the guild state has already left `Connected` by then.
pub struct DropWatcher {
    pub guild_id: GuildId,
    pub channel_id: ChannelId,
    pub manager: Arc<songbird::Songbird>,
    pub state: Arc<tokio::sync::Mutex<GuildState>>,
    pub recovery_wait_secs: u64,
}

#[async_trait]
impl VoiceEventHandler for DropWatcher {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        if let EventContext::DriverDisconnect(_) = ctx {
            let manager = self.manager.clone();
            let state = self.state.clone();
            let guild_id = self.guild_id;
            let channel_id = self.channel_id;
            let wait = self.recovery_wait_secs;

            tokio::spawn(async move {
                {
                    let mut st = state.lock().await;
                    if st.conn != ConnectionState::Connected(channel_id) {
                        return;
                    }
                    st.conn = ConnectionState::Recovering(channel_id);
                }
                info!(
                    "Voice dropped in guild {}, waiting {}s for recovery...",
                    guild_id, wait
                );
                tokio::time::sleep(tokio::time::Duration::from_secs(wait)).await;

                let recovered = match manager.get(guild_id) {
                    Some(call) => call.lock().await.current_connection().is_some(),
                    None => false,
                };

                let mut st = state.lock().await;
                if st.conn != ConnectionState::Recovering(channel_id) {
                    // A reconcile pass moved us elsewhere in the meantime.
                    return;
                }
                if recovered {
                    st.conn = ConnectionState::Connected(channel_id);
                    info!("Voice recovered in guild {}.", guild_id);
                } else {
                    st.conn = ConnectionState::Disconnected;
                    drop(st);
                    let _ = manager.remove(guild_id).await;
                    warn!(
                        "Voice did not recover in guild {} within {}s, destroyed connection.",
                        guild_id, wait
                    );
                }
            });
        }
        None
    }
}

/// Logs greeting playback failures. Errors after the connection was torn
/// down land here too and are nothing more than log lines.
pub struct PlaybackErrorLog {
    pub guild_id: GuildId,
}

#[async_trait]
impl VoiceEventHandler for PlaybackErrorLog {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        if let EventContext::Track(tracks) = ctx {
            for (track_state, _) in *tracks {
                warn!(
                    "Join sound playback error in guild {}: {:?}",
                    self.guild_id, track_state.playing
                );
            }
        }
        None
    }
}
