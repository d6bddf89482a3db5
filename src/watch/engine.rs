use super::reconciler::{self, Action, ConnectionState};
use super::rules::{self, WatchMode};
use super::snapshot;
use crate::config::Config;
use crate::voice::events::DropWatcher;
use crate::voice::lifecycle;
use crate::watchers::WatcherRegistry;
use serenity::model::id::{ChannelId, GuildId};
use serenity::prelude::Context;
use songbird::CoreEvent;
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Mutable per-guild resources: the logical connection and the cooldown
/// record. Guarded by one async mutex per guild; a reconcile pass holds
/// the lock end to end, which serializes overlapping evaluations for the
/// same guild.
pub struct GuildState {
    pub conn: ConnectionState,
    pub last_join: Option<Instant>,
}

enum Verdict {
    /// Guild not in cache; skip this cycle without acting on it.
    Unknown,
    /// The rule does not hold (or cannot, or may not be acted on).
    Clear,
    Target(ChannelId),
}

/// Drives snapshot → rule → plan → voice action for every presence event.
pub struct WatchEngine {
    registry: Arc<WatcherRegistry>,
    mode: WatchMode,
    cooldown: Duration,
    sound_file: String,
    sound_volume: f32,
    connect_timeout_secs: u64,
    recovery_wait_secs: u64,
    guilds: StdMutex<HashMap<GuildId, Arc<Mutex<GuildState>>>>,
}

impl WatchEngine {
    pub fn new(config: &Config, registry: Arc<WatcherRegistry>) -> Self {
        Self {
            registry,
            mode: config.watch_mode,
            cooldown: config.cooldown,
            sound_file: config.sound_file.clone(),
            sound_volume: config.sound_volume,
            connect_timeout_secs: config.connect_timeout_secs,
            recovery_wait_secs: config.recovery_wait_secs,
            guilds: StdMutex::new(HashMap::new()),
        }
    }

    fn entry(&self, guild_id: GuildId) -> Arc<Mutex<GuildState>> {
        self.guilds
            .lock()
            .unwrap()
            .entry(guild_id)
            .or_insert_with(|| {
                Arc::new(Mutex::new(GuildState {
                    conn: ConnectionState::Disconnected,
                    last_join: None,
                }))
            })
            .clone()
    }

    fn tracked_guilds(&self) -> Vec<GuildId> {
        self.guilds.lock().unwrap().keys().copied().collect()
    }

    fn verdict(&self, ctx: &Context, guild_id: GuildId) -> Verdict {
        let Some(pair) = self.registry.pair() else {
            // No watchers configured: any held connection must go.
            return Verdict::Clear;
        };
        let Some(snap) = snapshot::capture(ctx, guild_id) else {
            debug!("Guild {} not cached, skipping this pass.", guild_id);
            return Verdict::Unknown;
        };
        match rules::evaluate(&snap, pair, self.mode) {
            Some(target) if !snap.connectable(target) => {
                warn!(
                    "Missing CONNECT in #{} (guild {}), not joining.",
                    snap.channel_name(target).unwrap_or("?"),
                    guild_id
                );
                Verdict::Clear
            }
            Some(target) => {
                debug!(
                    "Rule holds in #{} (guild {}).",
                    snap.channel_name(target).unwrap_or("?"),
                    guild_id
                );
                Verdict::Target(target)
            }
            None => Verdict::Clear,
        }
    }

    /// One full reconcile pass for a guild. Called on every voice-state
    /// change, on the initial scan, and after watcher mutations.
    pub async fn evaluate(
        &self,
        ctx: &Context,
        guild_id: GuildId,
    ) -> anyhow::Result<()> {
        let manager = songbird::get(ctx)
            .await
            .ok_or_else(|| anyhow::anyhow!("voice client not initialized"))?;

        let entry = self.entry(guild_id);
        let mut st = entry.lock().await;

        let target = match self.verdict(ctx, guild_id) {
            Verdict::Unknown => return Ok(()),
            Verdict::Clear => None,
            Verdict::Target(c) => Some(c),
        };

        let action = reconciler::plan(target, st.conn, st.last_join, Instant::now(), self.cooldown);
        match action {
            Action::Stay => {
                if let Some(c) = target {
                    if st.conn.channel() != Some(c) {
                        debug!(
                            "Within cooldown in guild {}, skipping re-join to {}.",
                            guild_id, c
                        );
                    }
                }
            }
            Action::Leave => {
                st.conn = ConnectionState::Disconnected;
                lifecycle::disconnect(&manager, guild_id).await;
                info!("Left voice in guild {} (rule no longer holds).", guild_id);
            }
            Action::Join(to) | Action::Move { to, .. } => {
                let fresh = matches!(action, Action::Join(_));
                st.last_join = Some(Instant::now());
                st.conn = ConnectionState::Connecting(to);
                match lifecycle::connect(&manager, guild_id, to, self.connect_timeout_secs).await {
                    Ok(call) => {
                        st.conn = ConnectionState::Connected(to);
                        call.lock().await.add_global_event(
                            CoreEvent::DriverDisconnect.into(),
                            DropWatcher {
                                guild_id,
                                channel_id: to,
                                manager: manager.clone(),
                                state: entry.clone(),
                                recovery_wait_secs: self.recovery_wait_secs,
                            },
                        );
                        info!("Joined channel {} in guild {}.", to, guild_id);
                        if fresh {
                            lifecycle::play_greeting(
                                &call,
                                guild_id,
                                &self.sound_file,
                                self.sound_volume,
                            )
                            .await;
                        }
                    }
                    Err(e) => {
                        st.conn = ConnectionState::Disconnected;
                        warn!(
                            "Voice connect to {} in guild {} failed: {}",
                            to, guild_id, e
                        );
                    }
                }
            }
        }
        Ok(())
    }

    /// Unconditionally drops the guild's connection. Used when a guild
    /// becomes unavailable; any connection state is discarded.
    pub async fn force_disconnect(&self, ctx: &Context, guild_id: GuildId) {
        let Some(manager) = songbird::get(ctx).await else {
            return;
        };
        let entry = self.entry(guild_id);
        let mut st = entry.lock().await;
        if st.conn != ConnectionState::Disconnected || manager.get(guild_id).is_some() {
            st.conn = ConnectionState::Disconnected;
            lifecycle::disconnect(&manager, guild_id).await;
            info!("Dropped voice connection for unavailable guild {}.", guild_id);
        }
    }

    /// Tears down every held connection. The observable side effect of
    /// clearing the watcher pair: the rule cannot hold anywhere anymore.
    pub async fn disconnect_all(&self, ctx: &Context) {
        for guild_id in self.tracked_guilds() {
            self.force_disconnect(ctx, guild_id).await;
        }
    }
}
