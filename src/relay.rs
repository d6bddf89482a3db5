use crate::Data;
use serenity::model::channel::Message;
use serenity::model::id::{ChannelId, UserId};
use serenity::prelude::Context;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::time::interval;
use tracing::{debug, info, warn};

/// One live DM relay: messages the target user sends in their DM channel
/// get forwarded to the origin channel until the session expires.
#[derive(Debug, Clone)]
pub struct RelaySession {
    pub origin_channel: ChannelId,
    pub target_user: UserId,
    pub invoker: UserId,
    pub expires_at: Instant,
}

/// Session store keyed by DM channel. Expiry is enforced twice: passively
/// on lookup and by the periodic sweep, so a dead session never forwards.
pub struct RelayStore {
    ttl: Duration,
    sessions: Mutex<HashMap<ChannelId, RelaySession>>,
}

impl RelayStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Creates (or replaces) the session for a DM channel, returning its
    /// expiry. `ttl` overrides the store default when given.
    pub fn start(
        &self,
        dm_channel: ChannelId,
        origin_channel: ChannelId,
        target_user: UserId,
        invoker: UserId,
        now: Instant,
        ttl: Option<Duration>,
    ) -> Instant {
        let expires_at = now + ttl.unwrap_or(self.ttl);
        self.sessions.lock().unwrap().insert(
            dm_channel,
            RelaySession {
                origin_channel,
                target_user,
                invoker,
                expires_at,
            },
        );
        expires_at
    }

    /// Live session for a DM channel; an expired one is removed on the spot.
    pub fn lookup(&self, dm_channel: ChannelId, now: Instant) -> Option<RelaySession> {
        let mut sessions = self.sessions.lock().unwrap();
        match sessions.get(&dm_channel) {
            Some(session) if session.expires_at > now => Some(session.clone()),
            Some(_) => {
                sessions.remove(&dm_channel);
                None
            }
            None => None,
        }
    }

    /// Ends the invoker's relay for a target user. Returns whether one
    /// was actually removed.
    pub fn stop(&self, target_user: UserId, invoker: UserId) -> bool {
        let mut sessions = self.sessions.lock().unwrap();
        let before = sessions.len();
        sessions.retain(|_, s| !(s.target_user == target_user && s.invoker == invoker));
        sessions.len() < before
    }

    /// Drops every expired session, returning how many were removed.
    pub fn sweep(&self, now: Instant) -> usize {
        let mut sessions = self.sessions.lock().unwrap();
        let before = sessions.len();
        sessions.retain(|_, s| s.expires_at > now);
        before - sessions.len()
    }
}

/// Background sweep so abandoned sessions do not linger in memory.
pub async fn run_sweeper(store: Arc<RelayStore>) {
    let mut ticker = interval(Duration::from_secs(60));
    loop {
        ticker.tick().await;
        let removed = store.sweep(Instant::now());
        if removed > 0 {
            debug!("Swept {} expired relay session(s).", removed);
        }
    }
}

/// Forwards a DM from a relayed user into the session's origin channel.
/// Called from the gateway dispatcher for every non-bot direct message.
pub async fn forward_dm(ctx: &Context, data: &Data, message: &Message) {
    let Some(session) = data.relay.lookup(message.channel_id, Instant::now()) else {
        return;
    };
    if session.target_user != message.author.id || message.content.is_empty() {
        return;
    }
    let forwarded = format!("📨 **{}**: {}", message.author.name, message.content);
    match session.origin_channel.say(&ctx.http, forwarded).await {
        Ok(_) => info!(
            "Relayed DM from {} to channel {}.",
            message.author.id, session.origin_channel
        ),
        Err(e) => warn!(
            "Failed to relay DM from {} to channel {}: {}",
            message.author.id, session.origin_channel, e
        ),
    }
}
