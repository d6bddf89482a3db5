pub mod commands;
pub mod config;
pub mod events;
pub mod relay;
pub mod voice;
pub mod watch;
pub mod watchers;

use std::sync::Arc;

/// Custom data passed to all commands and event handlers
pub struct Data {
    pub config: config::Config,
    pub registry: Arc<watchers::WatcherRegistry>,
    pub engine: Arc<watch::engine::WatchEngine>,
    pub relay: Arc<relay::RelayStore>,
}

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;
