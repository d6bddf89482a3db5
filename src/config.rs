use crate::watch::rules::WatchMode;
use dotenvy::dotenv;
use std::env;
use std::time::Duration;

#[derive(Clone)]
pub struct Config {
    pub discord_token: String,
    pub application_id: Option<u64>,
    pub dev_guild_id: Option<u64>,
    /// Watched-user pair supplied via environment, if any. The registry
    /// falls back to the persisted file when this is `None`.
    pub watch_seed: Option<(u64, u64)>,
    pub watch_mode: WatchMode,
    pub sound_file: String,
    pub sound_volume: f32,
    pub cooldown: Duration,
    pub connect_timeout_secs: u64,
    pub recovery_wait_secs: u64,
    pub relay_ttl_secs: u64,
    pub watchers_file: String,
    pub status_message: String,
    pub verbose: bool,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok();
        Self::build()
    }

    fn build() -> anyhow::Result<Self> {
        Ok(Config {
            discord_token: env::var("DISCORD_TOKEN")
                .or_else(|_| env::var("TOKEN"))
                .map_err(|_| anyhow::anyhow!("DISCORD_TOKEN (or TOKEN) must be set"))?,
            application_id: env::var("APPLICATION_ID").ok().and_then(|id| id.parse().ok()),
            dev_guild_id: env::var("DEV_GUILD_ID").ok().and_then(|id| id.parse().ok()),
            watch_seed: Self::watch_seed_from_env(),
            watch_mode: env::var("WATCH_MODE")
                .ok()
                .and_then(|m| m.parse().ok())
                .unwrap_or(WatchMode::AloneTogether),
            sound_file: env::var("SOUND_FILE")
                .unwrap_or_else(|_| "sounds/welcome.ogg".to_string()),
            sound_volume: env::var("SOUND_VOLUME")
                .ok()
                .and_then(|v| v.parse::<f32>().ok())
                .unwrap_or(0.75)
                .clamp(0.0, 2.0),
            cooldown: Duration::from_millis(
                env::var("COOLDOWN_MS")
                    .unwrap_or_else(|_| "8000".to_string())
                    .parse()
                    .unwrap_or(8000),
            ),
            connect_timeout_secs: env::var("CONNECT_TIMEOUT_SECS")
                .unwrap_or_else(|_| "15".to_string())
                .parse()
                .unwrap_or(15),
            recovery_wait_secs: env::var("RECOVERY_WAIT_SECS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .unwrap_or(5),
            relay_ttl_secs: env::var("RELAY_TTL_SECS")
                .unwrap_or_else(|_| "600".to_string())
                .parse()
                .unwrap_or(600),
            watchers_file: env::var("WATCHERS_FILE")
                .unwrap_or_else(|_| "watchers.json".to_string()),
            status_message: env::var("STATUS_MESSAGE")
                .unwrap_or_else(|_| "youeatra".to_string()),
            verbose: env::var("VERBOSE")
                .unwrap_or_else(|_| "false".to_string())
                .parse()
                .unwrap_or(false),
        })
    }

    /// `WATCH_IDS=a,b` wins over the `WATCH_ID_1`/`WATCH_ID_2` pair.
    /// Zero, duplicate, or partially-set identifiers yield no seed.
    fn watch_seed_from_env() -> Option<(u64, u64)> {
        let combined = env::var("WATCH_IDS").unwrap_or_default();
        let parts: Vec<u64> = combined
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .filter(|v: &u64| *v != 0)
            .collect();
        let pair = if parts.len() == 2 {
            (parts[0], parts[1])
        } else {
            let a = env::var("WATCH_ID_1").ok()?.parse().ok().filter(|v| *v != 0)?;
            let b = env::var("WATCH_ID_2").ok()?.parse().ok().filter(|v| *v != 0)?;
            (a, b)
        };
        if pair.0 == pair.1 {
            return None;
        }
        Some(pair)
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("discord_token", &"[REDACTED]")
            .field("application_id", &self.application_id)
            .field("dev_guild_id", &self.dev_guild_id)
            .field("watch_seed", &self.watch_seed)
            .field("watch_mode", &self.watch_mode)
            .field("sound_file", &self.sound_file)
            .field("sound_volume", &self.sound_volume)
            .field("cooldown", &self.cooldown)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("recovery_wait_secs", &self.recovery_wait_secs)
            .field("relay_ttl_secs", &self.relay_ttl_secs)
            .field("watchers_file", &self.watchers_file)
            .field("status_message", &self.status_message)
            .field("verbose", &self.verbose)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn test_config_logic() {
        // 1. Missing token is fatal
        env::remove_var("DISCORD_TOKEN");
        env::remove_var("TOKEN");
        let result = Config::build();
        assert!(result.is_err(), "Should fail when the token is missing");

        // 2. Defaults
        env::set_var("DISCORD_TOKEN", "test_token");
        let config = Config::build().unwrap();
        assert_eq!(config.discord_token, "test_token");
        assert_eq!(config.cooldown, Duration::from_millis(8000));
        assert_eq!(config.watch_mode, WatchMode::AloneTogether);
        assert_eq!(config.watchers_file, "watchers.json");
        assert!(config.watch_seed.is_none());

        // 3. Volume clamp
        env::set_var("SOUND_VOLUME", "9.5");
        let config = Config::build().unwrap();
        assert_eq!(config.sound_volume, 2.0);
        env::remove_var("SOUND_VOLUME");

        // 4. Combined pair beats the split pair; duplicates rejected
        env::set_var("WATCH_ID_1", "111");
        env::set_var("WATCH_ID_2", "222");
        env::set_var("WATCH_IDS", "333, 444");
        let config = Config::build().unwrap();
        assert_eq!(config.watch_seed, Some((333, 444)));
        env::remove_var("WATCH_IDS");
        let config = Config::build().unwrap();
        assert_eq!(config.watch_seed, Some((111, 222)));
        env::set_var("WATCH_ID_2", "111");
        let config = Config::build().unwrap();
        assert!(config.watch_seed.is_none());
        env::remove_var("WATCH_ID_1");
        env::remove_var("WATCH_ID_2");

        // 5. Mode parse
        env::set_var("WATCH_MODE", "together");
        let config = Config::build().unwrap();
        assert_eq!(config.watch_mode, WatchMode::Together);
        env::remove_var("WATCH_MODE");

        // 6. Debug redaction
        let debug_output = format!("{:?}", config);
        assert!(!debug_output.contains("test_token"));
        assert!(debug_output.contains("[REDACTED]"));

        env::remove_var("DISCORD_TOKEN");
    }
}
