use serde::{Deserialize, Serialize};
use serenity::model::id::UserId;
use serenity::model::user::User;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::{fs, io};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum WatcherError {
    #[error("pick two **different** users")]
    SameUser,
    #[error("bot accounts cannot be watched")]
    BotUser,
}

/// On-disk shape, kept compatible with the original `watchers.json`.
#[derive(Serialize, Deserialize, Default)]
struct WatcherFile {
    watchers: Vec<String>,
}

/// Holds the watched pair: either exactly two distinct human user ids, or
/// nothing. Seeded from the environment at startup, else from the
/// persisted file; mutated only through `set`/`clear`, which replace the
/// pair in memory first and then persist it.
pub struct WatcherRegistry {
    path: PathBuf,
    inner: RwLock<Option<(UserId, UserId)>>,
}

impl WatcherRegistry {
    pub fn load(path: impl Into<PathBuf>, seed: Option<(u64, u64)>) -> Self {
        let path = path.into();
        let pair = match seed {
            Some((a, b)) => Some((UserId::new(a), UserId::new(b))),
            None => Self::read_file(&path),
        };
        if let Some((a, b)) = pair {
            info!("Watching {} & {}.", a, b);
        } else {
            info!("No watcher IDs configured yet. Use /watch set, or set WATCH_IDS and restart.");
        }
        Self {
            path,
            inner: RwLock::new(pair),
        }
    }

    fn read_file(path: &Path) -> Option<(UserId, UserId)> {
        let raw = fs::read_to_string(path).ok()?;
        let parsed: WatcherFile = serde_json::from_str(&raw).ok()?;
        let ids: Vec<u64> = parsed
            .watchers
            .iter()
            .filter_map(|s| s.parse().ok())
            .filter(|v: &u64| *v != 0)
            .collect();
        if ids.len() == 2 && ids[0] != ids[1] {
            Some((UserId::new(ids[0]), UserId::new(ids[1])))
        } else {
            None
        }
    }

    fn persist(&self, pair: Option<(UserId, UserId)>) -> io::Result<()> {
        let record = WatcherFile {
            watchers: pair
                .map(|(a, b)| vec![a.to_string(), b.to_string()])
                .unwrap_or_default(),
        };
        fs::write(&self.path, serde_json::to_string_pretty(&record)?)
    }

    /// Current pair, if configured.
    pub fn pair(&self) -> Option<(UserId, UserId)> {
        *self.inner.read().unwrap()
    }

    /// Replaces the watched pair. Validation happens before any mutation;
    /// a persist failure is logged but the in-memory replacement stands.
    pub fn set(&self, first: &User, second: &User) -> Result<(), WatcherError> {
        if first.id == second.id {
            return Err(WatcherError::SameUser);
        }
        if first.bot || second.bot {
            return Err(WatcherError::BotUser);
        }
        let pair = (first.id, second.id);
        *self.inner.write().unwrap() = Some(pair);
        if let Err(e) = self.persist(Some(pair)) {
            warn!("Failed to persist watcher list to {:?}: {}", self.path, e);
        }
        Ok(())
    }

    /// Empties the watched pair. The caller is responsible for the forced
    /// re-evaluation that tears down any connection the old pair earned.
    pub fn clear(&self) {
        *self.inner.write().unwrap() = None;
        if let Err(e) = self.persist(None) {
            warn!("Failed to persist watcher list to {:?}: {}", self.path, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn human(id: u64) -> User {
        let mut user = User::default();
        user.id = UserId::new(id);
        user
    }

    fn bot(id: u64) -> User {
        let mut user = human(id);
        user.bot = true;
        user
    }

    fn temp_path(dir: &tempfile::TempDir) -> PathBuf {
        dir.path().join("watchers.json")
    }

    #[test]
    fn env_seed_wins_over_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = temp_path(&dir);
        fs::write(&path, r#"{"watchers": ["5", "6"]}"#).unwrap();

        let registry = WatcherRegistry::load(&path, Some((1, 2)));
        assert_eq!(registry.pair(), Some((UserId::new(1), UserId::new(2))));

        let registry = WatcherRegistry::load(&path, None);
        assert_eq!(registry.pair(), Some((UserId::new(5), UserId::new(6))));
    }

    #[test]
    fn set_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = temp_path(&dir);

        let registry = WatcherRegistry::load(&path, None);
        assert_eq!(registry.pair(), None);

        registry.set(&human(10), &human(20)).unwrap();
        assert_eq!(registry.pair(), Some((UserId::new(10), UserId::new(20))));

        let reloaded = WatcherRegistry::load(&path, None);
        assert_eq!(reloaded.pair(), Some((UserId::new(10), UserId::new(20))));
    }

    #[test]
    fn invalid_set_leaves_state_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let registry = WatcherRegistry::load(temp_path(&dir), Some((1, 2)));

        let same = registry.set(&human(7), &human(7));
        assert!(matches!(same, Err(WatcherError::SameUser)));
        assert_eq!(registry.pair(), Some((UserId::new(1), UserId::new(2))));

        let with_bot = registry.set(&human(7), &bot(8));
        assert!(matches!(with_bot, Err(WatcherError::BotUser)));
        assert_eq!(registry.pair(), Some((UserId::new(1), UserId::new(2))));
    }

    #[test]
    fn clear_persists_empty_list() {
        let dir = tempfile::tempdir().unwrap();
        let path = temp_path(&dir);

        let registry = WatcherRegistry::load(&path, Some((1, 2)));
        registry.clear();
        assert_eq!(registry.pair(), None);

        let reloaded = WatcherRegistry::load(&path, None);
        assert_eq!(reloaded.pair(), None);

        let raw = fs::read_to_string(&path).unwrap();
        let parsed: WatcherFile = serde_json::from_str(&raw).unwrap();
        assert!(parsed.watchers.is_empty());
    }
}
