use super::snapshot::GuildSnapshot;
use serenity::model::id::{ChannelId, UserId};
use std::str::FromStr;

/// Which co-location predicate triggers a join.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchMode {
    /// Both watched users share a channel and are the only humans in it.
    AloneTogether,
    /// Both watched users share a channel, regardless of who else is there.
    Together,
}

impl FromStr for WatchMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "alone" | "alone_together" => Ok(WatchMode::AloneTogether),
            "together" => Ok(WatchMode::Together),
            _ => Err(()),
        }
    }
}

/// Picks the channel the watched pair currently satisfies the predicate in,
/// first match in snapshot order. Pure; ties cannot occur in practice since
/// a user occupies at most one voice channel.
pub fn evaluate(
    snapshot: &GuildSnapshot,
    pair: (UserId, UserId),
    mode: WatchMode,
) -> Option<ChannelId> {
    let (a, b) = pair;
    snapshot
        .channels
        .iter()
        .find(|ch| {
            let both_inside = ch.humans.contains(&a) && ch.humans.contains(&b);
            match mode {
                WatchMode::AloneTogether => both_inside && ch.humans.len() == 2,
                WatchMode::Together => both_inside,
            }
        })
        .map(|ch| ch.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watch::snapshot::occupancy;

    fn pair() -> (UserId, UserId) {
        (UserId::new(1), UserId::new(2))
    }

    #[test]
    fn alone_together_matches_exact_pair() {
        let snap = GuildSnapshot::from_parts(vec![occupancy(10, &[1, 2])]);
        assert_eq!(
            evaluate(&snap, pair(), WatchMode::AloneTogether),
            Some(ChannelId::new(10))
        );
    }

    #[test]
    fn alone_together_rejects_third_human() {
        let snap = GuildSnapshot::from_parts(vec![occupancy(10, &[1, 2, 3])]);
        assert_eq!(evaluate(&snap, pair(), WatchMode::AloneTogether), None);
        // ...but the plain together mode accepts it
        assert_eq!(
            evaluate(&snap, pair(), WatchMode::Together),
            Some(ChannelId::new(10))
        );
    }

    #[test]
    fn apart_matches_nothing_in_either_mode() {
        let snap = GuildSnapshot::from_parts(vec![occupancy(10, &[1]), occupancy(20, &[2])]);
        assert_eq!(evaluate(&snap, pair(), WatchMode::AloneTogether), None);
        assert_eq!(evaluate(&snap, pair(), WatchMode::Together), None);
    }

    #[test]
    fn first_matching_channel_wins() {
        let snap = GuildSnapshot::from_parts(vec![
            occupancy(10, &[3, 4]),
            occupancy(20, &[1, 2]),
            occupancy(30, &[]),
        ]);
        assert_eq!(
            evaluate(&snap, pair(), WatchMode::AloneTogether),
            Some(ChannelId::new(20))
        );
    }

    #[test]
    fn evaluation_is_deterministic() {
        let snap = GuildSnapshot::from_parts(vec![occupancy(10, &[2, 1])]);
        let first = evaluate(&snap, pair(), WatchMode::AloneTogether);
        let second = evaluate(&snap, pair(), WatchMode::AloneTogether);
        assert_eq!(first, second);
        assert_eq!(first, Some(ChannelId::new(10)));
    }
}
