use serenity::model::id::ChannelId;
use std::time::{Duration, Instant};

/// Logical connection state for one guild. At most one of these is ever
/// "live" per guild; transitions go through the voice lifecycle only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting(ChannelId),
    Connected(ChannelId),
    Recovering(ChannelId),
}

impl ConnectionState {
    /// Channel this state is bound to, if any. A connection mid-handshake
    /// or mid-recovery still counts as occupying its channel for
    /// idempotence and leave decisions.
    pub fn channel(&self) -> Option<ChannelId> {
        match *self {
            ConnectionState::Disconnected => None,
            ConnectionState::Connecting(c)
            | ConnectionState::Connected(c)
            | ConnectionState::Recovering(c) => Some(c),
        }
    }
}

/// Minimal corrective action for one reconcile pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Stay,
    Join(ChannelId),
    Move { from: ChannelId, to: ChannelId },
    Leave,
}

/// Compares the rule verdict against the current connection state and
/// returns the minimal transition.
///
/// Pure: the caller records the join timestamp when it actually issues a
/// `Join`/`Move`. A verdict for the already-occupied channel is always
/// `Stay`, never a cooldown hit; a join toward a *different* channel
/// within `cooldown` of the last join is suppressed.
pub fn plan(
    verdict: Option<ChannelId>,
    state: ConnectionState,
    last_join: Option<Instant>,
    now: Instant,
    cooldown: Duration,
) -> Action {
    let current = state.channel();
    match verdict {
        None => {
            if current.is_some() {
                Action::Leave
            } else {
                Action::Stay
            }
        }
        Some(target) if current == Some(target) => Action::Stay,
        Some(target) => {
            if let Some(prev) = last_join {
                if now.duration_since(prev) < cooldown {
                    return Action::Stay;
                }
            }
            match current {
                Some(from) => Action::Move { from, to: target },
                None => Action::Join(target),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COOLDOWN: Duration = Duration::from_millis(8000);

    fn ch(id: u64) -> ChannelId {
        ChannelId::new(id)
    }

    #[test]
    fn join_from_disconnected() {
        let now = Instant::now();
        let action = plan(
            Some(ch(1)),
            ConnectionState::Disconnected,
            None,
            now,
            COOLDOWN,
        );
        assert_eq!(action, Action::Join(ch(1)));
    }

    #[test]
    fn repeated_same_verdict_is_a_noop() {
        let base = Instant::now();
        // Same channel, even inside the cooldown window: idempotent, not
        // suppressed, and never a rejoin.
        for offset in [0u64, 100, 4000, 20000] {
            let action = plan(
                Some(ch(1)),
                ConnectionState::Connected(ch(1)),
                Some(base),
                base + Duration::from_millis(offset),
                COOLDOWN,
            );
            assert_eq!(action, Action::Stay);
        }
    }

    #[test]
    fn cooldown_suppresses_then_releases() {
        let base = Instant::now();
        // Joined channel 1 at t=0; verdict flips to channel 2 at t=4s.
        let suppressed = plan(
            Some(ch(2)),
            ConnectionState::Connected(ch(1)),
            Some(base),
            base + Duration::from_millis(4000),
            COOLDOWN,
        );
        assert_eq!(suppressed, Action::Stay);

        // At t=9s the window has passed and the move goes through.
        let honored = plan(
            Some(ch(2)),
            ConnectionState::Connected(ch(1)),
            Some(base),
            base + Duration::from_millis(9000),
            COOLDOWN,
        );
        assert_eq!(honored, Action::Move { from: ch(1), to: ch(2) });
    }

    #[test]
    fn cooldown_applies_to_fresh_joins_too() {
        let base = Instant::now();
        let suppressed = plan(
            Some(ch(2)),
            ConnectionState::Disconnected,
            Some(base),
            base + Duration::from_millis(1000),
            COOLDOWN,
        );
        assert_eq!(suppressed, Action::Stay);
    }

    #[test]
    fn no_verdict_leaves_when_connected() {
        let now = Instant::now();
        let action = plan(None, ConnectionState::Connected(ch(1)), None, now, COOLDOWN);
        assert_eq!(action, Action::Leave);
    }

    #[test]
    fn no_verdict_is_a_noop_when_disconnected() {
        let now = Instant::now();
        let action = plan(None, ConnectionState::Disconnected, None, now, COOLDOWN);
        assert_eq!(action, Action::Stay);
    }

    #[test]
    fn evaluate_then_plan_joins_from_scratch() {
        use crate::watch::rules::{evaluate, WatchMode};
        use crate::watch::snapshot::{occupancy, GuildSnapshot};
        use serenity::model::id::UserId;

        let snap = GuildSnapshot::from_parts(vec![occupancy(1, &[7, 8])]);
        let verdict = evaluate(&snap, (UserId::new(7), UserId::new(8)), WatchMode::AloneTogether);
        assert_eq!(verdict, Some(ch(1)));

        let action = plan(
            verdict,
            ConnectionState::Disconnected,
            None,
            Instant::now(),
            COOLDOWN,
        );
        assert_eq!(action, Action::Join(ch(1)));
    }

    #[test]
    fn mid_handshake_states_count_as_occupied() {
        let now = Instant::now();
        assert_eq!(
            plan(Some(ch(1)), ConnectionState::Connecting(ch(1)), None, now, COOLDOWN),
            Action::Stay
        );
        assert_eq!(
            plan(None, ConnectionState::Recovering(ch(1)), None, now, COOLDOWN),
            Action::Leave
        );
    }
}
