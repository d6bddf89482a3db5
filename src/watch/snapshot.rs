use serenity::model::channel::ChannelType;
use serenity::model::id::{ChannelId, GuildId, UserId};
use serenity::model::permissions::Permissions;
use serenity::prelude::Context;

/// Occupancy of a single voice channel, humans only.
#[derive(Debug, Clone)]
pub struct ChannelOccupancy {
    pub id: ChannelId,
    pub name: String,
    pub humans: Vec<UserId>,
    /// Whether the bot holds CONNECT on this channel. Unknown (bot member
    /// not cached) is treated as connectable; Discord rejects the join if
    /// we guessed wrong.
    pub connectable: bool,
}

/// Point-in-time view of a guild's voice channels, ordered by guild
/// position (channel id as tiebreak). Built fresh per evaluation and
/// discarded after use.
#[derive(Debug, Clone, Default)]
pub struct GuildSnapshot {
    pub channels: Vec<ChannelOccupancy>,
}

impl GuildSnapshot {
    pub fn from_parts(channels: Vec<ChannelOccupancy>) -> Self {
        Self { channels }
    }

    pub fn connectable(&self, channel: ChannelId) -> bool {
        self.channels
            .iter()
            .find(|c| c.id == channel)
            .map(|c| c.connectable)
            .unwrap_or(false)
    }

    pub fn channel_name(&self, channel: ChannelId) -> Option<&str> {
        self.channels
            .iter()
            .find(|c| c.id == channel)
            .map(|c| c.name.as_str())
    }
}

/// Reads the current voice occupancy of `guild_id` from the gateway cache.
///
/// Returns `None` when the guild is not cached (unknown state for this
/// cycle; the caller skips the pass rather than acting on it). The whole
/// read happens inside one cache borrow, so no await points here.
pub fn capture(ctx: &Context, guild_id: GuildId) -> Option<GuildSnapshot> {
    let bot_id = ctx.cache.current_user().id;
    let guild = ctx.cache.guild(guild_id)?;

    let mut voice_channels: Vec<_> = guild
        .channels
        .values()
        .filter(|c| matches!(c.kind, ChannelType::Voice | ChannelType::Stage))
        .collect();
    voice_channels.sort_by_key(|c| (c.position, c.id));

    let bot_member = guild.members.get(&bot_id);

    let channels = voice_channels
        .into_iter()
        .map(|channel| {
            let humans = guild
                .voice_states
                .values()
                .filter(|vs| vs.channel_id == Some(channel.id))
                .filter_map(|vs| {
                    let uid = vs.user_id;
                    if uid == bot_id {
                        return None;
                    }
                    let is_bot = guild
                        .members
                        .get(&uid)
                        .map(|m| m.user.bot)
                        .or_else(|| vs.member.as_ref().map(|m| m.user.bot))
                        .unwrap_or(false);
                    (!is_bot).then_some(uid)
                })
                .collect();
            let connectable = bot_member
                .map(|m| {
                    guild
                        .user_permissions_in(channel, m)
                        .contains(Permissions::CONNECT)
                })
                .unwrap_or(true);
            ChannelOccupancy {
                id: channel.id,
                name: channel.name.clone(),
                humans,
                connectable,
            }
        })
        .collect();

    Some(GuildSnapshot { channels })
}

#[cfg(test)]
pub(crate) fn occupancy(id: u64, humans: &[u64]) -> ChannelOccupancy {
    ChannelOccupancy {
        id: ChannelId::new(id),
        name: format!("voice-{}", id),
        humans: humans.iter().map(|&u| UserId::new(u)).collect(),
        connectable: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_parts_preserves_order_and_occupants() {
        use crate::watch::rules::{evaluate, WatchMode};

        // Channel order is whatever the caller gave, empty channels and
        // all; occupants are exactly the ids handed in.
        let snap = GuildSnapshot::from_parts(vec![
            occupancy(30, &[1, 2]),
            occupancy(10, &[]),
            occupancy(20, &[1, 2]),
        ]);
        let ids: Vec<ChannelId> = snap.channels.iter().map(|c| c.id).collect();
        assert_eq!(
            ids,
            vec![ChannelId::new(30), ChannelId::new(10), ChannelId::new(20)]
        );
        assert_eq!(snap.channels[0].humans, vec![UserId::new(1), UserId::new(2)]);
        assert!(snap.channels[1].humans.is_empty());

        // The rules walk that same order: the first satisfying channel
        // wins, the empty one in between never matches.
        assert_eq!(
            evaluate(
                &snap,
                (UserId::new(1), UserId::new(2)),
                WatchMode::AloneTogether
            ),
            Some(ChannelId::new(30))
        );
    }

    #[test]
    fn lookups_by_channel_id() {
        let snap = GuildSnapshot::from_parts(vec![occupancy(10, &[1, 2]), occupancy(20, &[])]);
        assert!(snap.connectable(ChannelId::new(10)));
        assert!(!snap.connectable(ChannelId::new(99)));
        assert_eq!(snap.channel_name(ChannelId::new(20)), Some("voice-20"));
        assert_eq!(snap.channel_name(ChannelId::new(99)), None);
    }
}
