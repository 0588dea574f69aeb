//! Guild/channel/member/role cache
//!
//! Uses `DashMap` for concurrent reads while the dispatch path writes.

use crate::store::Store;
use chord_core::{Channel, Emoji, Guild, Member, Role, Snowflake, User};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::Arc;

/// Cache shared between the dispatcher and handlers
pub type SharedCache = Arc<Cache>;

/// A cached guild, with nested collections split into id-keyed stores
#[derive(Debug, Clone)]
struct GuildEntry {
    /// Scalar guild fields; nested vectors are kept empty
    guild: Guild,
    channels: Store<Channel>,
    members: Store<Member>,
    roles: Store<Role>,
    emojis: Vec<Emoji>,
}

impl GuildEntry {
    fn from_guild(mut guild: Guild) -> Self {
        let channels = std::mem::take(&mut guild.channels)
            .into_iter()
            .map(|mut channel| {
                channel.guild_id.get_or_insert(guild.id);
                channel
            })
            .collect();
        let members = std::mem::take(&mut guild.members)
            .into_iter()
            .map(|mut member| {
                member.guild_id.get_or_insert(guild.id);
                member
            })
            .collect();
        let roles = std::mem::take(&mut guild.roles).into_iter().collect();
        let emojis = std::mem::take(&mut guild.emojis);

        Self {
            guild,
            channels,
            members,
            roles,
            emojis,
        }
    }

    fn snapshot(&self) -> Guild {
        Guild {
            channels: self.channels.to_vec(),
            members: self.members.to_vec(),
            roles: self.roles.to_vec(),
            emojis: self.emojis.clone(),
            ..self.guild.clone()
        }
    }
}

/// In-memory mirror of remote state
///
/// Every read returns an owned snapshot.
#[derive(Debug, Default)]
pub struct Cache {
    guilds: DashMap<Snowflake, GuildEntry>,

    /// Channel ID to owning guild ID
    channel_guilds: DashMap<Snowflake, Snowflake>,

    /// Channels without a guild (direct messages)
    private_channels: DashMap<Snowflake, Channel>,

    current_user: RwLock<Option<User>>,
}

impl Cache {
    /// Create an empty cache
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty cache wrapped in Arc
    #[must_use]
    pub fn new_shared() -> SharedCache {
        Arc::new(Self::new())
    }

    // ========================================================================
    // Current user
    // ========================================================================

    pub fn set_current_user(&self, user: User) {
        *self.current_user.write() = Some(user);
    }

    pub fn current_user(&self) -> Option<User> {
        self.current_user.read().clone()
    }

    // ========================================================================
    // Guilds
    // ========================================================================

    /// Insert or replace a guild with everything it carries
    pub fn upsert_guild(&self, guild: Guild) {
        let guild_id = guild.id;

        // Drop index entries of the replaced guild's channels
        if let Some((_, old)) = self.guilds.remove(&guild_id) {
            for channel in old.channels.to_vec() {
                self.channel_guilds.remove(&channel.id);
            }
        }

        let entry = GuildEntry::from_guild(guild);
        for channel in entry.channels.to_vec() {
            self.channel_guilds.insert(channel.id, guild_id);
        }
        self.guilds.insert(guild_id, entry);

        tracing::trace!(guild_id = %guild_id, "Guild cached");
    }

    /// Apply a partial guild update
    ///
    /// Scalar fields are replaced; nested collections are only replaced when
    /// the update carries them. Unknown guilds are inserted as-is.
    pub fn merge_guild_update(&self, update: Guild) -> Guild {
        let guild_id = update.id;

        if let Some(mut entry) = self.guilds.get_mut(&guild_id) {
            if !update.roles.is_empty() {
                entry.roles = update.roles.iter().cloned().collect();
            }
            if !update.emojis.is_empty() {
                entry.emojis.clone_from(&update.emojis);
            }
            entry.guild = Guild {
                channels: Vec::new(),
                members: Vec::new(),
                roles: Vec::new(),
                emojis: Vec::new(),
                ..update
            };

            tracing::trace!(guild_id = %guild_id, "Guild updated");
            return entry.snapshot();
        }

        self.upsert_guild(update);
        self.guild(guild_id).unwrap_or_default()
    }

    /// Remove a guild; absent ids are a no-op
    pub fn remove_guild(&self, guild_id: Snowflake) -> Option<Guild> {
        let (_, entry) = self.guilds.remove(&guild_id)?;
        for channel in entry.channels.to_vec() {
            self.channel_guilds.remove(&channel.id);
        }

        tracing::trace!(guild_id = %guild_id, "Guild removed");
        Some(entry.snapshot())
    }

    pub fn guild(&self, guild_id: Snowflake) -> Option<Guild> {
        self.guilds.get(&guild_id).map(|entry| entry.snapshot())
    }

    pub fn contains_guild(&self, guild_id: Snowflake) -> bool {
        self.guilds.contains_key(&guild_id)
    }

    /// Snapshot of every cached guild, ordered by id
    pub fn guilds(&self) -> Vec<Guild> {
        let mut guilds: Vec<Guild> = self.guilds.iter().map(|entry| entry.snapshot()).collect();
        guilds.sort_by_key(|g| g.id);
        guilds
    }

    pub fn guild_count(&self) -> usize {
        self.guilds.len()
    }

    // ========================================================================
    // Channels
    // ========================================================================

    /// Insert or replace a channel by id
    ///
    /// Channels without a guild go to the private channel store. Returns
    /// `false` when the owning guild is not cached.
    pub fn upsert_channel(&self, channel: Channel) -> bool {
        let Some(guild_id) = channel.guild_id else {
            self.private_channels.insert(channel.id, channel);
            return true;
        };

        let channel_id = channel.id;
        let Some(mut entry) = self.guilds.get_mut(&guild_id) else {
            return false;
        };
        entry.channels.upsert(channel);
        drop(entry);

        self.channel_guilds.insert(channel_id, guild_id);
        true
    }

    /// Remove a channel by id, looking in the given guild or the private store
    pub fn remove_channel(&self, guild_id: Option<Snowflake>, channel_id: Snowflake) -> Option<Channel> {
        let Some(guild_id) = guild_id else {
            return self.private_channels.remove(&channel_id).map(|(_, c)| c);
        };

        let removed = self
            .guilds
            .get_mut(&guild_id)
            .and_then(|mut entry| entry.channels.remove(channel_id));
        if removed.is_some() {
            self.channel_guilds.remove(&channel_id);
        }
        removed
    }

    /// Look up any cached channel by id
    pub fn channel(&self, channel_id: Snowflake) -> Option<Channel> {
        if let Some(channel) = self.private_channels.get(&channel_id) {
            return Some(channel.clone());
        }

        let guild_id = *self.channel_guilds.get(&channel_id)?;
        self.guilds
            .get(&guild_id)
            .and_then(|entry| entry.channels.get(channel_id).cloned())
    }

    pub fn private_channels(&self) -> Vec<Channel> {
        let mut channels: Vec<Channel> = self.private_channels.iter().map(|c| c.clone()).collect();
        channels.sort_by_key(|c| c.id);
        channels
    }

    // ========================================================================
    // Members
    // ========================================================================

    /// Insert or replace a member by user id; `false` when the guild is not cached
    pub fn upsert_member(&self, guild_id: Snowflake, mut member: Member) -> bool {
        let Some(mut entry) = self.guilds.get_mut(&guild_id) else {
            return false;
        };
        member.guild_id = Some(guild_id);
        entry.members.upsert(member);
        true
    }

    /// Remove a member; absent ids are a no-op
    pub fn remove_member(&self, guild_id: Snowflake, user_id: Snowflake) -> Option<Member> {
        self.guilds
            .get_mut(&guild_id)
            .and_then(|mut entry| entry.members.remove(user_id))
    }

    pub fn member(&self, guild_id: Snowflake, user_id: Snowflake) -> Option<Member> {
        self.guilds
            .get(&guild_id)
            .and_then(|entry| entry.members.get(user_id).cloned())
    }

    // ========================================================================
    // Roles
    // ========================================================================

    /// Insert or replace a role by id; `false` when the guild is not cached
    pub fn upsert_role(&self, guild_id: Snowflake, role: Role) -> bool {
        let Some(mut entry) = self.guilds.get_mut(&guild_id) else {
            return false;
        };
        entry.roles.upsert(role);
        true
    }

    /// Remove a role; absent ids are a no-op
    pub fn remove_role(&self, guild_id: Snowflake, role_id: Snowflake) -> Option<Role> {
        self.guilds
            .get_mut(&guild_id)
            .and_then(|mut entry| entry.roles.remove(role_id))
    }

    pub fn role(&self, guild_id: Snowflake, role_id: Snowflake) -> Option<Role> {
        self.guilds
            .get(&guild_id)
            .and_then(|entry| entry.roles.get(role_id).cloned())
    }

    // ========================================================================
    // Emojis
    // ========================================================================

    /// Replace a guild's emoji list; `false` when the guild is not cached
    pub fn set_emojis(&self, guild_id: Snowflake, emojis: Vec<Emoji>) -> bool {
        let Some(mut entry) = self.guilds.get_mut(&guild_id) else {
            return false;
        };
        entry.emojis = emojis;
        true
    }

    pub fn emojis(&self, guild_id: Snowflake) -> Vec<Emoji> {
        self.guilds
            .get(&guild_id)
            .map(|entry| entry.emojis.clone())
            .unwrap_or_default()
    }

    /// Drop everything
    pub fn clear(&self) {
        self.guilds.clear();
        self.channel_guilds.clear();
        self.private_channels.clear();
        *self.current_user.write() = None;
    }
}
