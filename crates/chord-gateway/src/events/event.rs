//! Typed dispatch events
//!
//! Each variant embeds the entity snapshot the event carries plus any
//! event-specific fields. Events that remove something from the cache also
//! carry the removed snapshot when it was cached.

use super::GatewayEventType;
use chord_core::{
    Channel, Emoji, Guild, Invite, Member, Message, Role, Snowflake, UnavailableGuild, User,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A decoded dispatch event
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Ready(Box<Ready>),
    Resumed,
    GuildCreate(Box<Guild>),
    GuildUpdate(Box<Guild>),
    GuildDelete(GuildDelete),
    ChannelCreate(Channel),
    ChannelUpdate(Channel),
    ChannelDelete(Channel),
    ChannelPinsUpdate(ChannelPinsUpdate),
    MessageCreate(Box<Message>),
    MessageUpdate(MessageUpdate),
    MessageDelete(MessageDelete),
    MessageDeleteBulk(MessageDeleteBulk),
    MessageReactionAdd(Reaction),
    MessageReactionRemove(Reaction),
    GuildMemberAdd(Member),
    GuildMemberUpdate(Member),
    GuildMemberRemove(MemberRemove),
    GuildRoleCreate(RoleEvent),
    GuildRoleUpdate(RoleEvent),
    GuildRoleDelete(RoleDelete),
    GuildBanAdd(Ban),
    GuildBanRemove(Ban),
    GuildEmojisUpdate(EmojisUpdate),
    InviteCreate(Invite),
    InviteDelete(InviteDelete),
    WebhooksUpdate(WebhooksUpdate),
    TypingStart(TypingStart),
}

impl Event {
    /// Event type this event was built from
    #[must_use]
    pub fn kind(&self) -> GatewayEventType {
        match self {
            Self::Ready(_) => GatewayEventType::Ready,
            Self::Resumed => GatewayEventType::Resumed,
            Self::GuildCreate(_) => GatewayEventType::GuildCreate,
            Self::GuildUpdate(_) => GatewayEventType::GuildUpdate,
            Self::GuildDelete(_) => GatewayEventType::GuildDelete,
            Self::ChannelCreate(_) => GatewayEventType::ChannelCreate,
            Self::ChannelUpdate(_) => GatewayEventType::ChannelUpdate,
            Self::ChannelDelete(_) => GatewayEventType::ChannelDelete,
            Self::ChannelPinsUpdate(_) => GatewayEventType::ChannelPinsUpdate,
            Self::MessageCreate(_) => GatewayEventType::MessageCreate,
            Self::MessageUpdate(_) => GatewayEventType::MessageUpdate,
            Self::MessageDelete(_) => GatewayEventType::MessageDelete,
            Self::MessageDeleteBulk(_) => GatewayEventType::MessageDeleteBulk,
            Self::MessageReactionAdd(_) => GatewayEventType::MessageReactionAdd,
            Self::MessageReactionRemove(_) => GatewayEventType::MessageReactionRemove,
            Self::GuildMemberAdd(_) => GatewayEventType::GuildMemberAdd,
            Self::GuildMemberUpdate(_) => GatewayEventType::GuildMemberUpdate,
            Self::GuildMemberRemove(_) => GatewayEventType::GuildMemberRemove,
            Self::GuildRoleCreate(_) => GatewayEventType::GuildRoleCreate,
            Self::GuildRoleUpdate(_) => GatewayEventType::GuildRoleUpdate,
            Self::GuildRoleDelete(_) => GatewayEventType::GuildRoleDelete,
            Self::GuildBanAdd(_) => GatewayEventType::GuildBanAdd,
            Self::GuildBanRemove(_) => GatewayEventType::GuildBanRemove,
            Self::GuildEmojisUpdate(_) => GatewayEventType::GuildEmojisUpdate,
            Self::InviteCreate(_) => GatewayEventType::InviteCreate,
            Self::InviteDelete(_) => GatewayEventType::InviteDelete,
            Self::WebhooksUpdate(_) => GatewayEventType::WebhooksUpdate,
            Self::TypingStart(_) => GatewayEventType::TypingStart,
        }
    }

    /// Public name handlers are registered under
    #[must_use]
    pub fn name(&self) -> String {
        self.kind().handler_name()
    }

    /// Guild the event belongs to, if any
    #[must_use]
    pub fn guild_id(&self) -> Option<Snowflake> {
        match self {
            Self::Ready(_) | Self::Resumed => None,
            Self::GuildCreate(guild) | Self::GuildUpdate(guild) => Some(guild.id),
            Self::GuildDelete(e) => Some(e.id),
            Self::ChannelCreate(c) | Self::ChannelUpdate(c) | Self::ChannelDelete(c) => c.guild_id,
            Self::ChannelPinsUpdate(e) => e.guild_id,
            Self::MessageCreate(m) => m.guild_id,
            Self::MessageUpdate(e) => e.guild_id,
            Self::MessageDelete(e) => e.guild_id,
            Self::MessageDeleteBulk(e) => e.guild_id,
            Self::MessageReactionAdd(e) | Self::MessageReactionRemove(e) => e.guild_id,
            Self::GuildMemberAdd(m) | Self::GuildMemberUpdate(m) => m.guild_id,
            Self::GuildMemberRemove(e) => Some(e.guild_id),
            Self::GuildRoleCreate(e) | Self::GuildRoleUpdate(e) => Some(e.guild_id),
            Self::GuildRoleDelete(e) => Some(e.guild_id),
            Self::GuildBanAdd(e) | Self::GuildBanRemove(e) => Some(e.guild_id),
            Self::GuildEmojisUpdate(e) => Some(e.guild_id),
            Self::InviteCreate(i) => i.guild_id,
            Self::InviteDelete(e) => e.guild_id,
            Self::WebhooksUpdate(e) => Some(e.guild_id),
            Self::TypingStart(e) => e.guild_id,
        }
    }
}

/// READY - the session is established
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ready {
    /// Gateway protocol version
    #[serde(default)]
    pub v: u8,
    pub user: User,
    /// Guilds the user is in; full guilds follow as GUILD_CREATE
    #[serde(default)]
    pub guilds: Vec<UnavailableGuild>,
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume_gateway_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shard: Option<[u32; 2]>,
    #[serde(default)]
    pub private_channels: Vec<Channel>,
}

/// GUILD_DELETE - left the guild, or it became unavailable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildDelete {
    pub id: Snowflake,
    /// Set when the guild went down rather than the user leaving
    #[serde(default)]
    pub unavailable: bool,
    /// Snapshot removed from the cache
    #[serde(skip)]
    pub cached: Option<Guild>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelPinsUpdate {
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    pub channel_id: Snowflake,
    #[serde(default)]
    pub last_pin_timestamp: Option<DateTime<Utc>>,
}

/// MESSAGE_UPDATE - partial message, only changed fields are present
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageUpdate {
    pub id: Snowflake,
    pub channel_id: Snowflake,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    #[serde(default)]
    pub author: Option<User>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub edited_timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub pinned: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageDelete {
    pub id: Snowflake,
    pub channel_id: Snowflake,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageDeleteBulk {
    pub ids: Vec<Snowflake>,
    pub channel_id: Snowflake,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
}

/// MESSAGE_REACTION_ADD / MESSAGE_REACTION_REMOVE
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction {
    pub user_id: Snowflake,
    pub channel_id: Snowflake,
    pub message_id: Snowflake,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    /// Only present on add, in guilds
    #[serde(default)]
    pub member: Option<Member>,
    pub emoji: Emoji,
}

/// GUILD_MEMBER_REMOVE
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberRemove {
    pub guild_id: Snowflake,
    pub user: User,
    #[serde(skip)]
    pub cached: Option<Member>,
}

/// GUILD_ROLE_CREATE / GUILD_ROLE_UPDATE
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleEvent {
    pub guild_id: Snowflake,
    pub role: Role,
}

/// GUILD_ROLE_DELETE
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleDelete {
    pub guild_id: Snowflake,
    pub role_id: Snowflake,
    #[serde(skip)]
    pub cached: Option<Role>,
}

/// GUILD_BAN_ADD / GUILD_BAN_REMOVE
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ban {
    pub guild_id: Snowflake,
    pub user: User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmojisUpdate {
    pub guild_id: Snowflake,
    #[serde(default)]
    pub emojis: Vec<Emoji>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InviteDelete {
    pub channel_id: Snowflake,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhooksUpdate {
    pub guild_id: Snowflake,
    pub channel_id: Snowflake,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypingStart {
    pub channel_id: Snowflake,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    pub user_id: Snowflake,
    /// Unix time in seconds
    pub timestamp: i64,
    #[serde(default)]
    pub member: Option<Member>,
}

impl TypingStart {
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.timestamp, 0)
    }
}
