//! Event constructors
//!
//! One function per event tag. Each decodes the dispatch payload and applies
//! the event to the cache. Payloads for guilds that are not cached still
//! produce an event, they just leave the cache alone.

use super::event::{
    Ban, ChannelPinsUpdate, EmojisUpdate, Event, GuildDelete, InviteDelete, MemberRemove,
    MessageDelete, MessageDeleteBulk, MessageUpdate, Reaction, Ready, RoleDelete, RoleEvent,
    TypingStart, WebhooksUpdate,
};
use chord_cache::Cache;
use chord_core::{Channel, Guild, Invite, Member, Message};
use serde_json::Value;

/// Signature shared by all constructors
pub type BuildFn = fn(&Cache, Value) -> Result<Event, serde_json::Error>;

// ============================================================================
// Connection
// ============================================================================

pub(crate) fn ready(cache: &Cache, data: Value) -> Result<Event, serde_json::Error> {
    let ready: Ready = serde_json::from_value(data)?;

    cache.set_current_user(ready.user.clone());

    // Stubs only; a full GUILD_CREATE may already have arrived
    for stub in &ready.guilds {
        if !cache.contains_guild(stub.id) {
            cache.upsert_guild(Guild::from(*stub));
        }
    }
    for channel in &ready.private_channels {
        cache.upsert_channel(channel.clone());
    }

    tracing::debug!(
        session_id = %ready.session_id,
        guilds = ready.guilds.len(),
        "Cache primed from READY"
    );
    Ok(Event::Ready(Box::new(ready)))
}

pub(crate) fn resumed(_cache: &Cache, _data: Value) -> Result<Event, serde_json::Error> {
    Ok(Event::Resumed)
}

// ============================================================================
// Guilds
// ============================================================================

pub(crate) fn guild_create(cache: &Cache, data: Value) -> Result<Event, serde_json::Error> {
    let guild: Guild = serde_json::from_value(data)?;
    cache.upsert_guild(guild.clone());
    Ok(Event::GuildCreate(Box::new(guild)))
}

pub(crate) fn guild_update(cache: &Cache, data: Value) -> Result<Event, serde_json::Error> {
    let update: Guild = serde_json::from_value(data)?;
    let merged = cache.merge_guild_update(update);
    Ok(Event::GuildUpdate(Box::new(merged)))
}

pub(crate) fn guild_delete(cache: &Cache, data: Value) -> Result<Event, serde_json::Error> {
    let mut event: GuildDelete = serde_json::from_value(data)?;
    event.cached = cache.remove_guild(event.id);
    Ok(Event::GuildDelete(event))
}

// ============================================================================
// Channels
// ============================================================================

fn upsert_channel(cache: &Cache, data: Value) -> Result<Channel, serde_json::Error> {
    let channel: Channel = serde_json::from_value(data)?;
    if !cache.upsert_channel(channel.clone()) {
        tracing::trace!(channel_id = %channel.id, "Channel for uncached guild");
    }
    Ok(channel)
}

pub(crate) fn channel_create(cache: &Cache, data: Value) -> Result<Event, serde_json::Error> {
    upsert_channel(cache, data).map(Event::ChannelCreate)
}

pub(crate) fn channel_update(cache: &Cache, data: Value) -> Result<Event, serde_json::Error> {
    upsert_channel(cache, data).map(Event::ChannelUpdate)
}

pub(crate) fn channel_delete(cache: &Cache, data: Value) -> Result<Event, serde_json::Error> {
    let channel: Channel = serde_json::from_value(data)?;
    cache.remove_channel(channel.guild_id, channel.id);
    Ok(Event::ChannelDelete(channel))
}

pub(crate) fn channel_pins_update(_cache: &Cache, data: Value) -> Result<Event, serde_json::Error> {
    serde_json::from_value::<ChannelPinsUpdate>(data).map(Event::ChannelPinsUpdate)
}

// ============================================================================
// Messages
// ============================================================================

pub(crate) fn message_create(cache: &Cache, data: Value) -> Result<Event, serde_json::Error> {
    let message: Message = serde_json::from_value(data)?;

    if let Some(mut channel) = cache.channel(message.channel_id) {
        channel.last_message_id = Some(message.id);
        cache.upsert_channel(channel);
    }

    Ok(Event::MessageCreate(Box::new(message)))
}

pub(crate) fn message_update(_cache: &Cache, data: Value) -> Result<Event, serde_json::Error> {
    serde_json::from_value::<MessageUpdate>(data).map(Event::MessageUpdate)
}

pub(crate) fn message_delete(_cache: &Cache, data: Value) -> Result<Event, serde_json::Error> {
    serde_json::from_value::<MessageDelete>(data).map(Event::MessageDelete)
}

pub(crate) fn message_delete_bulk(_cache: &Cache, data: Value) -> Result<Event, serde_json::Error> {
    serde_json::from_value::<MessageDeleteBulk>(data).map(Event::MessageDeleteBulk)
}

pub(crate) fn reaction_add(_cache: &Cache, data: Value) -> Result<Event, serde_json::Error> {
    serde_json::from_value::<Reaction>(data).map(Event::MessageReactionAdd)
}

pub(crate) fn reaction_remove(_cache: &Cache, data: Value) -> Result<Event, serde_json::Error> {
    serde_json::from_value::<Reaction>(data).map(Event::MessageReactionRemove)
}

// ============================================================================
// Members
// ============================================================================

fn upsert_member(cache: &Cache, data: Value) -> Result<Member, serde_json::Error> {
    let member: Member = serde_json::from_value(data)?;
    if let Some(guild_id) = member.guild_id {
        if !cache.upsert_member(guild_id, member.clone()) {
            tracing::trace!(guild_id = %guild_id, "Member for uncached guild");
        }
    }
    Ok(member)
}

pub(crate) fn member_add(cache: &Cache, data: Value) -> Result<Event, serde_json::Error> {
    upsert_member(cache, data).map(Event::GuildMemberAdd)
}

pub(crate) fn member_update(cache: &Cache, data: Value) -> Result<Event, serde_json::Error> {
    upsert_member(cache, data).map(Event::GuildMemberUpdate)
}

pub(crate) fn member_remove(cache: &Cache, data: Value) -> Result<Event, serde_json::Error> {
    let mut event: MemberRemove = serde_json::from_value(data)?;
    event.cached = cache.remove_member(event.guild_id, event.user.id);
    Ok(Event::GuildMemberRemove(event))
}

// ============================================================================
// Roles
// ============================================================================

fn upsert_role(cache: &Cache, data: Value) -> Result<RoleEvent, serde_json::Error> {
    let event: RoleEvent = serde_json::from_value(data)?;
    cache.upsert_role(event.guild_id, event.role.clone());
    Ok(event)
}

pub(crate) fn role_create(cache: &Cache, data: Value) -> Result<Event, serde_json::Error> {
    upsert_role(cache, data).map(Event::GuildRoleCreate)
}

pub(crate) fn role_update(cache: &Cache, data: Value) -> Result<Event, serde_json::Error> {
    upsert_role(cache, data).map(Event::GuildRoleUpdate)
}

pub(crate) fn role_delete(cache: &Cache, data: Value) -> Result<Event, serde_json::Error> {
    let mut event: RoleDelete = serde_json::from_value(data)?;
    event.cached = cache.remove_role(event.guild_id, event.role_id);
    Ok(Event::GuildRoleDelete(event))
}

// ============================================================================
// Everything else
// ============================================================================

pub(crate) fn ban_add(_cache: &Cache, data: Value) -> Result<Event, serde_json::Error> {
    serde_json::from_value::<Ban>(data).map(Event::GuildBanAdd)
}

pub(crate) fn ban_remove(_cache: &Cache, data: Value) -> Result<Event, serde_json::Error> {
    serde_json::from_value::<Ban>(data).map(Event::GuildBanRemove)
}

pub(crate) fn emojis_update(cache: &Cache, data: Value) -> Result<Event, serde_json::Error> {
    let event: EmojisUpdate = serde_json::from_value(data)?;
    cache.set_emojis(event.guild_id, event.emojis.clone());
    Ok(Event::GuildEmojisUpdate(event))
}

pub(crate) fn invite_create(_cache: &Cache, data: Value) -> Result<Event, serde_json::Error> {
    serde_json::from_value::<Invite>(data).map(Event::InviteCreate)
}

pub(crate) fn invite_delete(_cache: &Cache, data: Value) -> Result<Event, serde_json::Error> {
    serde_json::from_value::<InviteDelete>(data).map(Event::InviteDelete)
}

pub(crate) fn webhooks_update(_cache: &Cache, data: Value) -> Result<Event, serde_json::Error> {
    serde_json::from_value::<WebhooksUpdate>(data).map(Event::WebhooksUpdate)
}

pub(crate) fn typing_start(_cache: &Cache, data: Value) -> Result<Event, serde_json::Error> {
    serde_json::from_value::<TypingStart>(data).map(Event::TypingStart)
}
