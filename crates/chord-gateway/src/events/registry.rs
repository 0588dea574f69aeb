//! Event registry
//!
//! Explicit table from wire tag to (event type, constructor), built once.

use super::builders::{self, BuildFn};
use super::{Event, GatewayEventType};
use crate::error::EventError;
use chord_cache::Cache;
use serde_json::Value;
use std::collections::HashMap;

/// One registered event tag
#[derive(Clone, Copy)]
pub struct EventEntry {
    kind: GatewayEventType,
    build: BuildFn,
}

impl EventEntry {
    pub fn kind(&self) -> GatewayEventType {
        self.kind
    }

    /// Public handler name
    pub fn name(&self) -> String {
        self.kind.handler_name()
    }

    /// Decode `data` and apply it to the cache
    pub fn build(&self, cache: &Cache, data: Value) -> Result<Event, EventError> {
        (self.build)(cache, data).map_err(|source| EventError::Decode {
            event: self.kind.as_str(),
            source,
        })
    }
}

impl std::fmt::Debug for EventEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEntry").field("kind", &self.kind).finish()
    }
}

/// Lookup table of every event the client understands
#[derive(Debug, Clone)]
pub struct EventRegistry {
    entries: HashMap<&'static str, EventEntry>,
}

impl EventRegistry {
    /// Registry with every supported event
    pub fn standard() -> Self {
        let mut entries = HashMap::with_capacity(GatewayEventType::ALL.len());
        for kind in GatewayEventType::ALL {
            entries.insert(kind.as_str(), EventEntry { kind, build: constructor(kind) });
        }
        Self { entries }
    }

    /// Exact-match lookup by wire tag
    pub fn lookup(&self, tag: &str) -> Option<&EventEntry> {
        self.entries.get(tag)
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.entries.contains_key(tag)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered tags, sorted
    pub fn tags(&self) -> Vec<&'static str> {
        let mut tags: Vec<_> = self.entries.keys().copied().collect();
        tags.sort_unstable();
        tags
    }
}

impl Default for EventRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

fn constructor(kind: GatewayEventType) -> BuildFn {
    use GatewayEventType as T;

    match kind {
        T::Ready => builders::ready,
        T::Resumed => builders::resumed,
        T::GuildCreate => builders::guild_create,
        T::GuildUpdate => builders::guild_update,
        T::GuildDelete => builders::guild_delete,
        T::ChannelCreate => builders::channel_create,
        T::ChannelUpdate => builders::channel_update,
        T::ChannelDelete => builders::channel_delete,
        T::ChannelPinsUpdate => builders::channel_pins_update,
        T::MessageCreate => builders::message_create,
        T::MessageUpdate => builders::message_update,
        T::MessageDelete => builders::message_delete,
        T::MessageDeleteBulk => builders::message_delete_bulk,
        T::MessageReactionAdd => builders::reaction_add,
        T::MessageReactionRemove => builders::reaction_remove,
        T::GuildMemberAdd => builders::member_add,
        T::GuildMemberUpdate => builders::member_update,
        T::GuildMemberRemove => builders::member_remove,
        T::GuildRoleCreate => builders::role_create,
        T::GuildRoleUpdate => builders::role_update,
        T::GuildRoleDelete => builders::role_delete,
        T::GuildBanAdd => builders::ban_add,
        T::GuildBanRemove => builders::ban_remove,
        T::GuildEmojisUpdate => builders::emojis_update,
        T::InviteCreate => builders::invite_create,
        T::InviteDelete => builders::invite_delete,
        T::WebhooksUpdate => builders::webhooks_update,
        T::TypingStart => builders::typing_start,
    }
}
