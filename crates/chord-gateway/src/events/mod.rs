//! Gateway events
//!
//! Typed dispatch events, the registry that builds them, and the dispatcher
//! that hands them to user handlers.

mod builders;
mod dispatcher;
mod event;
mod event_types;
mod handler;
mod registry;

pub use builders::BuildFn;
pub use dispatcher::EventDispatcher;
pub use event::{
    Ban, ChannelPinsUpdate, EmojisUpdate, Event, GuildDelete, InviteDelete, MemberRemove,
    MessageDelete, MessageDeleteBulk, MessageUpdate, Reaction, Ready, RoleDelete, RoleEvent,
    TypingStart, WebhooksUpdate,
};
pub use event_types::GatewayEventType;
pub use handler::EventHandler;
pub use registry::{EventEntry, EventRegistry};
