//! # chord-core
//!
//! Domain layer containing the entity snapshots mirrored from the remote service
//! and the value objects they are built from.
//! This crate has zero dependencies on infrastructure (network, runtime, etc.).

pub mod entities;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use entities::{
    Activity, ActivityType, Channel, ChannelType, Emoji, Guild, Identified, Invite, Member,
    Message, Role, UnavailableGuild, User, Webhook,
};
pub use value_objects::{Intents, Permissions, Snowflake, SnowflakeParseError};
