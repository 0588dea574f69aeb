//! Domain entities - snapshots of remote objects mirrored by the client

mod activity;
mod channel;
mod emoji;
mod guild;
mod invite;
mod member;
mod message;
mod role;
mod user;
mod webhook;

pub use activity::{Activity, ActivityType};
pub use channel::{Channel, ChannelType};
pub use emoji::Emoji;
pub use guild::{Guild, UnavailableGuild};
pub use invite::Invite;
pub use member::Member;
pub use message::Message;
pub use role::Role;
pub use user::User;
pub use webhook::Webhook;

use crate::value_objects::Snowflake;

/// An entity with a stable identifier
///
/// Cache collections are keyed by this identifier.
pub trait Identified {
    /// The identifier of this entity
    fn id(&self) -> Snowflake;
}
