//! # chord-cache
//!
//! In-memory mirror of the remote state seen through the gateway.
//!
//! ## Features
//!
//! - **Guild store**: guilds keyed by id, each owning its channels, members, roles and emojis
//! - **Private channels**: direct message channels that belong to no guild
//! - **Snapshots**: readers always get owned copies, never references into the store
//!
//! The event dispatch path is the only writer; handlers and the bot handle read.
//!
//! ## Example
//!
//! ```ignore
//! use chord_cache::Cache;
//!
//! let cache = Cache::new_shared();
//! cache.upsert_guild(guild);
//! let channel = cache.channel(channel_id);
//! ```

mod cache;
mod store;

pub use cache::{Cache, SharedCache};
pub use store::Store;
