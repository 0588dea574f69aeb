//! Bot orchestrator
//!
//! Owns the gateway connection and the event dispatcher and drives the
//! receive loop. [`BotHandle`] is the thread-safe face handed to event handlers.

mod bot;
mod builder;
mod handle;

pub use bot::Bot;
pub use builder::BotBuilder;
pub use handle::BotHandle;
