//! # chord-gateway
//!
//! Persistent gateway client: connects, authenticates, keeps the connection
//! alive with heartbeats, resumes after transient drops and fans decoded
//! events out to user handlers while mirroring remote state in the cache.
//!
//! ```ignore
//! use chord_gateway::{Bot, Event, GatewayEventType};
//!
//! let mut bot = Bot::new(config)?;
//! bot.on(GatewayEventType::MessageCreate, |bot: BotHandle, event: Event| async move {
//!     if let Event::MessageCreate(message) = event {
//!         tracing::info!(content = %message.content, "message");
//!     }
//!     anyhow::Ok(())
//! });
//! bot.run().await?;
//! ```

pub mod bot;
pub mod connection;
pub mod error;
pub mod events;
pub mod protocol;
pub mod transport;

pub use bot::{Bot, BotBuilder, BotHandle};
pub use connection::{ConnectionConfig, ConnectionState, GatewayConnection, GatewayHandle, SessionState};
pub use error::{EventError, GatewayError, TransportError};
pub use events::{Event, EventDispatcher, EventHandler, EventRegistry, GatewayEventType};
pub use protocol::{CloseCode, GatewayMessage, OpCode, PresencePayload, Status};
pub use transport::{Connector, TransportSink, TransportStream, WsConnector};
