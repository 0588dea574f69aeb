//! Gateway connection management
//!
//! Session data, the outbound writer, the heartbeat task and the connection
//! state machine that ties them together.

mod gateway;
mod handle;
mod heartbeat;
mod session;
mod state;
mod writer;

pub use gateway::{ConnectionConfig, GatewayConnection};
pub use handle::GatewayHandle;
pub use heartbeat::HeartbeatTask;
pub use session::SessionState;
pub use state::ConnectionState;
pub use writer::WriterHandle;
